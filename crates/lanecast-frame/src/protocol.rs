//! Wire-level constants and byte classification.
//!
//! The thresholds below are defined by the console firmware and are kept
//! exactly as observed on captured streams.

/// Bytes at or above this value are control bytes.
pub const CONTROL_THRESHOLD: u8 = 0x7F;

/// Control bytes above this value blank the addressed channel.
pub const BLANK_THRESHOLD: u8 = 190;

/// Exclusive bounds of the address-marker control range.
pub const ADDRESS_MARKER_LOW: u8 = 169;
pub const ADDRESS_MARKER_HIGH: u8 = 190;

/// Stored value for a blanked segment (ASCII space).
pub const BLANK: u8 = 0x20;

/// What channel 0 stores for a zero nibble (ASCII '?').
pub const PLACEHOLDER: u8 = 0x3F;

/// Base added to inverted nibbles (ASCII '0').
pub const ASCII_ZERO: u8 = 0x30;

/// Segments per channel, in both the data and format buffers.
pub const SEGMENT_COUNT: usize = 8;

/// Number of addressable channels (5-bit address).
pub const CHANNEL_COUNT: usize = 32;

/// Which buffer of the addressed channel data bytes are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubMode {
    /// Display text segments.
    #[default]
    Data,
    /// Formatting-code segments.
    Format,
}

impl SubMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SubMode::Data => "data",
            SubMode::Format => "format",
        }
    }
}

/// A decoded control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlByte {
    pub raw: u8,
    pub sub_mode: SubMode,
    /// Channel address, 0-31.
    pub address: u8,
    /// Blank all data segments of the addressed channel.
    pub blank: bool,
    /// Address-acquisition marker.
    pub address_marker: bool,
}

impl ControlByte {
    pub fn decode(raw: u8) -> Self {
        let sub_mode = if raw & 0x01 == 1 {
            SubMode::Format
        } else {
            SubMode::Data
        };

        Self {
            raw,
            sub_mode,
            address: ((raw >> 1) & 0x1F) ^ 0x1F,
            blank: raw > BLANK_THRESHOLD,
            address_marker: raw > ADDRESS_MARKER_LOW && raw < ADDRESS_MARKER_HIGH,
        }
    }
}

/// A data byte split into its segment index and value nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataByte {
    pub raw: u8,
    /// High nibble; only 0-7 address a segment.
    pub segment: u8,
    /// Low nibble, still inverted.
    pub nibble: u8,
}

impl DataByte {
    pub fn decode(raw: u8) -> Self {
        Self {
            raw,
            segment: raw >> 4,
            nibble: raw & 0x0F,
        }
    }

    /// Segment index, or `None` when it falls outside the 8 segments.
    pub fn segment_index(&self) -> Option<usize> {
        let index = self.segment as usize;
        (index < SEGMENT_COUNT).then_some(index)
    }
}

/// Classification of a byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteKind {
    Control(ControlByte),
    Data(DataByte),
}

/// Classify a byte as control or data.
pub fn classify(byte: u8) -> ByteKind {
    if byte >= CONTROL_THRESHOLD {
        ByteKind::Control(ControlByte::decode(byte))
    } else {
        ByteKind::Data(DataByte::decode(byte))
    }
}

/// Turn a value nibble into the stored segment byte.
///
/// On channels above 0 a zero nibble means "segment off" and stores a blank.
/// Everything else is inverted and offset into ASCII digits, so channel 0's
/// zero nibble comes out as '?'.
pub fn decode_nibble(channel: u8, nibble: u8) -> u8 {
    let nibble = nibble & 0x0F;
    if channel > 0 && nibble == 0 {
        BLANK
    } else {
        (nibble ^ 0x0F) + ASCII_ZERO
    }
}

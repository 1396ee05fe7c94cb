use crate::protocol::{SubMode, BLANK, SEGMENT_COUNT};

/// One segment of a channel. `None` means the segment was never written.
pub type Slot = Option<u8>;

/// The content of one channel: 8 display segments and their 8 format codes.
///
/// Index `i` of `format` describes segment `i` of `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    number: u8,
    data: [Slot; SEGMENT_COUNT],
    format: [Slot; SEGMENT_COUNT],
}

impl ChannelRecord {
    /// A record with every segment unset.
    pub fn new(number: u8) -> Self {
        Self {
            number,
            data: [None; SEGMENT_COUNT],
            format: [None; SEGMENT_COUNT],
        }
    }

    /// A record with all data segments written and no format codes.
    pub fn with_data(number: u8, data: [u8; SEGMENT_COUNT]) -> Self {
        let mut record = Self::new(number);
        record.data = data.map(Some);
        record
    }

    /// Channel number, 0-31.
    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn data(&self) -> &[Slot; SEGMENT_COUNT] {
        &self.data
    }

    pub fn format(&self) -> &[Slot; SEGMENT_COUNT] {
        &self.format
    }

    /// Data segment at `index`, flattened to `None` when unset or out of range.
    pub fn data_at(&self, index: usize) -> Slot {
        self.data.get(index).copied().flatten()
    }

    /// Write one segment of the buffer selected by `mode`.
    pub fn set(&mut self, mode: SubMode, segment: usize, value: u8) {
        let slots = match mode {
            SubMode::Data => &mut self.data,
            SubMode::Format => &mut self.format,
        };
        if let Some(slot) = slots.get_mut(segment) {
            *slot = Some(value);
        }
    }

    /// Reset every data segment to blank. Format codes are left alone.
    pub fn blank_data(&mut self) {
        self.data = [Some(BLANK); SEGMENT_COUNT];
    }

    /// True when no segment has been written.
    pub fn is_unset(&self) -> bool {
        self.data.iter().chain(self.format.iter()).all(Option::is_none)
    }

    /// Overwrite both buffers with `other`'s, keeping this record's number.
    pub fn copy_slots_from(&mut self, other: &ChannelRecord) {
        self.data = other.data;
        self.format = other.format;
    }
}

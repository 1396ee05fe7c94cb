use tracing::{debug, trace, warn};

use crate::protocol::{classify, decode_nibble, ByteKind, ControlByte, DataByte, SubMode, BLANK};
use crate::record::ChannelRecord;

/// Side effects requested by the most recent control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFlags {
    /// The control byte was above the blank threshold.
    pub blank_pending: bool,
    /// The control byte was in the address-marker range.
    pub address_pending: bool,
}

/// Byte counters kept across the life of a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecoderStats {
    pub bytes: u64,
    pub control_bytes: u64,
    pub data_bytes: u64,
    /// Data bytes whose segment index was out of range.
    pub malformed: u64,
    /// Data bytes seen before any control byte.
    pub ignored: u64,
    pub commits: u64,
}

/// The channel-commit state machine, without any I/O.
///
/// Bytes are pushed in one at a time. A record is staged for the channel
/// named by the latest control byte and handed back, complete, when a
/// control byte names a different channel.
#[derive(Debug, Clone, Default)]
pub struct DecoderState {
    staging: Option<ChannelRecord>,
    sub_mode: SubMode,
    flags: ControlFlags,
    stats: DecoderStats,
}

impl DecoderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns the finished record when this byte commits one.
    pub fn push(&mut self, byte: u8) -> Option<ChannelRecord> {
        self.stats.bytes += 1;
        match classify(byte) {
            ByteKind::Control(control) => self.on_control(control),
            ByteKind::Data(data) => {
                self.on_data(data);
                None
            }
        }
    }

    fn on_control(&mut self, control: ControlByte) -> Option<ChannelRecord> {
        self.stats.control_bytes += 1;
        self.sub_mode = control.sub_mode;
        self.flags = ControlFlags {
            blank_pending: control.blank,
            address_pending: control.address_marker,
        };

        let same_channel = self
            .staging
            .as_ref()
            .map(|staging| staging.number() == control.address);

        let committed = match same_channel {
            Some(true) => None,
            Some(false) => self.staging.replace(ChannelRecord::new(control.address)),
            None => {
                self.staging = Some(ChannelRecord::new(control.address));
                None
            }
        };

        if let Some(staging) = self.staging.as_mut() {
            if control.blank {
                staging.blank_data();
            }
            if control.address_marker && staging.data_at(0) == Some(BLANK) {
                staging.blank_data();
            }
        }

        trace!(
            byte = control.raw,
            channel = control.address,
            sub_mode = control.sub_mode.as_str(),
            blank = control.blank,
            address_marker = control.address_marker,
            "control byte"
        );

        if let Some(record) = &committed {
            self.stats.commits += 1;
            debug!(channel = record.number(), next = control.address, "channel committed");
        }

        committed
    }

    fn on_data(&mut self, data: DataByte) {
        self.stats.data_bytes += 1;

        let Some(staging) = self.staging.as_mut() else {
            self.stats.ignored += 1;
            trace!(byte = data.raw, "data byte before any control byte, ignoring");
            return;
        };

        let Some(segment) = data.segment_index() else {
            self.stats.malformed += 1;
            warn!(
                channel = staging.number(),
                segment = data.segment,
                "segment index out of range, skipping byte"
            );
            return;
        };

        let value = decode_nibble(staging.number(), data.nibble);
        staging.set(self.sub_mode, segment, value);

        trace!(
            channel = staging.number(),
            segment,
            sub_mode = self.sub_mode.as_str(),
            value,
            "segment written"
        );
    }

    /// Channel currently being staged, if any control byte has been seen.
    pub fn current_channel(&self) -> Option<u8> {
        self.staging.as_ref().map(ChannelRecord::number)
    }

    pub fn sub_mode(&self) -> SubMode {
        self.sub_mode
    }

    pub fn flags(&self) -> ControlFlags {
        self.flags
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Drop the staging record and return to waiting for a control byte.
    ///
    /// Counters are kept.
    pub fn reset(&mut self) {
        self.staging = None;
        self.sub_mode = SubMode::Data;
        self.flags = ControlFlags::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PLACEHOLDER, SEGMENT_COUNT};

    /// Control byte addressing `channel` in the given sub-mode. Channels 1-10
    /// land in the address-marker range; channel 0 in format mode blanks.
    fn control(channel: u8, mode: SubMode) -> u8 {
        let base = ((channel ^ 0x1F) << 1) | 0x80;
        match mode {
            SubMode::Data => base,
            SubMode::Format => base | 0x01,
        }
    }

    fn push_all(state: &mut DecoderState, bytes: &[u8]) -> Vec<ChannelRecord> {
        bytes.iter().filter_map(|&b| state.push(b)).collect()
    }

    #[test]
    fn control_helper_round_trips() {
        for channel in 0..32u8 {
            let byte = control(channel, SubMode::Data);
            assert_eq!(ControlByte::decode(byte).address, channel);
            assert_eq!(ControlByte::decode(byte).sub_mode, SubMode::Data);
            let byte = control(channel, SubMode::Format);
            assert_eq!(ControlByte::decode(byte).sub_mode, SubMode::Format);
        }
    }

    #[test]
    fn first_control_byte_starts_staging_without_commit() {
        let mut state = DecoderState::new();
        assert!(state.push(control(5, SubMode::Data)).is_none());
        assert_eq!(state.current_channel(), Some(5));
        assert_eq!(state.stats().commits, 0);
    }

    #[test]
    fn commit_only_on_address_change() {
        let mut state = DecoderState::new();
        let bytes = [
            control(5, SubMode::Data),
            0x0E,
            control(5, SubMode::Format),
            0x0E,
            control(5, SubMode::Data),
            control(6, SubMode::Data),
            control(6, SubMode::Data),
            control(5, SubMode::Data),
        ];
        let commits = push_all(&mut state, &bytes);

        let numbers: Vec<u8> = commits.iter().map(ChannelRecord::number).collect();
        assert_eq!(numbers, vec![5, 6]);
        assert_eq!(state.stats().commits, 2);
        assert_eq!(state.current_channel(), Some(5));
    }

    #[test]
    fn committed_record_carries_both_buffers() {
        let mut state = DecoderState::new();
        let commits = push_all(
            &mut state,
            &[
                control(3, SubMode::Data),
                0x0E, // segment 0 <- '1'
                0x16, // segment 1 <- '9'
                control(3, SubMode::Format),
                0x0D, // format 0 <- '2'
                control(4, SubMode::Data),
            ],
        );

        assert_eq!(commits.len(), 1);
        let record = &commits[0];
        assert_eq!(record.number(), 3);
        assert_eq!(record.data()[0], Some(b'1'));
        assert_eq!(record.data()[1], Some(b'9'));
        assert_eq!(record.format()[0], Some(b'2'));
        assert_eq!(record.data()[2], None);
    }

    #[test]
    fn new_staging_record_starts_unset() {
        let mut state = DecoderState::new();
        push_all(&mut state, &[control(3, SubMode::Data), 0x0E, control(4, SubMode::Data)]);
        let commits = push_all(&mut state, &[control(3, SubMode::Data)]);

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].number(), 4);
        assert!(commits[0].is_unset());
    }

    #[test]
    fn zero_nibble_blanks_in_both_sub_modes() {
        let mut state = DecoderState::new();
        let commits = push_all(
            &mut state,
            &[
                control(2, SubMode::Data),
                0x40,
                control(2, SubMode::Format),
                0x40,
                control(7, SubMode::Data),
            ],
        );

        assert_eq!(commits[0].data()[4], Some(BLANK));
        assert_eq!(commits[0].format()[4], Some(BLANK));
    }

    #[test]
    fn channel_zero_zero_nibble_is_placeholder() {
        let mut state = DecoderState::new();
        let commits = push_all(
            &mut state,
            &[control(0, SubMode::Data), 0x10, control(1, SubMode::Data)],
        );

        assert_eq!(commits[0].number(), 0);
        assert_eq!(commits[0].data()[1], Some(PLACEHOLDER));
    }

    #[test]
    fn data_before_control_is_ignored() {
        let mut state = DecoderState::new();
        assert!(push_all(&mut state, &[0x0E, 0x1E]).is_empty());
        assert_eq!(state.current_channel(), None);
        assert_eq!(state.stats().ignored, 2);
    }

    #[test]
    fn blank_control_byte_blanks_addressed_channel() {
        // 200 addresses channel 27 in data mode and is above the blank threshold.
        let mut state = DecoderState::new();
        let commits = push_all(&mut state, &[control(1, SubMode::Data), 200, control(1, SubMode::Data)]);

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[1].number(), 27);
        assert_eq!(commits[1].data(), &[Some(BLANK); SEGMENT_COUNT]);
        assert_eq!(commits[1].format(), &[None; SEGMENT_COUNT]);
    }

    #[test]
    fn blank_applies_in_place_for_same_channel() {
        // 0xC9 = 201: channel 27, format mode, blank.
        let mut state = DecoderState::new();
        let commits = push_all(
            &mut state,
            &[200, 0x0E, 0x1E, 0xC9, control(1, SubMode::Data)],
        );

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].number(), 27);
        assert_eq!(commits[0].data(), &[Some(BLANK); SEGMENT_COUNT]);
        assert!(!state.flags().blank_pending);
    }

    #[test]
    fn blank_then_data_overwrites_segments() {
        let mut state = DecoderState::new();
        let commits = push_all(&mut state, &[200, 0x0E, control(1, SubMode::Data)]);

        assert_eq!(commits[0].data()[0], Some(b'1'));
        assert_eq!(commits[0].data()[1], Some(BLANK));
    }

    #[test]
    fn address_marker_reblanks_idle_channel() {
        // 0xAC = 172: channel 9, data mode, address marker.
        let marker = 0xAC;
        assert_eq!(ControlByte::decode(marker).address, 9);

        let mut state = DecoderState::new();
        let commits = push_all(
            &mut state,
            &[marker, 0x00, 0x1E, marker, control(1, SubMode::Data)],
        );

        assert_eq!(commits[0].number(), 9);
        assert_eq!(commits[0].data(), &[Some(BLANK); SEGMENT_COUNT]);
    }

    #[test]
    fn address_marker_keeps_written_channel() {
        let marker = 0xAC;
        let mut state = DecoderState::new();
        let commits = push_all(
            &mut state,
            &[marker, 0x0E, 0x1E, marker, control(1, SubMode::Data)],
        );

        assert_eq!(commits[0].data()[0], Some(b'1'));
        assert_eq!(commits[0].data()[1], Some(b'1'));
        assert_eq!(commits[0].data()[2], None);
    }

    #[test]
    fn flags_follow_latest_control_byte() {
        let mut state = DecoderState::new();
        state.push(200);
        assert!(state.flags().blank_pending);
        assert!(!state.flags().address_pending);

        state.push(0xAC);
        assert!(!state.flags().blank_pending);
        assert!(state.flags().address_pending);

        state.push(control(0, SubMode::Data));
        assert_eq!(state.flags(), ControlFlags::default());
    }

    #[test]
    fn reset_returns_to_awaiting_control() {
        let mut state = DecoderState::new();
        push_all(&mut state, &[control(3, SubMode::Format), 0x0E]);
        state.reset();

        assert_eq!(state.current_channel(), None);
        assert_eq!(state.sub_mode(), SubMode::Data);
        assert!(push_all(&mut state, &[control(4, SubMode::Data)]).is_empty());
        assert_eq!(state.stats().bytes, 3);
    }

    #[test]
    fn every_data_byte_hits_a_segment() {
        // Data bytes are below 0x7F, so their high nibble never exceeds 7.
        let mut state = DecoderState::new();
        state.push(control(3, SubMode::Data));
        for byte in 0..0x7Fu8 {
            state.push(byte);
        }
        assert_eq!(state.stats().malformed, 0);
        assert_eq!(state.stats().data_bytes, 0x7F);
    }
}

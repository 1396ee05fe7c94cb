use std::collections::BTreeMap;

use bytes::Bytes;
use lanecast_frame::{render, ChannelRecord, FrameSnapshot, PresentationMode, SEGMENT_COUNT};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Wire form of a frame sent to display clients.
///
/// Channel keys serialize as decimal strings (`"3"`). Segment buffers are
/// numeric arrays, with `null` for never-written segments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameMessage {
    pub sequence: u64,
    pub channels: BTreeMap<u8, ChannelMessage>,
}

/// Wire form of one channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelMessage {
    pub number: u8,
    pub mode: String,
    pub data: [Option<u8>; SEGMENT_COUNT],
    pub format: [Option<u8>; SEGMENT_COUNT],
    pub display: String,
}

impl ChannelMessage {
    pub fn new(record: &ChannelRecord, mode: PresentationMode) -> Self {
        Self {
            number: record.number(),
            mode: mode.as_str().to_string(),
            data: *record.data(),
            format: *record.format(),
            display: render(record, mode),
        }
    }
}

impl FrameMessage {
    pub fn from_snapshot(snapshot: &FrameSnapshot) -> Self {
        let channels = snapshot
            .iter()
            .map(|(record, mode)| (record.number(), ChannelMessage::new(record, mode)))
            .collect();

        Self {
            sequence: snapshot.sequence(),
            channels,
        }
    }
}

/// Encode a snapshot as a JSON payload.
pub fn encode_snapshot(snapshot: &FrameSnapshot) -> Result<Bytes> {
    let message = FrameMessage::from_snapshot(snapshot);
    Ok(Bytes::from(serde_json::to_vec(&message)?))
}

#[cfg(test)]
mod tests {
    use lanecast_frame::{Frame, ModeMap, SubMode};

    use super::*;

    fn sample_snapshot() -> FrameSnapshot {
        let mut frame = Frame::new(ModeMap::from([(3, PresentationMode::LaneTime)]));
        let mut record = ChannelRecord::with_data(3, *b"4 013217");
        record.set(SubMode::Format, 1, b'2');
        frame.commit(&record);

        let mut partial = ChannelRecord::new(12);
        partial.set(SubMode::Data, 0, 0x3F);
        frame.commit(&partial);
        frame.snapshot()
    }

    #[test]
    fn encodes_channels_by_decimal_key() {
        let payload = encode_snapshot(&sample_snapshot()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();

        assert_eq!(value["sequence"], 2);
        let lane = &value["channels"]["3"];
        assert_eq!(lane["number"], 3);
        assert_eq!(lane["mode"], "lane");
        assert_eq!(lane["display"], "4 _ 01:32.17");
        assert_eq!(
            lane["data"],
            serde_json::json!([52, 32, 48, 49, 51, 50, 49, 55])
        );
        assert_eq!(
            lane["format"],
            serde_json::json!([null, 50, null, null, null, null, null, null])
        );
    }

    #[test]
    fn unset_segments_are_null_and_raw_is_default() {
        let payload = encode_snapshot(&sample_snapshot()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();

        let raw = &value["channels"]["12"];
        assert_eq!(raw["mode"], "raw");
        assert_eq!(raw["data"][0], 63);
        assert!(raw["data"][1].is_null());
        assert_eq!(raw["display"], "?       ");
    }

    #[test]
    fn empty_frame_has_empty_channels() {
        let payload = encode_snapshot(&FrameSnapshot::default()).unwrap();
        assert_eq!(payload.as_ref(), br#"{"sequence":0,"channels":{}}"#);
    }

    #[test]
    fn message_decodes_back() {
        let payload = encode_snapshot(&sample_snapshot()).unwrap();
        let message: FrameMessage = serde_json::from_slice(&payload).unwrap();
        assert_eq!(message, FrameMessage::from_snapshot(&sample_snapshot()));
        assert_eq!(message.channels[&3].data[0], Some(b'4'));
    }
}

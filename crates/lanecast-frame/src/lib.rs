//! Segment decoder and frame model for multiplexed timing-console streams.
//!
//! This is the core of lanecast. The console interleaves up to 32 channels
//! on one byte stream:
//! - Control bytes (>= 0x7F) select a channel and a sub-mode (display text
//!   or formatting codes)
//! - Data bytes carry one nibble for one of 8 segments of the selected channel
//!
//! The decoder assembles each channel in a private staging record and only
//! hands it out (commits it) once the stream moves to a different channel,
//! so consumers never see a half-written channel.

pub mod error;
pub mod frame;
pub mod machine;
pub mod protocol;
pub mod reader;
pub mod record;
pub mod render;

pub use error::{DecodeError, Result, UnknownMode};
pub use frame::{Frame, FrameSnapshot, FrameStore, ModeMap};
pub use machine::{ControlFlags, DecoderState, DecoderStats};
pub use protocol::{classify, ByteKind, ControlByte, DataByte, SubMode, CHANNEL_COUNT, SEGMENT_COUNT};
pub use reader::{Advance, SegmentDecoder};
pub use record::{ChannelRecord, Slot};
pub use render::{render, PresentationMode, CLOCK_IDLE};

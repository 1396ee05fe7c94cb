//! Live timing-console decoding and broadcast.
//!
//! lanecast reads the multiplexed byte stream a timing console emits (from a
//! serial line or a recorded capture), decodes it into per-channel records,
//! and streams the current scoreboard to display clients over WebSocket.
//!
//! # Crate Structure
//!
//! - [`source`]: byte sources (capture files, serial lines)
//! - [`frame`]: protocol decoder, frame model and renderer
//! - [`broadcast`]: JSON encoding and WebSocket fan-out (behind `broadcast` feature)

/// Re-export source types.
pub mod source {
    pub use lanecast_source::*;
}

/// Re-export decoder and frame types.
pub mod frame {
    pub use lanecast_frame::*;
}

/// Re-export broadcast types (requires `broadcast` feature).
#[cfg(feature = "broadcast")]
pub mod broadcast {
    pub use lanecast_broadcast::*;
}

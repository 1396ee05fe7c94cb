//! Byte sources for timing-device streams.
//!
//! Provides a single blocking contract over the places timing bytes come from:
//! - Recorded capture files (optionally replayed and rate limited)
//! - Serial lines attached to the timing console (unix)
//!
//! This is the lowest layer of lanecast. The decoder in `lanecast-frame`
//! only ever sees the [`ByteSource`] trait provided here.

pub mod error;
pub mod file;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, SourceError};
pub use file::{open_file, FileOptions, RateLimited, Replay};
pub use traits::{ByteSource, ReadSource};

#[cfg(unix)]
pub use serial::{Parity, SerialPort, SerialSettings};

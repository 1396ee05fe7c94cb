use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, SourceError};
use crate::traits::{ByteSource, ReadSource};

/// Replays a seekable stream from the start whenever it runs out.
///
/// A capture file recorded from the console can drive a display forever this
/// way. An empty stream still reports end of stream instead of spinning.
pub struct Replay<R> {
    inner: ReadSource<R>,
    passes: u64,
}

impl<R: Read + Seek> Replay<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: ReadSource::new(inner),
            passes: 0,
        }
    }

    /// How many times the stream has been rewound.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Consume the adapter and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read + Seek> ByteSource for Replay<R> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if let Some(byte) = self.inner.read_byte()? {
            return Ok(Some(byte));
        }

        debug!(passes = self.passes, "end of input, rewinding for replay");
        self.inner.discard_buffered();
        self.inner
            .get_mut()
            .seek(SeekFrom::Start(0))
            .map_err(SourceError::Seek)?;
        self.passes = self.passes.saturating_add(1);

        self.inner.read_byte()
    }
}

/// Paces another source by sleeping before every byte.
pub struct RateLimited<S> {
    inner: S,
    delay: Duration,
}

impl<S: ByteSource> RateLimited<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ByteSource> ByteSource for RateLimited<S> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.inner.read_byte()
    }
}

/// How a capture file should be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// Rewind and start over at end of file.
    pub replay: bool,
    /// Pause before every byte, approximating the console's line rate.
    pub byte_delay: Duration,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            replay: true,
            byte_delay: Duration::from_millis(1),
        }
    }
}

/// Open a capture file as a byte source.
pub fn open_file(path: impl AsRef<Path>, options: FileOptions) -> Result<Box<dyn ByteSource + Send>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(?path, replay = options.replay, delay = ?options.byte_delay, "opened capture file");

    let source: Box<dyn ByteSource + Send> = match (options.replay, options.byte_delay.is_zero()) {
        (true, true) => Box::new(Replay::new(file)),
        (true, false) => Box::new(RateLimited::new(Replay::new(file), options.byte_delay)),
        (false, true) => Box::new(ReadSource::new(file)),
        (false, false) => Box::new(RateLimited::new(ReadSource::new(file), options.byte_delay)),
    };
    Ok(source)
}

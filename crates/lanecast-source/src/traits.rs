use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};

use crate::error::{Result, SourceError};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// A blocking supplier of single bytes.
///
/// `Ok(Some(byte))` delivers the next byte, `Ok(None)` signals the end of the
/// stream and `Err` reports a device or read failure. Adapters may restart
/// themselves transparently (see [`crate::Replay`]); callers never need to
/// know.
pub trait ByteSource {
    /// Read the next byte (blocking).
    fn read_byte(&mut self) -> Result<Option<u8>>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }
}

/// Serves bytes one at a time from any `Read` stream.
///
/// Reads happen in chunks internally so a serial line or file is not hit
/// with a syscall per byte.
pub struct ReadSource<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: Read> ReadSource<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Number of bytes read from the stream but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.buf.remaining()
    }

    /// Drop any buffered bytes.
    pub fn discard_buffered(&mut self) {
        self.buf.clear();
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the source and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        loop {
            if self.buf.has_remaining() {
                return Ok(Some(self.buf.get_u8()));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(SourceError::Io(err)),
            };

            if read == 0 {
                return Ok(None);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }
}

impl<R> std::fmt::Debug for ReadSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadSource")
            .field("buffered", &self.buf.len())
            .finish()
    }
}

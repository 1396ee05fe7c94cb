use lanecast_source::ByteSource;
use tracing::{debug, warn};

use crate::error::{DecodeError, Result};
use crate::machine::{DecoderState, DecoderStats};
use crate::record::ChannelRecord;

/// Outcome of one [`SegmentDecoder::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A channel was committed; see [`SegmentDecoder::committed`].
    More(u8),
    /// The source is exhausted.
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Ended,
    Faulted,
}

/// Drives a [`DecoderState`] from a [`ByteSource`].
///
/// Each `advance` reads until one channel is committed, so callers only ever
/// see complete channel records.
pub struct SegmentDecoder<S> {
    source: S,
    state: DecoderState,
    committed: Option<ChannelRecord>,
    phase: Phase,
}

impl<S: ByteSource> SegmentDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: DecoderState::new(),
            committed: None,
            phase: Phase::Running,
        }
    }

    /// Read until the next commit or the end of the stream (blocking).
    ///
    /// After `EndOfStream` every call returns `EndOfStream` again until
    /// [`reset`](Self::reset). A source failure discards the staging record
    /// and is returned once as [`DecodeError::Source`]; later calls return
    /// [`DecodeError::Faulted`] until the fault is acknowledged.
    pub fn advance(&mut self) -> Result<Advance> {
        match self.phase {
            Phase::Running => {}
            Phase::Ended => return Ok(Advance::EndOfStream),
            Phase::Faulted => return Err(DecodeError::Faulted),
        }

        loop {
            let byte = match self.source.read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => {
                    debug!(stats = ?self.state.stats(), "end of stream");
                    self.phase = Phase::Ended;
                    return Ok(Advance::EndOfStream);
                }
                Err(err) => {
                    warn!(error = %err, "byte source failed, discarding staged channel");
                    self.state.reset();
                    self.phase = Phase::Faulted;
                    return Err(DecodeError::Source(err));
                }
            };

            if let Some(record) = self.state.push(byte) {
                let number = record.number();
                self.committed = Some(record);
                return Ok(Advance::More(number));
            }
        }
    }

    /// The record committed by the most recent `More`.
    pub fn committed(&self) -> Option<&ChannelRecord> {
        self.committed.as_ref()
    }

    /// Take ownership of the most recently committed record.
    pub fn take_committed(&mut self) -> Option<ChannelRecord> {
        self.committed.take()
    }

    /// Resume after a source failure. Decoding restarts at the next control byte.
    pub fn acknowledge_fault(&mut self) {
        if self.phase == Phase::Faulted {
            self.phase = Phase::Running;
        }
    }

    /// Return to the initial state, e.g. after the source was reopened.
    pub fn reset(&mut self) {
        self.state.reset();
        self.committed = None;
        self.phase = Phase::Running;
    }

    pub fn is_faulted(&self) -> bool {
        self.phase == Phase::Faulted
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    pub fn stats(&self) -> DecoderStats {
        self.state.stats()
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the decoder and return the source.
    pub fn into_inner(self) -> S {
        self.source
    }
}

use lanecast_source::SourceError;

/// Errors surfaced by the segment decoder.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The byte source failed. The in-progress record was discarded.
    #[error("byte source failed: {0}")]
    Source(#[from] SourceError),

    /// A previous source failure has not been acknowledged yet.
    #[error("decoder halted after a source failure (acknowledge or reset to continue)")]
    Faulted,
}

/// A presentation mode name that is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown presentation mode {0:?} (expected raw, clock, lane or event)")]
pub struct UnknownMode(pub String);

pub type Result<T> = std::result::Result<T, DecodeError>;

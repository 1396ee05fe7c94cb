use std::path::PathBuf;

/// Errors that can occur while acquiring or reading a byte source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Failed to open the device or capture file.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to apply line settings to a serial device.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred while reading from the source.
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rewinding a replayed source failed.
    #[error("failed to rewind source for replay: {0}")]
    Seek(std::io::Error),

    /// A requested line setting is not supported.
    #[error("invalid setting {name}: {value}")]
    InvalidSetting { name: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, SourceError>;

use std::fmt;
use std::io;

use lanecast_broadcast::BroadcastError;
use lanecast_frame::DecodeError;
use lanecast_source::SourceError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
/// The byte source could not be opened or stopped delivering.
pub const SOURCE_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn source_error(context: &str, err: SourceError) -> CliError {
    match err {
        SourceError::Open { ref source, .. } | SourceError::Configure { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        SourceError::InvalidSetting { .. } => CliError::usage(format!("{context}: {err}")),
        other => CliError::new(SOURCE_ERROR, format!("{context}: {other}")),
    }
}

pub fn decode_error(context: &str, err: DecodeError) -> CliError {
    match err {
        DecodeError::Source(err) => source_error(context, err),
        DecodeError::Faulted => CliError::new(SOURCE_ERROR, format!("{context}: {err}")),
    }
}

pub fn broadcast_error(context: &str, err: BroadcastError) -> CliError {
    match err {
        BroadcastError::Bind { source, addr } => io_error(&format!("{context} ({addr})"), source),
        BroadcastError::Accept(source) | BroadcastError::Io(source) => io_error(context, source),
        BroadcastError::Serialize(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn missing_source_maps_to_source_error() {
        let err = source_error(
            "open failed",
            SourceError::Open {
                path: PathBuf::from("/dev/ttyMISSING"),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert_eq!(err.code, SOURCE_ERROR);
        assert!(err.message.starts_with("open failed: failed to open /dev/ttyMISSING"));
    }

    #[test]
    fn denied_source_maps_to_permission_denied() {
        let err = source_error(
            "open failed",
            SourceError::Open {
                path: PathBuf::from("/dev/ttyS0"),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            },
        );
        assert_eq!(err.code, PERMISSION_DENIED);
    }

    #[test]
    fn invalid_setting_is_usage() {
        let err = source_error(
            "serial",
            SourceError::InvalidSetting {
                name: "baud_rate",
                value: "12".into(),
            },
        );
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn decode_faults_map_to_source_error() {
        assert_eq!(decode_error("decode", DecodeError::Faulted).code, SOURCE_ERROR);
        let err = decode_error(
            "decode",
            DecodeError::Source(SourceError::Io(io::Error::other("line dropped"))),
        );
        assert_eq!(err.code, SOURCE_ERROR);
    }

    #[test]
    fn bind_failure_includes_address() {
        let err = broadcast_error(
            "websocket",
            BroadcastError::Bind {
                addr: "127.0.0.1:8000".parse().unwrap(),
                source: io::Error::from(io::ErrorKind::AddrInUse),
            },
        );
        assert_eq!(err.code, FAILURE);
        assert!(err.message.contains("127.0.0.1:8000"));
    }
}

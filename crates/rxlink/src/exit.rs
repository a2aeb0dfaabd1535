use std::fmt;
use std::io;

use rxlink::frame::FrameError;
use rxlink::transport::serialport;
use rxlink::transport::{ErrorClass, LineError, TransportError};
use rxlink::ReceiverError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
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
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { ref source, .. } => {
            let code = match source.kind() {
                serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => PERMISSION_DENIED,
                serialport::ErrorKind::InvalidInput => USAGE,
                _ => TRANSPORT_ERROR,
            };
            CliError::new(code, format!("{context}: {err}"))
        }
        TransportError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn line_error(context: &str, err: LineError) -> CliError {
    match err.class() {
        ErrorClass::Timeout | ErrorClass::Aborted => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        ErrorClass::Other => io_error(context, err.into()),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::MissingDelimiter(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn receiver_error(context: &str, err: ReceiverError) -> CliError {
    match err {
        ReceiverError::Transport(err) => transport_error(context, err),
        ReceiverError::Frame(err) => frame_error(context, err),
        ReceiverError::Line(err) => line_error(context, err),
        ReceiverError::TimedOut { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ReceiverError::SyncNotFound { .. } | ReceiverError::NoMatchingFrame { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_map_to_124() {
        let err = receiver_error(
            "read failed",
            ReceiverError::TimedOut {
                partial: Default::default(),
            },
        );
        assert_eq!(err.code, TIMEOUT);
        assert!(err.message.starts_with("read failed: timed out"));
    }

    #[test]
    fn corrupt_frames_are_data_invalid() {
        let err = frame_error(
            "fetch failed",
            FrameError::ChecksumMismatch {
                expected: [0x0e, 0x34],
                actual: [0x00, 0x00],
            },
        );
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn missing_device_is_a_transport_error() {
        let err = transport_error(
            "open failed",
            TransportError::Open {
                location: "/dev/ttyACM9".to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "not found"),
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert!(err.message.contains("/dev/ttyACM9"));
    }

    #[test]
    fn permission_denied_on_open() {
        let err = transport_error(
            "open failed",
            TransportError::Open {
                location: "/dev/ttyS0".to_string(),
                source: serialport::Error::new(
                    serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied),
                    "denied",
                ),
            },
        );
        assert_eq!(err.code, PERMISSION_DENIED);
    }
}

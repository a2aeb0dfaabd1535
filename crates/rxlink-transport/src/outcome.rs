use std::fmt;
use std::io;

use bytes::Bytes;

use crate::platform::{self, ErrorClass};

/// Lifecycle of a single read call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadStatus {
    Ongoing,
    Finalized,
    Error,
    TimedOut,
}

impl ReadStatus {
    /// True once the call has an outcome.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ReadStatus::Ongoing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReadStatus::Ongoing => "ongoing",
            ReadStatus::Finalized => "finalized",
            ReadStatus::Error => "error",
            ReadStatus::TimedOut => "timed-out",
        }
    }
}

impl fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified, cloneable snapshot of an I/O failure on the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    class: ErrorClass,
    kind: io::ErrorKind,
    raw_os_error: Option<i32>,
    message: String,
}

impl LineError {
    /// Capture an I/O error.
    pub fn from_io(err: &io::Error) -> Self {
        Self {
            class: platform::classify(err),
            kind: err.kind(),
            raw_os_error: err.raw_os_error(),
            message: err.to_string(),
        }
    }

    /// The completion error of a cancelled operation.
    pub fn aborted() -> Self {
        Self::from_io(&platform::aborted())
    }

    /// The reactor had nothing left to run while a read was still ongoing.
    pub fn stalled() -> Self {
        Self {
            class: ErrorClass::Other,
            kind: io::ErrorKind::Other,
            raw_os_error: None,
            message: "no pending operation left to complete the read".to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.kind
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        self.raw_os_error
    }
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LineError {}

impl From<LineError> for io::Error {
    fn from(err: LineError) -> Self {
        match err.raw_os_error {
            Some(code) => io::Error::from_raw_os_error(code),
            None => io::Error::new(err.kind, err.message),
        }
    }
}

/// Result of one bounded read.
///
/// Callers must branch on the variant: a short [`ReadOutcome::Finalized`] is
/// still a valid result, and [`ReadOutcome::TimedOut`] may carry the bytes
/// that did arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The read completed; for delimiter scans this may be a partial line.
    Finalized(Bytes),
    /// The deadline won; whatever arrived before it is included.
    TimedOut(Bytes),
    /// The line failed. Received bytes stay buffered on the channel.
    Error(LineError),
}

impl ReadOutcome {
    pub fn status(&self) -> ReadStatus {
        match self {
            ReadOutcome::Finalized(_) => ReadStatus::Finalized,
            ReadOutcome::TimedOut(_) => ReadStatus::TimedOut,
            ReadOutcome::Error(_) => ReadStatus::Error,
        }
    }

    /// The bytes delivered by this call (empty on error).
    pub fn bytes(&self) -> &[u8] {
        match self {
            ReadOutcome::Finalized(bytes) | ReadOutcome::TimedOut(bytes) => bytes,
            ReadOutcome::Error(_) => &[],
        }
    }

    /// Consume the outcome, keeping only finalized bytes.
    pub fn finalized(self) -> Option<Bytes> {
        match self {
            ReadOutcome::Finalized(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, ReadOutcome::Finalized(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, ReadOutcome::TimedOut(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_line_error_is_classified() {
        let err = LineError::aborted();
        assert_eq!(err.class(), ErrorClass::Aborted);
        assert_eq!(err.raw_os_error(), Some(platform::OPERATION_ABORTED));
    }

    #[test]
    fn outcome_accessors() {
        let done = ReadOutcome::Finalized(Bytes::from_static(b"OK"));
        assert_eq!(done.status(), ReadStatus::Finalized);
        assert_eq!(done.bytes(), b"OK");

        let partial = ReadOutcome::TimedOut(Bytes::from_static(b"O"));
        assert!(partial.is_timed_out());
        assert_eq!(partial.bytes(), b"O");
        assert!(partial.finalized().is_none());

        let failed = ReadOutcome::Error(LineError::stalled());
        assert!(failed.bytes().is_empty());
        assert!(failed.status().is_terminal());
    }

    #[test]
    fn line_error_converts_back_to_io() {
        let err: io::Error = LineError::from_io(&io::Error::from(io::ErrorKind::BrokenPipe)).into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}

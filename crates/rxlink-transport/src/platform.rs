//! Platform error code translation.
//!
//! This is the only place that compares raw OS error numbers. The read engine
//! works exclusively with [`ErrorClass`].

use std::io;

/// What the read engine needs to know about a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The operation ran out of time.
    Timeout,
    /// The operation was cancelled before it completed.
    Aborted,
    /// Anything else; treated as a transport failure.
    Other,
}

/// Raw "operation aborted" code for the target platform.
#[cfg(unix)]
pub const OPERATION_ABORTED: i32 = libc::ECANCELED;

/// Raw "operation aborted" code for the target platform.
#[cfg(windows)]
pub const OPERATION_ABORTED: i32 =
    windows_sys::Win32::Foundation::ERROR_OPERATION_ABORTED as i32;

/// Raw "operation aborted" code for the target platform.
#[cfg(not(any(unix, windows)))]
pub const OPERATION_ABORTED: i32 = 125;

/// Classify an I/O error.
pub fn classify(err: &io::Error) -> ErrorClass {
    if err.raw_os_error() == Some(OPERATION_ABORTED) {
        return ErrorClass::Aborted;
    }
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorClass::Timeout,
        _ => ErrorClass::Other,
    }
}

/// The error a cancelled operation completes with.
pub fn aborted() -> io::Error {
    io::Error::from_raw_os_error(OPERATION_ABORTED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_code_round_trips() {
        assert_eq!(classify(&aborted()), ErrorClass::Aborted);
    }

    #[test]
    fn timeout_kinds() {
        assert_eq!(
            classify(&io::Error::from(io::ErrorKind::TimedOut)),
            ErrorClass::Timeout
        );
        assert_eq!(
            classify(&io::Error::from(io::ErrorKind::WouldBlock)),
            ErrorClass::Timeout
        );
    }

    #[test]
    fn everything_else_is_other() {
        assert_eq!(
            classify(&io::Error::from(io::ErrorKind::BrokenPipe)),
            ErrorClass::Other
        );
        assert_eq!(
            classify(&io::Error::other("device unplugged")),
            ErrorClass::Other
        );
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn linux_aborted_code() {
        assert_eq!(OPERATION_ABORTED, 125);
    }
}

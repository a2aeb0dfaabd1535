/// Errors that can occur while opening, configuring or writing to a serial line.
///
/// Reads never produce a `TransportError`: they resolve to a tagged
/// [`ReadOutcome`](crate::ReadOutcome) instead.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The device node could not be acquired.
    #[error("failed to open {location}: {source}")]
    Open {
        location: String,
        source: serialport::Error,
    },

    /// The line opened but does not report the configuration that was applied.
    #[error("{location} rejected {setting}: requested {requested}, line reports {actual}")]
    Rejected {
        location: String,
        setting: &'static str,
        requested: String,
        actual: String,
    },

    /// The requested configuration is unusable before it reaches the platform.
    #[error("invalid line configuration: {0}")]
    InvalidConfig(String),

    /// Reconfiguring an already open line failed.
    #[error("failed to set {setting}: {source}")]
    Configure {
        setting: &'static str,
        source: std::io::Error,
    },

    /// The line did not accept the whole buffer.
    #[error("write failed after {written} of {len} bytes: {source}")]
    Write {
        written: usize,
        len: usize,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TransportError>;

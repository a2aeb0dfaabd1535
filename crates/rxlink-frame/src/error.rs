/// Errors that can occur while building or parsing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A text command is not of the form `$<body>*`.
    #[error("text command must start with '$' and end with '*': {0:?}")]
    MissingDelimiter(String),

    /// The text trailer is not two hex digits.
    #[error("malformed text checksum trailer: {0:?}")]
    MalformedTrailer(String),

    /// The text trailer does not match the body.
    #[error("text checksum mismatch: expected {expected:02X}, got {actual:02X}")]
    TextChecksumMismatch { expected: u8, actual: u8 },

    /// Fewer bytes than the smallest possible binary frame.
    #[error("frame too short ({len} bytes, min {min})")]
    TooShort { len: usize, min: usize },

    /// The frame does not start with the sync pair.
    #[error("invalid frame sync (expected 0xb5 0x62)")]
    InvalidSync,

    /// The payload exceeds what the length field (or the caller) allows.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The length field disagrees with the number of bytes present.
    #[error("length field declares {declared} payload bytes, frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// The trailing checksum pair does not match the frame contents.
    #[error("checksum mismatch: expected {expected:02x?}, got {actual:02x?}")]
    ChecksumMismatch { expected: [u8; 2], actual: [u8; 2] },

    /// An I/O error surfaced through a framed stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;

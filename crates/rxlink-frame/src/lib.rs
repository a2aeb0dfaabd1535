//! Checksums and framing for the two wire formats spoken by timing and GNSS
//! receivers:
//! - text commands, `$<body>*HH`, closed by an XOR checksum
//! - binary frames, `B5 62 class id len payload A B`, closed by a
//!   two-accumulator rolling checksum
//!
//! Everything here is pure; bytes come from and go to the transport layer.

pub mod binary;
pub mod checksum;
#[cfg(feature = "async")]
pub mod codec;
pub mod error;
pub mod escape;
pub mod text;

pub use binary::{
    append_binary_checksum, decode_frame, encode_frame, frame_without_checksum, parse_frame,
    validate_binary, UbxFrame, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAX_PAYLOAD, MIN_FRAME_SIZE,
    SYNC,
};
pub use checksum::{fletcher_checksum, xor_checksum};
#[cfg(feature = "async")]
pub use codec::UbxCodec;
pub use error::{FrameError, Result};
pub use escape::escape;
pub use text::{append_text_checksum, parse_text, text_command, validate_text};

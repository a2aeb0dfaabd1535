//! Host-side driver for GNSS and precision-timing receivers on a serial line.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial line channel and timeout-bounded read engine
//! - [`frame`]: checksums and framing for text commands and binary frames
//! - [`receiver`]: command/response helper built on both (behind `receiver` feature)

/// Re-export transport types.
pub mod transport {
    pub use rxlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use rxlink_frame::*;
}

#[cfg(feature = "receiver")]
pub mod receiver;

#[cfg(feature = "receiver")]
pub use receiver::{Receiver, ReceiverConfig, ReceiverError};

//! Serial line channel and timeout-bounded read engine.
//!
//! This is the lowest layer of rxlink:
//! - [`Channel`] owns an open serial line, its configuration and any input
//!   not yet handed to a caller
//! - [`ReadEngine`] races each read against a deadline and resolves it to
//!   exactly one [`ReadOutcome`]
//!
//! Everything device-specific builds on these two types.

pub mod carryover;
pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod line;
pub mod observer;
pub mod outcome;
pub mod platform;
pub mod reactor;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use serialport;

pub use channel::Channel;
pub use config::{
    char_size, DataBits, FlowControl, LineConfig, Parity, StopBits, DEFAULT_BAUD_RATE,
    DEFAULT_DELIMITER, DEFAULT_TIMEOUT,
};
pub use engine::{FollowUp, PendingRead, ReadEngine};
pub use error::{Result, TransportError};
pub use line::SerialLine;
pub use observer::{ReadObserver, SilentObserver, TracingObserver};
pub use outcome::{LineError, ReadOutcome, ReadStatus};
pub use platform::ErrorClass;
pub use reactor::{Completion, ReadTarget};

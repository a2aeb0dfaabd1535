use std::time::Duration;

use bytes::Bytes;

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

/// Default line speed.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default per-read deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Default read delimiter.
pub const DEFAULT_DELIMITER: &[u8] = b"\r\n";

/// Serial line configuration applied when a [`Channel`](crate::Channel) is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineConfig {
    /// Line speed in bits per second. Default: 115200.
    pub baud_rate: u32,
    /// Deadline for each read call, re-armed per call. Default: 100 ms.
    pub timeout: Duration,
    /// Character size. Default: 8 bits.
    pub char_size: DataBits,
    /// Byte sequence terminating a line for delimiter reads. Default: `"\r\n"`.
    pub delimiter: Bytes,
    /// Default: none.
    pub parity: Parity,
    /// Default: none.
    pub flow_control: FlowControl,
    /// Default: one.
    pub stop_bits: StopBits,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
            char_size: DataBits::Eight,
            delimiter: Bytes::from_static(DEFAULT_DELIMITER),
            parity: Parity::None,
            flow_control: FlowControl::None,
            stop_bits: StopBits::One,
        }
    }
}

impl LineConfig {
    /// Set the line speed.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the per-read deadline in milliseconds.
    pub fn with_timeout_ms(mut self, millis: u64) -> Self {
        self.timeout = Duration::from_millis(millis);
        self
    }

    /// Set the read delimiter.
    pub fn with_delimiter(mut self, delimiter: impl Into<Bytes>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Set the character size.
    pub fn with_char_size(mut self, char_size: DataBits) -> Self {
        self.char_size = char_size;
        self
    }

    /// Set the parity.
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Set the flow control mode.
    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    /// Set the stop bit count.
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }
}

/// Map a character size in bits onto [`DataBits`].
pub fn char_size(bits: u8) -> Option<DataBits> {
    match bits {
        5 => Some(DataBits::Five),
        6 => Some(DataBits::Six),
        7 => Some(DataBits::Seven),
        8 => Some(DataBits::Eight),
        _ => None,
    }
}

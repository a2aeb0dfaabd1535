use std::io::{self, Write};
use std::time::Duration;

use serialport::SerialPort;

/// The raw byte pipe underneath a [`Channel`](crate::Channel).
///
/// Implemented for the platform serial port returned by `serialport`; tests
/// and simulators can provide their own.
pub trait SerialLine: Write {
    /// Read whatever is available into `buf`, waiting at most `timeout`.
    ///
    /// Returns an error of kind [`io::ErrorKind::TimedOut`] when nothing
    /// arrived in time.
    fn read_within(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Change the line speed of the open port.
    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()>;
}

impl SerialLine for Box<dyn SerialPort> {
    fn read_within(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).set_timeout(timeout)?;
        (**self).read(buf)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
        (**self).set_baud_rate(baud_rate).map_err(Into::into)
    }
}

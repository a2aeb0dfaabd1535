use std::collections::VecDeque;
use std::fmt;
use std::io::{self, ErrorKind};
use std::time::{Duration, Instant};

use bytes::Bytes;
use serialport::SerialPort;
use tracing::{debug, info, trace};

use crate::carryover::Carryover;
use crate::config::LineConfig;
use crate::error::{Result, TransportError};
use crate::line::SerialLine;
use crate::outcome::LineError;
use crate::platform::{self, ErrorClass};
use crate::reactor::{Completion, ReadTarget};

const READ_CHUNK_SIZE: usize = 1024;

/// Poll interval for a read armed without a deadline.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// An open serial line plus its configuration and unconsumed input.
///
/// The line stays open for the lifetime of the value; there is no close or
/// reopen. Drop the channel and open a new one instead.
///
/// Besides `write`, a channel runs a tiny single-threaded reactor for the
/// [`ReadEngine`](crate::ReadEngine): at most one read and one deadline timer
/// are armed at a time, and [`Channel::run_one`] blocks until one of them
/// completes.
pub struct Channel<P = Box<dyn SerialPort>> {
    port: P,
    location: String,
    config: LineConfig,
    carryover: Carryover,
    armed_read: Option<ReadTarget>,
    deadline: Option<Instant>,
    completed: VecDeque<Completion>,
}

impl Channel<Box<dyn SerialPort>> {
    /// Open the device node at `location` and apply every option in `config`.
    ///
    /// Fails with [`TransportError::Open`] if the node cannot be acquired and
    /// with [`TransportError::Rejected`] if the line does not report back the
    /// configuration that was requested.
    pub fn open(location: impl Into<String>, config: LineConfig) -> Result<Self> {
        let location = location.into();
        validate(&config)?;

        let port = serialport::new(location.as_str(), config.baud_rate)
            .data_bits(config.char_size)
            .parity(config.parity)
            .flow_control(config.flow_control)
            .stop_bits(config.stop_bits)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                location: location.clone(),
                source,
            })?;

        verify_applied(port.as_ref(), &location, &config)?;

        info!(
            %location,
            baud_rate = config.baud_rate,
            timeout_ms = config.timeout.as_millis() as u64,
            "serial line open"
        );

        Self::from_port(port, location, config)
    }
}

impl<P: SerialLine> Channel<P> {
    /// Wrap an already open line.
    pub fn from_port(port: P, location: impl Into<String>, config: LineConfig) -> Result<Self> {
        validate(&config)?;
        Ok(Self {
            port,
            location: location.into(),
            config,
            carryover: Carryover::new(),
            armed_read: None,
            deadline: None,
            completed: VecDeque::new(),
        })
    }

    /// Reconfigure the line speed of the open port.
    pub fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        self.port
            .set_baud_rate(baud_rate)
            .map_err(|source| TransportError::Configure {
                setting: "baud rate",
                source,
            })?;
        self.config.baud_rate = baud_rate;
        debug!(location = %self.location, baud_rate, "baud rate changed");
        Ok(())
    }

    /// Current per-read deadline.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Change the per-read deadline used by subsequent reads.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    /// Write the whole buffer or fail (blocking).
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut written = 0usize;
        while written < bytes.len() {
            match self.port.write(&bytes[written..]) {
                Ok(0) => {
                    return Err(TransportError::Write {
                        written,
                        len: bytes.len(),
                        source: io::Error::from(ErrorKind::WriteZero),
                    })
                }
                Ok(n) => written += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(source) => {
                    return Err(TransportError::Write {
                        written,
                        len: bytes.len(),
                        source,
                    })
                }
            }
        }

        loop {
            match self.port.flush() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(source) => {
                    return Err(TransportError::Write {
                        written,
                        len: bytes.len(),
                        source,
                    })
                }
            }
        }

        trace!(location = %self.location, len = bytes.len(), "wrote to line");
        Ok(())
    }

    /// Cancel whatever is armed and forget queued completions.
    ///
    /// After a reset no completion from an earlier operation can be returned
    /// by [`Channel::run_one`]. Buffered input is kept.
    pub fn reset(&mut self) {
        self.armed_read = None;
        self.deadline = None;
        if !self.completed.is_empty() {
            trace!(stale = self.completed.len(), "discarding stale completions");
            self.completed.clear();
        }
    }

    /// Arm an asynchronous read for `target`, replacing any armed read.
    pub fn arm_read(&mut self, target: ReadTarget) {
        self.armed_read = Some(target);
    }

    /// Arm the deadline timer to fire `after` from now.
    pub fn arm_timer(&mut self, after: Duration) {
        self.deadline = Some(Instant::now() + after);
    }

    /// Cancel the armed read; it completes with the platform's abort code.
    pub fn cancel_read(&mut self) {
        if let Some(target) = self.armed_read.take() {
            let (transferred, _) = target.scan(self.carryover.as_slice());
            self.completed.push_back(Completion::Read {
                result: Err(LineError::aborted()),
                transferred,
            });
        }
    }

    /// Cancel the deadline timer; it completes with the platform's abort code.
    pub fn cancel_timer(&mut self) {
        if self.deadline.take().is_some() {
            self.completed.push_back(Completion::Timer {
                result: Err(LineError::aborted()),
            });
        }
    }

    /// Block until one armed operation completes.
    ///
    /// Returns `None` when nothing is armed and nothing is queued.
    pub fn run_one(&mut self) -> Option<Completion> {
        if let Some(completion) = self.completed.pop_front() {
            return Some(completion);
        }

        loop {
            if let Some(target) = &self.armed_read {
                let (transferred, complete) = target.scan(self.carryover.as_slice());
                if complete {
                    self.armed_read = None;
                    return Some(Completion::Read {
                        result: Ok(()),
                        transferred,
                    });
                }
            }

            let now = Instant::now();
            if let Some(deadline) = self.deadline {
                if now >= deadline {
                    self.deadline = None;
                    return Some(Completion::Timer { result: Ok(()) });
                }
            }

            if self.armed_read.is_none() {
                let deadline = self.deadline?;
                std::thread::sleep(deadline - now);
                continue;
            }

            let wait = self.deadline.map_or(IDLE_POLL, |deadline| deadline - now);
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            match self.port.read_within(&mut chunk, wait) {
                Ok(0) => continue,
                Ok(n) => {
                    trace!(n, "bytes received");
                    self.carryover.append(&chunk[..n]);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if platform::classify(&err) == ErrorClass::Timeout => continue,
                Err(err) => {
                    let transferred = self
                        .armed_read
                        .take()
                        .map_or(0, |target| target.scan(self.carryover.as_slice()).0);
                    return Some(Completion::Read {
                        result: Err(LineError::from_io(&err)),
                        transferred,
                    });
                }
            }
        }
    }

    /// Bytes received but not yet handed to any caller.
    pub fn buffered(&self) -> &[u8] {
        self.carryover.as_slice()
    }

    /// Hand the first `n` buffered bytes to a caller.
    pub fn drain(&mut self, n: usize) -> Bytes {
        self.carryover.drain(n)
    }

    /// Device location this channel was opened on.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Current line configuration.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    /// Borrow the underlying line.
    pub fn port(&self) -> &P {
        &self.port
    }
}

impl<P> fmt::Debug for Channel<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("location", &self.location)
            .field("config", &self.config)
            .field("buffered", &self.carryover.len())
            .field("read_armed", &self.armed_read.is_some())
            .field("timer_armed", &self.deadline.is_some())
            .finish()
    }
}

fn validate(config: &LineConfig) -> Result<()> {
    if config.delimiter.is_empty() {
        return Err(TransportError::InvalidConfig(
            "read delimiter must not be empty".to_string(),
        ));
    }
    if config.baud_rate == 0 {
        return Err(TransportError::InvalidConfig(
            "baud rate must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn verify_applied(port: &dyn SerialPort, location: &str, config: &LineConfig) -> Result<()> {
    expect_setting(location, "baud rate", config.baud_rate, port.baud_rate())?;
    expect_setting(location, "character size", config.char_size, port.data_bits())?;
    expect_setting(location, "parity", config.parity, port.parity())?;
    expect_setting(location, "flow control", config.flow_control, port.flow_control())?;
    expect_setting(location, "stop bits", config.stop_bits, port.stop_bits())?;
    Ok(())
}

fn expect_setting<T: PartialEq + fmt::Debug>(
    location: &str,
    setting: &'static str,
    requested: T,
    actual: serialport::Result<T>,
) -> Result<()> {
    let actual = actual.map_err(|source| TransportError::Open {
        location: location.to_string(),
        source,
    })?;
    if actual != requested {
        return Err(TransportError::Rejected {
            location: location.to_string(),
            setting,
            requested: format!("{requested:?}"),
            actual: format!("{actual:?}"),
        });
    }
    Ok(())
}

//! Scripted in-memory serial line.
//!
//! Each read pops the next step of the script. An exhausted script behaves
//! like a silent device: the read blocks for the full timeout and reports
//! [`io::ErrorKind::TimedOut`].

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::line::SerialLine;

#[derive(Debug, Clone)]
enum Step {
    Data(Vec<u8>),
    Delay(Duration),
    Fail(io::ErrorKind),
    FailOs(i32),
}

/// Handle onto everything written to a [`ScriptedPort`].
#[derive(Debug, Clone, Default)]
pub struct WriteLog(Arc<Mutex<Vec<u8>>>);

impl WriteLog {
    /// Snapshot of the bytes written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().map(|buf| buf.clone()).unwrap_or_default()
    }
}

/// A serial line that replays a fixed script.
#[derive(Debug, Default)]
pub struct ScriptedPort {
    steps: VecDeque<Step>,
    written: WriteLog,
    max_write: Option<usize>,
    fail_writes: bool,
    baud_rate: Option<u32>,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `bytes` in a single read (split only if the reader's buffer is smaller).
    pub fn data(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.steps.push_back(Step::Data(bytes.as_ref().to_vec()));
        self
    }

    /// Stay silent for `millis` before the next step.
    pub fn delay_ms(mut self, millis: u64) -> Self {
        self.steps
            .push_back(Step::Delay(Duration::from_millis(millis)));
        self
    }

    /// Fail the next read with an error of `kind`.
    pub fn fail(mut self, kind: io::ErrorKind) -> Self {
        self.steps.push_back(Step::Fail(kind));
        self
    }

    /// Fail the next read with a raw OS error code.
    pub fn fail_os(mut self, code: i32) -> Self {
        self.steps.push_back(Step::FailOs(code));
        self
    }

    /// Accept at most `max` bytes per write call.
    pub fn short_writes(mut self, max: usize) -> Self {
        self.max_write = Some(max);
        self
    }

    /// Reject every write.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Handle for inspecting written bytes after the port is moved into a channel.
    pub fn write_log(&self) -> WriteLog {
        self.written.clone()
    }

    /// Last baud rate applied through [`SerialLine::set_baud_rate`].
    pub fn baud_rate(&self) -> Option<u32> {
        self.baud_rate
    }
}

impl Write for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        let n = self.max_write.map_or(buf.len(), |max| max.min(buf.len()));
        self.written
            .0
            .lock()
            .map_err(|_| io::Error::other("write log poisoned"))?
            .extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialLine for ScriptedPort {
    fn read_within(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        match self.steps.pop_front() {
            Some(Step::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.steps.push_front(Step::Data(bytes.split_off(n)));
                }
                Ok(n)
            }
            Some(Step::Delay(delay)) if delay > timeout => {
                std::thread::sleep(timeout);
                self.steps.push_front(Step::Delay(delay - timeout));
                Err(io::Error::from(io::ErrorKind::TimedOut))
            }
            Some(Step::Delay(delay)) => {
                std::thread::sleep(delay);
                self.read_within(buf, timeout - delay)
            }
            Some(Step::Fail(kind)) => Err(io::Error::from(kind)),
            Some(Step::FailOs(code)) => Err(io::Error::from_raw_os_error(code)),
            None => {
                std::thread::sleep(timeout);
                Err(io::Error::from(io::ErrorKind::TimedOut))
            }
        }
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
        self.baud_rate = Some(baud_rate);
        Ok(())
    }
}

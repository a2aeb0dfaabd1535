use std::fmt;

use serialport::SerialPort;

use crate::channel::Channel;
use crate::error::Result;
use crate::line::SerialLine;
use crate::observer::{ReadObserver, TracingObserver};
use crate::outcome::{LineError, ReadOutcome, ReadStatus};
use crate::platform::ErrorClass;
use crate::reactor::{Completion, ReadTarget};

/// Follow-up the engine owes the reactor after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    Nothing,
    CancelTimer,
    CancelRead,
}

/// State of one in-flight read.
///
/// `status` changes only inside [`PendingRead::apply`] and
/// [`PendingRead::stall`], and only while it is still
/// [`ReadStatus::Ongoing`]. The first completion to reach a terminal state
/// wins; every later completion is a no-op.
#[derive(Debug, Clone)]
pub struct PendingRead {
    target: ReadTarget,
    status: ReadStatus,
    transferred: usize,
    error: Option<LineError>,
}

impl PendingRead {
    pub fn new(target: ReadTarget) -> Self {
        Self {
            target,
            status: ReadStatus::Ongoing,
            transferred: 0,
            error: None,
        }
    }

    pub fn status(&self) -> ReadStatus {
        self.status
    }

    /// Bytes that belong to the caller once the read is over.
    pub fn transferred(&self) -> usize {
        self.transferred
    }

    pub fn error(&self) -> Option<&LineError> {
        self.error.as_ref()
    }

    /// Feed one completion into the state machine.
    ///
    /// `progress` is how many buffered bytes currently count toward the
    /// request; it is what a firing timer hands back as the partial result.
    pub fn apply(&mut self, completion: &Completion, progress: usize) -> FollowUp {
        if self.status.is_terminal() {
            return FollowUp::Nothing;
        }

        match completion {
            Completion::Read {
                result: Ok(()),
                transferred,
            } => {
                self.finish(ReadStatus::Finalized, *transferred);
                FollowUp::CancelTimer
            }
            Completion::Read {
                result: Err(err),
                transferred,
            } => {
                match err.class() {
                    ErrorClass::Timeout | ErrorClass::Aborted => {
                        self.finish(ReadStatus::TimedOut, *transferred)
                    }
                    ErrorClass::Other => self.fail(err.clone()),
                }
                // A still pending timer fires later and is ignored.
                FollowUp::Nothing
            }
            Completion::Timer { result: Ok(()) } => {
                // Soft timeout: a delimiter scan hands out the partial line,
                // a counted read reports that it came up short.
                let status = if self.target.is_counted() {
                    ReadStatus::TimedOut
                } else {
                    ReadStatus::Finalized
                };
                self.finish(status, progress);
                FollowUp::CancelRead
            }
            Completion::Timer { result: Err(err) } => {
                match err.class() {
                    ErrorClass::Aborted | ErrorClass::Timeout => {
                        self.finish(ReadStatus::TimedOut, progress)
                    }
                    ErrorClass::Other => self.fail(err.clone()),
                }
                FollowUp::CancelRead
            }
        }
    }

    /// The reactor ran dry before anything completed.
    pub fn stall(&mut self) {
        if !self.status.is_terminal() {
            self.fail(LineError::stalled());
        }
    }

    fn finish(&mut self, status: ReadStatus, transferred: usize) {
        self.status = status;
        self.transferred = transferred;
    }

    fn fail(&mut self, err: LineError) {
        self.status = ReadStatus::Error;
        self.error = Some(err);
    }

    fn into_error(self) -> LineError {
        self.error.unwrap_or_else(LineError::stalled)
    }
}

/// Timeout-bounded reads over a [`Channel`].
///
/// Each read first serves what the channel already buffered. Anything still
/// missing is raced against a deadline of [`Channel::timeout`], armed when
/// the device read is armed. Every read takes `&mut self`, so at most one
/// read per channel is ever in flight.
pub struct ReadEngine<P = Box<dyn SerialPort>> {
    channel: Channel<P>,
    observer: Box<dyn ReadObserver>,
}

impl<P: SerialLine> ReadEngine<P> {
    /// Drive reads over `channel`, logging through `tracing`.
    pub fn new(channel: Channel<P>) -> Self {
        Self::with_observer(channel, TracingObserver)
    }

    /// Drive reads over `channel`, reporting to `observer`.
    pub fn with_observer(channel: Channel<P>, observer: impl ReadObserver + 'static) -> Self {
        Self {
            channel,
            observer: Box::new(observer),
        }
    }

    /// Read through the next occurrence of the configured delimiter.
    ///
    /// If the deadline expires first, the partial line is returned as
    /// [`ReadOutcome::Finalized`].
    pub fn read_until_delimiter(&mut self) -> ReadOutcome {
        let delimiter = self.channel.config().delimiter.clone();
        self.read(ReadTarget::Delimiter(delimiter))
    }

    /// Read exactly `n` bytes, or report [`ReadOutcome::TimedOut`] with what arrived.
    pub fn read_fixed(&mut self, n: usize) -> ReadOutcome {
        self.read(ReadTarget::Exact(n))
    }

    /// Read a single byte.
    pub fn read_one_byte(&mut self) -> ReadOutcome {
        self.read(ReadTarget::Exact(1))
    }

    /// Write the whole buffer to the line.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.channel.write(bytes)
    }

    /// Borrow the channel.
    pub fn channel(&self) -> &Channel<P> {
        &self.channel
    }

    /// Mutably borrow the channel (e.g. to change baud rate or timeout).
    pub fn channel_mut(&mut self) -> &mut Channel<P> {
        &mut self.channel
    }

    /// Consume the engine and return the channel, buffered input included.
    pub fn into_inner(self) -> Channel<P> {
        self.channel
    }

    fn read(&mut self, target: ReadTarget) -> ReadOutcome {
        self.observer
            .read_started(&target, self.channel.buffered().len());

        let (ready, complete) = target.scan(self.channel.buffered());
        if complete {
            let bytes = self.channel.drain(ready);
            self.observer
                .read_finished(ReadStatus::Finalized, bytes.len());
            return ReadOutcome::Finalized(bytes);
        }

        let mut pending = PendingRead::new(target.clone());
        let timeout = self.channel.timeout();
        self.channel.arm_read(target);
        self.channel.arm_timer(timeout);

        while !pending.status().is_terminal() {
            let Some(completion) = self.channel.run_one() else {
                pending.stall();
                break;
            };
            match self.step(&mut pending, &completion) {
                FollowUp::CancelTimer => self.channel.cancel_timer(),
                FollowUp::CancelRead => self.channel.cancel_read(),
                FollowUp::Nothing => {}
            }
        }

        // Cancel the loser and let its completion run against the terminal state.
        self.channel.cancel_read();
        self.channel.cancel_timer();
        while let Some(late) = self.channel.run_one() {
            self.step(&mut pending, &late);
        }
        self.channel.reset();

        let outcome = match pending.status() {
            ReadStatus::Finalized => {
                ReadOutcome::Finalized(self.channel.drain(pending.transferred()))
            }
            ReadStatus::TimedOut => {
                ReadOutcome::TimedOut(self.channel.drain(pending.transferred()))
            }
            ReadStatus::Error | ReadStatus::Ongoing => ReadOutcome::Error(pending.into_error()),
        };
        self.observer
            .read_finished(outcome.status(), outcome.bytes().len());
        outcome
    }

    fn step(&mut self, pending: &mut PendingRead, completion: &Completion) -> FollowUp {
        let from = pending.status();
        let (progress, _) = pending.target.scan(self.channel.buffered());
        let follow_up = pending.apply(completion, progress);
        self.observer.completion(completion, from, pending.status());
        follow_up
    }
}

impl<P> fmt::Debug for ReadEngine<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadEngine")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use bytes::Bytes;

    use super::*;
    use crate::config::LineConfig;
    use crate::platform::OPERATION_ABORTED;
    use crate::testing::ScriptedPort;

    fn engine(port: ScriptedPort, timeout_ms: u64) -> ReadEngine<ScriptedPort> {
        let config = LineConfig::default().with_timeout_ms(timeout_ms);
        ReadEngine::new(Channel::from_port(port, "scripted", config).unwrap())
    }

    fn read_ok(transferred: usize) -> Completion {
        Completion::Read {
            result: Ok(()),
            transferred,
        }
    }

    fn timer_fired() -> Completion {
        Completion::Timer { result: Ok(()) }
    }

    fn timer_cancelled() -> Completion {
        Completion::Timer {
            result: Err(LineError::aborted()),
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(ReadStatus, ReadStatus)>>>);

    impl Recorder {
        fn transitions(&self) -> Vec<(ReadStatus, ReadStatus)> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ReadObserver for Recorder {
        fn completion(&mut self, _completion: &Completion, from: ReadStatus, to: ReadStatus) {
            self.0.lock().unwrap().push((from, to));
        }
    }

    // State machine

    #[test]
    fn read_completion_finalizes_and_cancels_timer() {
        let mut pending = PendingRead::new(ReadTarget::Exact(4));
        assert_eq!(pending.apply(&read_ok(4), 4), FollowUp::CancelTimer);
        assert_eq!(pending.status(), ReadStatus::Finalized);
        assert_eq!(pending.transferred(), 4);
    }

    #[test]
    fn late_timer_never_overrides_finalized() {
        let mut pending = PendingRead::new(ReadTarget::Exact(4));
        pending.apply(&read_ok(4), 4);

        assert_eq!(pending.apply(&timer_cancelled(), 4), FollowUp::Nothing);
        assert_eq!(pending.apply(&timer_fired(), 4), FollowUp::Nothing);
        assert_eq!(pending.status(), ReadStatus::Finalized);
        assert_eq!(pending.transferred(), 4);
    }

    #[test]
    fn late_timer_never_overrides_error() {
        let mut pending = PendingRead::new(ReadTarget::Exact(4));
        let broken = LineError::from_io(&std::io::Error::from(ErrorKind::BrokenPipe));
        pending.apply(
            &Completion::Read {
                result: Err(broken.clone()),
                transferred: 0,
            },
            0,
        );
        pending.apply(&timer_fired(), 0);
        pending.apply(&timer_cancelled(), 0);

        assert_eq!(pending.status(), ReadStatus::Error);
        assert_eq!(pending.error(), Some(&broken));
    }

    #[test]
    fn expiring_timer_on_counted_read_times_out() {
        let mut pending = PendingRead::new(ReadTarget::Exact(5));
        assert_eq!(pending.apply(&timer_fired(), 2), FollowUp::CancelRead);
        assert_eq!(pending.status(), ReadStatus::TimedOut);
        assert_eq!(pending.transferred(), 2);
    }

    #[test]
    fn expiring_timer_on_delimiter_scan_finalizes_partial_line() {
        let mut pending = PendingRead::new(ReadTarget::Delimiter(Bytes::from_static(b"\r\n")));
        assert_eq!(pending.apply(&timer_fired(), 3), FollowUp::CancelRead);
        assert_eq!(pending.status(), ReadStatus::Finalized);
        assert_eq!(pending.transferred(), 3);
    }

    #[test]
    fn cancelled_timer_while_ongoing_times_out() {
        let mut pending = PendingRead::new(ReadTarget::Exact(5));
        assert_eq!(pending.apply(&timer_cancelled(), 1), FollowUp::CancelRead);
        assert_eq!(pending.status(), ReadStatus::TimedOut);
        assert_eq!(pending.transferred(), 1);
    }

    #[test]
    fn other_timer_error_fails_the_read() {
        let mut pending = PendingRead::new(ReadTarget::Exact(5));
        let err = LineError::from_io(&std::io::Error::other("clock gone"));
        pending.apply(&Completion::Timer { result: Err(err) }, 0);
        assert_eq!(pending.status(), ReadStatus::Error);
    }

    #[test]
    fn aborted_read_times_out_and_leaves_timer_alone() {
        let mut pending = PendingRead::new(ReadTarget::Exact(5));
        let follow_up = pending.apply(
            &Completion::Read {
                result: Err(LineError::aborted()),
                transferred: 3,
            },
            3,
        );
        assert_eq!(follow_up, FollowUp::Nothing);
        assert_eq!(pending.status(), ReadStatus::TimedOut);
        assert_eq!(pending.transferred(), 3);
    }

    #[test]
    fn stall_only_applies_while_ongoing() {
        let mut pending = PendingRead::new(ReadTarget::Exact(1));
        pending.stall();
        assert_eq!(pending.status(), ReadStatus::Error);

        let mut done = PendingRead::new(ReadTarget::Exact(1));
        done.apply(&read_ok(1), 1);
        done.stall();
        assert_eq!(done.status(), ReadStatus::Finalized);
    }

    // Engine over a scripted line

    #[test]
    fn reads_through_delimiter() {
        let mut engine = engine(ScriptedPort::new().data(b"OK\r\n"), 200);
        let outcome = engine.read_until_delimiter();
        assert_eq!(outcome, ReadOutcome::Finalized(Bytes::from_static(b"OK\r\n")));
        assert!(engine.channel().buffered().is_empty());
    }

    #[test]
    fn bytes_after_delimiter_carry_over() {
        let mut engine = engine(
            ScriptedPort::new()
                .data(b"OK\r\nAB")
                .delay_ms(5)
                .data(b"CDE"),
            200,
        );

        assert_eq!(engine.read_until_delimiter().bytes(), b"OK\r\n");
        assert_eq!(engine.channel().buffered(), b"AB");

        let outcome = engine.read_fixed(5);
        assert_eq!(outcome, ReadOutcome::Finalized(Bytes::from_static(b"ABCDE")));
    }

    #[test]
    fn request_served_from_carryover_skips_the_device() {
        let recorder = Recorder::default();
        let config = LineConfig::default().with_timeout_ms(200);
        let channel =
            Channel::from_port(ScriptedPort::new().data(b"$GPRMC\r\n$G"), "scripted", config)
                .unwrap();
        let mut engine = ReadEngine::with_observer(channel, recorder.clone());

        engine.read_until_delimiter();
        let seen = recorder.transitions().len();

        let start = Instant::now();
        let outcome = engine.read_fixed(2);
        assert_eq!(outcome, ReadOutcome::Finalized(Bytes::from_static(b"$G")));
        assert_eq!(recorder.transitions().len(), seen);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn short_fixed_read_times_out_with_partial_bytes() {
        let mut engine = engine(ScriptedPort::new().data(b"ab"), 30);

        let outcome = engine.read_fixed(5);
        assert_eq!(outcome, ReadOutcome::TimedOut(Bytes::from_static(b"ab")));
        assert!(engine.channel().buffered().is_empty());

        let outcome = engine.read_fixed(3);
        assert_eq!(outcome, ReadOutcome::TimedOut(Bytes::new()));
    }

    #[test]
    fn silent_line_returns_within_the_deadline() {
        let mut engine = engine(ScriptedPort::new(), 30);
        let start = Instant::now();
        let outcome = engine.read_one_byte();
        let elapsed = start.elapsed();

        assert_eq!(outcome, ReadOutcome::TimedOut(Bytes::new()));
        assert!(elapsed >= Duration::from_millis(30));
        assert!(elapsed < Duration::from_millis(530));
    }

    #[test]
    fn partial_line_is_finalized_on_deadline() {
        let mut engine = engine(ScriptedPort::new().data(b"$GPGSV,3"), 30);
        let outcome = engine.read_until_delimiter();
        assert_eq!(outcome, ReadOutcome::Finalized(Bytes::from_static(b"$GPGSV,3")));
    }

    #[test]
    fn data_arriving_before_deadline_wins() {
        let mut engine = engine(ScriptedPort::new().delay_ms(10).data([0xb5]), 200);
        assert_eq!(engine.read_one_byte().bytes(), &[0xb5]);
    }

    #[test]
    fn transport_error_keeps_bytes_buffered() {
        let mut engine = engine(
            ScriptedPort::new().data(b"ab").fail(ErrorKind::BrokenPipe),
            200,
        );

        let outcome = engine.read_fixed(4);
        match outcome {
            ReadOutcome::Error(err) => assert_eq!(err.kind(), ErrorKind::BrokenPipe),
            other => panic!("expected error, got {other:?}"),
        }
        assert_eq!(engine.channel().buffered(), b"ab");
    }

    #[test]
    fn aborted_device_read_times_out() {
        let mut engine = engine(
            ScriptedPort::new().data(b"a").fail_os(OPERATION_ABORTED),
            200,
        );
        let outcome = engine.read_fixed(2);
        assert_eq!(outcome, ReadOutcome::TimedOut(Bytes::from_static(b"a")));
    }

    #[test]
    fn losing_timer_is_observed_as_no_op() {
        let recorder = Recorder::default();
        let config = LineConfig::default().with_timeout_ms(200);
        let channel =
            Channel::from_port(ScriptedPort::new().data(b"xyz"), "scripted", config).unwrap();
        let mut engine = ReadEngine::with_observer(channel, recorder.clone());

        assert!(engine.read_fixed(3).is_finalized());
        assert_eq!(
            recorder.transitions(),
            vec![
                (ReadStatus::Ongoing, ReadStatus::Finalized),
                (ReadStatus::Finalized, ReadStatus::Finalized),
            ]
        );
    }

    #[test]
    fn timeout_is_rearmed_per_call() {
        let mut engine = engine(ScriptedPort::new(), 30);
        engine.read_one_byte();
        engine.channel_mut().set_timeout(Duration::from_millis(10));

        let start = Instant::now();
        assert!(matches!(engine.read_one_byte(), ReadOutcome::TimedOut(_)));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(10), "{elapsed:?}");
        // A deadline accumulated across both calls would run to 40 ms.
        assert!(elapsed < Duration::from_millis(35), "{elapsed:?}");
    }

    #[test]
    fn into_inner_keeps_buffered_input() {
        let mut engine = engine(ScriptedPort::new().data(b"OK\r\nAB"), 200);
        assert_eq!(engine.read_until_delimiter().bytes(), b"OK\r\n");

        let channel = engine.into_inner();
        assert_eq!(channel.buffered(), b"AB");
        assert_eq!(channel.location(), "scripted");
    }
}

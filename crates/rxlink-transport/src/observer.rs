use tracing::{debug, trace, warn};

use crate::outcome::ReadStatus;
use crate::reactor::{Completion, ReadTarget};

/// Diagnostic hook into the read engine.
///
/// Observers only watch; nothing they do affects the outcome of a read.
/// Every method has an empty default.
pub trait ReadObserver: Send {
    /// A read call started with `buffered` bytes already on hand.
    fn read_started(&mut self, _target: &ReadTarget, _buffered: usize) {}

    /// The reactor delivered `completion`, moving the read from `from` to `to`.
    fn completion(&mut self, _completion: &Completion, _from: ReadStatus, _to: ReadStatus) {}

    /// The read call returned `delivered` bytes with `status`.
    fn read_finished(&mut self, _status: ReadStatus, _delivered: usize) {}
}

/// Emits `tracing` events for every read.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ReadObserver for TracingObserver {
    fn read_started(&mut self, target: &ReadTarget, buffered: usize) {
        trace!(?target, buffered, "read started");
    }

    fn completion(&mut self, completion: &Completion, from: ReadStatus, to: ReadStatus) {
        if from.is_terminal() {
            trace!(?completion, status = %from, "late completion ignored");
            return;
        }
        match completion {
            Completion::Read {
                result: Err(err), ..
            }
            | Completion::Timer { result: Err(err) }
                if to == ReadStatus::Error =>
            {
                warn!(error = %err, "read failed");
            }
            _ => debug!(?completion, status = %to, "read completion"),
        }
    }

    fn read_finished(&mut self, status: ReadStatus, delivered: usize) {
        debug!(%status, delivered, "read finished");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl ReadObserver for SilentObserver {}

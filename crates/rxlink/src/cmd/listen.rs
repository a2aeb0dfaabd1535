use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rxlink::frame::FrameError;
use rxlink::ReceiverError;
use tracing::{info, warn};

use crate::cmd::ListenArgs;
use crate::exit::{receiver_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frame, print_line, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut receiver = args.port.open()?;
    let location = args.port.port.as_str();

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    info!(port = location, frames = args.frames, "listening");

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let result = if args.frames {
            receiver
                .fetch_frame()
                .map(|frame| print_frame(&frame, location, format))
        } else {
            receiver
                .read_line()
                .map(|line| print_line(&line, location, format))
        };

        match result {
            Ok(()) => {}
            Err(ReceiverError::TimedOut { .. }) => continue,
            Err(err) if is_corrupt_input(&err) => {
                warn!(error = %err, "dropped corrupt input");
                continue;
            }
            Err(err) => return Err(receiver_error("receive failed", err)),
        }

        printed = printed.saturating_add(1);
        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

/// Corrupt frames are routine on a live line; they are logged and skipped.
fn is_corrupt_input(err: &ReceiverError) -> bool {
    matches!(
        err,
        ReceiverError::SyncNotFound { .. }
            | ReceiverError::Frame(FrameError::ChecksumMismatch { .. })
            | ReceiverError::Frame(FrameError::LengthMismatch { .. })
            | ReceiverError::Frame(FrameError::PayloadTooLarge { .. })
    )
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxlink::transport::TransportError;

    #[test]
    fn corrupt_frames_are_skipped() {
        assert!(is_corrupt_input(&ReceiverError::Frame(
            FrameError::ChecksumMismatch {
                expected: [0, 0],
                actual: [1, 1]
            }
        )));
        assert!(is_corrupt_input(&ReceiverError::SyncNotFound { scanned: 4096 }));
    }

    #[test]
    fn line_failures_stop_listening() {
        let err = ReceiverError::Transport(TransportError::InvalidConfig("baud".to_string()));
        assert!(!is_corrupt_input(&err));
    }
}

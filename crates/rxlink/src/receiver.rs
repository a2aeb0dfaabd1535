//! Command/response helper for a receiver on a serial line.
//!
//! [`Receiver`] only uses the public API of the transport and frame layers.
//! Device-specific modules (message catalogs, field decoders) are expected to
//! sit on top of it.

use bytes::{Bytes, BytesMut};
use rxlink_frame::binary::CHECKSUM_SIZE;
use rxlink_frame::{
    encode_frame, parse_frame, text_command, FrameError, UbxFrame, DEFAULT_MAX_PAYLOAD,
    MIN_FRAME_SIZE, SYNC,
};
use rxlink_transport::serialport::SerialPort;
use rxlink_transport::{
    Channel, LineConfig, LineError, ReadEngine, ReadOutcome, SerialLine, TransportError,
};
use tracing::{debug, trace};

/// Line terminator appended to every text command.
pub const COMMAND_TERMINATOR: &str = "\r\n";

/// Frames skipped by [`Receiver::fetch_frame_matching`] before giving up. Default: 32.
pub const DEFAULT_FETCH_ATTEMPTS: usize = 32;

/// Bytes examined while looking for a frame sync pair. Default: 4096.
pub const DEFAULT_SYNC_SCAN_LIMIT: usize = 4096;

/// Errors surfaced by [`Receiver`].
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("serial line error: {0}")]
    Line(#[from] LineError),

    /// The deadline expired. Bytes that did arrive are handed back.
    #[error("timed out after receiving {} bytes", .partial.len())]
    TimedOut { partial: Bytes },

    #[error("no frame sync within {scanned} bytes")]
    SyncNotFound { scanned: usize },

    #[error("no frame {class:#04x}/{id:#04x} within {attempts} frames")]
    NoMatchingFrame { class: u8, id: u8, attempts: usize },
}

pub type Result<T> = std::result::Result<T, ReceiverError>;

/// Configuration for a [`Receiver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Largest binary payload accepted from the line. Default: 65535.
    pub max_payload: usize,
    /// Frames read by [`Receiver::fetch_frame_matching`] before it gives up.
    pub fetch_attempts: usize,
    /// Bytes read while hunting for a sync pair before [`Receiver::fetch_frame`] gives up.
    pub sync_scan_limit: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            sync_scan_limit: DEFAULT_SYNC_SCAN_LIMIT,
        }
    }
}

/// A receiver attached to a serial line.
pub struct Receiver<P = Box<dyn SerialPort>> {
    engine: ReadEngine<P>,
    config: ReceiverConfig,
}

impl Receiver<Box<dyn SerialPort>> {
    /// Open the device node at `location`.
    pub fn open(location: impl Into<String>, line: LineConfig) -> Result<Self> {
        let channel = Channel::open(location, line)?;
        Ok(Self::new(ReadEngine::new(channel), ReceiverConfig::default()))
    }
}

impl<P: SerialLine> Receiver<P> {
    pub fn new(engine: ReadEngine<P>, config: ReceiverConfig) -> Self {
        Self { engine, config }
    }

    /// Send `$<body>*HH\r\n`.
    pub fn send_command(&mut self, body: &str) -> Result<()> {
        let mut command = text_command(body);
        debug!(command = %command, "sending text command");
        command.push_str(COMMAND_TERMINATOR);
        self.engine.write(command.as_bytes())?;
        Ok(())
    }

    /// Send one binary frame.
    pub fn send_frame(&mut self, class: u8, id: u8, payload: &[u8]) -> Result<()> {
        let mut buf = BytesMut::with_capacity(MIN_FRAME_SIZE + payload.len());
        encode_frame(class, id, payload, &mut buf)?;
        debug!(class, id, len = payload.len(), "sending frame");
        self.engine.write(&buf)?;
        Ok(())
    }

    /// Read through the next line delimiter.
    ///
    /// A line cut short by the deadline is returned as is. A deadline that
    /// passes with nothing received is [`ReceiverError::TimedOut`].
    pub fn read_line(&mut self) -> Result<Bytes> {
        let line = finalized(self.engine.read_until_delimiter())?;
        if line.is_empty() {
            return Err(ReceiverError::TimedOut { partial: line });
        }
        Ok(line)
    }

    /// Read exactly `n` bytes.
    pub fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        finalized(self.engine.read_fixed(n))
    }

    /// Read the next binary frame off the line.
    ///
    /// Bytes ahead of the sync pair are skipped. A frame whose checksum does
    /// not match is reported as [`FrameError::ChecksumMismatch`] and consumed.
    pub fn fetch_frame(&mut self) -> Result<UbxFrame> {
        self.scan_sync()?;

        let header = finalized(self.engine.read_fixed(4))?;
        let declared = match header[..] {
            [_, _, lo, hi] => usize::from(u16::from_le_bytes([lo, hi])),
            _ => {
                return Err(FrameError::TooShort {
                    len: SYNC.len() + header.len(),
                    min: MIN_FRAME_SIZE,
                }
                .into())
            }
        };
        if declared > self.config.max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: declared,
                max: self.config.max_payload,
            }
            .into());
        }

        let rest = finalized(self.engine.read_fixed(declared + CHECKSUM_SIZE))?;
        let mut wire = Vec::with_capacity(MIN_FRAME_SIZE + declared);
        wire.extend_from_slice(&SYNC);
        wire.extend_from_slice(&header);
        wire.extend_from_slice(&rest);

        let frame = parse_frame(&wire)?;
        debug!(
            class = frame.class,
            id = frame.id,
            len = frame.payload.len(),
            "frame received"
        );
        Ok(frame)
    }

    /// Fetch frames until one with `class` and `id` arrives.
    pub fn fetch_frame_matching(&mut self, class: u8, id: u8) -> Result<UbxFrame> {
        for _ in 0..self.config.fetch_attempts {
            let frame = self.fetch_frame()?;
            if frame.is(class, id) {
                return Ok(frame);
            }
            trace!(class = frame.class, id = frame.id, "skipping unrelated frame");
        }
        Err(ReceiverError::NoMatchingFrame {
            class,
            id,
            attempts: self.config.fetch_attempts,
        })
    }

    /// Send the empty poll request for `class`/`id` and fetch the reply.
    pub fn poll_frame(&mut self, class: u8, id: u8) -> Result<UbxFrame> {
        self.send_frame(class, id, &[])?;
        self.fetch_frame_matching(class, id)
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub fn engine(&self) -> &ReadEngine<P> {
        &self.engine
    }

    /// Mutably borrow the engine (e.g. to change baud rate or timeout).
    pub fn engine_mut(&mut self) -> &mut ReadEngine<P> {
        &mut self.engine
    }

    pub fn into_engine(self) -> ReadEngine<P> {
        self.engine
    }

    fn scan_sync(&mut self) -> Result<()> {
        let mut previous = None;
        for scanned in 0..self.config.sync_scan_limit {
            let byte = finalized(self.engine.read_one_byte())?;
            let Some(&byte) = byte.first() else {
                continue;
            };
            if previous == Some(SYNC[0]) && byte == SYNC[1] {
                if scanned > 1 {
                    trace!(skipped = scanned - 1, "skipped bytes ahead of frame sync");
                }
                return Ok(());
            }
            previous = Some(byte);
        }
        Err(ReceiverError::SyncNotFound {
            scanned: self.config.sync_scan_limit,
        })
    }
}

impl<P> std::fmt::Debug for Receiver<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .finish()
    }
}

fn finalized(outcome: ReadOutcome) -> Result<Bytes> {
    match outcome {
        ReadOutcome::Finalized(bytes) => Ok(bytes),
        ReadOutcome::TimedOut(partial) => Err(ReceiverError::TimedOut { partial }),
        ReadOutcome::Error(err) => Err(ReceiverError::Line(err)),
    }
}

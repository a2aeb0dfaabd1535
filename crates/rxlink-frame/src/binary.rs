use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::checksum::fletcher_checksum;
use crate::error::{FrameError, Result};

/// Sync pair opening every binary frame.
pub const SYNC: [u8; 2] = [0xb5, 0x62];

/// Sync (2) + class (1) + id (1) + length (2).
pub const HEADER_SIZE: usize = 6;

/// Trailing checksum pair.
pub const CHECKSUM_SIZE: usize = 2;

/// Header plus checksum, i.e. a frame with an empty payload.
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + CHECKSUM_SIZE;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Default decode limit.
pub const DEFAULT_MAX_PAYLOAD: usize = MAX_PAYLOAD;

/// A binary frame addressed by message class and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UbxFrame {
    pub class: u8,
    pub id: u8,
    pub payload: Bytes,
}

impl UbxFrame {
    /// Create a new frame.
    pub fn new(class: u8, id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            class,
            id,
            payload: payload.into(),
        }
    }

    /// A poll request: the message's class and id with no payload.
    pub fn poll(class: u8, id: u8) -> Self {
        Self::new(class, id, Bytes::new())
    }

    /// Whether this frame carries the given class and id.
    pub fn is(&self, class: u8, id: u8) -> bool {
        self.class == class && self.id == id
    }

    /// The total wire size of this frame (header + payload + checksum).
    pub fn wire_size(&self) -> usize {
        MIN_FRAME_SIZE + self.payload.len()
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame(self.class, self.id, &self.payload, &mut buf)?;
        Ok(buf.freeze())
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────┬───────┬──────┬───────────┬──────────────┬───────────┐
/// │ Sync (2B) │ Class │ Id   │ Length    │ Payload      │ Checksum  │
/// │ 0xb5 0x62 │ (1B)  │ (1B) │ (2B LE)   │ (Length B)   │ A, B      │
/// └───────────┴───────┴──────┴───────────┴──────────────┴───────────┘
/// ```
///
/// The checksum covers class, id, length and payload.
pub fn encode_frame(class: u8, id: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let length = payload_length(payload)?;
    dst.reserve(MIN_FRAME_SIZE + payload.len());
    let start = dst.len();
    dst.put_slice(&SYNC);
    dst.put_u8(class);
    dst.put_u8(id);
    dst.put_u16_le(length);
    dst.put_slice(payload);
    let (a, b) = fletcher_checksum(&dst[start + SYNC.len()..]);
    dst.put_u8(a);
    dst.put_u8(b);
    Ok(())
}

/// Sync, header and payload, ready for [`append_binary_checksum`].
pub fn frame_without_checksum(class: u8, id: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let length = payload_length(payload)?;
    let mut frame = Vec::with_capacity(MIN_FRAME_SIZE + payload.len());
    frame.extend_from_slice(&SYNC);
    frame.push(class);
    frame.push(id);
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Append the checksum pair computed over everything after the sync bytes.
pub fn append_binary_checksum(frame: &mut Vec<u8>) {
    let (a, b) = fletcher_checksum(frame.get(SYNC.len()..).unwrap_or_default());
    frame.push(a);
    frame.push(b);
}

/// Whether `frame` is a complete binary frame with a matching checksum.
///
/// Frames shorter than [`MIN_FRAME_SIZE`] or not opening with [`SYNC`] are
/// never valid.
pub fn validate_binary(frame: &[u8]) -> bool {
    if frame.len() < MIN_FRAME_SIZE || frame[..2] != SYNC {
        return false;
    }
    let (body, trailer) = frame.split_at(frame.len() - CHECKSUM_SIZE);
    let (a, b) = fletcher_checksum(&body[SYNC.len()..]);
    trailer == [a, b]
}

/// Parse one complete frame held in `bytes`.
///
/// Unlike [`validate_binary`] this also requires the length field to account
/// for every byte between header and checksum.
pub fn parse_frame(bytes: &[u8]) -> Result<UbxFrame> {
    if bytes.len() < MIN_FRAME_SIZE {
        return Err(FrameError::TooShort {
            len: bytes.len(),
            min: MIN_FRAME_SIZE,
        });
    }
    if bytes[..2] != SYNC {
        return Err(FrameError::InvalidSync);
    }
    let declared = u16::from_le_bytes([bytes[4], bytes[5]]) as usize;
    let actual = bytes.len() - MIN_FRAME_SIZE;
    if declared != actual {
        return Err(FrameError::LengthMismatch { declared, actual });
    }
    verify_checksum(bytes)?;
    Ok(UbxFrame {
        class: bytes[2],
        id: bytes[3],
        payload: Bytes::copy_from_slice(&bytes[HEADER_SIZE..HEADER_SIZE + declared]),
    })
}

/// Decode a frame from a stream buffer.
///
/// Bytes ahead of the first sync pair are discarded. Returns `Ok(None)` if the
/// buffer doesn't contain a complete frame yet. On success, consumes the frame
/// bytes from the buffer.
///
/// On an oversized length or a checksum mismatch the offending sync pair is
/// consumed before the error is returned, so the next call resynchronises on
/// whatever follows.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<UbxFrame>> {
    if !resync(src) {
        return Ok(None);
    }
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let payload_len = u16::from_le_bytes([src[4], src[5]]) as usize;
    if payload_len > max_payload {
        src.advance(SYNC.len());
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = MIN_FRAME_SIZE + payload_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    if let Err(err) = verify_checksum(&src[..total]) {
        src.advance(SYNC.len());
        return Err(err);
    }

    let class = src[2];
    let id = src[3];
    let mut frame = src.split_to(total);
    frame.advance(HEADER_SIZE);
    frame.truncate(payload_len);
    Ok(Some(UbxFrame {
        class,
        id,
        payload: frame.freeze(),
    }))
}

/// Drop everything ahead of the first sync pair. Returns true when `src` now
/// starts with [`SYNC`].
fn resync(src: &mut BytesMut) -> bool {
    if src.starts_with(&SYNC) {
        return true;
    }
    match src.windows(2).position(|w| w == SYNC) {
        Some(pos) => {
            trace!(skipped = pos, "resynchronised on frame sync");
            src.advance(pos);
            true
        }
        None => {
            // A trailing first sync byte may be completed by the next read.
            let keep = usize::from(src.last() == Some(&SYNC[0]));
            let skipped = src.len() - keep;
            if skipped > 0 {
                trace!(skipped, "discarded bytes without frame sync");
                src.advance(skipped);
            }
            false
        }
    }
}

fn verify_checksum(frame: &[u8]) -> Result<()> {
    let (body, trailer) = frame.split_at(frame.len() - CHECKSUM_SIZE);
    let (a, b) = fletcher_checksum(&body[SYNC.len()..]);
    if trailer != [a, b] {
        return Err(FrameError::ChecksumMismatch {
            expected: [a, b],
            actual: [trailer[0], trailer[1]],
        });
    }
    Ok(())
}

fn payload_length(payload: &[u8]) -> Result<u16> {
    u16::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: MAX_PAYLOAD,
    })
}

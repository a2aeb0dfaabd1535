//! [`tokio_util::codec`] adapter for the binary frame format.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::binary::{decode_frame, encode_frame, UbxFrame, DEFAULT_MAX_PAYLOAD};
use crate::error::FrameError;

/// Decodes and encodes [`UbxFrame`]s on a byte stream.
///
/// Noise between frames is skipped. A corrupt frame yields one error and the
/// stream resynchronises on the next sync pair.
#[derive(Debug, Clone)]
pub struct UbxCodec {
    max_payload: usize,
}

impl UbxCodec {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    pub fn with_max_payload(max_payload: usize) -> Self {
        Self { max_payload }
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }
}

impl Default for UbxCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for UbxCodec {
    type Item = UbxFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<UbxFrame>, FrameError> {
        decode_frame(src, self.max_payload)
    }
}

impl Encoder<UbxFrame> for UbxCodec {
    type Error = FrameError;

    fn encode(&mut self, item: UbxFrame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item.class, item.id, &item.payload, dst)
    }
}

impl Encoder<&UbxFrame> for UbxCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &UbxFrame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item.class, item.id, &item.payload, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_roundtrip() {
        let mut codec = UbxCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(UbxFrame::new(0x01, 0x07, &b"fix"[..]), &mut buf)
            .unwrap();
        codec.encode(&UbxFrame::poll(0x0a, 0x04), &mut buf).unwrap();

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert!(first.is(0x01, 0x07));
        assert_eq!(first.payload.as_ref(), b"fix");
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert!(second.is(0x0a, 0x04));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_enforces_limit() {
        let mut codec = UbxCodec::with_max_payload(2);
        let mut buf = BytesMut::new();
        codec
            .encode(UbxFrame::new(0x01, 0x07, &b"abc"[..]), &mut buf)
            .unwrap();
        assert!(matches!(
            codec.decode(&mut buf),
            Err(FrameError::PayloadTooLarge { size: 3, max: 2 })
        ));
    }

    #[test]
    fn test_codec_waits_for_more() {
        let mut codec = UbxCodec::default();
        let mut buf = BytesMut::from(&[0xb5, 0x62, 0x0a, 0x04, 0x00][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&[0x00, 0x0e, 0x34]);
        assert!(codec.decode(&mut buf).unwrap().unwrap().is(0x0a, 0x04));
    }
}

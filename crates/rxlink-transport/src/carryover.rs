use bytes::{Bytes, BytesMut};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Bytes received from the device that no caller has consumed yet.
///
/// Appending and draining are the only mutations, so bytes leave in exactly
/// the order they arrived.
#[derive(Debug)]
pub struct Carryover {
    buf: BytesMut,
}

impl Default for Carryover {
    fn default() -> Self {
        Self::new()
    }
}

impl Carryover {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Queue bytes behind anything already buffered.
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Remove up to `n` bytes from the front.
    pub fn drain(&mut self, n: usize) -> Bytes {
        let n = n.min(self.buf.len());
        self.buf.split_to(n).freeze()
    }

    /// View the buffered bytes without consuming them.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_arrival_order() {
        let mut carry = Carryover::new();
        carry.append(b"ab");
        carry.append(b"cde");

        assert_eq!(carry.drain(3).as_ref(), b"abc");
        assert_eq!(carry.as_slice(), b"de");
        assert_eq!(carry.drain(2).as_ref(), b"de");
        assert!(carry.is_empty());
    }

    #[test]
    fn drain_clamps_to_available() {
        let mut carry = Carryover::new();
        carry.append(b"xy");
        assert_eq!(carry.drain(10).as_ref(), b"xy");
        assert_eq!(carry.drain(1).len(), 0);
    }
}

//! Operations the channel's reactor runs on behalf of the read engine.

use bytes::Bytes;

use crate::outcome::LineError;

/// What an armed read is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadTarget {
    /// Exactly this many bytes.
    Exact(usize),
    /// Everything up to and including this byte sequence.
    Delimiter(Bytes),
}

impl ReadTarget {
    /// How many of `buffered` answer this request, and whether that completes it.
    ///
    /// For delimiter targets an incomplete scan claims everything buffered, so
    /// a partial line can be handed out when the deadline expires.
    pub fn scan(&self, buffered: &[u8]) -> (usize, bool) {
        match self {
            ReadTarget::Exact(n) => (buffered.len().min(*n), buffered.len() >= *n),
            ReadTarget::Delimiter(delimiter) => match find(buffered, delimiter) {
                Some(pos) => (pos + delimiter.len(), true),
                None => (buffered.len(), false),
            },
        }
    }

    /// True for counted reads.
    pub fn is_counted(&self) -> bool {
        matches!(self, ReadTarget::Exact(_))
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// One finished asynchronous operation, as reported by
/// [`Channel::run_one`](crate::Channel::run_one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The armed read finished, successfully or not.
    Read {
        result: std::result::Result<(), LineError>,
        /// Bytes buffered toward the request when it finished.
        transferred: usize,
    },
    /// The deadline timer fired or was cancelled.
    Timer {
        result: std::result::Result<(), LineError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_scan() {
        let target = ReadTarget::Exact(4);
        assert_eq!(target.scan(b"ab"), (2, false));
        assert_eq!(target.scan(b"abcd"), (4, true));
        assert_eq!(target.scan(b"abcdef"), (4, true));
    }

    #[test]
    fn delimiter_scan_stops_after_first_delimiter() {
        let target = ReadTarget::Delimiter(Bytes::from_static(b"\r\n"));
        assert_eq!(target.scan(b"OK\r\nNEXT\r\n"), (4, true));
        assert_eq!(target.scan(b"OK\r"), (3, false));
        assert_eq!(target.scan(b""), (0, false));
    }

    #[test]
    fn empty_delimiter_never_completes() {
        let target = ReadTarget::Delimiter(Bytes::new());
        assert_eq!(target.scan(b"abc"), (3, false));
    }
}

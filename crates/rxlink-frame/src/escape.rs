use std::fmt::Write;

/// Render bytes as `\xhh` escapes, two lowercase hex digits per byte.
pub fn escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 4);
    for byte in bytes {
        // Writing into a String cannot fail.
        let _ = write!(out, "\\x{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_every_byte() {
        assert_eq!(escape(&[0xb5, 0x62, 0x0a, 0x04]), "\\xb5\\x62\\x0a\\x04");
    }

    #[test]
    fn printable_bytes_are_escaped_too() {
        assert_eq!(escape(b"OK"), "\\x4f\\x4b");
        assert_eq!(escape(&[]), "");
    }
}

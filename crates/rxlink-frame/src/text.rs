//! Text command framing.
//!
//! ```text
//! $<body>*<HH>\r\n
//! ```
//!
//! `HH` is the XOR of every body byte, as two uppercase hex digits. The `$` and
//! `*` delimiters are excluded from the checksum.

use crate::checksum::xor_checksum;
use crate::error::{FrameError, Result};

/// Leading delimiter of a text command.
pub const START: char = '$';

/// Delimiter between body and checksum trailer.
pub const CHECKSUM_MARK: char = '*';

/// Append the two-digit checksum trailer to a command of the form `$<body>*`.
///
/// Fails with [`FrameError::MissingDelimiter`] if either delimiter is absent;
/// the command is left untouched in that case.
pub fn append_text_checksum(command: &mut String) -> Result<()> {
    if command.len() < 2 || !command.starts_with(START) || !command.ends_with(CHECKSUM_MARK) {
        return Err(FrameError::MissingDelimiter(command.clone()));
    }

    let body = &command.as_bytes()[1..command.len() - 1];
    let checksum = xor_checksum(body);
    command.push_str(&format!("{checksum:02X}"));
    Ok(())
}

/// Build `$<body>*<HH>` from a bare body.
pub fn text_command(body: &str) -> String {
    format!("{START}{body}{CHECKSUM_MARK}{:02X}", xor_checksum(body.as_bytes()))
}

/// Check a received sentence and return its body.
///
/// A trailing line terminator is ignored. Hex digits in the trailer may be of
/// either case.
pub fn parse_text(sentence: &str) -> Result<&str> {
    let line = sentence.trim_end_matches(['\r', '\n']);
    let rest = line
        .strip_prefix(START)
        .ok_or_else(|| FrameError::MissingDelimiter(line.to_string()))?;
    let (body, trailer) = rest
        .rsplit_once(CHECKSUM_MARK)
        .ok_or_else(|| FrameError::MissingDelimiter(line.to_string()))?;

    if trailer.len() != 2 || !trailer.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FrameError::MalformedTrailer(trailer.to_string()));
    }
    let actual = u8::from_str_radix(trailer, 16)
        .map_err(|_| FrameError::MalformedTrailer(trailer.to_string()))?;
    let expected = xor_checksum(body.as_bytes());
    if actual != expected {
        return Err(FrameError::TextChecksumMismatch { expected, actual });
    }
    Ok(body)
}

/// Whether `sentence` carries a correct checksum trailer.
pub fn validate_text(sentence: &[u8]) -> bool {
    std::str::from_utf8(sentence)
        .map(|s| parse_text(s).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn appends_uppercase_trailer() {
        let mut command = String::from("$PUBX,40,GLL,0,0,0,0,0,0*");
        append_text_checksum(&mut command).unwrap();
        assert_eq!(command, "$PUBX,40,GLL,0,0,0,0,0,0*5C");
    }

    #[test]
    fn pads_single_digit_checksum() {
        // 'A' ^ 'C' = 0x02
        let mut command = String::from("$AC*");
        append_text_checksum(&mut command).unwrap();
        assert_eq!(command, "$AC*02");
    }

    #[test]
    fn empty_body_checksums_to_zero() {
        let mut command = String::from("$*");
        append_text_checksum(&mut command).unwrap();
        assert_eq!(command, "$*00");
    }

    #[test]
    fn rejects_missing_delimiters() {
        for bad in ["PUBX,00*", "$PUBX,00", "PUBX", "", "$", "*"] {
            let mut command = bad.to_string();
            let err = append_text_checksum(&mut command).unwrap_err();
            assert!(matches!(err, FrameError::MissingDelimiter(_)), "{bad:?}");
            assert_eq!(command, bad);
        }
    }

    #[test]
    fn text_command_matches_append() {
        assert_eq!(text_command("PUBX,00"), "$PUBX,00*33");
    }

    #[test]
    fn parses_received_sentence() {
        let body = parse_text("$GPGLL,5300.97914,N,00259.98174,E,125926,A*28\r\n").unwrap();
        assert_eq!(body, "GPGLL,5300.97914,N,00259.98174,E,125926,A");
        assert!(validate_text(b"$GPGLL,5300.97914,N,00259.98174,E,125926,A*28"));
    }

    #[test]
    fn accepts_lowercase_trailer() {
        assert!(validate_text(b"$PUBX,40,GLL,0,0,0,0,0,0*5c"));
    }

    #[test]
    fn reports_wrong_checksum() {
        let err = parse_text("$PUBX,00*34").unwrap_err();
        assert!(matches!(
            err,
            FrameError::TextChecksumMismatch {
                expected: 0x33,
                actual: 0x34
            }
        ));
        assert!(!validate_text(b"$PUBX,00*34"));
    }

    #[test]
    fn reports_malformed_trailer() {
        assert!(matches!(
            parse_text("$PUBX,00*3").unwrap_err(),
            FrameError::MalformedTrailer(_)
        ));
        assert!(matches!(
            parse_text("$PUBX,00*ZZ").unwrap_err(),
            FrameError::MalformedTrailer(_)
        ));
        assert!(!validate_text(&[b'$', 0xff, b'*', b'0', b'0']));
    }

    proptest! {
        #[test]
        fn trailer_is_two_uppercase_hex_of_body_xor(body in "[ -)+-~]{0,80}") {
            let mut command = format!("${body}*");
            append_text_checksum(&mut command).unwrap();

            let trailer = &command[command.len() - 2..];
            prop_assert!(trailer.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)));
            prop_assert_eq!(u8::from_str_radix(trailer, 16).unwrap(), xor_checksum(body.as_bytes()));
            prop_assert!(validate_text(command.as_bytes()));
        }
    }
}

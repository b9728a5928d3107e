//! Text decoding shared by the verbose and non-verbose string decoders

use crate::types::StringEncoding;

/// Decode a string payload
///
/// A trailing NUL byte is stripped. An empty payload gives an empty string.
/// `Ascii` is the ISO-8859-15 code page; every other coding is UTF-8 with
/// invalid sequences replaced.
pub fn decode_payload(payload: &[u8], encoding: StringEncoding) -> String {
    let payload = match payload.split_last() {
        Some((0, rest)) => rest,
        _ => payload,
    };
    if payload.is_empty() {
        return String::new();
    }

    match encoding {
        StringEncoding::Ascii => payload.iter().map(|&b| iso8859_15(b)).collect(),
        StringEncoding::Utf8 | StringEncoding::Other(_) => {
            String::from_utf8_lossy(payload).into_owned()
        }
    }
}

/// Map one ISO-8859-15 byte to its character
///
/// Identical to Latin-1 except for eight code points.
fn iso8859_15(byte: u8) -> char {
    match byte {
        0xA4 => '\u{20AC}',
        0xA6 => '\u{0160}',
        0xA8 => '\u{0161}',
        0xB4 => '\u{017D}',
        0xB8 => '\u{017E}',
        0xBC => '\u{0152}',
        0xBD => '\u{0153}',
        0xBE => '\u{0178}',
        b => b as char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nul_stripped() {
        assert_eq!(decode_payload(b"hello\0", StringEncoding::Utf8), "hello");
        assert_eq!(decode_payload(b"hello", StringEncoding::Utf8), "hello");
        assert_eq!(decode_payload(b"\0", StringEncoding::Ascii), "");
        assert_eq!(decode_payload(b"", StringEncoding::Ascii), "");
    }

    #[test]
    fn test_iso8859_15() {
        assert_eq!(decode_payload(&[0xA4, b'5'], StringEncoding::Ascii), "€5");
        assert_eq!(decode_payload(&[0xE9], StringEncoding::Ascii), "é");
        assert_eq!(decode_payload(&[0xBE], StringEncoding::Ascii), "Ÿ");
    }

    #[test]
    fn test_utf8_and_unknown_coding() {
        let text = "Grüße".as_bytes();
        assert_eq!(decode_payload(text, StringEncoding::Utf8), "Grüße");
        assert_eq!(decode_payload(text, StringEncoding::Other(7)), "Grüße");
        assert_eq!(decode_payload(&[0xFF, b'a'], StringEncoding::Utf8), "\u{FFFD}a");
    }
}

//! Byte-to-text decoding.

/// Decode UTF-8, silently dropping invalid sequences.
pub fn decode_dropping_invalid(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Decode bytes in the given charset.
///
/// Known single-byte charsets are decoded directly; everything else is read as
/// UTF-8. Bytes that do not decode are dropped.
pub fn decode_with_charset(bytes: &[u8], charset: Option<&str>) -> String {
    let charset = charset.map(|c| c.trim().to_ascii_lowercase());
    match charset.as_deref() {
        Some("iso-8859-1" | "latin1" | "latin-1" | "l1" | "iso8859-1") => {
            bytes.iter().map(|&b| char::from(b)).collect()
        }
        Some("us-ascii" | "ascii") if bytes.is_ascii() => {
            bytes.iter().map(|&b| char::from(b)).collect()
        }
        _ => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => decode_dropping_invalid(bytes),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_utf8_is_dropped() {
        assert_eq!(decode_dropping_invalid(b"ab\xffcd\xc3"), "abcd");
        assert_eq!(decode_dropping_invalid("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn test_latin1() {
        assert_eq!(decode_with_charset(b"caf\xe9", Some("ISO-8859-1")), "café");
    }

    #[test]
    fn test_unknown_charset_falls_back_to_utf8() {
        assert_eq!(decode_with_charset("ü".as_bytes(), Some("x-unknown")), "ü");
        assert_eq!(decode_with_charset(b"ok\xff", None), "ok");
    }
}

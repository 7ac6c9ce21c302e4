//! Percent-escaping for query-string values.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscapeError {
    #[error("truncated escape sequence at byte {0}")]
    Truncated(usize),
    #[error("invalid hex digits in escape sequence at byte {0}")]
    InvalidHex(usize),
    #[error("unescaped value is not valid UTF-8")]
    NotUtf8,
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

const fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~')
}

/// Escape every byte outside the RFC 3986 unreserved set as `%XX`.
pub fn escape_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for &byte in value.as_bytes() {
        if is_unreserved(byte) {
            out.push(char::from(byte));
        } else {
            out.push('%');
            out.push(char::from(HEX[usize::from(byte >> 4)]));
            out.push(char::from(HEX[usize::from(byte & 0x0f)]));
        }
    }
    out
}

/// Reverse [`escape_component`]. Unescaped input passes through unchanged.
///
/// # Errors
///
/// Returns an error for a `%` not followed by two hex digits, or when the
/// decoded bytes are not UTF-8.
pub fn unescape_component(value: &str) -> Result<String, EscapeError> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let (Some(&hi), Some(&lo)) = (bytes.get(i + 1), bytes.get(i + 2)) else {
                return Err(EscapeError::Truncated(i));
            };
            let (Some(hi), Some(lo)) = (hex_value(hi), hex_value(lo)) else {
                return Err(EscapeError::InvalidHex(i));
            };
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| EscapeError::NotUtf8)
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_base64_punctuation() {
        assert_eq!(escape_component("ab+/c=="), "ab%2B%2Fc%3D%3D");
    }

    #[test]
    fn test_escape_keeps_unreserved() {
        assert_eq!(escape_component("A-z_0.9~"), "A-z_0.9~");
    }

    #[test]
    fn test_unescape_accepts_lowercase_hex() {
        assert_eq!(unescape_component("%2b%2F").unwrap(), "+/");
    }

    #[test]
    fn test_unescape_rejects_truncated_sequence() {
        assert_eq!(unescape_component("abc%2"), Err(EscapeError::Truncated(3)));
    }

    #[test]
    fn test_unescape_rejects_bad_hex() {
        assert_eq!(unescape_component("%zz"), Err(EscapeError::InvalidHex(0)));
    }

    #[test]
    fn test_unescape_rejects_invalid_utf8() {
        assert_eq!(unescape_component("%FF"), Err(EscapeError::NotUtf8));
    }

    #[test]
    fn test_multibyte_round_trip() {
        let text = "flowchart → ünïcode";
        assert_eq!(unescape_component(&escape_component(text)).unwrap(), text);
    }
}

//! Command serialization helpers.

use crate::{Error, Result};

/// Writes a quoted string, escaping `"` and `\`.
///
/// Quoted strings cannot carry CR, LF or NUL; those are rejected rather than
/// smuggled onto the wire where they would terminate the command early.
pub fn write_quoted(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if let Some(b) = s.bytes().find(|&b| forbidden_in_quoted(b)) {
        return Err(Error::Config(format!(
            "value contains byte 0x{b:02x}, which cannot be sent in a quoted string"
        )));
    }

    buf.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
    Ok(())
}

/// Writes an astring: a bare atom when possible, a quoted string otherwise.
pub fn write_astring(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if !s.is_empty() && s.bytes().all(is_atom_char) {
        buf.extend_from_slice(s.as_bytes());
        Ok(())
    } else {
        write_quoted(buf, s)
    }
}

/// ASTRING-CHAR from RFC 3501: printable ASCII minus atom-specials, plus `]`.
const fn is_atom_char(b: u8) -> bool {
    b > 0x20 && b < 0x7f && !matches!(b, b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'\\')
}

/// Returns true if the byte can never appear inside a quoted string.
const fn forbidden_in_quoted(b: u8) -> bool {
    matches!(b, b'\r' | b'\n' | 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn quoted(s: &str) -> Result<String> {
        let mut buf = Vec::new();
        write_quoted(&mut buf, s)?;
        Ok(String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_plain_value() {
        assert_eq!(quoted("alice@example.com").unwrap(), "\"alice@example.com\"");
    }

    #[test]
    fn test_empty_value() {
        assert_eq!(quoted("").unwrap(), "\"\"");
    }

    #[test]
    fn test_spaces_kept() {
        assert_eq!(quoted("two words").unwrap(), "\"two words\"");
    }

    #[test]
    fn test_escapes() {
        assert_eq!(quoted(r#"a"b\c"#).unwrap(), r#""a\"b\\c""#);
    }

    #[test]
    fn test_utf8_passthrough() {
        assert_eq!(quoted("pässwörd").unwrap(), "\"pässwörd\"");
    }

    #[test]
    fn test_astring() {
        let mut buf = Vec::new();
        write_astring(&mut buf, "user/alice").unwrap();
        assert_eq!(buf, b"user/alice");

        let mut buf = Vec::new();
        write_astring(&mut buf, "user/alice smith").unwrap();
        assert_eq!(buf, b"\"user/alice smith\"");

        let mut buf = Vec::new();
        write_astring(&mut buf, "").unwrap();
        assert_eq!(buf, b"\"\"");
    }

    #[test]
    fn test_rejects_control() {
        assert!(matches!(quoted("a\nb"), Err(Error::Config(_))));
        assert!(matches!(quoted("a\rb"), Err(Error::Config(_))));
        assert!(matches!(quoted("a\0b"), Err(Error::Config(_))));
    }
}

//! Parser helper functions.

use crate::types::{Capabilities, Quota};

/// Splits raw bytes into trimmed, non-empty text lines.
///
/// Lines that are not printable text (invalid UTF-8, control bytes) are
/// discarded, so binary noise never reaches status classification.
pub fn split_lines(input: &[u8]) -> Vec<String> {
    input
        .split(|&b| b == b'\n')
        .map(|line| String::from_utf8_lossy(line).trim().to_string())
        .filter(|line| is_text_line(line))
        .collect()
}

/// Returns true if the line is non-empty printable text.
fn is_text_line(line: &str) -> bool {
    !line.is_empty()
        && !line
            .chars()
            .any(|c| c == char::REPLACEMENT_CHARACTER || (c.is_control() && c != '\t'))
}

/// Returns true if `line` is a status line for `tag`.
pub fn is_tagged(line: &str, tag: &str) -> bool {
    line.strip_prefix(tag)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
}

/// Splits a status line into its status keyword and trailing text.
///
/// The leading tag (or `*`) is skipped when present.
pub fn status_and_text<'a>(line: &'a str, tag: &str) -> (&'a str, &'a str) {
    let rest = if is_tagged(line, tag) {
        &line[tag.len()..]
    } else if let Some(rest) = line.strip_prefix('*') {
        rest
    } else {
        line
    };

    let rest = rest.trim_start();
    match rest.split_once([' ', '\t']) {
        Some((status, text)) => (status, text.trim()),
        None => (rest, ""),
    }
}

/// Extracts a `[CAPABILITY ...]` response code from a status line.
pub fn capability_code(line: &str) -> Option<Capabilities> {
    const MARKER: &str = "[CAPABILITY";

    let upper = line.to_ascii_uppercase();
    let start = upper.find(MARKER)? + MARKER.len();
    let end = start + upper[start..].find(']')?;
    let tokens = &line[start..end];

    // "[CAPABILITYX ...]" is a different code
    if !tokens.is_empty() && !tokens.starts_with([' ', '\t']) {
        return None;
    }
    Some(Capabilities::from_tokens(tokens))
}

/// Extracts capabilities from an untagged `* CAPABILITY ...` data line.
pub fn untagged_capabilities(lines: &[String]) -> Option<Capabilities> {
    lines.iter().find_map(|line| {
        let rest = line.strip_prefix('*')?.trim_start();
        let (keyword, tokens) = rest.split_once([' ', '\t']).unwrap_or((rest, ""));
        keyword
            .eq_ignore_ascii_case("CAPABILITY")
            .then(|| Capabilities::from_tokens(tokens))
    })
}

/// Extracts `(used, limit)` from an untagged `* QUOTA root (STORAGE used limit)`.
pub fn parse_quota(lines: &[String]) -> Option<Quota> {
    lines.iter().find_map(|line| {
        let rest = line.strip_prefix('*')?.trim_start();
        let (keyword, data) = rest.split_once([' ', '\t'])?;
        if !keyword.eq_ignore_ascii_case("QUOTA") {
            return None;
        }

        let mut tokens = data
            .split(|c: char| c.is_ascii_whitespace() || c == '(' || c == ')')
            .filter(|t| !t.is_empty());
        tokens.find(|t| t.eq_ignore_ascii_case("STORAGE"))?;
        let used = tokens.next()?.parse().ok()?;
        let limit = tokens.next()?.parse().ok()?;
        Some(Quota::new(used, limit))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines() {
        let lines = split_lines(b"* OK ready\r\n\r\n   \r\na1 OK done\r\n");
        assert_eq!(lines, vec!["* OK ready", "a1 OK done"]);
    }

    #[test]
    fn test_split_lines_drops_binary() {
        let lines = split_lines(b"\x00\x01\xff\xfe\r\n\x1b[2J\r\n");
        assert!(lines.is_empty());
    }

    #[test]
    fn test_is_tagged() {
        assert!(is_tagged("a0000000001 OK done", "a0000000001"));
        assert!(!is_tagged("a0000010 OK done", "a0000000001"));
        assert!(!is_tagged("* OK done", "a0000000001"));
    }

    #[test]
    fn test_status_and_text() {
        assert_eq!(
            status_and_text("a0000000001 NO denied", "a0000000001"),
            ("NO", "denied")
        );
        assert_eq!(status_and_text("* BAD oops", "a0000000001"), ("BAD", "oops"));
        assert_eq!(status_and_text("NO fail", "a0000000001"), ("NO", "fail"));
        assert_eq!(status_and_text("a0000000001 OK", "a0000000001"), ("OK", ""));
    }

    #[test]
    fn test_capability_code() {
        let caps =
            capability_code("a0000000001 OK [CAPABILITY IMAP4rev1 STARTTLS AUTH=PLAIN] done").unwrap();
        assert_eq!(caps.tokens(), vec!["IMAP4rev1", "STARTTLS", "AUTH=PLAIN"]);
    }

    #[test]
    fn test_capability_code_absent() {
        assert!(capability_code("a0000000001 OK Logged in").is_none());
        assert!(capability_code("a0000000001 OK [CAPABILITYX FOO] x").is_none());
        assert!(capability_code("a0000000001 OK [CAPABILITY IMAP4rev1").is_none());
    }

    #[test]
    fn test_untagged_capabilities() {
        let lines = vec![
            "* CAPABILITY IMAP4rev1 QUOTA".to_string(),
            "a0000000002 OK done".to_string(),
        ];
        let caps = untagged_capabilities(&lines).unwrap();
        assert_eq!(caps.tokens(), vec!["IMAP4rev1", "QUOTA"]);
    }

    #[test]
    fn test_parse_quota() {
        let lines = vec!["* QUOTA user/alice (STORAGE 1234 5000)".to_string()];
        assert_eq!(parse_quota(&lines), Some(Quota::new(1234, 5000)));
    }

    #[test]
    fn test_parse_quota_multiple_resources() {
        let lines = vec!["* QUOTA \"\" (MESSAGE 10 100 STORAGE 512 1024)".to_string()];
        assert_eq!(parse_quota(&lines), Some(Quota::new(512, 1024)));
    }

    #[test]
    fn test_parse_quota_missing_storage() {
        let lines = vec!["* QUOTA user/alice (MESSAGE 10 100)".to_string()];
        assert_eq!(parse_quota(&lines), None);
        let lines = vec!["* QUOTA user/alice (STORAGE 12)".to_string()];
        assert_eq!(parse_quota(&lines), None);
        let lines = vec!["* QUOTAROOT INBOX user/alice".to_string()];
        assert_eq!(parse_quota(&lines), None);
    }
}

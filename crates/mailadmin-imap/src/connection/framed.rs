//! Framed I/O for IMAP protocol.
//!
//! Replies arrive in arbitrary chunks. This module accumulates received bytes
//! until the reply the caller is waiting for is complete, honoring literals
//! (`{n}\r\n<n bytes>`) so their contents are never mistaken for status lines.

#![allow(clippy::missing_errors_doc)]

use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::trace;

use super::stream::Transport;
use crate::parser::response::is_tagged;
use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum reply size to prevent memory exhaustion.
const MAX_REPLY_LENGTH: usize = 1024 * 1024; // 1 MB

/// Longest wait a deadline is computed for; larger timeouts saturate here.
const MAX_WAIT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// What ends the reply being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator<'a> {
    /// The first complete line (server greeting).
    Greeting,
    /// The status line for a tag.
    Tagged(&'a str),
    /// A `+` continuation request, or the status line for a tag.
    Continuation(&'a str),
}

/// Framed connection over a [`Transport`].
pub struct FramedStream {
    transport: Box<dyn Transport>,
    buffer: BytesMut,
}

impl FramedStream {
    /// Creates a new framed stream.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Writes a command to the stream.
    ///
    /// Bytes left over from earlier replies are discarded first so every
    /// reply is read from a clean buffer.
    pub fn write_command(&mut self, data: &[u8]) -> Result<()> {
        if !self.buffer.is_empty() {
            trace!(len = self.buffer.len(), "discarding stale bytes");
            self.buffer.clear();
        }
        self.transport.send(data)
    }

    /// Reads until `until` is satisfied or `timeout` elapses.
    ///
    /// Returns the bytes of the complete reply; anything received after it
    /// stays buffered.
    pub fn read_reply(&mut self, until: Terminator<'_>, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = deadline_after(timeout);

        loop {
            if let Some(end) = find_reply_end(&self.buffer, until) {
                let reply = self.buffer.split_to(end);
                trace!(len = reply.len(), ?until, "reply complete");
                return Ok(reply.to_vec());
            }

            if self.buffer.len() > MAX_REPLY_LENGTH {
                return Err(Error::Response(format!(
                    "reply exceeds {MAX_REPLY_LENGTH} bytes"
                )));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout(timeout));
            }

            let chunk = self.transport.receive(remaining).map_err(|e| match e {
                Error::Timeout(_) => Error::Timeout(timeout),
                other => other,
            })?;
            self.buffer.extend_from_slice(&chunk);
        }
    }

    /// Upgrades the underlying transport to TLS.
    ///
    /// Fails if the server sent anything after the STARTTLS reply: those
    /// bytes arrived in plaintext and must not be read as part of the TLS
    /// session.
    pub fn start_tls(mut self, server_name: &str, timeout: Duration) -> Result<Self> {
        if !self.buffer.is_empty() {
            self.transport.close();
            return Err(Error::Encryption(
                "plaintext data received before TLS handshake".to_string(),
            ));
        }
        let transport = self.transport.start_tls(server_name, timeout)?;
        Ok(Self::new(transport))
    }

    /// Returns true if the transport is TLS-encrypted.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.transport.is_encrypted()
    }

    /// Closes the transport and drops buffered bytes.
    pub fn close(&mut self) {
        self.buffer.clear();
        self.transport.close();
    }

    /// Drops the connection without a graceful shutdown.
    pub fn abort(&mut self) {
        self.buffer.clear();
        self.transport.abort();
    }
}

/// Instant `timeout` from now, saturating for timeouts past the clock's range.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(MAX_WAIT))
        .unwrap_or(now)
}

/// Returns the offset just past the line that completes the reply.
fn find_reply_end(buf: &[u8], until: Terminator<'_>) -> Option<usize> {
    let mut pos = 0;

    while let Some(newline) = buf[pos..].iter().position(|&b| b == b'\n') {
        let end = pos + newline + 1;
        let line = &buf[pos..end];

        if let Some(literal_len) = parse_literal_length(line) {
            // The line continues after the literal; its tail cannot end a reply
            // until the literal bytes are in.
            pos = end.checked_add(literal_len)?;
            if pos > buf.len() {
                return None;
            }
            continue;
        }

        if ends_reply(line, until) {
            return Some(end);
        }
        pos = end;
    }

    None
}

fn ends_reply(line: &[u8], until: Terminator<'_>) -> bool {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return false;
    }

    match until {
        Terminator::Greeting => true,
        Terminator::Tagged(tag) => is_tagged(text, tag) || is_untagged_bad(text),
        Terminator::Continuation(tag) => {
            text.starts_with('+') || is_tagged(text, tag) || is_untagged_bad(text)
        }
    }
}

/// Some servers reject unparsable commands with an untagged BAD only.
fn is_untagged_bad(line: &str) -> bool {
    line.strip_prefix('*')
        .map(str::trim_start)
        .and_then(|rest| rest.get(..3))
        .is_some_and(|keyword| keyword.eq_ignore_ascii_case("BAD"))
}

/// Parses a literal length from the end of a line.
///
/// Matches patterns like `{123}\r\n` or `{123+}\r\n` (non-synchronizing).
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\n")?;
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = line.strip_suffix(b"}")?;
    let line = line.strip_suffix(b"+").unwrap_or(line);

    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Chunks(VecDeque<Vec<u8>>);

    impl Transport for Chunks {
        fn send(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>> {
            self.0.pop_front().ok_or(Error::Timeout(timeout))
        }

        fn start_tls(
            self: Box<Self>,
            _server_name: &str,
            _timeout: Duration,
        ) -> Result<Box<dyn Transport>> {
            Ok(self)
        }

        fn is_encrypted(&self) -> bool {
            false
        }

        fn close(&mut self) {}
    }

    fn framed(chunks: &[&str]) -> FramedStream {
        FramedStream::new(Box::new(Chunks(
            chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
        )))
    }

    #[test]
    fn test_parse_literal_length() {
        assert_eq!(parse_literal_length(b"* QUOTA {5}\r\n"), Some(5));
        assert_eq!(parse_literal_length(b"* QUOTA {12+}\r\n"), Some(12));
        assert_eq!(parse_literal_length(b"* QUOTA {}\r\n"), None);
        assert_eq!(parse_literal_length(b"* OK done\r\n"), None);
        assert_eq!(parse_literal_length(b"* QUOTA {5}"), None);
    }

    #[test]
    fn test_reply_split_across_chunks() {
        let mut stream = framed(&["* QUOTA user/alice (STOR", "AGE 1 2)\r\na0000", "01 OK done\r\n"]);
        let reply = stream
            .read_reply(Terminator::Tagged("a0000000001"), Duration::from_secs(1))
            .unwrap();
        assert_eq!(
            reply,
            b"* QUOTA user/alice (STORAGE 1 2)\r\na000001 OK done\r\n"
        );
    }

    #[test]
    fn test_literal_hides_status_line() {
        let mut stream = framed(&[
            "* QUOTA {17}\r\na000001 OK fake\r\n (STORAGE 1 2)\r\n",
            "a0000000001 OK real\r\n",
        ]);
        let reply = stream
            .read_reply(Terminator::Tagged("a0000000001"), Duration::from_secs(1))
            .unwrap();
        assert!(reply.ends_with(b"a0000000001 OK real\r\n"));
    }

    #[test]
    fn test_greeting_is_first_line() {
        let mut stream = framed(&["* OK ready\r\n"]);
        let reply = stream
            .read_reply(Terminator::Greeting, Duration::from_secs(1))
            .unwrap();
        assert_eq!(reply, b"* OK ready\r\n");
    }

    #[test]
    fn test_continuation_or_status() {
        let mut stream = framed(&["+ PDE4OTY+\r\n"]);
        let reply = stream
            .read_reply(Terminator::Continuation("a0000000001"), Duration::from_secs(1))
            .unwrap();
        assert_eq!(reply, b"+ PDE4OTY+\r\n");

        let mut stream = framed(&["a0000000001 NO disabled\r\n"]);
        let reply = stream
            .read_reply(Terminator::Continuation("a0000000001"), Duration::from_secs(1))
            .unwrap();
        assert_eq!(reply, b"a0000000001 NO disabled\r\n");
    }

    #[test]
    fn test_untagged_bad_ends_reply() {
        let mut stream = framed(&["* BAD command line too long\r\n"]);
        let reply = stream
            .read_reply(Terminator::Tagged("a0000000001"), Duration::from_secs(1))
            .unwrap();
        assert_eq!(reply, b"* BAD command line too long\r\n");
    }

    #[test]
    fn test_incomplete_reply_times_out() {
        let mut stream = framed(&["* CAPABILITY IMAP4rev1\r\n"]);
        let err = stream
            .read_reply(Terminator::Tagged("a0000000001"), Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[test]
    fn test_unbounded_timeout() {
        assert!(deadline_after(Duration::MAX) > Instant::now());

        let mut stream = framed(&["* OK ready\r\n"]);
        let greeting = stream
            .read_reply(Terminator::Greeting, Duration::MAX)
            .unwrap();
        assert_eq!(greeting, b"* OK ready\r\n");
    }

    #[test]
    fn test_start_tls_rejects_buffered_plaintext() {
        let mut stream = framed(&["a0000000001 OK begin\r\n* OK injected\r\n"]);
        stream
            .read_reply(Terminator::Tagged("a0000000001"), Duration::from_secs(1))
            .unwrap();
        let err = stream
            .start_tls("imap.example.com", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Encryption(_)));
    }
}

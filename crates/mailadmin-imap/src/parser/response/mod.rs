//! IMAP response classification.
//!
//! Each call takes the raw bytes received for one command and returns a
//! fresh value; nothing is cached between calls.

mod helpers;

use tracing::trace;

use crate::types::{Capabilities, Quota, Status};
use crate::{Error, Result};

pub use helpers::is_tagged;
use helpers::{
    capability_code, parse_quota, split_lines, status_and_text, untagged_capabilities,
};

/// A classified server reply to one tagged command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: Status,
    status_line: String,
    text: String,
    data: Vec<String>,
}

impl Response {
    /// Returns the status classification.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Returns the raw status line.
    #[must_use]
    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// Returns the data lines (untagged lines received before the status line).
    #[must_use]
    pub fn data(&self) -> &[String] {
        &self.data
    }

    /// Returns the human-readable text following the status keyword.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns capabilities carried by this reply, if any.
    ///
    /// A `[CAPABILITY ...]` code on the status line wins over an untagged
    /// `* CAPABILITY` data line.
    #[must_use]
    pub fn capabilities(&self) -> Option<Capabilities> {
        capability_code(&self.status_line).or_else(|| untagged_capabilities(&self.data))
    }

    /// Returns the storage quota carried by this reply, if any.
    #[must_use]
    pub fn quota(&self) -> Option<Quota> {
        parse_quota(&self.data)
    }
}

/// The server's unsolicited greeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// Greeting text after `* OK`.
    pub text: String,
    /// Capabilities advertised in a `[CAPABILITY ...]` code, if any.
    pub capabilities: Option<Capabilities>,
}

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Classifies the reply to the command sent with `tag`.
    ///
    /// # Errors
    ///
    /// - [`Error::Empty`] if no text line was received
    /// - [`Error::Undefined`] if no status line can be found or its keyword is unknown
    /// - [`Error::No`] / [`Error::Bad`] carrying the server's explanation
    pub fn classify(input: &[u8], tag: &str) -> Result<Response> {
        let lines = split_lines(input);
        if lines.is_empty() {
            return Err(Error::Empty);
        }

        let index = match lines.iter().position(|line| is_tagged(line, tag)) {
            Some(index) => index,
            // Some servers drop the tag on single-line error replies
            None if lines.len() == 1 => 0,
            None => {
                return Err(Error::Undefined(format!(
                    "no status line for {tag} in {} lines",
                    lines.len()
                )));
            }
        };

        let status_line = lines[index].clone();
        let (keyword, text) = status_and_text(&status_line, tag);
        let status = Status::parse(keyword);
        trace!(tag, ?status, "classified reply");

        match status {
            Status::Ok => {
                let data = if lines.len() == 1 {
                    lines
                } else {
                    let mut data = lines;
                    data.remove(index);
                    data
                };
                Ok(Response {
                    status,
                    text: text.to_string(),
                    status_line,
                    data,
                })
            }
            Status::No => Err(Error::No(text.to_string())),
            Status::Bad => Err(Error::Bad(text.to_string())),
            Status::Undefined => Err(Error::Undefined(status_line)),
        }
    }

    /// Classifies the server greeting.
    ///
    /// # Errors
    ///
    /// - [`Error::Empty`] if nothing readable arrived
    /// - [`Error::Bye`] if the server refused the connection
    /// - [`Error::Undefined`] for anything other than an untagged OK
    pub fn greeting(input: &[u8]) -> Result<Greeting> {
        let lines = split_lines(input);
        let line = lines.first().ok_or(Error::Empty)?;

        if !line.starts_with('*') {
            return Err(Error::Undefined(format!("greeting is not untagged: {line}")));
        }

        let (keyword, text) = status_and_text(line, "*");
        if keyword.eq_ignore_ascii_case("OK") {
            Ok(Greeting {
                text: text.to_string(),
                capabilities: capability_code(line),
            })
        } else if keyword.eq_ignore_ascii_case("BYE") {
            Err(Error::Bye(text.to_string()))
        } else {
            Err(Error::Undefined(line.clone()))
        }
    }

    /// Extracts the payload of a `+` continuation request.
    ///
    /// # Errors
    ///
    /// - [`Error::Empty`] if nothing readable arrived
    /// - the tagged status as an error if the server ended the command instead
    /// - [`Error::Bad`] for any other reply shape
    pub fn continuation(input: &[u8], tag: &str) -> Result<String> {
        let lines = split_lines(input);
        if lines.is_empty() {
            return Err(Error::Empty);
        }

        if let Some(line) = lines.iter().find(|line| line.starts_with('+')) {
            return Ok(line[1..].trim().to_string());
        }

        if lines.iter().any(|line| is_tagged(line, tag)) {
            let response = Self::classify(input, tag)?;
            return Err(Error::Bad(format!(
                "expected continuation request, command completed: {}",
                response.status_line()
            )));
        }

        Err(Error::Bad(format!(
            "expected continuation request, got: {}",
            lines[0]
        )))
    }
}

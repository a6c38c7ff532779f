//! Authentication negotiation.
//!
//! Drives one login exchange for the configured mechanism. Every step that
//! expects a `+` continuation aborts the exchange on any other reply.

use std::time::Duration;

use tracing::debug;

use crate::command::{Command, TagGenerator};
use crate::connection::{AuthMechanism, Credentials, FramedStream, Terminator};
use crate::parser::{Response, ResponseParser};
use crate::{Result, sasl};

/// Runs the login exchange and returns the server's final reply.
///
/// # Errors
///
/// Returns the classified error of the first reply that does not match the
/// expected shape: [`crate::Error::Bad`] for a missing continuation,
/// [`crate::Error::Response`] for a malformed CRAM-MD5 challenge, the server's
/// NO/BAD for a refused login, or any transport error.
pub fn authenticate(
    stream: &mut FramedStream,
    tags: &TagGenerator,
    mechanism: AuthMechanism,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<Response> {
    let mut negotiator = Negotiator {
        stream,
        tag: tags.next(),
        timeout,
    };
    debug!(tag = %negotiator.tag, ?mechanism, username = %credentials.username, "authenticating");

    match mechanism {
        AuthMechanism::Clear => negotiator.clear(credentials),
        AuthMechanism::Login => negotiator.login(credentials),
        AuthMechanism::Plain => negotiator.plain(credentials),
        AuthMechanism::CramMd5 => negotiator.cram_md5(credentials),
    }
}

struct Negotiator<'a> {
    stream: &'a mut FramedStream,
    tag: String,
    timeout: Duration,
}

impl Negotiator<'_> {
    /// `LOGIN "user" "password"`: one round trip.
    fn clear(&mut self, credentials: &Credentials) -> Result<Response> {
        let command = Command::Login {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        };
        self.stream.write_command(&command.serialize(&self.tag)?)?;
        self.finish()
    }

    /// `AUTHENTICATE LOGIN`: username and password each answer a prompt.
    fn login(&mut self, credentials: &Credentials) -> Result<Response> {
        self.open(AuthMechanism::Login)?;
        self.respond(sasl::login_step(&credentials.username).as_bytes())?;
        self.continuation()?;
        self.respond(sasl::login_step(&credentials.password).as_bytes())?;
        self.finish()
    }

    /// `AUTHENTICATE PLAIN`: the blob answers the single prompt.
    fn plain(&mut self, credentials: &Credentials) -> Result<Response> {
        let blob = sasl::plain_blob(&credentials.username, &credentials.password)?;
        self.open(AuthMechanism::Plain)?;
        self.respond(&blob)?;
        self.finish()
    }

    /// `AUTHENTICATE CRAM-MD5`: the prompt carries the challenge.
    fn cram_md5(&mut self, credentials: &Credentials) -> Result<Response> {
        let challenge = self.open(AuthMechanism::CramMd5)?;
        let response = sasl::cram_md5_response(&challenge, &credentials.password)?;
        self.respond(response.as_bytes())?;
        self.finish()
    }

    /// Sends `AUTHENTICATE <mechanism>` and returns the first prompt.
    fn open(&mut self, mechanism: AuthMechanism) -> Result<String> {
        let command = Command::Authenticate { mechanism };
        self.stream.write_command(&command.serialize(&self.tag)?)?;
        self.continuation()
    }

    fn continuation(&mut self) -> Result<String> {
        let reply = self
            .stream
            .read_reply(Terminator::Continuation(&self.tag), self.timeout)?;
        ResponseParser::continuation(&reply, &self.tag)
    }

    fn respond(&mut self, payload: &[u8]) -> Result<()> {
        let mut line = Vec::with_capacity(payload.len() + 2);
        line.extend_from_slice(payload);
        line.extend_from_slice(b"\r\n");
        self.stream.write_command(&line)
    }

    fn finish(&mut self) -> Result<Response> {
        let reply = self
            .stream
            .read_reply(Terminator::Tagged(&self.tag), self.timeout)?;
        ResponseParser::classify(&reply, &self.tag)
    }
}

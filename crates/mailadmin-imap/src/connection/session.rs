//! IMAP session: the administrative command façade.
//!
//! This module provides `Session`, which owns one connection at a time and
//! sequences connect, greeting, optional STARTTLS, authentication and the
//! commands available once logged in.
//!
//! ## Design
//!
//! The session is a small state machine. Between calls it is always either
//! `Disconnected` or `Ready`; the intermediate states are visible in logs
//! while `login` and `logout` run. Transport-level failures (timeouts, socket
//! and TLS errors) drop the connection. Command-level failures such as a NO
//! reply leave a logged-in session usable.
//!
//! ## Example
//!
//! ```no_run
//! use mailadmin_imap::{AuthMechanism, Config, Credentials, Security, Session};
//!
//! let config = Config::builder("imap.example.com")
//!     .security(Security::StartTls)
//!     .auth_mechanism(AuthMechanism::Plain)
//!     .credentials(Credentials::new("admin", "secret"))
//!     .build();
//!
//! let mut session = Session::new(config);
//! session.login()?;
//! let quota = session.quota("alice")?;
//! println!("{} of {} KiB used", quota.used, quota.limit);
//! session.logout()?;
//! # Ok::<(), mailadmin_imap::Error>(())
//! ```

use std::fmt;

use tracing::{debug, info, warn};

use super::config::{Config, Security};
use super::framed::{FramedStream, Terminator};
use super::stream::{Connector, TcpConnector};
use crate::auth;
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser};
use crate::types::{Capabilities, Quota};
use crate::{Error, Result};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection.
    Disconnected,
    /// Opening the TCP connection.
    Connecting,
    /// Negotiating STARTTLS.
    Encrypting,
    /// Waiting for the server greeting.
    AwaitingGreeting,
    /// Running the login exchange.
    Authenticating,
    /// Logged in; commands may be issued.
    Ready,
    /// LOGOUT sent.
    LoggingOut,
}

/// IMAP administrative session.
pub struct Session {
    config: Config,
    connector: Box<dyn Connector>,
    stream: Option<FramedStream>,
    tags: TagGenerator,
    capabilities: Capabilities,
    state: SessionState,
}

impl Session {
    /// Creates a disconnected session that connects over TCP.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_connector(config, TcpConnector)
    }

    /// Creates a disconnected session using a custom connector.
    #[must_use]
    pub fn with_connector(config: Config, connector: impl Connector + 'static) -> Self {
        Self {
            config,
            connector: Box::new(connector),
            stream: None,
            tags: TagGenerator::default(),
            capabilities: Capabilities::new(),
            state: SessionState::Disconnected,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true if logged in.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the cached capabilities without any I/O.
    ///
    /// Empty until the first login populates them.
    #[must_use]
    pub const fn cached_capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Returns true if the current connection is TLS-encrypted.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.stream.as_ref().is_some_and(FramedStream::is_encrypted)
    }

    /// Connects, upgrades to TLS when configured, and authenticates.
    ///
    /// Does nothing if already logged in.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; the session is left
    /// `Disconnected`.
    pub fn login(&mut self) -> Result<()> {
        if self.state == SessionState::Ready {
            debug!("already logged in");
            return Ok(());
        }

        let result = self.establish();
        match &result {
            Ok(()) => info!(
                host = %self.config.host,
                username = %self.config.credentials.username,
                capabilities = self.capabilities.len(),
                "logged in"
            ),
            Err(e) => {
                warn!(host = %self.config.host, kind = %e.kind(), error = %e, "login failed");
                self.drop_connection(e);
            }
        }
        result
    }

    /// Sends LOGOUT and closes the connection.
    ///
    /// Cleanup happens even when the server does not acknowledge; the
    /// session always ends `Disconnected`.
    ///
    /// # Errors
    ///
    /// Returns the LOGOUT failure, reported after cleanup.
    pub fn logout(&mut self) -> Result<()> {
        if matches!(
            self.state,
            SessionState::Disconnected | SessionState::LoggingOut
        ) {
            return Ok(());
        }

        self.transition(SessionState::LoggingOut);
        let result = self.execute(&Command::Logout).map(|_| ());
        match &result {
            Ok(()) => self.disconnect(),
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "logout not acknowledged");
                self.drop_connection(e);
            }
        }
        result
    }

    /// Returns the server capabilities.
    ///
    /// The cached set is returned unless it is empty or `force_reload` is set,
    /// in which case a CAPABILITY command refreshes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if not logged in, or the command's
    /// failure.
    pub fn capabilities(&mut self, force_reload: bool) -> Result<&Capabilities> {
        self.require_ready(Command::Capability.name())?;

        if force_reload || self.capabilities.is_empty() {
            let capabilities = self.guard(Self::fetch_capabilities)?;
            self.capabilities = capabilities;
        }
        Ok(&self.capabilities)
    }

    /// Returns the storage quota of `user`.
    ///
    /// The quota root is `user<separator><user>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if not logged in, [`Error::Response`] if
    /// the reply has no STORAGE resource, or the command's failure.
    pub fn quota(&mut self, user: &str) -> Result<Quota> {
        let command = Command::GetQuota {
            root: self.config.quota_root(user),
        };
        self.require_ready(command.name())?;

        let response = self.guard(|session| session.execute(&command))?;
        let quota = response.quota().ok_or_else(|| {
            Error::Response(format!("no STORAGE quota in reply: {}", response.status_line()))
        })?;
        debug!(user, used = quota.used, limit = quota.limit, "quota");
        Ok(quota)
    }

    fn establish(&mut self) -> Result<()> {
        self.capabilities.clear();
        self.tags.reset();

        self.transition(SessionState::Connecting);
        let transport = self.connector.connect(&self.config)?;
        self.stream = Some(FramedStream::new(transport));

        self.transition(SessionState::AwaitingGreeting);
        let timeout = self.config.io_timeout;
        let greeting = self
            .stream_mut()?
            .read_reply(Terminator::Greeting, timeout)?;
        let greeting = ResponseParser::greeting(&greeting)?;
        debug!(text = %greeting.text, "greeting");
        if let Some(capabilities) = greeting.capabilities {
            self.capabilities = capabilities;
        }

        if self.config.security == Security::StartTls {
            self.start_tls()?;
        }

        self.transition(SessionState::Authenticating);
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        let response = auth::authenticate(
            stream,
            &self.tags,
            self.config.auth_mechanism,
            &self.config.credentials,
            self.config.io_timeout,
        )?;

        self.capabilities = match response.capabilities() {
            Some(capabilities) => capabilities,
            None => self.fetch_capabilities()?,
        };
        self.transition(SessionState::Ready);
        Ok(())
    }

    fn start_tls(&mut self) -> Result<()> {
        if self.capabilities.is_empty() {
            self.capabilities = self.fetch_capabilities()?;
        }
        if !self.capabilities.supports_starttls() {
            return Err(Error::Config(format!(
                "{} does not advertise STARTTLS",
                self.config.host
            )));
        }

        self.transition(SessionState::Encrypting);
        self.execute(&Command::StartTls)?;

        let stream = self.stream.take().ok_or_else(not_connected)?;
        self.stream = Some(stream.start_tls(self.config.verify_name(), self.config.connect_timeout)?);
        // Pre-TLS capabilities are untrusted
        self.capabilities.clear();
        debug!(server_name = self.config.verify_name(), "STARTTLS complete");
        Ok(())
    }

    fn fetch_capabilities(&mut self) -> Result<Capabilities> {
        let response = self.execute(&Command::Capability)?;
        response.capabilities().ok_or_else(|| {
            Error::Response(format!(
                "CAPABILITY reply has no capability list: {}",
                response.status_line()
            ))
        })
    }

    /// Sends one tagged command and classifies its reply.
    fn execute(&mut self, command: &Command) -> Result<Response> {
        let tag = self.tags.next();
        let bytes = command.serialize(&tag)?;
        let timeout = self.config.io_timeout;
        let stream = self.stream_mut()?;

        debug!(%tag, ?command, "sending command");
        stream.write_command(&bytes)?;
        let reply = stream.read_reply(Terminator::Tagged(&tag), timeout)?;
        ResponseParser::classify(&reply, &tag)
    }

    /// Runs `f`, dropping the connection if it fails fatally.
    fn guard<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = f(self);
        if let Err(e) = &result
            && e.is_fatal()
        {
            warn!(kind = %e.kind(), error = %e, "connection lost");
            self.drop_connection(e);
        }
        result
    }

    fn require_ready(&self, operation: &str) -> Result<()> {
        if self.state == SessionState::Ready {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "{operation} requires a logged-in session (state: {:?})",
                self.state
            )))
        }
    }

    fn stream_mut(&mut self) -> Result<&mut FramedStream> {
        self.stream.as_mut().ok_or_else(not_connected)
    }

    fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
        self.tags.reset();
        self.capabilities.clear();
        self.transition(SessionState::Disconnected);
    }

    /// Disconnects after `error`; a timed-out connection is aborted rather
    /// than shut down.
    fn drop_connection(&mut self, error: &Error) {
        if matches!(error, Error::Timeout(_))
            && let Some(mut stream) = self.stream.take()
        {
            stream.abort();
        }
        self.disconnect();
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "session state");
            self.state = next;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

fn not_connected() -> Error {
    Error::InvalidState("no connection".to_string())
}

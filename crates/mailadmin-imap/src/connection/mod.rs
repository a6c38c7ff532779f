//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, authentication mechanism)
//! - Plaintext and TLS transports behind one trait
//! - Framed reply reading bounded by a deadline
//! - The session state machine and its administrative commands

mod config;
mod framed;
mod session;
mod stream;

pub use config::{
    AuthMechanism, Config, ConfigBuilder, Credentials, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_IO_TIMEOUT, IpPreference, Security,
};
pub use framed::{FramedStream, Terminator};
pub use session::{Session, SessionState};
pub use stream::{
    Connector, PlainTransport, TcpConnector, TlsTransport, Transport, create_tls_config,
};

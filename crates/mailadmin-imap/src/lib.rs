//! # mailadmin-imap
//!
//! A small, blocking IMAP client engine for mail administration: log in with
//! one of four mechanisms, read server capabilities, query storage quotas and
//! log out.
//!
//! ## Features
//!
//! - **Plain, STARTTLS and implicit TLS**: TLS via rustls with the webpki roots
//! - **Four login mechanisms**: `LOGIN`, `AUTHENTICATE LOGIN`, `PLAIN` and `CRAM-MD5`
//! - **Closed error taxonomy**: every failure maps onto an [`ErrorKind`]
//! - **Bounded waits**: connect, handshake and every reply have a timeout
//! - **Sans-I/O parser**: reply classification separated from network I/O
//!
//! ## Quick Start
//!
//! ```no_run
//! use mailadmin_imap::{Config, Credentials, ErrorKind, Security, Session};
//!
//! let config = Config::builder("imap.example.com")
//!     .security(Security::Implicit)
//!     .credentials(Credentials::new("admin@example.com", "password"))
//!     .build();
//!
//! let mut session = Session::new(config);
//! let result = session.login();
//! if let Err(e) = &result {
//!     eprintln!("{}: {e}", ErrorKind::of(&result));
//! }
//!
//! for capability in session.capabilities(false)? {
//!     println!("{capability}");
//! }
//!
//! let quota = session.quota("alice")?;
//! println!("{} / {}", quota.used, quota.limit);
//!
//! session.logout()?;
//! # Ok::<(), mailadmin_imap::Error>(())
//! ```
//!
//! ## Session States
//!
//! ```text
//! Disconnected ─ login() ─→ Connecting ─→ (Encrypting) ─→ AwaitingGreeting
//!       ▲                                                        │
//!       │                                                        ▼
//!   LoggingOut ←─ logout() ─ Ready ←──────────────────── Authenticating
//! ```
//!
//! ## Modules
//!
//! - [`command`]: IMAP command builders and tags
//! - [`connection`]: Transports, configuration and the session
//! - [`parser`]: Sans-I/O response classifier
//! - [`sasl`]: SASL payloads
//! - [`types`]: Capabilities, status and quota types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod auth;
pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod sasl;
pub mod types;

pub use command::{Command, TagGenerator};
pub use connection::{
    AuthMechanism, Config, ConfigBuilder, Connector, Credentials, IpPreference, Security,
    Session, SessionState, TcpConnector, Transport,
};
pub use error::{Error, ErrorKind, Result};
pub use parser::{Greeting, Response, ResponseParser};
pub use types::{Capabilities, Capability, Quota, Status};

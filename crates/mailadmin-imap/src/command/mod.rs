//! IMAP command builder.
//!
//! This module provides the administrative command subset and its wire
//! serialization.

mod serialize;
mod tag_generator;

pub use tag_generator::TagGenerator;

use serialize::{write_astring, write_quoted};

use crate::Result;
use crate::connection::AuthMechanism;

/// IMAP command.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    // Any State Commands
    /// CAPABILITY command.
    Capability,
    /// LOGOUT command.
    Logout,

    // Not Authenticated State Commands
    /// STARTTLS command.
    StartTls,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// AUTHENTICATE command, opening a SASL exchange.
    Authenticate {
        /// Authentication mechanism.
        mechanism: AuthMechanism,
    },

    // Authenticated State Commands
    /// GETQUOTA command (RFC 2087).
    GetQuota {
        /// Quota root, e.g. `user/alice`.
        root: String,
    },
}

impl Command {
    /// Serializes the command to bytes with the given tag.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if a LOGIN credential or quota root
    /// cannot be expressed as a quoted string (CR, LF or NUL).
    pub fn serialize(&self, tag: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_quoted(&mut buf, username)?;
                buf.push(b' ');
                write_quoted(&mut buf, password)?;
            }
            Self::Authenticate { mechanism } => {
                buf.extend_from_slice(b"AUTHENTICATE ");
                buf.extend_from_slice(mechanism.sasl_name().as_bytes());
            }
            Self::GetQuota { root } => {
                buf.extend_from_slice(b"GETQUOTA ");
                write_astring(&mut buf, root)?;
            }
        }

        buf.extend_from_slice(b"\r\n");
        Ok(buf)
    }

    /// Returns the command verb.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Logout => "LOGOUT",
            Self::StartTls => "STARTTLS",
            Self::Login { .. } => "LOGIN",
            Self::Authenticate { .. } => "AUTHENTICATE",
            Self::GetQuota { .. } => "GETQUOTA",
        }
    }
}

// Manual Debug implementation so passwords never reach logs
impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Authenticate { mechanism } => f
                .debug_struct("Authenticate")
                .field("mechanism", mechanism)
                .finish(),
            Self::GetQuota { root } => f.debug_struct("GetQuota").field("root", root).finish(),
            other => f.write_str(other.name()),
        }
    }
}

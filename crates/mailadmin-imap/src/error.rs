//! Error types for the IMAP engine.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer accepted fewer bytes than were written.
    #[error("Short write: {written} of {expected} bytes accepted")]
    ShortWrite {
        /// Bytes accepted by the socket.
        written: usize,
        /// Bytes the command required.
        expected: usize,
    },

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// TLS failure reported through the socket layer (handshake I/O, alerts).
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Server returned NO response.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server returned BAD response, or a reply of the wrong shape.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE instead of a greeting.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// A status line was found but its status keyword is not OK/NO/BAD.
    #[error("Undefined response: {0}")]
    Undefined(String),

    /// Nothing usable was received.
    #[error("Empty response")]
    Empty,

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Server data could not be interpreted (challenge, quota, capability).
    #[error("Malformed response: {0}")]
    Response(String),

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration or negotiation mismatch.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::ShortWrite { .. } => ErrorKind::SocketError,
            Self::Tls(_) | Self::Encryption(_) => ErrorKind::EncryptionError,
            Self::No(_) | Self::Bye(_) => ErrorKind::NoResponse,
            Self::Bad(_) => ErrorKind::BadResponse,
            Self::Undefined(_) => ErrorKind::UndefinedResponse,
            Self::Empty => ErrorKind::EmptyResponse,
            Self::Timeout(_) => ErrorKind::ConnectionTimeout,
            Self::Response(_) => ErrorKind::ResponseError,
            Self::InvalidState(_) => ErrorKind::InternalError,
            Self::Config(_) => ErrorKind::ConfigError,
        }
    }

    /// Returns true if the connection cannot be trusted after this error.
    ///
    /// Fatal errors drop the session to `Disconnected`; everything else is a
    /// command-level failure that leaves an authenticated session usable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConnectionTimeout | ErrorKind::SocketError | ErrorKind::EncryptionError
        )
    }
}

/// Closed classification of engine outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The operation succeeded.
    NoError,
    /// The server answered NO (or BYE).
    NoResponse,
    /// The server answered BAD, or replied with the wrong shape.
    BadResponse,
    /// The status keyword was not recognized.
    UndefinedResponse,
    /// No status line could be found.
    EmptyResponse,
    /// Connect, handshake or read did not finish in time.
    ConnectionTimeout,
    /// TLS negotiation or certificate verification failed.
    EncryptionError,
    /// The socket failed.
    SocketError,
    /// Server data was malformed.
    ResponseError,
    /// The engine was used incorrectly.
    InternalError,
    /// The configuration cannot work against this server.
    ConfigError,
}

impl ErrorKind {
    /// Classifies the outcome of an engine call.
    #[must_use]
    pub fn of<T>(result: &Result<T>) -> Self {
        result.as_ref().map_or_else(Error::kind, |_| Self::NoError)
    }

    /// Returns the stable name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoError => "NoError",
            Self::NoResponse => "NoResponse",
            Self::BadResponse => "BadResponse",
            Self::UndefinedResponse => "UndefinedResponse",
            Self::EmptyResponse => "EmptyResponse",
            Self::ConnectionTimeout => "ConnectionTimeout",
            Self::EncryptionError => "EncryptionError",
            Self::SocketError => "SocketError",
            Self::ResponseError => "ResponseError",
            Self::InternalError => "InternalError",
            Self::ConfigError => "ConfigError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::No("denied".into()).kind(), ErrorKind::NoResponse);
        assert_eq!(Error::Bad("syntax".into()).kind(), ErrorKind::BadResponse);
        assert_eq!(Error::Empty.kind(), ErrorKind::EmptyResponse);
        assert_eq!(
            Error::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::ConnectionTimeout
        );
        assert_eq!(
            Error::ShortWrite {
                written: 1,
                expected: 4
            }
            .kind(),
            ErrorKind::SocketError
        );
        assert_eq!(
            Error::InvalidState("not ready".into()).kind(),
            ErrorKind::InternalError
        );
    }

    #[test]
    fn test_fatal_errors() {
        assert!(Error::Timeout(Duration::from_secs(1)).is_fatal());
        assert!(Error::Encryption("alert".into()).is_fatal());
        assert!(!Error::No("over quota".into()).is_fatal());
        assert!(!Error::Response("no STORAGE".into()).is_fatal());
    }

    #[test]
    fn test_kind_of_result() {
        let ok: Result<u32> = Ok(1);
        let err: Result<u32> = Err(Error::Config("no STARTTLS".into()));
        assert_eq!(ErrorKind::of(&ok), ErrorKind::NoError);
        assert_eq!(ErrorKind::of(&err), ErrorKind::ConfigError);
        assert_eq!(ErrorKind::ConfigError.to_string(), "ConfigError");
    }
}

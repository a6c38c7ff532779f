//! Connection configuration types.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Default timeout for TCP connect and TLS handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for waiting on a server reply.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption (port 143). **Not recommended for production.**
    #[serde(alias = "none", alias = "plain")]
    Unsecured,
    /// Start with plaintext, upgrade with STARTTLS (port 143).
    #[default]
    StartTls,
    /// TLS from the start (port 993).
    #[serde(alias = "ssl", alias = "tls")]
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Unsecured | Self::StartTls => 143,
            Self::Implicit => 993,
        }
    }
}

/// Network-layer preference when resolving the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpPreference {
    /// Try every resolved address in resolver order.
    #[default]
    Any,
    /// IPv4 addresses only.
    V4,
    /// IPv6 addresses only.
    V6,
}

impl IpPreference {
    /// Returns true if `addr` is acceptable under this preference.
    #[must_use]
    pub const fn accepts(self, addr: &std::net::SocketAddr) -> bool {
        match self {
            Self::Any => true,
            Self::V4 => addr.is_ipv4(),
            Self::V6 => addr.is_ipv6(),
        }
    }
}

/// Authentication mechanism used by `login`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMechanism {
    /// `LOGIN "user" "password"` command.
    #[default]
    Clear,
    /// `AUTHENTICATE LOGIN` (two Base64 prompts).
    Login,
    /// `AUTHENTICATE PLAIN`.
    Plain,
    /// `AUTHENTICATE CRAM-MD5` (RFC 2195).
    #[serde(alias = "cram-md5")]
    CramMd5,
}

impl AuthMechanism {
    /// Returns the SASL mechanism name sent with AUTHENTICATE.
    #[must_use]
    pub const fn sasl_name(self) -> &'static str {
        match self {
            Self::Clear | Self::Login => "LOGIN",
            Self::Plain => "PLAIN",
            Self::CramMd5 => "CRAM-MD5",
        }
    }
}

/// Username and password.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates a new credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Manual Debug implementation so passwords never reach logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// IMAP connection configuration.
///
/// Immutable for the duration of one session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Address family preference.
    pub ip_preference: IpPreference,
    /// Security mode.
    pub security: Security,
    /// Authentication mechanism.
    pub auth_mechanism: AuthMechanism,
    /// Login credentials.
    pub credentials: Credentials,
    /// Name checked against the server certificate (defaults to `host`).
    pub tls_server_name: Option<String>,
    /// Mailbox hierarchy separator used to build quota roots.
    pub hierarchy_separator: char,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Read/write timeout.
    pub io_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with STARTTLS on port 143.
    #[must_use]
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self::builder(host).credentials(credentials).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// Returns the name the server certificate must match.
    #[must_use]
    pub fn verify_name(&self) -> &str {
        self.tls_server_name.as_deref().unwrap_or(&self.host)
    }

    /// Returns the quota root for a user: `user<sep><name>`.
    #[must_use]
    pub fn quota_root(&self, user: &str) -> String {
        format!("user{}{user}", self.hierarchy_separator)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    ip_preference: IpPreference,
    security: Security,
    auth_mechanism: AuthMechanism,
    credentials: Credentials,
    tls_server_name: Option<String>,
    hierarchy_separator: char,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            ip_preference: IpPreference::Any,
            security: Security::StartTls,
            auth_mechanism: AuthMechanism::Clear,
            credentials: Credentials::default(),
            tls_server_name: None,
            hierarchy_separator: '/',
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the address family preference.
    #[must_use]
    pub const fn ip_preference(mut self, preference: IpPreference) -> Self {
        self.ip_preference = preference;
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the authentication mechanism.
    #[must_use]
    pub const fn auth_mechanism(mut self, mechanism: AuthMechanism) -> Self {
        self.auth_mechanism = mechanism;
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the name verified against the server certificate.
    #[must_use]
    pub fn tls_server_name(mut self, name: impl Into<String>) -> Self {
        self.tls_server_name = Some(name.into());
        self
    }

    /// Sets the mailbox hierarchy separator.
    #[must_use]
    pub const fn hierarchy_separator(mut self, separator: char) -> Self {
        self.hierarchy_separator = separator;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the I/O timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            ip_preference: self.ip_preference,
            security: self.security,
            auth_mechanism: self.auth_mechanism,
            credentials: self.credentials,
            tls_server_name: self.tls_server_name,
            hierarchy_separator: self.hierarchy_separator,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
        }
    }
}

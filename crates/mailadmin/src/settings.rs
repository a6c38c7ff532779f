//! Connection settings for the command-line tool.
//!
//! Settings come from an optional JSON file holding the flat key set, with
//! command-line flags and environment variables layered on top.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use mailadmin_imap::{AuthMechanism, Config, Credentials, IpPreference, Security};
use serde::Deserialize;

/// Environment variable carrying the password.
pub const PASSWORD_ENV: &str = "MAILADMIN_IMAP_PASSWORD";

/// Longest accepted timeout, in seconds.
const MAX_TIMEOUT_SECS: u64 = 60 * 60;

/// Flat connection key set.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Server hostname.
    pub host: Option<String>,
    /// Server port; derived from the encryption mode when absent.
    pub port: Option<u16>,
    /// Administrator username.
    pub user: Option<String>,
    /// Administrator password.
    pub password: Option<String>,
    /// Address family preference.
    pub protocol: Option<IpPreference>,
    /// Encryption mode.
    pub encryption: Option<Security>,
    /// Authentication mechanism.
    pub auth_mechanism: Option<AuthMechanism>,
    /// Name verified against the server certificate.
    pub tls_server_name: Option<String>,
    /// Mailbox hierarchy separator.
    pub hierarchy_separator: Option<char>,
    /// Connect and TLS handshake timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Reply timeout in seconds.
    pub io_timeout_secs: Option<u64>,
}

impl Settings {
    /// Reads settings from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("invalid settings file {}", path.display()))
    }

    /// Returns `self` with every key set in `other` replacing its own.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            host: other.host.or(self.host),
            port: other.port.or(self.port),
            user: other.user.or(self.user),
            password: other.password.or(self.password),
            protocol: other.protocol.or(self.protocol),
            encryption: other.encryption.or(self.encryption),
            auth_mechanism: other.auth_mechanism.or(self.auth_mechanism),
            tls_server_name: other.tls_server_name.or(self.tls_server_name),
            hierarchy_separator: other.hierarchy_separator.or(self.hierarchy_separator),
            connect_timeout_secs: other.connect_timeout_secs.or(self.connect_timeout_secs),
            io_timeout_secs: other.io_timeout_secs.or(self.io_timeout_secs),
        }
    }

    /// Builds the engine configuration.
    ///
    /// Host and user are required; a missing password is sent as empty.
    pub fn into_config(self) -> anyhow::Result<Config> {
        let Some(host) = self.host else {
            bail!("no IMAP host configured");
        };
        let Some(user) = self.user else {
            bail!("no IMAP user configured");
        };

        let mut builder = Config::builder(host)
            .credentials(Credentials::new(user, self.password.unwrap_or_default()));

        if let Some(security) = self.encryption {
            builder = builder.security(security);
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(protocol) = self.protocol {
            builder = builder.ip_preference(protocol);
        }
        if let Some(mechanism) = self.auth_mechanism {
            builder = builder.auth_mechanism(mechanism);
        }
        if let Some(name) = self.tls_server_name {
            builder = builder.tls_server_name(name);
        }
        if let Some(separator) = self.hierarchy_separator {
            builder = builder.hierarchy_separator(separator);
        }
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(timeout("connect_timeout_secs", secs)?);
        }
        if let Some(secs) = self.io_timeout_secs {
            builder = builder.io_timeout(timeout("io_timeout_secs", secs)?);
        }

        Ok(builder.build())
    }
}

fn timeout(key: &str, secs: u64) -> anyhow::Result<Duration> {
    if !(1..=MAX_TIMEOUT_SECS).contains(&secs) {
        bail!("{key} must be between 1 and {MAX_TIMEOUT_SECS} seconds, got {secs}");
    }
    Ok(Duration::from_secs(secs))
}

// Manual Debug implementation so passwords never reach logs
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("protocol", &self.protocol)
            .field("encryption", &self.encryption)
            .field("auth_mechanism", &self.auth_mechanism)
            .field("tls_server_name", &self.tls_server_name)
            .field("hierarchy_separator", &self.hierarchy_separator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "host": "imap.example.com",
                "port": 10993,
                "user": "admin",
                "password": "secret",
                "protocol": "v4",
                "encryption": "implicit",
                "auth_mechanism": "cram-md5",
                "tls_server_name": "mail.example.com",
                "hierarchy_separator": ".",
                "io_timeout_secs": 5
            }"#,
        )
        .unwrap();

        let config = settings.into_config().unwrap();
        assert_eq!(config.port, 10993);
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.auth_mechanism, AuthMechanism::CramMd5);
        assert_eq!(config.ip_preference, IpPreference::V4);
        assert_eq!(config.verify_name(), "mail.example.com");
        assert_eq!(config.quota_root("alice"), "user.alice");
        assert_eq!(config.io_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_encryption_aliases() {
        let settings: Settings = serde_json::from_str(r#"{"encryption": "tls"}"#).unwrap();
        assert_eq!(settings.encryption, Some(Security::Implicit));
        let settings: Settings = serde_json::from_str(r#"{"encryption": "none"}"#).unwrap();
        assert_eq!(settings.encryption, Some(Security::Unsecured));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(serde_json::from_str::<Settings>(r#"{"hostname": "x"}"#).is_err());
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let file = Settings {
            host: Some("file.example.com".to_string()),
            user: Some("admin".to_string()),
            password: Some("secret".to_string()),
            ..Settings::default()
        };
        let flags = Settings {
            host: Some("flag.example.com".to_string()),
            ..Settings::default()
        };

        let merged = file.merge(flags);
        assert_eq!(merged.host.as_deref(), Some("flag.example.com"));
        assert_eq!(merged.user.as_deref(), Some("admin"));
        assert_eq!(merged.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_missing_host() {
        let err = Settings::default().into_config().unwrap_err();
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn test_defaults_follow_engine() {
        let settings = Settings {
            host: Some("imap.example.com".to_string()),
            user: Some("admin".to_string()),
            ..Settings::default()
        };
        let config = settings.into_config().unwrap();
        assert_eq!(config.security, Security::StartTls);
        assert_eq!(config.port, 143);
        assert_eq!(config.hierarchy_separator, '/');
    }

    #[test]
    fn test_timeout_bounds() {
        let settings = |secs| Settings {
            host: Some("imap.example.com".to_string()),
            user: Some("admin".to_string()),
            io_timeout_secs: Some(secs),
            ..Settings::default()
        };

        let err = settings(u64::MAX).into_config().unwrap_err();
        assert!(err.to_string().contains("io_timeout_secs"));
        assert!(settings(0).into_config().is_err());

        let config = settings(MAX_TIMEOUT_SECS).into_config().unwrap();
        assert_eq!(config.io_timeout, Duration::from_secs(3600));
    }

    #[test]
    fn test_debug_redacts_password() {
        let settings = Settings {
            password: Some("hunter2".to_string()),
            ..Settings::default()
        };
        assert!(!format!("{settings:?}").contains("hunter2"));
    }
}

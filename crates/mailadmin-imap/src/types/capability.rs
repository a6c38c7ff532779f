//! Server capabilities and response status.

/// Classification of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed (operational error).
    No,
    /// Command failed (protocol/syntax error).
    Bad,
    /// Status keyword was not recognized.
    Undefined,
}

impl Status {
    /// Parses the status keyword following a tag.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("OK") {
            Self::Ok
        } else if s.eq_ignore_ascii_case("NO") {
            Self::No
        } else if s.eq_ignore_ascii_case("BAD") {
            Self::Bad
        } else {
            Self::Undefined
        }
    }

    /// Returns true if this is a successful status.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Server capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1` (RFC 3501)
    Imap4Rev1,
    /// `IMAP4rev2` (RFC 9051)
    Imap4Rev2,
    /// STARTTLS support
    StartTls,
    /// LOGIN disabled
    LoginDisabled,
    /// AUTH mechanism
    Auth(String),
    /// QUOTA extension (RFC 2087 / RFC 9208)
    Quota,
    /// NAMESPACE command support (RFC 2342)
    Namespace,
    /// IDLE command support (RFC 2177)
    Idle,
    /// SASL initial response (RFC 4959)
    SaslIr,
    /// Unknown capability
    Unknown(String),
}

impl Capability {
    /// Parses a capability string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "IMAP4REV2" => Self::Imap4Rev2,
            "STARTTLS" => Self::StartTls,
            "LOGINDISABLED" => Self::LoginDisabled,
            "QUOTA" => Self::Quota,
            "NAMESPACE" => Self::Namespace,
            "IDLE" => Self::Idle,
            "SASL-IR" => Self::SaslIr,
            _ if upper.starts_with("AUTH=") => Self::Auth(s[5..].to_string()),
            _ => Self::Unknown(s.to_string()),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap4Rev1 => write!(f, "IMAP4rev1"),
            Self::Imap4Rev2 => write!(f, "IMAP4rev2"),
            Self::StartTls => write!(f, "STARTTLS"),
            Self::LoginDisabled => write!(f, "LOGINDISABLED"),
            Self::Auth(mech) => write!(f, "AUTH={mech}"),
            Self::Quota => write!(f, "QUOTA"),
            Self::Namespace => write!(f, "NAMESPACE"),
            Self::Idle => write!(f, "IDLE"),
            Self::SaslIr => write!(f, "SASL-IR"),
            Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// Ordered set of capabilities advertised by a server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(Vec<Capability>);

impl Capabilities {
    /// Creates an empty capability set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Parses whitespace-separated capability tokens, keeping server order.
    ///
    /// Duplicate tokens are collapsed to their first occurrence.
    #[must_use]
    pub fn from_tokens(tokens: &str) -> Self {
        let mut caps = Vec::new();
        for cap in tokens.split_ascii_whitespace().map(Capability::parse) {
            if !caps.contains(&cap) {
                caps.push(cap);
            }
        }
        Self(caps)
    }

    /// Returns true if no capabilities are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Removes every capability.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has(&self, cap: &Capability) -> bool {
        self.0.contains(cap)
    }

    /// Returns true if the server supports STARTTLS.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.has(&Capability::StartTls)
    }

    /// Returns true if LOGIN is disabled (e.g., before STARTTLS).
    #[must_use]
    pub fn login_disabled(&self) -> bool {
        self.has(&Capability::LoginDisabled)
    }

    /// Returns true if the server supports the given SASL mechanism.
    #[must_use]
    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.0
            .iter()
            .any(|c| matches!(c, Capability::Auth(m) if m.eq_ignore_ascii_case(mechanism)))
    }

    /// Returns an iterator over the capabilities.
    pub fn iter(&self) -> std::slice::Iter<'_, Capability> {
        self.0.iter()
    }

    /// Returns the capabilities rendered as wire tokens.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl From<Vec<Capability>> for Capabilities {
    fn from(caps: Vec<Capability>) -> Self {
        Self(caps)
    }
}

impl<'a> IntoIterator for &'a Capabilities {
    type Item = &'a Capability;
    type IntoIter = std::slice::Iter<'a, Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, cap) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{cap}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod status_tests {
        use super::*;

        #[test]
        fn parse_known() {
            assert_eq!(Status::parse("OK"), Status::Ok);
            assert_eq!(Status::parse("no"), Status::No);
            assert_eq!(Status::parse("Bad"), Status::Bad);
        }

        #[test]
        fn parse_unknown_is_undefined() {
            assert_eq!(Status::parse("MAYBE"), Status::Undefined);
            assert_eq!(Status::parse(""), Status::Undefined);
        }

        #[test]
        fn is_ok_only_for_ok() {
            assert!(Status::Ok.is_ok());
            assert!(!Status::No.is_ok());
            assert!(!Status::Bad.is_ok());
            assert!(!Status::Undefined.is_ok());
        }
    }

    mod capability_parse_tests {
        use super::*;

        #[test]
        fn parse_imap4rev1() {
            assert_eq!(Capability::parse("IMAP4REV1"), Capability::Imap4Rev1);
            assert_eq!(Capability::parse("imap4rev1"), Capability::Imap4Rev1);
        }

        #[test]
        fn parse_starttls() {
            assert_eq!(Capability::parse("STARTTLS"), Capability::StartTls);
        }

        #[test]
        fn parse_logindisabled() {
            assert_eq!(
                Capability::parse("LOGINDISABLED"),
                Capability::LoginDisabled
            );
        }

        #[test]
        fn parse_auth() {
            let cap = Capability::parse("AUTH=CRAM-MD5");
            assert_eq!(cap, Capability::Auth("CRAM-MD5".to_string()));
        }

        #[test]
        fn parse_quota() {
            assert_eq!(Capability::parse("QUOTA"), Capability::Quota);
        }

        #[test]
        fn parse_unknown() {
            let cap = Capability::parse("XSOMETHING");
            assert_eq!(cap, Capability::Unknown("XSOMETHING".to_string()));
        }
    }

    mod capabilities_tests {
        use super::*;

        #[test]
        fn keeps_server_order() {
            let caps = Capabilities::from_tokens("IMAP4rev1 STARTTLS AUTH=PLAIN");
            assert_eq!(caps.tokens(), vec!["IMAP4rev1", "STARTTLS", "AUTH=PLAIN"]);
            assert_eq!(caps.to_string(), "IMAP4rev1 STARTTLS AUTH=PLAIN");
        }

        #[test]
        fn collapses_duplicates() {
            let caps = Capabilities::from_tokens("IDLE idle QUOTA");
            assert_eq!(caps.len(), 2);
        }

        #[test]
        fn helpers() {
            let caps = Capabilities::from_tokens("IMAP4rev1 STARTTLS LOGINDISABLED AUTH=plain");
            assert!(caps.supports_starttls());
            assert!(caps.login_disabled());
            assert!(caps.supports_auth("PLAIN"));
            assert!(!caps.supports_auth("CRAM-MD5"));
        }

        #[test]
        fn empty_and_clear() {
            let mut caps = Capabilities::from_tokens("IMAP4rev1");
            assert!(!caps.is_empty());
            caps.clear();
            assert!(caps.is_empty());
            assert!(Capabilities::from_tokens("   ").is_empty());
        }
    }
}

//! Type-safe wrappers using the new-type pattern.
//!
//! These keep raw strings out of the signing API: a timestamp server is a
//! validated URL, a password never shows up in logs, and a sign definition is
//! one of exactly two shapes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::crypto::DigestAlgorithm;
use crate::infra::error::{SigningError, TimestampError};

/// Type-safe wrapper for timestamp authority URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampUrl(Url);

impl TimestampUrl {
    /// Create a new `TimestampUrl` after validation
    pub fn new(url: impl AsRef<str>) -> Result<Self, TimestampError> {
        let raw = url.as_ref();
        let invalid = |reason: &str| TimestampError::InvalidUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(invalid("scheme must be http or https"));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        Ok(Self(parsed))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn is_https(&self) -> bool {
        self.0.scheme() == "https"
    }

    /// Host name as it should appear in the `Host` header and TLS SNI.
    #[must_use]
    pub fn host(&self) -> &str {
        // validated in `new`
        self.0.host_str().unwrap_or_default()
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.0
            .port_or_known_default()
            .unwrap_or(if self.is_https() { 443 } else { 80 })
    }

    /// `Host` header value: the host, plus the port when it is not the default.
    #[must_use]
    pub fn host_header(&self) -> String {
        match self.0.port() {
            Some(port) => format!("{}:{port}", self.host()),
            None => self.host().to_string(),
        }
    }

    /// Request target for an origin-form HTTP/1.1 request line.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        match self.0.query() {
            Some(q) => format!("{}?{q}", self.0.path()),
            None => self.0.path().to_string(),
        }
    }
}

impl FromStr for TimestampUrl {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TimestampUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which certificates of each reconstructed chain get embedded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CertSelectMode {
    /// Only the leaf of every chain.
    #[default]
    Leaf,
    /// Every certificate except self-signed ones.
    NoRoot,
    /// Every certificate.
    All,
}

impl CertSelectMode {
    pub const VALUES: [&'static str; 3] = ["leaf", "no-root", "all"];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::NoRoot => "no-root",
            Self::All => "all",
        }
    }
}

impl FromStr for CertSelectMode {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leaf" => Ok(Self::Leaf),
            "no-root" => Ok(Self::NoRoot),
            "all" => Ok(Self::All),
            other => Err(SigningError::InvalidDefinition(format!(
                "'sign.certSelect' is not a valid value: '{other}' (choices: {})",
                Self::VALUES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for CertSelectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container password. An empty password is distinct from no password.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never print the secret.
impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password([REDACTED])")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[PASSWORD REDACTED]")
    }
}

/// Where the key and certificate material comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// A PKCS#12 (`.p12` / `.pfx`) container holding key and certificates.
    P12 { p12_file: PathBuf },
    /// A PEM private key plus a certificate file (DER, PKCS#7 or PEM).
    Pem {
        private_key_file: PathBuf,
        certificate_file: PathBuf,
    },
}

/// A validated signing definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignDefinition {
    pub source: KeySource,
    pub cert_select: CertSelectMode,
    pub password: Option<Password>,
    pub digest_algorithm: DigestAlgorithm,
    pub timestamp_server: Option<TimestampUrl>,
}

impl SignDefinition {
    #[must_use]
    pub fn with_p12(p12_file: impl Into<PathBuf>) -> Self {
        Self::from_source(KeySource::P12 {
            p12_file: p12_file.into(),
        })
    }

    #[must_use]
    pub fn with_pem(
        private_key_file: impl Into<PathBuf>,
        certificate_file: impl Into<PathBuf>,
    ) -> Self {
        Self::from_source(KeySource::Pem {
            private_key_file: private_key_file.into(),
            certificate_file: certificate_file.into(),
        })
    }

    fn from_source(source: KeySource) -> Self {
        Self {
            source,
            cert_select: CertSelectMode::default(),
            password: None,
            digest_algorithm: DigestAlgorithm::default(),
            timestamp_server: None,
        }
    }

    #[must_use]
    pub fn cert_select(mut self, mode: CertSelectMode) -> Self {
        self.cert_select = mode;
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Password::new(password));
        self
    }

    #[must_use]
    pub fn digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn timestamp_server(mut self, url: TimestampUrl) -> Self {
        self.timestamp_server = Some(url);
        self
    }
}

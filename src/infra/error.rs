//! Error types for signing preparation and streaming signature operations.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Error types for signing operations.
///
/// Every variant is fatal for the signing operation in progress; nothing in
/// this crate retries on its own.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigningError {
    #[error("Invalid or unsupported p12/pfx data: {0}")]
    #[diagnostic(help("a wrong password is the most common cause"))]
    InvalidContainer(String),

    #[error("No private key found: {0}")]
    NoPrivateKey(String),

    #[error("No certificates found: {0}")]
    NoCertificates(String),

    #[error("Invalid or unsupported certificate file: {0}")]
    InvalidCertificateFile(String),

    #[error("Unsupported digest algorithm '{requested}' (choices: {available})")]
    UnsupportedDigestAlgorithm { requested: String, available: String },

    #[error("Cryptographic operation failed: {0}")]
    CryptographicOperation(String),

    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error("No timestamp server is configured for this signer")]
    TimestampNotConfigured,

    #[error("Invalid sign definition: {0}")]
    InvalidDefinition(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SigningError {
    /// Prefix the message with the file the failing data came from.
    ///
    /// Only the material errors carry a free-form message; other variants are
    /// returned unchanged.
    #[must_use]
    pub fn in_file(self, path: &Path) -> Self {
        let wrap = |detail: String| format!("'{}' ({detail})", path.display());
        match self {
            Self::InvalidContainer(d) => Self::InvalidContainer(wrap(d)),
            Self::NoPrivateKey(d) => Self::NoPrivateKey(wrap(d)),
            Self::NoCertificates(d) => Self::NoCertificates(wrap(d)),
            Self::InvalidCertificateFile(d) => Self::InvalidCertificateFile(wrap(d)),
            other => other,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures while talking to a timestamp authority.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum TimestampError {
    /// The transport failed before a complete response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Server error {status} {reason} from {server}")]
    HttpStatus {
        server: String,
        status: u16,
        reason: String,
    },

    #[error("Unexpected Content-Type for response from {server}: {} (expected {expected})", actual.as_deref().unwrap_or("<none>"))]
    UnexpectedResponseType {
        server: String,
        expected: &'static str,
        actual: Option<String>,
    },

    #[error("Invalid timestamp server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Errors raised by the individual HTTP transports, passed through unmodified.
#[derive(Error, Debug)]
pub enum TransportError {
    #[cfg(feature = "reqwest-transport")]
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[cfg(feature = "hyper-transport")]
    #[error(transparent)]
    Hyper(#[from] hyper_util::client::legacy::Error),

    #[cfg(feature = "hyper-transport")]
    #[error(transparent)]
    HyperBody(#[from] hyper::Error),

    #[cfg(feature = "hyper-transport")]
    #[error(transparent)]
    Http(#[from] http::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tls(#[from] openssl::ssl::Error),

    #[error(transparent)]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("Malformed HTTP response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Transport task failed: {0}")]
    Task(String),

    #[error("The {0} transport is not compiled into this build")]
    Unavailable(&'static str),
}

impl From<openssl::error::ErrorStack> for SigningError {
    fn from(error: openssl::error::ErrorStack) -> Self {
        SigningError::CryptographicOperation(error.to_string())
    }
}

impl From<der::Error> for SigningError {
    fn from(error: der::Error) -> Self {
        SigningError::InvalidCertificateFile(format!("ASN.1 error: {error}"))
    }
}

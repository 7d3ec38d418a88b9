//! HTTP transports for timestamp authority requests.
//!
//! Three interchangeable implementations of [`TimestampTransport`] exist. Which
//! ones are compiled in depends on cargo features; the socket transport is
//! always present. [`TransportKind::probe`] picks the first available one in
//! a fixed order and remembers the answer for the rest of the process, so the
//! choice is deterministic and callers (tests in particular) can still force
//! a specific transport through [`build_transport`].

#[cfg(feature = "hyper-transport")]
mod hyper_client;
#[cfg(feature = "reqwest-transport")]
mod reqwest_client;
mod socket;

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::types::TimestampUrl;
use crate::infra::error::{SigningError, TransportError};

#[cfg(feature = "hyper-transport")]
pub use self::hyper_client::HyperTransport;
#[cfg(feature = "reqwest-transport")]
pub use self::reqwest_client::ReqwestTransport;
pub use self::socket::SocketTransport;

/// Identifies one transport implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    Reqwest,
    Hyper,
    Socket,
}

static PROBED: OnceLock<TransportKind> = OnceLock::new();

impl TransportKind {
    /// Order in which [`probe`](Self::probe) considers the transports.
    pub const PROBE_ORDER: [TransportKind; 3] = [Self::Reqwest, Self::Hyper, Self::Socket];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reqwest => "reqwest",
            Self::Hyper => "hyper",
            Self::Socket => "socket",
        }
    }

    /// Whether this transport was compiled into the crate.
    #[must_use]
    pub fn is_available(&self) -> bool {
        match self {
            Self::Reqwest => cfg!(feature = "reqwest-transport"),
            Self::Hyper => cfg!(feature = "hyper-transport"),
            Self::Socket => true,
        }
    }

    /// The first available transport in probe order, resolved once.
    pub fn probe() -> TransportKind {
        *PROBED.get_or_init(|| {
            let kind = Self::PROBE_ORDER
                .into_iter()
                .find(TransportKind::is_available)
                .unwrap_or(Self::Socket);
            log::debug!("timestamp transport selected: {kind}");
            kind
        })
    }
}

impl FromStr for TransportKind {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::PROBE_ORDER
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                SigningError::ConfigurationError(format!(
                    "Unknown transport '{s}' (choices: reqwest, hyper, socket)"
                ))
            })
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete HTTP response, as far as the timestamp client cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    /// Raw `Content-Type` header value, if the server sent one.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one POST request and returns the whole response.
///
/// Implementations apply their own request timeout and never retry. Errors are
/// returned as produced by the underlying library.
#[async_trait]
pub trait TimestampTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn post(
        &self,
        url: &TimestampUrl,
        content_type: &str,
        body: &[u8],
    ) -> Result<HttpResponse, TransportError>;
}

/// Construct the transport named by `kind`.
pub fn build_transport(
    kind: TransportKind,
    timeout: Duration,
) -> Result<Arc<dyn TimestampTransport>, TransportError> {
    match kind {
        #[cfg(feature = "reqwest-transport")]
        TransportKind::Reqwest => Ok(Arc::new(ReqwestTransport::new(timeout)?)),
        #[cfg(feature = "hyper-transport")]
        TransportKind::Hyper => Ok(Arc::new(HyperTransport::new(timeout))),
        TransportKind::Socket => Ok(Arc::new(SocketTransport::new(timeout))),
        #[allow(unreachable_patterns)]
        other => Err(TransportError::Unavailable(other.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_is_stable_and_available() {
        let first = TransportKind::probe();
        assert!(first.is_available());
        assert_eq!(TransportKind::probe(), first);
        #[cfg(feature = "reqwest-transport")]
        assert_eq!(first, TransportKind::Reqwest);
    }

    #[test]
    fn test_socket_is_always_available() {
        assert!(TransportKind::Socket.is_available());
        let transport = build_transport(TransportKind::Socket, Duration::from_secs(1)).unwrap();
        assert_eq!(transport.kind(), TransportKind::Socket);
    }

    #[test]
    fn test_kind_names() {
        for kind in TransportKind::PROBE_ORDER {
            assert_eq!(kind.as_str().parse::<TransportKind>().unwrap(), kind);
        }
        assert!("curl".parse::<TransportKind>().is_err());
        let json = serde_json::to_string(&TransportKind::Hyper).unwrap();
        assert_eq!(json, "\"hyper\"");
    }

    #[cfg(not(feature = "hyper-transport"))]
    #[test]
    fn test_missing_transport_is_reported() {
        let err = build_transport(TransportKind::Hyper, Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, TransportError::Unavailable("hyper")));
    }
}

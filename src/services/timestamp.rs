//! RFC 3161 timestamp client.
//!
//! Posts an already-encoded timestamp query to a single timestamp authority
//! and returns the raw reply. Building the query and interpreting the reply
//! are left to the Authenticode assembler; this client only checks the HTTP
//! status and the response content type.

use std::sync::Arc;
use std::time::Duration;

use crate::adapters::transport::{build_transport, TimestampTransport, TransportKind};
use crate::domain::constants::{TIMESTAMP_QUERY_CONTENT_TYPE, TIMESTAMP_REPLY_CONTENT_TYPE};
use crate::domain::types::TimestampUrl;
use crate::infra::error::TimestampError;

/// Client bound to one timestamp server.
#[derive(Clone)]
pub struct TimestampClient {
    server: TimestampUrl,
    transport: Arc<dyn TimestampTransport>,
}

impl TimestampClient {
    /// Create a client using the process-wide probed transport.
    pub fn new(server: TimestampUrl, timeout: Duration) -> Result<Self, TimestampError> {
        Self::with_kind(server, TransportKind::probe(), timeout)
    }

    /// Create a client using a specific transport implementation.
    pub fn with_kind(
        server: TimestampUrl,
        kind: TransportKind,
        timeout: Duration,
    ) -> Result<Self, TimestampError> {
        Ok(Self::with_transport(server, build_transport(kind, timeout)?))
    }

    #[must_use]
    pub fn with_transport(server: TimestampUrl, transport: Arc<dyn TimestampTransport>) -> Self {
        Self { server, transport }
    }

    #[must_use]
    pub fn server(&self) -> &TimestampUrl {
        &self.server
    }

    #[must_use]
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Send `query` and return the reply body unmodified.
    ///
    /// A single attempt is made. Any status outside 2xx, or a content type
    /// other than exactly `application/timestamp-reply`, is an error.
    pub async fn request(&self, query: &[u8]) -> Result<Vec<u8>, TimestampError> {
        log::info!(
            "Requesting timestamp from {} ({} bytes, {} transport)",
            self.server,
            query.len(),
            self.transport.kind()
        );

        let response = self
            .transport
            .post(&self.server, TIMESTAMP_QUERY_CONTENT_TYPE, query)
            .await?;

        if !response.is_success() {
            log::warn!(
                "timestamp server {} answered {} {}",
                self.server,
                response.status,
                response.reason
            );
            return Err(TimestampError::HttpStatus {
                server: self.server.to_string(),
                status: response.status,
                reason: response.reason,
            });
        }

        if response.content_type.as_deref() != Some(TIMESTAMP_REPLY_CONTENT_TYPE) {
            return Err(TimestampError::UnexpectedResponseType {
                server: self.server.to_string(),
                expected: TIMESTAMP_REPLY_CONTENT_TYPE,
                actual: response.content_type,
            });
        }

        log::debug!("timestamp reply received: {} bytes", response.body.len());
        Ok(response.body)
    }
}

impl std::fmt::Debug for TimestampClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampClient")
            .field("server", &self.server.as_str())
            .field("transport", &self.transport.kind())
            .finish()
    }
}

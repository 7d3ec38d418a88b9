use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT as USER_AGENT_HEADER};
use http::Request;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use super::{HttpResponse, TimestampTransport, TransportKind};
use crate::domain::constants::USER_AGENT;
use crate::domain::types::TimestampUrl;
use crate::infra::error::TransportError;

/// Transport backed by the `hyper-util` legacy client over rustls.
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
}

impl HyperTransport {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(https);
        Self { client, timeout }
    }

    async fn exchange(
        &self,
        url: &TimestampUrl,
        content_type: &str,
        body: &[u8],
    ) -> Result<HttpResponse, TransportError> {
        let request = Request::post(url.as_str())
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, body.len())
            .header(USER_AGENT_HEADER, USER_AGENT)
            .body(Full::new(Bytes::copy_from_slice(body)))?;

        let response = self.client.request(request).await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.into_body().collect().await?.to_bytes();

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl TimestampTransport for HyperTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Hyper
    }

    async fn post(
        &self,
        url: &TimestampUrl,
        content_type: &str,
        body: &[u8],
    ) -> Result<HttpResponse, TransportError> {
        tokio::time::timeout(self.timeout, self.exchange(url, content_type, body))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}

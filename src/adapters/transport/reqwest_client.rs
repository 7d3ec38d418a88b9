use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::{HttpResponse, TimestampTransport, TransportKind};
use crate::domain::constants::USER_AGENT;
use crate::domain::types::TimestampUrl;
use crate::infra::error::TransportError;

/// Transport backed by a shared `reqwest` client.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl TimestampTransport for ReqwestTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Reqwest
    }

    async fn post(
        &self,
        url: &TimestampUrl,
        content_type: &str,
        body: &[u8],
    ) -> Result<HttpResponse, TransportError> {
        let response = self
            .http
            .post(url.as_str())
            .header(CONTENT_TYPE, content_type)
            .body(body.to_vec())
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            body: body.to_vec(),
        })
    }
}

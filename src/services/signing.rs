//! High-level signing flow.
//!
//! Loads the signing material named by a [`SignDefinition`], builds an
//! [`OpenSslSigner`] for it and hands that signer to an
//! [`AuthenticodeEmbedder`], which owns everything about the executable
//! format: hashing layout, signed-data assembly and embedding.

use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::transport::TransportKind;
use crate::domain::constants::DEFAULT_TIMESTAMP_TIMEOUT_SECS;
use crate::domain::types::SignDefinition;
use crate::infra::config::NetworkConfig;
use crate::infra::error::SigningResult;
use crate::services::loader;
use crate::services::signer::{OpenSslSigner, Signer};
use crate::services::timestamp::TimestampClient;

/// Produces a signed executable image from an unsigned one.
#[async_trait]
pub trait AuthenticodeEmbedder: Send + Sync {
    /// Sign `image` using `signer`. The signer is used for this one image only.
    async fn sign_image(&self, image: &[u8], signer: &dyn Signer) -> SigningResult<Vec<u8>>;
}

/// Network options for the timestamp request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningOptions {
    pub timeout: Duration,
    /// Force a transport instead of using the probed one.
    pub transport: Option<TransportKind>,
}

impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMESTAMP_TIMEOUT_SECS),
            transport: None,
        }
    }
}

impl From<&NetworkConfig> for SigningOptions {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            timeout: Duration::from_secs(network.timeout_seconds),
            transport: network.transport,
        }
    }
}

/// Load the material for `definition` and build a ready-to-use signer.
pub fn build_signer(
    definition: &SignDefinition,
    options: &SigningOptions,
) -> SigningResult<OpenSslSigner> {
    let bundle = loader::prepare(definition)?;

    let timestamp = match &definition.timestamp_server {
        Some(server) => Some(match options.transport {
            Some(kind) => TimestampClient::with_kind(server.clone(), kind, options.timeout)?,
            None => TimestampClient::new(server.clone(), options.timeout)?,
        }),
        None => None,
    };

    log::info!(
        "[sign] is_rsa = {}, cert count = {}, digest algorithm = {}, timestamp server = {}",
        bundle.is_rsa,
        bundle.certificates.len(),
        definition.digest_algorithm,
        definition
            .timestamp_server
            .as_ref()
            .map_or("(not used)", |url| url.as_str())
    );

    OpenSslSigner::new(bundle, definition.digest_algorithm, timestamp)
}

/// Sign `image` as described by `definition`.
pub async fn sign_executable(
    embedder: &dyn AuthenticodeEmbedder,
    image: &[u8],
    definition: &SignDefinition,
    options: &SigningOptions,
) -> SigningResult<Vec<u8>> {
    let signer = build_signer(definition, options)?;
    let signed = embedder.sign_image(image, &signer).await?;
    log::info!(
        "signed image: {} bytes in, {} bytes out",
        image.len(),
        signed.len()
    );
    Ok(signed)
}

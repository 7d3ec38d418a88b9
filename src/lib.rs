//! Signing support for PE resource editing.
//!
//! Prepares the key and certificate material named by a sign definition and
//! exposes it through a streaming [`Signer`] that an Authenticode assembler
//! can drive. Certificates are put into chain order (leaf first) regardless
//! of how they were stored, and RFC 3161 timestamp queries are forwarded to a
//! timestamp authority over HTTP.
//!
//! Layout:
//! - `domain`: certificate model, chain reconstruction and selection, PEM scanning
//! - `services`: material loading, the OpenSSL signer, the timestamp client
//! - `adapters`: HTTP transports
//! - `infra`: errors and configuration files

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

pub use adapters::transport::{TimestampTransport, TransportKind};
pub use domain::crypto::{CertAndKeyData, DigestAlgorithm, EncryptionAlgorithm};
pub use domain::types::{CertSelectMode, KeySource, Password, SignDefinition, TimestampUrl};
pub use infra::config::{ConfigManager, SignDefinitionData, SigningConfiguration};
pub use infra::error::{SigningError, SigningResult, TimestampError, TransportError};
pub use services::{
    sign_executable, AuthenticodeEmbedder, DataChunks, OpenSslSigner, Signer, SigningOptions,
    TimestampClient,
};

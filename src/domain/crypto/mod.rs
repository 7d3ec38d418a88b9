//! Foundational cryptographic domain types.
//!
//! Provides strongly-typed wrappers for the signing material:
//! - Digest algorithms, probed against the OpenSSL provider
//! - Certificates with subject/issuer identity hashes, and PKCS#12 bags
//! - Private key PEM text and its algorithm family
//! - The key-and-certificate bundle handed to the signer

mod bundle;
mod cert;
mod digest;
mod key;

pub use bundle::CertAndKeyData;
pub use cert::{CertBag, CertRecord, Certificate, CertificateLike, ChainEntry, NameHash};
pub use digest::DigestAlgorithm;
pub use key::{EncryptionAlgorithm, KeyAlgorithm, PrivateKeyPem};

use std::fmt;

use super::{EncryptionAlgorithm, PrivateKeyPem};
use crate::domain::types::Password;

/// Key and certificate material for one signing operation.
///
/// Built once by the loader and moved into the signer; it is not meant to be
/// reused across operations.
#[derive(Clone)]
pub struct CertAndKeyData {
    /// DER certificates in embedding order (leaf first within each chain).
    pub certificates: Vec<Vec<u8>>,
    pub private_key: PrivateKeyPem,
    pub is_rsa: bool,
    /// Decrypts an encrypted PEM key when present.
    pub password: Option<Password>,
}

impl CertAndKeyData {
    #[must_use]
    pub fn encryption_algorithm(&self) -> EncryptionAlgorithm {
        EncryptionAlgorithm::from_is_rsa(self.is_rsa)
    }
}

impl fmt::Debug for CertAndKeyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertAndKeyData")
            .field("certificates", &self.certificates.len())
            .field("private_key", &self.private_key)
            .field("is_rsa", &self.is_rsa)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

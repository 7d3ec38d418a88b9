use std::fmt;

use der::{Decode, Encode};
use sha2::{Digest, Sha256};

use crate::infra::error::{SigningError, SigningResult};

/// Identity hash of a distinguished name (SHA-256 over its DER encoding).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameHash([u8; 32]);

impl NameHash {
    /// Hash the DER encoding of a name.
    #[must_use]
    pub fn of_der(name_der: &[u8]) -> Self {
        Self(Sha256::digest(name_der).into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for NameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameHash({})", hex::encode(&self.0[..8]))
    }
}

/// Anything that names its subject and issuer.
pub trait CertificateLike {
    fn subject_hash(&self) -> NameHash;
    fn issuer_hash(&self) -> NameHash;

    fn is_self_signed(&self) -> bool {
        self.subject_hash() == self.issuer_hash()
    }
}

/// An input record for chain reconstruction: either a certificate or a
/// wrapper that may or may not carry one.
pub trait ChainEntry {
    type Cert: CertificateLike;

    fn certificate(&self) -> Option<&Self::Cert>;
}

/// Parsed X.509 certificate, immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Box<[u8]>,
    subject: NameHash,
    issuer: NameHash,
    subject_display: String,
}

impl Certificate {
    /// Parse a single DER certificate. Trailing data is rejected.
    pub fn from_der(der: Vec<u8>) -> SigningResult<Self> {
        let parsed = x509_cert::Certificate::from_der(&der).map_err(|e| {
            SigningError::InvalidCertificateFile(format!("not a DER certificate: {e}"))
        })?;
        let tbs = &parsed.tbs_certificate;
        let subject = NameHash::of_der(&tbs.subject.to_der()?);
        let issuer = NameHash::of_der(&tbs.issuer.to_der()?);
        let subject_display = tbs.subject.to_string();
        Ok(Self {
            der: der.into_boxed_slice(),
            subject,
            issuer,
            subject_display,
        })
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    #[must_use]
    pub fn to_der_vec(&self) -> Vec<u8> {
        self.der.to_vec()
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject_display
    }
}

impl CertificateLike for Certificate {
    fn subject_hash(&self) -> NameHash {
        self.subject
    }

    fn issuer_hash(&self) -> NameHash {
        self.issuer
    }
}

impl ChainEntry for Certificate {
    type Cert = Certificate;

    fn certificate(&self) -> Option<&Certificate> {
        Some(self)
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Certificate(subject={}, len={}, self_signed={})",
            self.subject_display,
            self.der.len(),
            self.is_self_signed()
        )
    }
}

/// PKCS#12 certificate bag. The certificate is optional because a bag may
/// hold a certificate type this crate cannot parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertBag {
    pub certificate: Option<Certificate>,
    pub friendly_name: Option<String>,
}

/// Input record for chain reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertRecord {
    Certificate(Certificate),
    Bag(CertBag),
}

impl ChainEntry for CertRecord {
    type Cert = Certificate;

    fn certificate(&self) -> Option<&Certificate> {
        match self {
            CertRecord::Certificate(c) => Some(c),
            CertRecord::Bag(bag) => bag.certificate.as_ref(),
        }
    }
}

impl From<Certificate> for CertRecord {
    fn from(cert: Certificate) -> Self {
        CertRecord::Certificate(cert)
    }
}

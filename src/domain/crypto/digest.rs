//! Digest algorithm domain type.
//!
//! The fixed set of algorithms a signing definition may name, filtered at
//! runtime to the ones the linked OpenSSL provider can actually compute.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use openssl::hash::MessageDigest;
use serde::{Deserialize, Serialize};

use crate::infra::error::{SigningError, SigningResult};

/// Digest algorithms accepted for Authenticode signing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    #[serde(rename = "sha1")]
    Sha1,
    #[serde(rename = "sha224")]
    Sha224,
    #[default]
    #[serde(rename = "sha256")]
    Sha256,
    #[serde(rename = "sha384")]
    Sha384,
    #[serde(rename = "sha512")]
    Sha512,
    #[serde(rename = "sha512-224")]
    Sha512_224,
    #[serde(rename = "sha512-256")]
    Sha512_256,
    #[serde(rename = "sha3-224")]
    Sha3_224,
    #[serde(rename = "sha3-256")]
    Sha3_256,
    #[serde(rename = "sha3-384")]
    Sha3_384,
    #[serde(rename = "sha3-512")]
    Sha3_512,
    #[serde(rename = "shake128")]
    Shake128,
    #[serde(rename = "shake256")]
    Shake256,
}

static AVAILABLE: OnceLock<Vec<DigestAlgorithm>> = OnceLock::new();

impl DigestAlgorithm {
    /// Every algorithm in the order the choices are presented to users.
    pub const ALL: [DigestAlgorithm; 13] = [
        Self::Sha1,
        Self::Sha256,
        Self::Sha512,
        Self::Sha224,
        Self::Sha384,
        Self::Sha512_224,
        Self::Sha512_256,
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
        Self::Shake128,
        Self::Shake256,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Sha512_224 => "sha512-224",
            Self::Sha512_256 => "sha512-256",
            Self::Sha3_224 => "sha3-224",
            Self::Sha3_256 => "sha3-256",
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_512 => "sha3-512",
            Self::Shake128 => "shake128",
            Self::Shake256 => "shake256",
        }
    }

    /// Output length in bytes. For the SHAKE functions this is the default
    /// output length used when no explicit length is requested.
    #[must_use]
    pub fn digest_size(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 | Self::Sha512_224 | Self::Sha3_224 => 28,
            Self::Sha256 | Self::Sha512_256 | Self::Sha3_256 | Self::Shake256 => 32,
            Self::Sha384 | Self::Sha3_384 => 48,
            Self::Sha512 | Self::Sha3_512 => 64,
            Self::Shake128 => 16,
        }
    }

    /// Extendable-output functions need `finish_xof` instead of `finish`.
    #[must_use]
    pub fn is_xof(&self) -> bool {
        matches!(self, Self::Shake128 | Self::Shake256)
    }

    /// Look the algorithm up in the OpenSSL provider.
    #[must_use]
    pub fn message_digest(&self) -> Option<MessageDigest> {
        MessageDigest::from_name(self.as_str())
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        Self::available().contains(self)
    }

    /// Algorithms the provider supports, probed once per process.
    pub fn available() -> &'static [DigestAlgorithm] {
        AVAILABLE.get_or_init(|| {
            let list: Vec<_> = Self::ALL
                .into_iter()
                .filter(|a| a.message_digest().is_some())
                .collect();
            log::debug!(
                "digest algorithms available from provider: {}",
                Self::choices_of(&list)
            );
            list
        })
    }

    /// Resolve the provider digest, failing with the list of valid choices.
    pub fn require(&self) -> SigningResult<MessageDigest> {
        match self.message_digest() {
            Some(md) if self.is_available() => Ok(md),
            _ => Err(self.unsupported_error()),
        }
    }

    fn unsupported_error(&self) -> SigningError {
        SigningError::UnsupportedDigestAlgorithm {
            requested: self.as_str().to_string(),
            available: Self::choices_of(Self::available()),
        }
    }

    fn choices_of(list: &[DigestAlgorithm]) -> String {
        list.iter()
            .map(DigestAlgorithm::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for DigestAlgorithm {
    type Err = SigningError;

    /// Names are case-sensitive and must be available from the provider.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::available()
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| SigningError::UnsupportedDigestAlgorithm {
                requested: s.to_string(),
                available: Self::choices_of(Self::available()),
            })
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_sha256() {
        assert_eq!(DigestAlgorithm::default(), DigestAlgorithm::Sha256);
        assert_eq!(DigestAlgorithm::default().digest_size(), 32);
    }

    #[test]
    fn test_common_algorithms_available() {
        for algo in [
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            assert!(algo.is_available(), "{algo} should be available");
            assert_eq!(algo.require().unwrap().size(), algo.digest_size());
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(
            "sha384".parse::<DigestAlgorithm>().unwrap(),
            DigestAlgorithm::Sha384
        );
        assert!("SHA384".parse::<DigestAlgorithm>().is_err());
        let err = "md5".parse::<DigestAlgorithm>().unwrap_err();
        assert!(matches!(
            err,
            SigningError::UnsupportedDigestAlgorithm { ref requested, .. } if requested == "md5"
        ));
        assert!(err.to_string().contains("sha256"));
    }

    #[test]
    fn test_names_round_trip_through_serde() {
        let json = serde_json::to_string(&DigestAlgorithm::Sha512_224).unwrap();
        assert_eq!(json, "\"sha512-224\"");
        let back: DigestAlgorithm = serde_json::from_str("\"sha3-256\"").unwrap();
        assert_eq!(back, DigestAlgorithm::Sha3_256);
    }

    #[test]
    fn test_every_name_is_distinct() {
        let mut names: Vec<_> = DigestAlgorithm::ALL.iter().map(|a| a.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DigestAlgorithm::ALL.len());
    }
}

//! Wire-level and ASN.1 constants used across the signing subsystem.

use der::asn1::ObjectIdentifier;

/// Request content type for RFC 3161 timestamp queries.
pub const TIMESTAMP_QUERY_CONTENT_TYPE: &str = "application/timestamp-query";

/// The only response content type accepted from a timestamp authority.
pub const TIMESTAMP_REPLY_CONTENT_TYPE: &str = "application/timestamp-reply";

/// User agent sent by every transport.
pub const USER_AGENT: &str = concat!("resedit-signing/", env!("CARGO_PKG_VERSION"));

/// Default request timeout for timestamp servers, in seconds.
pub const DEFAULT_TIMESTAMP_TIMEOUT_SECS: u64 = 30;

/// Largest timestamp response, headers included, the socket transport reads.
pub const MAX_TIMESTAMP_RESPONSE_BYTES: usize = 1024 * 1024;

/// rsaEncryption (PKCS#1)
pub const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// id-dsa (X9.57)
pub const OID_DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");

/// id-signedData (PKCS#7 / CMS)
pub const OID_SIGNED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");

// PEM armour labels recognised by the key and certificate scanners.
pub const PEM_LABEL_CERTIFICATE: &str = "CERTIFICATE";
pub const PEM_LABEL_RSA_PRIVATE_KEY: &str = "RSA PRIVATE KEY";
pub const PEM_LABEL_DSA_PRIVATE_KEY: &str = "DSA PRIVATE KEY";
pub const PEM_LABEL_PRIVATE_KEY: &str = "PRIVATE KEY";

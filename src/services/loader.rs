//! Certificate and key material loading.
//!
//! Two sources are supported: a PKCS#12 container, or a PEM private key paired
//! with a certificate file. Either way the certificates are run through chain
//! reconstruction and selection before they reach the signer, so the output
//! order is leaf first within each chain no matter how the input was ordered.

use std::fs;
use std::path::Path;

use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::SignedData;
use der::{Decode, Encode};
use openssl::pkcs12::Pkcs12;
use openssl::x509::X509Ref;

use crate::domain::constants::OID_SIGNED_DATA;
use crate::domain::crypto::{
    CertAndKeyData, CertBag, CertRecord, Certificate, ChainEntry, PrivateKeyPem,
};
use crate::domain::pem::{certificate_blocks, pick_private_keys};
use crate::domain::selection::select_certificates;
use crate::domain::types::{CertSelectMode, KeySource, Password, SignDefinition};
use crate::infra::error::{SigningError, SigningResult};

/// Load key and certificates from the files named by `definition`.
///
/// Material errors are reported with the offending file path.
pub fn prepare(definition: &SignDefinition) -> SigningResult<CertAndKeyData> {
    let password = definition.password.as_ref();
    match &definition.source {
        KeySource::P12 { p12_file } => {
            let bytes = read_file(p12_file)?;
            load_from_p12(&bytes, definition.cert_select, password)
                .map_err(|e| e.in_file(p12_file))
        }
        KeySource::Pem {
            private_key_file,
            certificate_file,
        } => {
            let key_bytes = read_file(private_key_file)?;
            let cert_bytes = read_file(certificate_file)?;

            let key_text = String::from_utf8_lossy(&key_bytes);
            let (is_rsa, private_key) =
                pick_first_key(&key_text).map_err(|e| e.in_file(private_key_file))?;
            let certificates = load_certificate_file(&cert_bytes, definition.cert_select)
                .map_err(|e| e.in_file(certificate_file))?;

            Ok(CertAndKeyData {
                certificates,
                private_key,
                is_rsa,
                password: password.cloned(),
            })
        }
    }
}

fn read_file(path: &Path) -> SigningResult<Vec<u8>> {
    log::debug!("reading {}", path.display());
    fs::read(path).map_err(|e| SigningError::io(path, e))
}

/// Extract the private key and selected certificates from PKCS#12 data.
///
/// A missing password is tried as the empty password. The key is returned as
/// unencrypted PKCS#8 PEM. The container's key type is not inspected and the
/// result always reports RSA.
pub fn load_from_p12(
    data: &[u8],
    mode: CertSelectMode,
    password: Option<&Password>,
) -> SigningResult<CertAndKeyData> {
    let container =
        Pkcs12::from_der(data).map_err(|e| SigningError::InvalidContainer(e.to_string()))?;
    let parsed = container
        .parse2(password.map_or("", Password::as_str))
        .map_err(|e| SigningError::InvalidContainer(e.to_string()))?;

    let key = parsed
        .pkey
        .ok_or_else(|| SigningError::NoPrivateKey("the container has no key bag".to_string()))?;

    let mut bags = Vec::new();
    if let Some(cert) = parsed.cert.as_deref() {
        bags.push(cert_bag(cert)?);
    }
    if let Some(ca) = parsed.ca.as_ref() {
        for cert in ca {
            bags.push(cert_bag(cert)?);
        }
    }
    log::debug!("PKCS#12 container holds {} certificate bag(s)", bags.len());

    let certificates = select_der(&bags, mode)?;

    let pem = key.private_key_to_pem_pkcs8()?;
    let pem = String::from_utf8(pem).map_err(|_| {
        SigningError::CryptographicOperation("private key PEM is not UTF-8".to_string())
    })?;
    log::debug!("PKCS#12 key type is reported as RSA without inspection");

    Ok(CertAndKeyData {
        certificates,
        private_key: PrivateKeyPem::new(pem),
        is_rsa: true,
        password: password.cloned(),
    })
}

fn cert_bag(cert: &X509Ref) -> SigningResult<CertRecord> {
    let friendly_name = cert
        .alias()
        .map(|alias| String::from_utf8_lossy(alias).into_owned());
    let certificate = match Certificate::from_der(cert.to_der()?) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("skipping unreadable certificate bag: {e}");
            None
        }
    };
    Ok(CertRecord::Bag(CertBag {
        certificate,
        friendly_name,
    }))
}

/// Build a bundle from PEM key text and certificate file contents.
pub fn load_from_pem(
    key_text: &str,
    certificate_data: &[u8],
    mode: CertSelectMode,
    password: Option<&Password>,
) -> SigningResult<CertAndKeyData> {
    let (is_rsa, private_key) = pick_first_key(key_text)?;
    let certificates = load_certificate_file(certificate_data, mode)?;
    Ok(CertAndKeyData {
        certificates,
        private_key,
        is_rsa,
        password: password.cloned(),
    })
}

fn pick_first_key(key_text: &str) -> SigningResult<(bool, PrivateKeyPem)> {
    let (algorithm, pem) = pick_private_keys(key_text).into_iter().next().ok_or_else(|| {
        SigningError::NoPrivateKey("no RSA or DSA private key block found".to_string())
    })?;
    log::debug!("private key algorithm: {algorithm:?}");
    Ok((algorithm.is_rsa(), pem))
}

/// Read a certificate file and return the selected certificates as DER.
///
/// The data is tried as a single DER certificate, then as a PKCS#7
/// certificates-only bundle, then as PEM text with `CERTIFICATE` blocks.
pub fn load_certificate_file(data: &[u8], mode: CertSelectMode) -> SigningResult<Vec<Vec<u8>>> {
    let records = if let Ok(single) = Certificate::from_der(data.to_vec()) {
        log::debug!("certificate file is a single DER certificate");
        vec![CertRecord::from(single)]
    } else if let Some(bundle) = pkcs7_certificates(data) {
        log::debug!(
            "certificate file is a PKCS#7 bundle with {} certificate(s)",
            bundle.len()
        );
        bundle
    } else {
        pem_certificates(data)?
    };
    select_der(&records, mode)
}

fn pkcs7_certificates(data: &[u8]) -> Option<Vec<CertRecord>> {
    let content = ContentInfo::from_der(data).ok()?;
    if content.content_type != OID_SIGNED_DATA {
        return None;
    }
    let signed: SignedData = content.content.decode_as().ok()?;
    let set = signed.certificates?;

    let mut records = Vec::new();
    for choice in set.0.iter() {
        match choice {
            CertificateChoices::Certificate(cert) => {
                let parsed = Certificate::from_der(cert.to_der().ok()?).ok()?;
                records.push(CertRecord::from(parsed));
            }
            _ => log::debug!("skipping non-X.509 certificate choice"),
        }
    }
    Some(records)
}

fn pem_certificates(data: &[u8]) -> SigningResult<Vec<CertRecord>> {
    let unsupported =
        || SigningError::InvalidCertificateFile("not DER, PKCS#7 or PEM certificate data".into());

    let text = std::str::from_utf8(data).map_err(|_| unsupported())?;
    let blocks = certificate_blocks(text);
    if blocks.is_empty() {
        return Err(unsupported());
    }
    log::debug!("certificate file has {} PEM block(s)", blocks.len());

    blocks
        .iter()
        .map(|block| {
            let der = block.to_der().ok_or_else(unsupported)?;
            Certificate::from_der(der).map(CertRecord::from)
        })
        .collect()
}

fn select_der(records: &[CertRecord], mode: CertSelectMode) -> SigningResult<Vec<Vec<u8>>> {
    let selected: Vec<Vec<u8>> = select_certificates(records, mode)
        .into_iter()
        .filter_map(|record| record.certificate())
        .map(Certificate::to_der_vec)
        .collect();
    if selected.is_empty() {
        return Err(SigningError::NoCertificates(format!(
            "nothing left after '{mode}' selection of {} record(s)",
            records.len()
        )));
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_container_is_invalid() {
        let err = load_from_p12(b"definitely not pkcs12", CertSelectMode::Leaf, None).unwrap_err();
        assert!(matches!(err, SigningError::InvalidContainer(_)));
    }

    #[test]
    fn test_garbage_certificate_file_is_invalid() {
        for data in [&b"\x00\x01\x02"[..], b"plain text without armour", b"\xff\xfe"] {
            let err = load_certificate_file(data, CertSelectMode::All).unwrap_err();
            assert!(matches!(err, SigningError::InvalidCertificateFile(_)), "{err:?}");
        }
    }

    #[test]
    fn test_missing_key_block() {
        let err = load_from_pem("no keys here", b"", CertSelectMode::Leaf, None).unwrap_err();
        assert!(matches!(err, SigningError::NoPrivateKey(_)));
    }

    #[test]
    fn test_prepare_reports_missing_file() {
        let definition = SignDefinition::with_p12("/nonexistent/dir/cert.pfx");
        match prepare(&definition).unwrap_err() {
            SigningError::Io { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/dir/cert.pfx"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

//! PEM block selection on top of the `pem` crate.
//!
//! Blocks are recognised only when the BEGIN/END armour lines stand alone on
//! their line. A BEGIN line seen while a block is already open is ignored, and
//! an END line with a different label closes the open block without keeping
//! it. Text outside blocks is skipped, so key and certificate files may carry
//! comments or `openssl x509 -text` dumps around the armour. Each selected
//! block is then decoded by `pem::parse`, which also keeps encapsulated
//! headers such as `Proc-Type` and `DEK-Info`.

use der::asn1::{Any, ObjectIdentifier};
use der::{Decode, Tag, Tagged};
use pem::{EncodeConfig, LineEnding, Pem};

use crate::domain::constants::{
    OID_DSA, OID_RSA_ENCRYPTION, PEM_LABEL_CERTIFICATE, PEM_LABEL_DSA_PRIVATE_KEY,
    PEM_LABEL_PRIVATE_KEY, PEM_LABEL_RSA_PRIVATE_KEY,
};
use crate::domain::crypto::{KeyAlgorithm, PrivateKeyPem};

/// One armoured block as it appeared in the input, with `\n` line endings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    pub label: String,
    armoured: String,
}

impl PemBlock {
    /// Parse the block. Fails on a body that is not base64.
    pub fn decode(&self) -> Result<Pem, pem::PemError> {
        pem::parse(&self.armoured)
    }

    /// The decoded body.
    #[must_use]
    pub fn to_der(&self) -> Option<Vec<u8>> {
        self.decode().ok().map(Pem::into_contents)
    }
}

/// Re-armour with 64 column lines and `\n` endings, headers included.
#[must_use]
pub fn encode_pem(block: &Pem) -> String {
    pem::encode_config(block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

fn armour_label<'l>(line: &'l str, kind: &str) -> Option<&'l str> {
    line.strip_prefix("-----")?
        .strip_prefix(kind)?
        .strip_prefix(' ')?
        .strip_suffix("-----")
}

/// Collect every block whose label is one of `labels`.
#[must_use]
pub fn scan_blocks(text: &str, labels: &[&str]) -> Vec<PemBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<PemBlock> = None;

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(label) = armour_label(line, "BEGIN").filter(|l| labels.contains(l)) {
            if open.is_none() {
                open = Some(PemBlock {
                    label: label.to_string(),
                    armoured: format!("{line}\n"),
                });
            }
        } else if let Some(label) = armour_label(line, "END").filter(|l| labels.contains(l)) {
            if let Some(mut block) = open.take() {
                if block.label == label {
                    block.armoured.push_str(line);
                    block.armoured.push('\n');
                    blocks.push(block);
                }
            }
        } else if let Some(block) = open.as_mut() {
            block.armoured.push_str(line);
            block.armoured.push('\n');
        }
    }
    blocks
}

/// Split certificate PEM text into `CERTIFICATE` blocks.
#[must_use]
pub fn certificate_blocks(text: &str) -> Vec<PemBlock> {
    scan_blocks(text, &[PEM_LABEL_CERTIFICATE])
}

/// Find private keys in PEM text, in file order.
///
/// `RSA PRIVATE KEY` and `DSA PRIVATE KEY` blocks are taken at their word.
/// Blocks whose body does not decode are skipped. An algorithm-neutral `PRIVATE KEY` block is a PKCS#8 `PrivateKeyInfo`; its
/// algorithm is read from the embedded identifier, and blocks that are
/// neither RSA nor DSA are skipped.
#[must_use]
pub fn pick_private_keys(text: &str) -> Vec<(KeyAlgorithm, PrivateKeyPem)> {
    scan_blocks(
        text,
        &[
            PEM_LABEL_RSA_PRIVATE_KEY,
            PEM_LABEL_DSA_PRIVATE_KEY,
            PEM_LABEL_PRIVATE_KEY,
        ],
    )
    .into_iter()
    .filter_map(|block| {
        let decoded = match block.decode() {
            Ok(decoded) => decoded,
            Err(e) => {
                log::debug!("skipping {} block: {e}", block.label);
                return None;
            }
        };
        let algorithm = match decoded.tag() {
            PEM_LABEL_RSA_PRIVATE_KEY => KeyAlgorithm::Rsa,
            PEM_LABEL_DSA_PRIVATE_KEY => KeyAlgorithm::Dsa,
            _ => sniff_pkcs8_algorithm(decoded.contents())?,
        };
        Some((algorithm, PrivateKeyPem::new(encode_pem(&decoded))))
    })
    .collect()
}

/// Read the key algorithm out of a DER `PrivateKeyInfo`.
///
/// ```text
/// PrivateKeyInfo ::= SEQUENCE {
///   version              Version,
///   privateKeyAlgorithm  AlgorithmIdentifier,
///   privateKey           OCTET STRING }
/// ```
#[must_use]
pub fn sniff_pkcs8_algorithm(der_bytes: &[u8]) -> Option<KeyAlgorithm> {
    let info = Vec::<Any>::from_der(der_bytes).ok()?;
    if info.len() != 3 || info[1].tag() != Tag::Sequence {
        return None;
    }
    let algorithm_id: Vec<Any> = info[1].decode_as().ok()?;
    if algorithm_id.len() != 2 {
        return None;
    }
    let oid: ObjectIdentifier = algorithm_id[0].decode_as().ok()?;
    if oid == OID_RSA_ENCRYPTION {
        Some(KeyAlgorithm::Rsa)
    } else if oid == OID_DSA {
        Some(KeyAlgorithm::Dsa)
    } else {
        None
    }
}

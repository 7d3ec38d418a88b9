//! Shared fixtures for integration tests.
//!
//! Everything is generated at test time: RSA and DSA keys, a three-level
//! certificate chain, PKCS#12 containers and PKCS#7 certificate bundles.
//! A small warp server stands in for a timestamp authority.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cms::cert::CertificateChoices;
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{CertificateSet, EncapsulatedContentInfo, SignedData, SignerInfos};
use der::asn1::{Any, ObjectIdentifier, SetOfVec};
use der::{Decode, Encode};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::dsa::Dsa;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::extension::BasicConstraints;
use openssl::x509::{X509NameBuilder, X509};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use warp::Filter;

use resedit_signing::domain::constants::OID_SIGNED_DATA;

const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");

pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

pub fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

pub fn dsa_key() -> PKey<Private> {
    PKey::from_dsa(Dsa::generate(2048).unwrap()).unwrap()
}

/// A certificate together with the key it certifies.
pub struct Issued {
    pub cert: X509,
    pub key: PKey<Private>,
}

impl Issued {
    pub fn der(&self) -> Vec<u8> {
        self.cert.to_der().unwrap()
    }

    pub fn pem(&self) -> String {
        String::from_utf8(self.cert.to_pem().unwrap()).unwrap()
    }
}

/// Issue a certificate for `key`. Self-signed when `issuer` is `None`.
pub fn issue_with_key(
    common_name: &str,
    key: PKey<Private>,
    issuer: Option<&Issued>,
    ca: bool,
) -> Issued {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    let name = name.build();

    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder
        .set_serial_number(&serial.to_asn1_integer().unwrap())
        .unwrap();
    builder.set_subject_name(&name).unwrap();
    match issuer {
        Some(issuer) => builder.set_issuer_name(issuer.cert.subject_name()).unwrap(),
        None => builder.set_issuer_name(&name).unwrap(),
    }
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();
    if ca {
        builder
            .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
    }
    let signing_key = issuer.map_or(&key, |i| &i.key);
    builder.sign(signing_key, MessageDigest::sha256()).unwrap();

    Issued {
        cert: builder.build(),
        key,
    }
}

pub fn issue(common_name: &str, issuer: Option<&Issued>, ca: bool) -> Issued {
    issue_with_key(common_name, rsa_key(), issuer, ca)
}

/// Root, intermediate and leaf, each issued by the previous one.
pub struct Chain {
    pub root: Issued,
    pub intermediate: Issued,
    pub leaf: Issued,
}

impl Chain {
    pub fn new() -> Self {
        let root = issue("Resedit Test Root CA", None, true);
        let intermediate = issue("Resedit Test Intermediate CA", Some(&root), true);
        let leaf = issue("Resedit Test Code Signing", Some(&intermediate), false);
        Self {
            root,
            intermediate,
            leaf,
        }
    }

    /// DER certificates in leaf-to-root order.
    pub fn leaf_first(&self) -> Vec<Vec<u8>> {
        vec![self.leaf.der(), self.intermediate.der(), self.root.der()]
    }
}

/// Concatenate PEM certificates with some surrounding noise.
pub fn pem_bundle(certs: &[&Issued]) -> String {
    let mut out = String::from("# generated for tests\n");
    for cert in certs {
        out.push_str("Certificate:\n    (text dump omitted)\n");
        out.push_str(&cert.pem());
    }
    out
}

/// Build a PKCS#12 container with the given pieces.
pub fn p12(
    key: Option<&PKey<Private>>,
    cert: Option<&Issued>,
    ca: &[&Issued],
    password: &str,
) -> Vec<u8> {
    let mut builder = Pkcs12::builder();
    builder.name("resedit test");
    if let Some(key) = key {
        builder.pkey(key);
    }
    if let Some(cert) = cert {
        builder.cert(&cert.cert);
    }
    if !ca.is_empty() {
        let mut stack = Stack::new().unwrap();
        for issued in ca {
            stack.push(issued.cert.clone()).unwrap();
        }
        builder.ca(stack);
    }
    builder.build2(password).unwrap().to_der().unwrap()
}

/// DER `ContentInfo` holding a certificates-only `SignedData`.
pub fn pkcs7_bundle(certs: &[&Issued]) -> Vec<u8> {
    let choices: Vec<CertificateChoices> = certs
        .iter()
        .map(|issued| {
            CertificateChoices::Certificate(x509_cert::Certificate::from_der(&issued.der()).unwrap())
        })
        .collect();

    let signed = SignedData {
        version: CmsVersion::V1,
        digest_algorithms: SetOfVec::new(),
        encap_content_info: EncapsulatedContentInfo {
            econtent_type: ID_DATA,
            econtent: None,
        },
        certificates: Some(CertificateSet(SetOfVec::try_from(choices).unwrap())),
        crls: None,
        signer_infos: SignerInfos(SetOfVec::new()),
    };

    ContentInfo {
        content_type: OID_SIGNED_DATA,
        content: Any::encode_from(&signed).unwrap(),
    }
    .to_der()
    .unwrap()
}

/// What the mock timestamp authority received.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub body: Vec<u8>,
}

pub type Captured = Arc<Mutex<Vec<CapturedRequest>>>;

/// Start a mock timestamp authority on an ephemeral port.
///
/// Every POST to `/tsa` is answered with `status`, the given content type
/// (if any) and `reply` as the body. Returns the URL and the request log.
pub fn spawn_tsa(
    status: u16,
    content_type: Option<&'static str>,
    reply: Vec<u8>,
) -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let log = captured.clone();

    let route = warp::post()
        .and(warp::path("tsa"))
        .and(warp::path::end())
        .and(warp::header::optional::<String>("content-type"))
        .and(warp::header::optional::<String>("content-length"))
        .and(warp::body::bytes())
        .map(
            move |content_type_in: Option<String>,
                  content_length: Option<String>,
                  body: warp::hyper::body::Bytes| {
                log.lock().unwrap().push(CapturedRequest {
                    content_type: content_type_in,
                    content_length,
                    body: body.to_vec(),
                });
                let mut response = warp::http::Response::builder().status(status);
                if let Some(content_type) = content_type {
                    response = response.header("content-type", content_type);
                }
                response.body(reply.clone()).unwrap()
            },
        );

    let (addr, server): (SocketAddr, _) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (format!("http://{addr}/tsa"), captured)
}

/// Start a timestamp authority that sends its headers at once and then
/// trickles a 64 byte body, one byte per `interval`.
pub fn spawn_trickling_tsa(interval: Duration) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();
    let listener = tokio::net::TcpListener::from_std(listener).unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                // wait for the end of the request head before answering
                let mut seen = Vec::new();
                let mut buf = [0u8; 1024];
                while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => seen.extend_from_slice(&buf[..n]),
                    }
                }
                let head = "HTTP/1.1 200 OK\r\n\
                            Content-Type: application/timestamp-reply\r\n\
                            Content-Length: 64\r\n\r\n";
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for _ in 0..64 {
                    tokio::time::sleep(interval).await;
                    if socket.write_all(&[0x30]).await.is_err() {
                        return;
                    }
                }
            });
        }
    });
    format!("http://{addr}/tsa")
}

/// A loopback URL nothing is listening on.
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/tsa")
}

//! Service layer module root.
//! Loads signing material, signs, and talks to timestamp authorities.

pub mod loader;
pub mod signer;
pub mod signing;
pub mod timestamp;

pub use loader::{load_certificate_file, load_from_p12, load_from_pem, prepare};
pub use signer::{DataChunks, OpenSslSigner, Signer};
pub use signing::{build_signer, sign_executable, AuthenticodeEmbedder, SigningOptions};
pub use timestamp::TimestampClient;

//! Domain layer: signing material types and the pure algorithms over them.
//!
//! Nothing in here performs I/O. Chain reconstruction and selection operate on
//! the `ChainEntry` abstraction so they can be exercised without real
//! certificates.

pub mod chain;
pub mod constants;
pub mod crypto;
pub mod pem;
pub mod selection;
pub mod types;

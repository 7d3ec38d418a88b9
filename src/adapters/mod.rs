//! Adapter layer modules for external system integration.
//!
//! Provides adapters for:
//! - HTTP transports used to reach RFC 3161 timestamp authorities
pub mod transport;

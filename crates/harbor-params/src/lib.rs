//! Harbor network parameters and constants
//!
//! This crate provides the per-network version-byte tables used by the
//! address and key codecs, plus a process-wide registry that can be
//! extended with new network definitions at runtime.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod network;
pub mod registry;

pub use network::{AddressKind, Network, NetworkType, VersionBytes};
pub use registry::{get, is_registered, names, register};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or unknown network specified
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// A network with the same name is already registered
    #[error("Network already registered: {0}")]
    AlreadyRegistered(String),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;

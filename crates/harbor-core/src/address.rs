//! Address encoding, decoding and validation
//!
//! A Harbor address is the base58 form of a 25-byte payload: one network
//! version byte, a 20-byte hash160, and a 4-byte checksum (the first four
//! bytes of the double SHA-256 of version plus hash). The version byte
//! decides whether the address is pay-to-public-key-hash or
//! pay-to-script-hash; the kind is fixed once, at construction time.

use crate::hashes::sha256d;
use crate::{Error, Result};
use harbor_params::{AddressKind, Network};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the decoded address payload
pub const ADDRESS_PAYLOAD_LEN: usize = 25;

/// Length of the checksum suffix
const CHECKSUM_LEN: usize = 4;

/// A validated, immutable address value object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    encoded: String,
    version: u8,
    hash: [u8; 20],
    kind: AddressKind,
}

impl Address {
    /// Build an address from a public-key hash under the given network.
    pub fn from_pubkey_hash(hash: [u8; 20], network: &Network) -> Self {
        Self::from_hash(hash, AddressKind::P2pkh, network)
    }

    /// Build an address from a script hash under the given network.
    pub fn from_script_hash(hash: [u8; 20], network: &Network) -> Self {
        Self::from_hash(hash, AddressKind::P2sh, network)
    }

    /// Build an address of the given kind from a raw hash160.
    pub fn from_hash(hash: [u8; 20], kind: AddressKind, network: &Network) -> Self {
        let version = network.version_for(kind);
        Self {
            encoded: encode_base58check(version, &hash),
            version,
            hash,
            kind,
        }
    }

    /// Decode and validate an address string against a network.
    ///
    /// Fails when the payload length is wrong, the checksum does not match,
    /// or the version byte belongs to neither of the network's address
    /// kinds.
    pub fn decode(encoded: &str, network: &Network) -> Result<Self> {
        let payload = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| Error::InvalidAddress(format!("{encoded}: {e}")))?;

        if payload.len() != ADDRESS_PAYLOAD_LEN {
            return Err(Error::InvalidAddress(format!(
                "{encoded}: expected {ADDRESS_PAYLOAD_LEN} bytes, got {}",
                payload.len()
            )));
        }

        let (body, checksum) = payload.split_at(ADDRESS_PAYLOAD_LEN - CHECKSUM_LEN);
        let expected = &sha256d(body)[..CHECKSUM_LEN];
        if checksum != expected {
            return Err(Error::InvalidAddress(format!("{encoded}: bad checksum")));
        }

        let version = body[0];
        let kind = network.classify_version(version).ok_or_else(|| {
            Error::InvalidAddress(format!(
                "{encoded}: version byte {version:#04x} does not belong to network {}",
                network.name
            ))
        })?;

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&body[1..]);

        Ok(Self {
            encoded: encoded.to_string(),
            version,
            hash,
            kind,
        })
    }

    /// Check address validity for a network.
    ///
    /// Never errors: any structural or network mismatch is `false`.
    pub fn is_valid(encoded: &str, network: &Network) -> bool {
        Self::decode(encoded, network).is_ok()
    }

    /// The base58 string form
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// The network version byte
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The 20-byte hash160 payload
    pub fn hash160(&self) -> &[u8; 20] {
        &self.hash
    }

    /// Address kind, as classified from the version byte
    pub fn kind(&self) -> AddressKind {
        self.kind
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Encode a version byte and hash160 into the base58check string form.
fn encode_base58check(version: u8, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(ADDRESS_PAYLOAD_LEN);
    payload.push(version);
    payload.extend_from_slice(hash);
    let checksum = sha256d(&payload);
    payload.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    bs58::encode(payload).into_string()
}

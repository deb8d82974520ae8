//! Harbor network definitions

use serde::{Deserialize, Serialize};

/// Network type enumeration for the built-in networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkType {
    /// Mainnet
    Mainnet,
    /// Testnet
    Testnet,
}

/// Address kind, determined by which version byte an address matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressKind {
    /// Pay-to-public-key-hash
    P2pkh,
    /// Pay-to-script-hash
    P2sh,
}

/// Version-byte table for a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionBytes {
    /// Version byte for pay-to-public-key-hash addresses
    pub p2pkh: u8,
    /// Version byte for pay-to-script-hash addresses
    pub p2sh: u8,
    /// Prefix for extended private keys
    pub xpriv: [u8; 4],
    /// Prefix for extended public keys
    pub xpub: [u8; 4],
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Human-readable name, unique within the registry
    pub name: String,
    /// Version-byte table
    pub version_bytes: VersionBytes,
    /// Coin type (BIP-44)
    pub coin_type: u32,
}

impl Network {
    /// Get mainnet parameters
    pub fn mainnet() -> Self {
        Self {
            name: "mainnet".to_string(),
            version_bytes: VersionBytes {
                p2pkh: 0x28,
                p2sh: 0x64,
                xpriv: [0x04, 0x88, 0xad, 0xe4],
                xpub: [0x04, 0x88, 0xb2, 0x1e],
            },
            coin_type: 280,
        }
    }

    /// Get testnet parameters
    pub fn testnet() -> Self {
        Self {
            name: "testnet".to_string(),
            version_bytes: VersionBytes {
                p2pkh: 0x49,
                p2sh: 0x87,
                xpriv: [0x04, 0x35, 0x83, 0x94],
                xpub: [0x04, 0x35, 0x87, 0xcf],
            },
            coin_type: 280,
        }
    }

    /// Get network by type
    pub fn from_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Testnet => Self::testnet(),
        }
    }

    /// Classify an address version byte against this network's table.
    ///
    /// Returns `None` when the byte belongs to neither address kind, in
    /// which case the address must be rejected for this network.
    pub fn classify_version(&self, version: u8) -> Option<AddressKind> {
        if version == self.version_bytes.p2pkh {
            Some(AddressKind::P2pkh)
        } else if version == self.version_bytes.p2sh {
            Some(AddressKind::P2sh)
        } else {
            None
        }
    }

    /// Version byte for the given address kind
    pub fn version_for(&self, kind: AddressKind) -> u8 {
        match kind {
            AddressKind::P2pkh => self.version_bytes.p2pkh,
            AddressKind::P2sh => self.version_bytes.p2sh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_params() {
        let net = Network::mainnet();
        assert_eq!(net.name, "mainnet");
        assert_eq!(net.coin_type, 280);
        assert_eq!(net.version_bytes.p2pkh, 0x28);
        assert_eq!(net.version_bytes.p2sh, 0x64);
    }

    #[test]
    fn test_network_from_type() {
        let net = Network::from_type(NetworkType::Testnet);
        assert_eq!(net.name, "testnet");
        assert_eq!(net.version_bytes.p2pkh, 0x49);
    }

    #[test]
    fn test_classify_version() {
        let net = Network::mainnet();
        assert_eq!(net.classify_version(0x28), Some(AddressKind::P2pkh));
        assert_eq!(net.classify_version(0x64), Some(AddressKind::P2sh));
        assert_eq!(net.classify_version(0x00), None);
        // Testnet bytes are not valid on mainnet
        assert_eq!(net.classify_version(0x49), None);
    }

    #[test]
    fn test_version_for_kind_roundtrip() {
        let net = Network::testnet();
        for kind in [AddressKind::P2pkh, AddressKind::P2sh] {
            let byte = net.version_for(kind);
            assert_eq!(net.classify_version(byte), Some(kind));
        }
    }
}

//! Process-wide network registry
//!
//! Seeded with the built-in networks at first use. New definitions can be
//! appended at runtime (e.g. a private network for integration tests);
//! registered definitions are immutable and redefinition is rejected.

use crate::network::Network;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;

static REGISTRY: Lazy<RwLock<HashMap<String, Network>>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for net in [Network::mainnet(), Network::testnet()] {
        map.insert(net.name.clone(), net);
    }
    RwLock::new(map)
});

/// Register a new network definition.
///
/// Fails with [`Error::AlreadyRegistered`] when a network with the same
/// name exists; the registry is append-only.
pub fn register(network: Network) -> Result<()> {
    let mut registry = REGISTRY.write();
    if registry.contains_key(&network.name) {
        return Err(Error::AlreadyRegistered(network.name));
    }
    registry.insert(network.name.clone(), network);
    Ok(())
}

/// Look up a network by name.
pub fn get(name: &str) -> Result<Network> {
    REGISTRY
        .read()
        .get(name)
        .cloned()
        .ok_or_else(|| Error::InvalidNetwork(name.to_string()))
}

/// Check whether a network name is registered.
pub fn is_registered(name: &str) -> bool {
    REGISTRY.read().contains_key(name)
}

/// List all registered network names.
pub fn names() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY.read().keys().cloned().collect();
    names.sort();
    names
}

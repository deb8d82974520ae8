//! Wallet adapter boundary
//!
//! The proposal assembler never talks to a concrete wallet service; it
//! depends on [`WalletAdapter`], implemented once per backing wallet kind.
//! The adapter owns utxo queries, the wallet-wide "next unused address"
//! cursor (increment-on-use), ownership checks, and outpoint lookups.
//! Query results are treated as already filtered for spendability.

use crate::transaction::{Capabilities, TokenId, TxId};
use crate::{Address, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An unspent output as reported by the wallet service.
///
/// Read-only from the core's perspective: the engine selects and
/// references utxos, it never mutates ledger state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utxo {
    /// Id of the transaction holding the output
    pub tx_id: TxId,
    /// Output index within that transaction
    pub index: u8,
    /// Owning address
    pub address: Address,
    /// Derivation path of the owning address
    pub path: String,
    /// Token held by the output
    pub token: TokenId,
    /// Value in base units, or the capability bitmask for authorities
    pub value: u64,
    /// Authority bitmask; zero for monetary outputs
    pub authorities: u64,
    /// Absolute timelock, if any
    pub timelock: Option<u32>,
    /// Height lock, if any
    pub heightlock: Option<u32>,
    /// Whether the wallet considers the output locked
    pub locked: bool,
}

impl Utxo {
    /// True iff this utxo carries authority capabilities.
    pub fn is_authority(&self) -> bool {
        self.authorities != 0
    }

    /// Typed view of the authority bitmask.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from_bits(self.authorities)
    }
}

/// Parameters of a utxo query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UtxoQuery {
    /// Monetary funding target
    pub amount: Option<u64>,
    /// Number of authority utxos requested
    pub authority_count: Option<usize>,
    /// Capabilities the authority utxos must carry
    pub authorities: Option<Capabilities>,
    /// Restrict results to one owning address
    pub address_filter: Option<Address>,
}

impl UtxoQuery {
    /// Query for monetary utxos covering `amount`.
    pub fn amount(amount: u64) -> Self {
        Self {
            amount: Some(amount),
            ..Self::default()
        }
    }

    /// Query for `count` authority utxos carrying `capabilities`.
    pub fn authorities(capabilities: Capabilities, count: usize) -> Self {
        Self {
            authority_count: Some(count),
            authorities: Some(capabilities),
            ..Self::default()
        }
    }

    /// Restrict the query to utxos owned by one address.
    pub fn with_address(mut self, address: Address) -> Self {
        self.address_filter = Some(address);
        self
    }
}

/// The wallet-side collaborator interface the assembler needs.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Fetch spendable utxos for a token. Results are already filtered
    /// for spendability (not locked, not time-locked in the future); any
    /// ordering heuristic belongs to the implementation.
    async fn query_utxos(&self, token: &TokenId, query: &UtxoQuery) -> Result<Vec<Utxo>>;

    /// Allocate the next unused wallet address, marking it used.
    /// Returns the address with its derivation path.
    async fn next_unused_address(&self) -> Result<(Address, String)>;

    /// Whether the address belongs to this wallet.
    async fn is_address_mine(&self, address: &Address) -> Result<bool>;

    /// Resolve an outpoint to a wallet utxo, if the wallet holds it.
    async fn get_utxo(&self, tx_id: &TxId, index: u8) -> Result<Option<Utxo>>;
}

#[cfg(any(test, feature = "test-helpers"))]
pub use memory::MemoryWallet;

#[cfg(any(test, feature = "test-helpers"))]
mod memory {
    use super::*;
    use crate::Error;
    use parking_lot::Mutex;

    /// In-memory wallet double for tests.
    ///
    /// Holds a fixed address pool with a serialized cursor and a flat utxo
    /// set returned in insertion order.
    #[derive(Default)]
    pub struct MemoryWallet {
        utxos: Mutex<Vec<Utxo>>,
        addresses: Mutex<Vec<(Address, String)>>,
        cursor: Mutex<usize>,
    }

    impl MemoryWallet {
        /// Create an empty wallet.
        pub fn new() -> Self {
            Self::default()
        }

        /// Add an address to the pool (also used for ownership checks).
        pub fn add_address(&self, address: Address, path: String) {
            self.addresses.lock().push((address, path));
        }

        /// Add a utxo to the set.
        pub fn add_utxo(&self, utxo: Utxo) {
            self.utxos.lock().push(utxo);
        }

        /// Addresses allocated so far through `next_unused_address`.
        pub fn allocated(&self) -> usize {
            *self.cursor.lock()
        }
    }

    #[async_trait]
    impl WalletAdapter for MemoryWallet {
        async fn query_utxos(&self, token: &TokenId, query: &UtxoQuery) -> Result<Vec<Utxo>> {
            let want_authorities = query.authority_count.is_some();
            let utxos = self
                .utxos
                .lock()
                .iter()
                .filter(|u| u.token == *token && !u.locked)
                .filter(|u| u.is_authority() == want_authorities)
                .filter(|u| match &query.authorities {
                    Some(caps) => u.capabilities().contains(*caps),
                    None => true,
                })
                .filter(|u| match &query.address_filter {
                    Some(address) => u.address == *address,
                    None => true,
                })
                .cloned()
                .collect();
            Ok(utxos)
        }

        async fn next_unused_address(&self) -> Result<(Address, String)> {
            let addresses = self.addresses.lock();
            let mut cursor = self.cursor.lock();
            let entry = addresses.get(*cursor).cloned().ok_or_else(|| {
                Error::InvalidAddress("test wallet address pool exhausted".to_string())
            })?;
            *cursor += 1;
            Ok(entry)
        }

        async fn is_address_mine(&self, address: &Address) -> Result<bool> {
            Ok(self.addresses.lock().iter().any(|(a, _)| a == address))
        }

        async fn get_utxo(&self, tx_id: &TxId, index: u8) -> Result<Option<Utxo>> {
            Ok(self
                .utxos
                .lock()
                .iter()
                .find(|u| u.tx_id == *tx_id && u.index == index)
                .cloned())
        }
    }
}

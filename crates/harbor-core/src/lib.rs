//! Harbor wallet engine core
//!
//! This crate implements the client-side transaction construction engine:
//! address and script codecs, transaction primitives with multi-token
//! bookkeeping, utxo selection, proposal assembly, token lifecycle
//! operations, and per-address key derivation and signing. Private key
//! material never crosses the wallet-service boundary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod builder;
pub mod error;
pub mod fees;
pub mod hashes;
pub mod keys;
pub mod script;
pub mod selection;
pub mod submit;
pub mod tokens;
pub mod transaction;
pub mod wallet;

pub use address::{Address, ADDRESS_PAYLOAD_LEN};
pub use builder::{finalize, OutputRequest, PendingProposal, ProposalBuilder};
pub use error::{Error, ErrorCategory, Result};
pub use fees::{DepositCalculator, TOKEN_DEPOSIT_PERCENT};
pub use keys::{derivation_path, pack_unlocking_data, KeyManager, Keypair, Signer};
pub use script::{build_p2pkh_script, build_p2sh_script, identify, parse, ParsedScript};
pub use selection::{SelectionResult, UtxoSelector};
pub use submit::{apply_outcome, MiningOutcome, SubmitError, Submitter};
pub use tokens::{CreateTokenOptions, MeltOptions, MintOptions, TokenManager};
pub use transaction::{
    is_authority, token_index, Capabilities, Input, Output, OutputScript, TokenId, TokenInfo,
    Transaction, TxId, AUTHORITY_MELT, AUTHORITY_MINT, CREATE_TOKEN_TX_VERSION, MAX_OUTPUT_VALUE,
    TOKEN_AUTHORITY_MASK, TOKEN_INDEX_MASK, TRANSFER_TX_VERSION,
};
pub use wallet::{Utxo, UtxoQuery, WalletAdapter};

#[cfg(feature = "test-helpers")]
pub use wallet::MemoryWallet;

//! Transaction primitives
//!
//! Output, Input and Transaction value objects, the token-data byte
//! algebra, and the canonical signature-hash serialization. Outputs are
//! plain records until they are asked to serialize; value bounds are
//! enforced at that point, not at construction.

use crate::hashes::sha256d;
use crate::script;
use crate::{Address, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version tag of a plain transfer transaction
pub const TRANSFER_TX_VERSION: u16 = 1;
/// Version tag of a token-creation transaction
pub const CREATE_TOKEN_TX_VERSION: u16 = 2;

/// Maximum representable output value (fits a signed 8-byte wire integer)
pub const MAX_OUTPUT_VALUE: u64 = i64::MAX as u64;

/// Largest value encoded as 4 wire bytes; above this the 8-byte form is used
pub const MAX_COMPACT_VALUE: u64 = i32::MAX as u64;

/// Low 7 bits of the token-data byte: index into the token list
pub const TOKEN_INDEX_MASK: u8 = 0x7f;
/// High bit of the token-data byte: authority flag
pub const TOKEN_AUTHORITY_MASK: u8 = 0x80;

/// Authority capability bit: minting new token units
pub const AUTHORITY_MINT: u64 = 0x01;
/// Authority capability bit: melting existing token units
pub const AUTHORITY_MELT: u64 = 0x02;

/// Maximum number of inputs or outputs (counts are one wire byte)
pub const MAX_TX_SLOTS: usize = 255;
/// Maximum number of listed tokens (indexes are 7 bits, 0 is the native token)
pub const MAX_TX_TOKENS: usize = 127;

/// Maximum token name length for token-creation transactions
pub const MAX_TOKEN_NAME_LEN: usize = 30;
/// Maximum token symbol length for token-creation transactions
pub const MAX_TOKEN_SYMBOL_LEN: usize = 5;

/// True iff the token-data byte marks an authority output.
pub fn is_authority(token_data: u8) -> bool {
    token_data & TOKEN_AUTHORITY_MASK != 0
}

/// Token-list index encoded in a token-data byte.
///
/// `None` means the network's native token; `Some(i)` is a zero-based
/// index into the transaction's token list.
pub fn token_index(token_data: u8) -> Option<usize> {
    match token_data & TOKEN_INDEX_MASK {
        0 => None,
        n => Some(n as usize - 1),
    }
}

/// A token identifier (the native token is the single byte `0x00`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(Vec<u8>);

impl TokenId {
    /// Wrap raw token uid bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The native token of the network
    pub fn native() -> Self {
        Self(vec![0x00])
    }

    /// True for the native token uid
    pub fn is_native(&self) -> bool {
        self.0 == [0x00]
    }

    /// Raw uid bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl FromStr for TokenId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(hex::decode(s)?))
    }
}

/// A transaction identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(Vec<u8>);

impl TxId {
    /// Wrap raw transaction id bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw id bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl FromStr for TxId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(hex::decode(s)?))
    }
}

/// Typed view over the authority capability bitmask.
///
/// On the wire an authority output reuses its `value` field as a bitmask;
/// application code only ever sees this struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// May create new token units
    pub mint: bool,
    /// May destroy existing token units
    pub melt: bool,
}

impl Capabilities {
    /// Mint capability only
    pub fn mint() -> Self {
        Self {
            mint: true,
            melt: false,
        }
    }

    /// Melt capability only
    pub fn melt() -> Self {
        Self {
            mint: false,
            melt: true,
        }
    }

    /// Both capabilities
    pub fn all() -> Self {
        Self {
            mint: true,
            melt: true,
        }
    }

    /// Decode from the wire bitmask
    pub fn from_bits(bits: u64) -> Self {
        Self {
            mint: bits & AUTHORITY_MINT != 0,
            melt: bits & AUTHORITY_MELT != 0,
        }
    }

    /// Encode to the wire bitmask
    pub fn bits(&self) -> u64 {
        let mut bits = 0;
        if self.mint {
            bits |= AUTHORITY_MINT;
        }
        if self.melt {
            bits |= AUTHORITY_MELT;
        }
        bits
    }

    /// True when no capability is set
    pub fn is_empty(&self) -> bool {
        !self.mint && !self.melt
    }

    /// True when every capability of `other` is also present here
    pub fn contains(&self, other: Capabilities) -> bool {
        (self.mint || !other.mint) && (self.melt || !other.melt)
    }
}

/// Script source of an output, resolved once at construction time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputScript {
    /// Pay-to-public-key-hash destination
    P2pkh {
        /// Destination address
        address: Address,
        /// Optional absolute timelock
        timelock: Option<u32>,
    },
    /// Pay-to-script-hash destination
    P2sh {
        /// Destination address
        address: Address,
        /// Optional absolute timelock
        timelock: Option<u32>,
    },
    /// Opaque payload, inserted verbatim without address resolution
    Data {
        /// Raw script bytes
        payload: Vec<u8>,
    },
    /// Explicit script override
    Raw {
        /// Raw script bytes
        bytes: Vec<u8>,
    },
}

impl OutputScript {
    /// Resolve an address destination into its script variant.
    pub fn for_address(address: Address, timelock: Option<u32>) -> Self {
        match address.kind() {
            harbor_params::AddressKind::P2pkh => Self::P2pkh { address, timelock },
            harbor_params::AddressKind::P2sh => Self::P2sh { address, timelock },
        }
    }

    /// Produce the on-chain script bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::P2pkh { address, timelock } => {
                script::build_p2pkh_script(address.hash160(), *timelock)
            }
            Self::P2sh { address, timelock } => {
                script::build_p2sh_script(address.hash160(), *timelock)
            }
            Self::Data { payload } => payload.clone(),
            Self::Raw { bytes } => bytes.clone(),
        }
    }

    /// Destination address, when the script has one.
    pub fn address(&self) -> Option<&Address> {
        match self {
            Self::P2pkh { address, .. } | Self::P2sh { address, .. } => Some(address),
            Self::Data { .. } | Self::Raw { .. } => None,
        }
    }

    /// Timelock, when the script has one.
    pub fn timelock(&self) -> Option<u32> {
        match self {
            Self::P2pkh { timelock, .. } | Self::P2sh { timelock, .. } => *timelock,
            Self::Data { .. } | Self::Raw { .. } => None,
        }
    }
}

/// A transaction output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Value in base units, or the capability bitmask for authority outputs
    pub value: u64,
    /// Token-data byte: low 7 bits token index, high bit authority flag
    pub token_data: u8,
    /// Script source
    pub script: OutputScript,
}

impl Output {
    /// Create an output. No validation happens here; bounds are checked
    /// when the output is serialized.
    pub fn new(value: u64, token_data: u8, script: OutputScript) -> Self {
        Self {
            value,
            token_data,
            script,
        }
    }

    /// Create an authority output carrying the given capabilities.
    pub fn authority(capabilities: Capabilities, token_index: u8, script: OutputScript) -> Self {
        Self {
            value: capabilities.bits(),
            token_data: token_index | TOKEN_AUTHORITY_MASK,
            script,
        }
    }

    /// Create a data output. Data outputs carry the minimum value.
    pub fn data(payload: Vec<u8>) -> Self {
        Self {
            value: 1,
            token_data: 0,
            script: OutputScript::Data { payload },
        }
    }

    /// True iff this is an authority output.
    pub fn is_authority(&self) -> bool {
        is_authority(self.token_data)
    }

    /// Zero-based token-list index; `None` for the native token.
    pub fn token_index(&self) -> Option<usize> {
        token_index(self.token_data)
    }

    /// Capability view of an authority output's value field.
    ///
    /// Empty for non-authority outputs regardless of their value.
    pub fn capabilities(&self) -> Capabilities {
        if self.is_authority() {
            Capabilities::from_bits(self.value)
        } else {
            Capabilities::default()
        }
    }

    /// True iff this output confers mint capability.
    pub fn can_mint(&self) -> bool {
        self.capabilities().mint
    }

    /// True iff this output confers melt capability.
    pub fn can_melt(&self) -> bool {
        self.capabilities().melt
    }

    /// Validate the value bounds (1..=[`MAX_OUTPUT_VALUE`]).
    pub fn check_value(&self) -> Result<()> {
        if self.value == 0 {
            return Err(Error::InvalidValue(
                "output value must be positive".to_string(),
            ));
        }
        if self.value > MAX_OUTPUT_VALUE {
            return Err(Error::InvalidValue(format!(
                "output value {} exceeds maximum {}",
                self.value, MAX_OUTPUT_VALUE
            )));
        }
        Ok(())
    }

    /// Serialize for the signature hash: value, token data, script.
    pub fn serialize_into(&self, out: &mut Vec<u8>) -> Result<()> {
        self.check_value()?;
        write_output_value(out, self.value);
        out.push(self.token_data);

        let script = self.script.to_bytes();
        let len = u16::try_from(script.len()).map_err(|_| {
            Error::ScriptParse(format!("script length {} exceeds wire limit", script.len()))
        })?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&script);
        Ok(())
    }
}

/// Wire encoding of an output value.
///
/// Values up to [`MAX_COMPACT_VALUE`] take 4 big-endian bytes; larger
/// values take 8 bytes as the two's complement of the negated value. The
/// sign bit of the first byte is how a reader distinguishes the widths.
fn write_output_value(out: &mut Vec<u8>, value: u64) {
    if value > MAX_COMPACT_VALUE {
        out.extend_from_slice(&(-(value as i64)).to_be_bytes());
    } else {
        out.extend_from_slice(&(value as u32).to_be_bytes());
    }
}

/// A transaction input: a reference to a prior output, plus unlocking
/// data once signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    /// Id of the transaction holding the spent output
    pub tx_id: TxId,
    /// Index of the spent output within that transaction
    pub index: u8,
    /// Unlocking data; `None` until signed
    pub data: Option<Vec<u8>>,
}

impl Input {
    /// Create an unsigned input.
    pub fn new(tx_id: TxId, index: u8) -> Self {
        Self {
            tx_id,
            index,
            data: None,
        }
    }

    /// Serialize for the signature hash. Unlocking data is excluded: the
    /// data length is written as zero no matter what is attached.
    fn serialize_for_signing(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.tx_id.as_bytes());
        out.push(self.index);
        out.extend_from_slice(&0u16.to_be_bytes());
    }
}

/// Name and symbol of a token being created (version-2 transactions only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
}

impl TokenInfo {
    /// Validate name and symbol lengths.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.len() > MAX_TOKEN_NAME_LEN {
            return Err(Error::InvalidValue(format!(
                "token name must be 1..={MAX_TOKEN_NAME_LEN} bytes"
            )));
        }
        if self.symbol.is_empty() || self.symbol.len() > MAX_TOKEN_SYMBOL_LEN {
            return Err(Error::InvalidValue(format!(
                "token symbol must be 1..={MAX_TOKEN_SYMBOL_LEN} bytes"
            )));
        }
        Ok(())
    }

    fn serialize_into(&self, out: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        out.push(0x01);
        out.push(self.name.len() as u8);
        out.extend_from_slice(self.name.as_bytes());
        out.push(self.symbol.len() as u8);
        out.extend_from_slice(self.symbol.as_bytes());
        Ok(())
    }
}

/// A transaction under construction or awaiting submission
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Version tag
    pub version: u16,
    /// Ordered inputs
    pub inputs: Vec<Input>,
    /// Ordered outputs
    pub outputs: Vec<Output>,
    /// Non-native tokens referenced by outputs, in first-reference order
    pub tokens: Vec<TokenId>,
    /// Token name/symbol, present on token-creation transactions only
    pub token_info: Option<TokenInfo>,
    /// Parent transactions; filled by the submission collaborator
    pub parents: Vec<TxId>,
    /// Timestamp; filled by the submission collaborator
    pub timestamp: Option<u32>,
    /// Proof-of-work nonce; filled by the submission collaborator
    pub nonce: Option<u32>,
    /// Weight; filled by the submission collaborator
    pub weight: Option<f64>,
}

impl Transaction {
    /// Create an empty transaction with the given version tag.
    pub fn new(version: u16) -> Self {
        Self {
            version,
            inputs: Vec::new(),
            outputs: Vec::new(),
            tokens: Vec::new(),
            token_info: None,
            parents: Vec::new(),
            timestamp: None,
            nonce: None,
            weight: None,
        }
    }

    /// Canonical byte serialization hashed to produce the signature-hash
    /// digest. Deterministic, and independent of any unlocking data
    /// attached to the inputs.
    pub fn serialize_for_signing(&self) -> Result<Vec<u8>> {
        if self.inputs.len() > MAX_TX_SLOTS || self.outputs.len() > MAX_TX_SLOTS {
            return Err(Error::InvalidValue(format!(
                "at most {MAX_TX_SLOTS} inputs and outputs are representable"
            )));
        }
        if self.tokens.len() > MAX_TX_TOKENS {
            return Err(Error::InvalidValue(format!(
                "at most {MAX_TX_TOKENS} tokens are representable"
            )));
        }
        self.validate_token_references()?;

        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_be_bytes());
        out.push(self.tokens.len() as u8);
        out.push(self.inputs.len() as u8);
        out.push(self.outputs.len() as u8);

        for token in &self.tokens {
            out.extend_from_slice(token.as_bytes());
        }
        for input in &self.inputs {
            input.serialize_for_signing(&mut out);
        }
        for output in &self.outputs {
            output.serialize_into(&mut out)?;
        }
        if let Some(info) = &self.token_info {
            info.serialize_into(&mut out)?;
        }
        Ok(out)
    }

    /// The 32-byte digest the signing adapter consumes.
    pub fn sighash_digest(&self) -> Result<[u8; 32]> {
        Ok(sha256d(&self.serialize_for_signing()?))
    }

    /// Check that every non-native output references a valid entry of the
    /// token list. Token-creation transactions are the one exception:
    /// their outputs may reference index 1, the token being created, with
    /// an empty token list.
    pub fn validate_token_references(&self) -> Result<()> {
        for (position, output) in self.outputs.iter().enumerate() {
            let index = match output.token_index() {
                None => continue,
                Some(index) => index,
            };
            if index < self.tokens.len() {
                continue;
            }
            let creates_token =
                self.version == CREATE_TOKEN_TX_VERSION && self.token_info.is_some();
            if creates_token && index == self.tokens.len() {
                continue;
            }
            return Err(Error::InvalidValue(format!(
                "output {position} references token index {index}, but only {} tokens are listed",
                self.tokens.len()
            )));
        }
        Ok(())
    }
}

//! Key derivation and signing
//!
//! Derives per-address keypairs from a BIP-39 seed through BIP-32 paths
//! (`m/44'/coin'/0'/0/index`), signs signature-hash digests with ECDSA,
//! and packs signature plus public key into input unlocking data. Private
//! key material never leaves this module.

use crate::hashes::hash160;
use crate::{Address, Error, Result};
use bip39::{Language, Mnemonic};
use harbor_params::Network;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroizing;

/// Anything able to produce unlocking data for an input.
///
/// The proposal assembler only depends on this seam, so tests can
/// substitute the key manager.
pub trait Signer {
    /// Produce unlocking data for the given sighash digest, using the key
    /// at the given derivation path.
    fn unlocking_data(&self, digest: &[u8; 32], path: &str) -> Result<Vec<u8>>;
}

/// A derived keypair bound to one derivation path
#[derive(Clone, Debug)]
pub struct Keypair {
    secret: SecretKey,
    public: PublicKey,
}

impl Keypair {
    /// Compressed public key bytes
    pub fn public_key_bytes(&self) -> [u8; 33] {
        self.public.serialize()
    }

    /// hash160 of the compressed public key
    pub fn pubkey_hash(&self) -> [u8; 20] {
        hash160(&self.public_key_bytes())
    }

    /// The pay-to-public-key-hash address of this keypair
    pub fn address(&self, network: &Network) -> Address {
        Address::from_pubkey_hash(self.pubkey_hash(), network)
    }
}

/// Key manager holding the wallet seed
#[derive(Debug)]
pub struct KeyManager {
    seed: Zeroizing<Vec<u8>>,
    secp: Secp256k1<All>,
}

impl KeyManager {
    /// Create from a BIP-39 mnemonic and passphrase.
    pub fn from_mnemonic(mnemonic: &str, passphrase: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, mnemonic)
            .map_err(|e| Error::Signing(format!("invalid mnemonic: {e}")))?;
        Ok(Self::from_seed(mnemonic.to_seed(passphrase).to_vec()))
    }

    /// Create from raw seed bytes (16..=64 bytes per BIP-32).
    pub fn from_seed(seed: Vec<u8>) -> Self {
        Self {
            seed: Zeroizing::new(seed),
            secp: Secp256k1::new(),
        }
    }

    /// Generate new random mnemonic
    ///
    /// # Arguments
    /// * `word_count` - Number of words in mnemonic (12, 18, or 24). Defaults to 24.
    pub fn generate_mnemonic(word_count: Option<u32>) -> String {
        let entropy_size = match word_count.unwrap_or(24) {
            12 => 16,
            18 => 24,
            _ => 32,
        };

        let mut entropy = vec![0u8; entropy_size];
        use rand::RngCore;
        rand::thread_rng().fill_bytes(&mut entropy);

        let mnemonic = Mnemonic::from_entropy(&entropy)
            .expect("entropy of a supported size always yields a mnemonic");
        mnemonic.to_string()
    }

    /// Derive the keypair at a BIP-32 path.
    pub fn derive_keypair(&self, path: &str) -> Result<Keypair> {
        let path: bip32::DerivationPath = path
            .parse()
            .map_err(|e| Error::Signing(format!("invalid derivation path {path}: {e}")))?;
        let xprv = bip32::XPrv::derive_from_path(&*self.seed, &path)
            .map_err(|e| Error::Signing(format!("derivation failed: {e}")))?;

        let mut key_bytes = Zeroizing::new([0u8; 32]);
        key_bytes.copy_from_slice(xprv.private_key().to_bytes().as_slice());
        let secret = SecretKey::from_slice(key_bytes.as_slice())
            .map_err(|e| Error::Signing(format!("derived key rejected: {e}")))?;
        let public = PublicKey::from_secret_key(&self.secp, &secret);

        Ok(Keypair { secret, public })
    }

    /// Sign a 32-byte sighash digest, returning the DER signature.
    pub fn sign_digest(&self, digest: &[u8; 32], keypair: &Keypair) -> Result<Vec<u8>> {
        let message = Message::from_slice(digest)
            .map_err(|e| Error::Signing(format!("invalid digest: {e}")))?;
        let signature = self.secp.sign_ecdsa(&message, &keypair.secret);
        Ok(signature.serialize_der().to_vec())
    }

    /// Derive the wallet address at `index` on the standard receive chain,
    /// returning the address together with its derivation path.
    pub fn derive_address(&self, network: &Network, index: u32) -> Result<(Address, String)> {
        let path = derivation_path(network.coin_type, index);
        let keypair = self.derive_keypair(&path)?;
        Ok((keypair.address(network), path))
    }
}

impl Signer for KeyManager {
    fn unlocking_data(&self, digest: &[u8; 32], path: &str) -> Result<Vec<u8>> {
        let keypair = self.derive_keypair(path)?;
        let signature = self.sign_digest(digest, &keypair)?;
        Ok(pack_unlocking_data(&signature, &keypair.public_key_bytes()))
    }
}

/// Standard receive-chain derivation path for an address index.
pub fn derivation_path(coin_type: u32, index: u32) -> String {
    format!("m/44'/{coin_type}'/0'/0/{index}")
}

/// Pack a signature and public key into input unlocking data:
/// `len(sig) | sig | len(pubkey) | pubkey`.
pub fn pack_unlocking_data(signature: &[u8], public_key: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(2 + signature.len() + public_key.len());
    data.push(signature.len() as u8);
    data.extend_from_slice(signature);
    data.push(public_key.len() as u8);
    data.extend_from_slice(public_key);
    data
}

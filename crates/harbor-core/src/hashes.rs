//! Hash primitives shared by the codecs
//!
//! The address checksum and the signature-hash digest use double SHA-256;
//! public keys and redeem scripts are addressed by RIPEMD160(SHA256(x)).

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Double SHA-256: `SHA256(SHA256(data))`
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

/// HASH160: `RIPEMD160(SHA256(data))`
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    ripe.into()
}

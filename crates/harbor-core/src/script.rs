//! Spend-script construction and parsing
//!
//! Two script shapes are supported, each optionally prefixed with an
//! absolute timelock:
//!
//! ```text
//! [PUSH4 <timestamp be32> OP_GREATERTHAN_TIMESTAMP]
//! OP_DUP OP_HASH160 PUSH20 <hash160> OP_EQUALVERIFY OP_CHECKSIG   (p2pkh)
//!
//! [PUSH4 <timestamp be32> OP_GREATERTHAN_TIMESTAMP]
//! OP_HASH160 PUSH20 <hash160> OP_EQUAL                            (p2sh)
//! ```
//!
//! The timelock is always a big-endian 4-byte integer; the width is a wire
//! format contract, not a tunable.

use crate::address::Address;
use crate::{Error, Result};
use harbor_params::{AddressKind, Network};

/// Duplicate the top stack item
pub const OP_DUP: u8 = 0x76;
/// Pop and hash the top stack item with RIPEMD160(SHA256(x))
pub const OP_HASH160: u8 = 0xa9;
/// Pop two items, fail the script unless they are equal
pub const OP_EQUALVERIFY: u8 = 0x88;
/// Pop two items, push whether they are equal
pub const OP_EQUAL: u8 = 0x87;
/// Verify an ECDSA signature against a public key
pub const OP_CHECKSIG: u8 = 0xac;
/// Fail the script unless the transaction timestamp exceeds the operand
pub const OP_GREATERTHAN_TIMESTAMP: u8 = 0x6f;

/// Byte length of a p2pkh script without timelock prefix
const P2PKH_LEN: usize = 25;
/// Byte length of a p2sh script without timelock prefix
const P2SH_LEN: usize = 23;
/// Byte length of the timelock prefix (push marker + be32 + opcode)
const TIMELOCK_PREFIX_LEN: usize = 6;
/// Push marker for the 4-byte timelock operand; also how the prefix is detected
const TIMELOCK_PUSH: u8 = 0x04;
/// Push marker for the 20-byte hash operand
const HASH_PUSH: u8 = 0x14;

/// A successfully parsed spend script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedScript {
    /// Destination address recovered from the script hash
    pub address: Address,
    /// Absolute timelock, when the script carries the prefix
    pub timelock: Option<u32>,
}

/// Build a pay-to-public-key-hash script.
pub fn build_p2pkh_script(hash: &[u8; 20], timelock: Option<u32>) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_LEN + TIMELOCK_PREFIX_LEN);
    push_timelock(&mut script, timelock);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    script.push(HASH_PUSH);
    script.extend_from_slice(hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// Build a pay-to-script-hash script.
pub fn build_p2sh_script(hash: &[u8; 20], timelock: Option<u32>) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2SH_LEN + TIMELOCK_PREFIX_LEN);
    push_timelock(&mut script, timelock);
    script.push(OP_HASH160);
    script.push(HASH_PUSH);
    script.extend_from_slice(hash);
    script.push(OP_EQUAL);
    script
}

/// Identify a script's shape without reconstructing an address.
///
/// Returns `None` for anything that is not byte-exact one of the two
/// supported shapes (with or without timelock prefix).
pub fn identify(script: &[u8]) -> Option<AddressKind> {
    let body = match split_timelock(script) {
        Some((_, body)) => body,
        None => return None,
    };
    if is_p2pkh_body(body) {
        Some(AddressKind::P2pkh)
    } else if is_p2sh_body(body) {
        Some(AddressKind::P2sh)
    } else {
        None
    }
}

/// Parse a spend script, recovering the destination address and timelock.
pub fn parse(script: &[u8], network: &Network) -> Result<ParsedScript> {
    let (timelock, body) = split_timelock(script).ok_or_else(|| {
        Error::ScriptParse(format!(
            "truncated timelock prefix in script {}",
            hex::encode(script)
        ))
    })?;

    let (hash, kind) = if is_p2pkh_body(body) {
        (&body[3..23], AddressKind::P2pkh)
    } else if is_p2sh_body(body) {
        (&body[2..22], AddressKind::P2sh)
    } else {
        return Err(Error::ScriptParse(format!(
            "unrecognized script shape: {}",
            hex::encode(script)
        )));
    };

    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(hash);

    Ok(ParsedScript {
        address: Address::from_hash(hash160, kind, network),
        timelock,
    })
}

fn push_timelock(script: &mut Vec<u8>, timelock: Option<u32>) {
    if let Some(timestamp) = timelock {
        script.push(TIMELOCK_PUSH);
        script.extend_from_slice(&timestamp.to_be_bytes());
        script.push(OP_GREATERTHAN_TIMESTAMP);
    }
}

/// Detect and strip the timelock prefix by its fixed leading-length marker.
///
/// Returns `None` when the prefix marker is present but the prefix itself
/// is malformed or truncated.
fn split_timelock(script: &[u8]) -> Option<(Option<u32>, &[u8])> {
    if script.first() != Some(&TIMELOCK_PUSH) {
        return Some((None, script));
    }
    if script.len() < TIMELOCK_PREFIX_LEN || script[5] != OP_GREATERTHAN_TIMESTAMP {
        return None;
    }
    let timestamp = u32::from_be_bytes([script[1], script[2], script[3], script[4]]);
    Some((Some(timestamp), &script[TIMELOCK_PREFIX_LEN..]))
}

fn is_p2pkh_body(body: &[u8]) -> bool {
    body.len() == P2PKH_LEN
        && body[0] == OP_DUP
        && body[1] == OP_HASH160
        && body[2] == HASH_PUSH
        && body[23] == OP_EQUALVERIFY
        && body[24] == OP_CHECKSIG
}

fn is_p2sh_body(body: &[u8]) -> bool {
    body.len() == P2SH_LEN && body[0] == OP_HASH160 && body[1] == HASH_PUSH && body[22] == OP_EQUAL
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net() -> Network {
        Network::mainnet()
    }

    #[test]
    fn test_p2pkh_roundtrip_no_timelock() {
        let hash = [0xab; 20];
        let script = build_p2pkh_script(&hash, None);
        assert_eq!(script.len(), 25);
        assert_eq!(identify(&script), Some(AddressKind::P2pkh));

        let parsed = parse(&script, &net()).unwrap();
        assert_eq!(parsed.address.hash160(), &hash);
        assert_eq!(parsed.address.kind(), AddressKind::P2pkh);
        assert_eq!(parsed.timelock, None);
    }

    #[test]
    fn test_p2pkh_roundtrip_with_timelock() {
        let hash = [0x11; 20];
        let script = build_p2pkh_script(&hash, Some(1_700_000_000));
        assert_eq!(script.len(), 31);
        assert_eq!(script[0], 0x04);
        assert_eq!(script[5], OP_GREATERTHAN_TIMESTAMP);

        let parsed = parse(&script, &net()).unwrap();
        assert_eq!(parsed.timelock, Some(1_700_000_000));
        assert_eq!(parsed.address.hash160(), &hash);
    }

    #[test]
    fn test_p2sh_roundtrip() {
        let hash = [0x42; 20];
        for timelock in [None, Some(123u32)] {
            let script = build_p2sh_script(&hash, timelock);
            assert_eq!(identify(&script), Some(AddressKind::P2sh));

            let parsed = parse(&script, &net()).unwrap();
            assert_eq!(parsed.address.kind(), AddressKind::P2sh);
            assert_eq!(parsed.address.hash160(), &hash);
            assert_eq!(parsed.timelock, timelock);
        }
    }

    #[test]
    fn test_timelock_is_big_endian() {
        let script = build_p2pkh_script(&[0u8; 20], Some(0x0102_0304));
        assert_eq!(&script[1..5], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_truncated_script_rejected() {
        let hash = [0x33; 20];
        let script = build_p2pkh_script(&hash, Some(99));
        for len in [0, 3, 5, script.len() - 1] {
            let truncated = &script[..len];
            assert!(parse(truncated, &net()).is_err(), "len {len} should fail");
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut script = build_p2sh_script(&[0x55; 20], None);
        script.push(0x00);
        assert!(parse(&script, &net()).is_err());
        assert_eq!(identify(&script), None);
    }

    #[test]
    fn test_corrupted_opcode_rejected() {
        let mut script = build_p2pkh_script(&[0x01; 20], None);
        script[0] = 0x77;
        let err = parse(&script, &net()).unwrap_err();
        assert!(matches!(err, Error::ScriptParse(_)));
    }

    #[test]
    fn test_identify_agrees_with_parse() {
        let scripts = [
            build_p2pkh_script(&[1; 20], None),
            build_p2pkh_script(&[2; 20], Some(7)),
            build_p2sh_script(&[3; 20], None),
            build_p2sh_script(&[4; 20], Some(u32::MAX)),
        ];
        for script in scripts {
            assert!(identify(&script).is_some());
            assert!(parse(&script, &net()).is_ok());
        }
        let garbage = vec![0xde, 0xad, 0xbe, 0xef];
        assert_eq!(identify(&garbage), None);
        assert!(parse(&garbage, &net()).is_err());
    }
}

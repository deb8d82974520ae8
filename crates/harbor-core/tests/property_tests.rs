//! Property-based tests for harbor-core
//!
//! Uses proptest to verify codec round-trips and selection invariants
//! across randomized inputs.

use harbor_core::selection::UtxoSelector;
use harbor_core::transaction::{is_authority, token_index, TxId};
use harbor_core::{
    build_p2pkh_script, build_p2sh_script, identify, parse, Address, DepositCalculator, Error,
    KeyManager, TokenId, Utxo,
};
use harbor_params::{AddressKind, Network};
use proptest::prelude::*;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate a 20-byte hash160
fn hash_strategy() -> impl Strategy<Value = [u8; 20]> {
    prop::array::uniform20(any::<u8>())
}

/// Generate an optional absolute timelock
fn timelock_strategy() -> impl Strategy<Value = Option<u32>> {
    prop::option::of(any::<u32>())
}

/// Generate utxo values small enough that sums never overflow
fn utxo_values_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..1_000_000, 1..12)
}

fn test_utxo(value: u64, token: TokenId, seq: usize) -> Utxo {
    Utxo {
        tx_id: TxId::new(vec![seq as u8; 32]),
        index: (seq % 256) as u8,
        address: Address::from_pubkey_hash([seq as u8; 20], &Network::mainnet()),
        path: format!("m/44'/280'/0'/0/{seq}"),
        token,
        value,
        authorities: 0,
        timelock: None,
        heightlock: None,
        locked: false,
    }
}

// ============================================================================
// Address Codec Properties
// ============================================================================

proptest! {
    /// Property: decode(encode(version, hash)) recovers version and hash
    #[test]
    fn prop_address_roundtrip(hash in hash_strategy()) {
        let net = Network::mainnet();
        for kind in [AddressKind::P2pkh, AddressKind::P2sh] {
            let addr = Address::from_hash(hash, kind, &net);
            let decoded = Address::decode(addr.as_str(), &net).unwrap();
            prop_assert_eq!(decoded.hash160(), &hash);
            prop_assert_eq!(decoded.version(), net.version_for(kind));
            prop_assert_eq!(decoded.kind(), kind);
        }
    }

    /// Property: addresses never validate under a foreign network
    #[test]
    fn prop_address_network_membership(hash in hash_strategy()) {
        let mainnet = Network::mainnet();
        let testnet = Network::testnet();
        let addr = Address::from_pubkey_hash(hash, &mainnet);
        prop_assert!(Address::is_valid(addr.as_str(), &mainnet));
        prop_assert!(!Address::is_valid(addr.as_str(), &testnet));
    }

    /// Property: is_valid never panics, whatever the input string
    #[test]
    fn prop_is_valid_total(input in ".{0,60}") {
        let _ = Address::is_valid(&input, &Network::mainnet());
    }
}

// ============================================================================
// Script Codec Properties
// ============================================================================

proptest! {
    /// Property: build/parse round-trips address and timelock exactly
    #[test]
    fn prop_script_roundtrip(hash in hash_strategy(), timelock in timelock_strategy()) {
        let net = Network::mainnet();

        let p2pkh = build_p2pkh_script(&hash, timelock);
        let parsed = parse(&p2pkh, &net).unwrap();
        prop_assert_eq!(parsed.address.hash160(), &hash);
        prop_assert_eq!(parsed.address.kind(), AddressKind::P2pkh);
        prop_assert_eq!(parsed.timelock, timelock);

        let p2sh = build_p2sh_script(&hash, timelock);
        let parsed = parse(&p2sh, &net).unwrap();
        prop_assert_eq!(parsed.address.kind(), AddressKind::P2sh);
        prop_assert_eq!(parsed.timelock, timelock);
    }

    /// Property: identify agrees with parse on built scripts
    #[test]
    fn prop_identify_matches_parse(hash in hash_strategy(), timelock in timelock_strategy()) {
        let net = Network::mainnet();
        let script = build_p2pkh_script(&hash, timelock);
        prop_assert_eq!(identify(&script), Some(AddressKind::P2pkh));
        prop_assert!(parse(&script, &net).is_ok());
    }

    /// Property: truncating a built script always breaks parsing
    #[test]
    fn prop_truncation_rejected(hash in hash_strategy(), cut in 1usize..24) {
        let net = Network::mainnet();
        let script = build_p2pkh_script(&hash, None);
        let truncated = &script[..script.len() - cut];
        prop_assert!(parse(truncated, &net).is_err());
    }
}

// ============================================================================
// Token Data Properties
// ============================================================================

proptest! {
    /// Property: authority flag is exactly the high bit
    #[test]
    fn prop_token_data_bits(token_data in any::<u8>()) {
        prop_assert_eq!(is_authority(token_data), token_data & 0x80 != 0);
        match token_index(token_data) {
            None => prop_assert_eq!(token_data & 0x7f, 0),
            Some(index) => prop_assert_eq!(index, (token_data & 0x7f) as usize - 1),
        }
    }
}

// ============================================================================
// Selection Properties
// ============================================================================

proptest! {
    /// Property: a reachable target is always covered, with exact change
    #[test]
    fn prop_selection_covers_target(values in utxo_values_strategy()) {
        let token: TokenId = "01".parse().unwrap();
        let total: u64 = values.iter().sum();
        let target = total / 2 + 1;

        let utxos: Vec<Utxo> = values
            .iter()
            .enumerate()
            .map(|(i, v)| test_utxo(*v, token.clone(), i))
            .collect();

        let result = UtxoSelector::new().select_amount(utxos, &token, target).unwrap();
        prop_assert!(result.total >= target);
        prop_assert_eq!(result.change, result.total - target);
        let sum: u64 = result.utxos.iter().map(|u| u.value).sum();
        prop_assert_eq!(sum, result.total);
    }

    /// Property: an unreachable target fails with the token and amount
    #[test]
    fn prop_selection_never_fabricates(values in utxo_values_strategy()) {
        let token: TokenId = "01".parse().unwrap();
        let total: u64 = values.iter().sum();
        let target = total + 1;

        let utxos: Vec<Utxo> = values
            .iter()
            .enumerate()
            .map(|(i, v)| test_utxo(*v, token.clone(), i))
            .collect();

        let err = UtxoSelector::new().select_amount(utxos, &token, target).unwrap_err();
        match err {
            Error::NoUtxos { token: t, amount } => {
                prop_assert_eq!(t, "01".to_string());
                prop_assert_eq!(amount, target);
            }
            other => prop_assert!(false, "unexpected error: {other}"),
        }
    }
}

// ============================================================================
// Deposit Formula Properties
// ============================================================================

proptest! {
    /// Property: deposits round up, withdrawals round down, and melting
    /// never releases more than minting deposited
    #[test]
    fn prop_deposit_bounds(amount in 1u64..1_000_000_000) {
        let calc = DepositCalculator::new();
        let deposit = calc.mint_deposit(amount).unwrap();
        let withdrawal = calc.melt_withdrawal(amount).unwrap();

        prop_assert!(deposit >= 1);
        prop_assert!(deposit as u128 * 100 >= amount as u128);
        prop_assert!(withdrawal as u128 * 100 <= amount as u128);
        prop_assert!(withdrawal <= deposit);
    }
}

// ============================================================================
// Key Derivation Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: address derivation is deterministic per index and
    /// injective across nearby indexes
    #[test]
    fn prop_deterministic_address_derivation(index in 0u32..50) {
        let keys = KeyManager::from_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
            "",
        ).unwrap();
        let net = Network::mainnet();

        let (a, path_a) = keys.derive_address(&net, index).unwrap();
        let (b, path_b) = keys.derive_address(&net, index).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(path_a, path_b);

        let (c, _) = keys.derive_address(&net, index + 1).unwrap();
        prop_assert_ne!(&a, &c);
    }

    /// Property: same digest and path always produce identical unlocking data
    #[test]
    fn prop_signing_deterministic(digest in prop::array::uniform32(any::<u8>()), index in 0u32..20) {
        use harbor_core::Signer;
        let keys = KeyManager::from_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
            "",
        ).unwrap();
        let path = harbor_core::derivation_path(280, index);

        let a = keys.unlocking_data(&digest, &path).unwrap();
        let b = keys.unlocking_data(&digest, &path).unwrap();
        prop_assert_eq!(a, b);
    }
}

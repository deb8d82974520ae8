//! Utxo selection for transaction funding
//!
//! Pure, advisory selection over candidates supplied by the wallet-service
//! collaborator. The collaborator owns any ordering heuristic; this engine
//! consumes candidates in the order given, accumulates until the target is
//! reached, and computes the leftover change. It never talks to private
//! keys and never mutates utxo state.

use crate::transaction::{Capabilities, TokenId};
use crate::wallet::Utxo;
use crate::{Error, Result};

/// Utxo selection result
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Selected utxos
    pub utxos: Vec<Utxo>,
    /// Total value of the selected utxos
    pub total: u64,
    /// Change amount (zero when the target was matched exactly)
    pub change: u64,
}

/// Utxo selector
#[derive(Debug, Clone, Default)]
pub struct UtxoSelector;

impl UtxoSelector {
    /// Create a selector
    pub fn new() -> Self {
        Self
    }

    /// Select utxos covering `target` units of `token`.
    ///
    /// Authority utxos among the candidates are skipped: their value field
    /// is a capability bitmask, not money. Fails when the candidates are
    /// exhausted before the target is reached.
    pub fn select_amount(
        &self,
        available: Vec<Utxo>,
        token: &TokenId,
        target: u64,
    ) -> Result<SelectionResult> {
        tracing::debug!(token = %token, target, "selecting utxos");

        let mut selected = Vec::new();
        let mut total = 0u64;

        for utxo in available {
            if total >= target {
                break;
            }
            if utxo.is_authority() || utxo.token != *token {
                continue;
            }
            total = total
                .checked_add(utxo.value)
                .ok_or_else(|| Error::InvalidValue("utxo sum overflow".to_string()))?;
            selected.push(utxo);
        }

        if total < target {
            return Err(Error::NoUtxos {
                token: token.to_string(),
                amount: target,
            });
        }

        let change = total - target;
        tracing::debug!(
            selected = selected.len(),
            total,
            change,
            "utxo selection complete"
        );

        Ok(SelectionResult {
            utxos: selected,
            total,
            change,
        })
    }

    /// Select `count` authority utxos for `token` carrying all of the
    /// requested capabilities.
    pub fn select_authorities(
        &self,
        available: Vec<Utxo>,
        token: &TokenId,
        capability: Capabilities,
        count: usize,
    ) -> Result<Vec<Utxo>> {
        let selected: Vec<Utxo> = available
            .into_iter()
            .filter(|u| u.token == *token && u.is_authority() && u.capabilities().contains(capability))
            .take(count)
            .collect();

        if selected.len() < count {
            return Err(Error::InsufficientAuthorities {
                token: token.to_string(),
                required: count,
                available: selected.len(),
            });
        }
        Ok(selected)
    }

    /// Total spendable value among the candidates (authorities excluded).
    pub fn total_available(available: &[Utxo]) -> u64 {
        available
            .iter()
            .filter(|u| !u.is_authority())
            .map(|u| u.value)
            .sum()
    }
}

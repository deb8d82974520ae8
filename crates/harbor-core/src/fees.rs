//! Token deposit and withdrawal formula
//!
//! Creating or minting token units requires a native-token deposit of a
//! fixed percentage of the minted amount; melting returns the same
//! percentage as a withdrawal. The deposit rounds up, the withdrawal
//! rounds down, so the ledger never refunds more than it collected.

use crate::{Error, Result};

/// Deposit percentage charged on minted amounts
pub const TOKEN_DEPOSIT_PERCENT: u64 = 1;

/// Deposit calculator using the fixed percentage formula.
#[derive(Debug, Clone, Default)]
pub struct DepositCalculator;

impl DepositCalculator {
    /// Create a deposit calculator
    pub fn new() -> Self {
        Self
    }

    /// Native-token deposit required to mint `amount` token units.
    ///
    /// Rounds up; minting any non-zero amount costs at least one base unit.
    pub fn mint_deposit(&self, amount: u64) -> Result<u64> {
        if amount == 0 {
            return Err(Error::InvalidValue(
                "mint amount must be positive".to_string(),
            ));
        }
        let scaled = amount
            .checked_mul(TOKEN_DEPOSIT_PERCENT)
            .and_then(|v| v.checked_add(99))
            .ok_or_else(|| Error::InvalidValue(format!("mint amount {amount} overflows")))?;
        let deposit = scaled / 100;

        tracing::debug!(amount, deposit, "computed mint deposit");
        Ok(deposit)
    }

    /// Native-token withdrawal released by melting `amount` token units.
    ///
    /// Rounds down; melting fewer than 100 units releases nothing.
    pub fn melt_withdrawal(&self, amount: u64) -> Result<u64> {
        let scaled = amount
            .checked_mul(TOKEN_DEPOSIT_PERCENT)
            .ok_or_else(|| Error::InvalidValue(format!("melt amount {amount} overflows")))?;
        Ok(scaled / 100)
    }
}

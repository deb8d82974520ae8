//! Submission collaborator boundary
//!
//! A finalized, signed transaction is handed to a submitter that runs the
//! mining/proof-of-work step remotely and fills in the transient fields.
//! This core never retries; it only preserves the distinction between
//! "rate limited, retryable" and "rejected, terminal" for its caller.

use crate::transaction::{Transaction, TxId};
use async_trait::async_trait;

/// Submission failure classification
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The service applied rate limiting; the submission may be retried
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The transaction was rejected; retrying the same bytes cannot succeed
    #[error("rejected: {0}")]
    Rejected(String),

    /// Transport failure before a verdict was reached
    #[error("transport: {0}")]
    Transport(String),
}

impl SubmitError {
    /// Whether the same submission may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Transport(_))
    }
}

/// Timing and proof fields produced by the mining step
#[derive(Debug, Clone, PartialEq)]
pub struct MiningOutcome {
    /// Proof-of-work nonce
    pub nonce: u32,
    /// Transaction weight
    pub weight: f64,
    /// Parent transactions
    pub parents: Vec<TxId>,
    /// Timestamp assigned by the service
    pub timestamp: u32,
}

/// The submission/mining collaborator interface.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Submit a finalized, signed transaction.
    async fn submit(&self, transaction: &Transaction)
        -> std::result::Result<MiningOutcome, SubmitError>;
}

/// Write a mining outcome's transient fields onto a transaction.
pub fn apply_outcome(transaction: &mut Transaction, outcome: MiningOutcome) {
    transaction.nonce = Some(outcome.nonce);
    transaction.weight = Some(outcome.weight);
    transaction.parents = outcome.parents;
    transaction.timestamp = Some(outcome.timestamp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TRANSFER_TX_VERSION;

    #[test]
    fn test_retryable_classification() {
        assert!(SubmitError::RateLimited("429".into()).is_retryable());
        assert!(SubmitError::Transport("connection reset".into()).is_retryable());
        assert!(!SubmitError::Rejected("invalid parents".into()).is_retryable());
    }

    #[test]
    fn test_apply_outcome_fills_transient_fields() {
        let mut tx = Transaction::new(TRANSFER_TX_VERSION);
        let outcome = MiningOutcome {
            nonce: 42,
            weight: 17.5,
            parents: vec![TxId::new(vec![1; 32]), TxId::new(vec![2; 32])],
            timestamp: 1_700_000_000,
        };
        apply_outcome(&mut tx, outcome);

        assert_eq!(tx.nonce, Some(42));
        assert_eq!(tx.weight, Some(17.5));
        assert_eq!(tx.parents.len(), 2);
        assert_eq!(tx.timestamp, Some(1_700_000_000));
    }
}

//! Error types for Harbor Core
//!
//! Error taxonomy for transaction construction and proposal assembly.
//! Every error is raised synchronously to the immediate caller with the
//! offending token/input/address embedded in the message; nothing is
//! downgraded to a log line.

use crate::submit::SubmitError;
use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Harbor Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Output value out of range (zero or above the representable maximum)
    #[error("Invalid output value: {0}")]
    InvalidValue(String),

    /// Malformed or unrecognized script bytes
    #[error("Script parse error: {0}")]
    ScriptParse(String),

    /// Invalid address string, checksum, or network mismatch
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Utxo selection exhausted before reaching the funding target
    #[error("No utxos available to fill the request. Token: {token} - Amount: {amount}.")]
    NoUtxos {
        /// Token whose funding could not be completed
        token: String,
        /// Requested amount
        amount: u64,
    },

    /// Fewer authority utxos available than required
    #[error("Not enough authority outputs. Token: {token} - Required: {required} - Available: {available}.")]
    InsufficientAuthorities {
        /// Token whose authority was requested
        token: String,
        /// Number of authority utxos required
        required: usize,
        /// Number of authority utxos available
        available: usize,
    },

    /// A caller-pinned input could not be used as declared
    #[error("Invalid input selection. {0}")]
    InvalidInputSelection(String),

    /// Authority destination failed wallet-ownership validation
    #[error("Invalid authority address: {0}")]
    AuthorityAddress(String),

    /// Key derivation or signature production failure
    #[error("Signing error: {0}")]
    Signing(String),

    /// Network parameter error
    #[error("Network error: {0}")]
    Network(#[from] harbor_params::Error),

    /// Submission failure, preserving the retryable/terminal distinction
    #[error("Submission failed: {0}")]
    Submission(#[from] SubmitError),
}

impl Error {
    /// Check if the operation may be retried as-is.
    ///
    /// Only submission-side rate limiting and transport failures qualify;
    /// every construction-time error is deterministic and terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Submission(e) if e.is_retryable())
    }

    /// Get error category for logging/metrics
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidValue(_) => ErrorCategory::Value,
            Error::ScriptParse(_) => ErrorCategory::Script,
            Error::InvalidAddress(_) => ErrorCategory::Address,
            Error::NoUtxos { .. } | Error::InsufficientAuthorities { .. } => ErrorCategory::Utxo,
            Error::InvalidInputSelection(_) => ErrorCategory::InputSelection,
            Error::AuthorityAddress(_) => ErrorCategory::Authority,
            Error::Signing(_) => ErrorCategory::Signing,
            Error::Network(_) => ErrorCategory::Network,
            Error::Submission(_) => ErrorCategory::Submission,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Output value errors
    Value,
    /// Script codec errors
    Script,
    /// Address codec errors
    Address,
    /// Utxo selection errors
    Utxo,
    /// Pinned-input reconciliation errors
    InputSelection,
    /// Authority address validation errors
    Authority,
    /// Signing adapter errors
    Signing,
    /// Network parameter errors
    Network,
    /// Submission collaborator errors
    Submission,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Value => write!(f, "Value"),
            ErrorCategory::Script => write!(f, "Script"),
            ErrorCategory::Address => write!(f, "Address"),
            ErrorCategory::Utxo => write!(f, "Utxo"),
            ErrorCategory::InputSelection => write!(f, "InputSelection"),
            ErrorCategory::Authority => write!(f, "Authority"),
            ErrorCategory::Signing => write!(f, "Signing"),
            ErrorCategory::Network => write!(f, "Network"),
            ErrorCategory::Submission => write!(f, "Submission"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_utxos_message_contract() {
        let err = Error::NoUtxos {
            token: "01".to_string(),
            amount: 10,
        };
        assert_eq!(
            err.to_string(),
            "No utxos available to fill the request. Token: 01 - Amount: 10."
        );
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            Error::InvalidValue("test".to_string()).category(),
            ErrorCategory::Value
        );
        assert_eq!(
            Error::NoUtxos {
                token: "00".to_string(),
                amount: 1
            }
            .category(),
            ErrorCategory::Utxo
        );
        assert_eq!(
            Error::InsufficientAuthorities {
                token: "01".to_string(),
                required: 1,
                available: 0
            }
            .category(),
            ErrorCategory::Utxo
        );
        assert_eq!(
            Error::AuthorityAddress("test".to_string()).category(),
            ErrorCategory::Authority
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Submission(SubmitError::RateLimited("slow down".into())).is_retryable());
        assert!(!Error::Submission(SubmitError::Rejected("bad tx".into())).is_retryable());
        assert!(!Error::Signing("test".to_string()).is_retryable());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Utxo.to_string(), "Utxo");
        assert_eq!(ErrorCategory::InputSelection.to_string(), "InputSelection");
    }
}

//! Error type shared by every post-processing stage.
//!
//! Most variants are *expected* outcomes of a key-distribution run (the
//! channel was too noisy, the sample was too small, a block did not decode).
//! Those all mean the same thing to a caller: throw the run away and start
//! again with fresh randomness. [`QkdError::requires_restart`] reports that.

use thiserror::Error;

use crate::bb84_protocol::ProtocolState;

pub type Result<T> = std::result::Result<T, QkdError>;

#[derive(Debug, Error)]
pub enum QkdError {
    /// Two inputs that must line up did not. Always a caller or configuration bug.
    #[error("{context}: length mismatch (expected {expected}, got {actual})")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Not enough key material survived to carry out a stage.
    #[error("{context}: insufficient data (need {needed} bits, have {available})")]
    InsufficientData {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    /// Parameter estimation saw more disagreements than the threshold allows.
    #[error("security check failed: {mismatches} of {tested} bits differ (limit {threshold})")]
    AbortedBySecurityCheck {
        mismatches: usize,
        tested: usize,
        threshold: usize,
    },

    /// A syndrome could not be decoded, or the reconciled keys failed confirmation.
    #[error("reconciliation failed: {reason}")]
    ReconciliationFailure { reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid protocol transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ProtocolState,
        to: ProtocolState,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QkdError {
    /// True for outcomes that a fresh run may avoid.
    ///
    /// Key material from the failed run must not be reused: part of it has
    /// been disclosed during testing or reconciliation.
    pub fn requires_restart(&self) -> bool {
        matches!(
            self,
            QkdError::InsufficientData { .. }
                | QkdError::AbortedBySecurityCheck { .. }
                | QkdError::ReconciliationFailure { .. }
        )
    }

    pub(crate) fn length_mismatch(context: &'static str, expected: usize, actual: usize) -> Self {
        QkdError::LengthMismatch {
            context,
            expected,
            actual,
        }
    }
}

//! Pool error types.
//!
//! Every variant is raised before the ledger changes, or after the ledger
//! has been restored, so a failed operation never leaves partial state.

use stakepool_shared::{AppError, ParticipantId, Wei};
use thiserror::Error;

use super::access::Role;

/// Errors that can occur during pool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    // ========== Guard Errors ==========
    /// Deposit or reward injection at or below the minimum unit.
    #[error("value must be greater than {min_unit}, got {value}")]
    InsufficientValue {
        /// The rejected amount.
        value: Wei,
        /// The exclusive lower bound.
        min_unit: Wei,
    },

    /// Reward injection against an empty pool.
    #[error("there isn't any users in pool")]
    NoParticipants,

    /// Caller lacks the role the operation requires.
    #[error("account {caller} is missing role {role}")]
    Unauthorized {
        /// The rejected caller.
        caller: ParticipantId,
        /// The role that was required.
        role: Role,
    },

    /// Stake withdrawal by an account with zero stake.
    #[error("user {0} doesn't have enough to withdraw")]
    NothingToWithdraw(ParticipantId),

    /// Restake with reward at or below the minimum unit.
    #[error("user {caller} doesn't have minimum {min_unit} to restake, has {reward}")]
    InsufficientRewardToRestake {
        /// The caller.
        caller: ParticipantId,
        /// The caller's current reward.
        reward: Wei,
        /// The exclusive lower bound.
        min_unit: Wei,
    },

    // ========== Transfer Errors ==========
    /// The transport refused the payout; ledger state was restored.
    #[error("transfer of {amount} to {recipient} failed: {reason}")]
    TransferFailed {
        /// The intended recipient.
        recipient: ParticipantId,
        /// The amount that was not paid.
        amount: Wei,
        /// Why the transport refused.
        reason: String,
    },

    // ========== Arithmetic Errors ==========
    /// An aggregate would leave the representable range.
    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PoolError {
    /// Returns the stable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientValue { .. } => "INSUFFICIENT_VALUE",
            Self::NoParticipants => "NO_PARTICIPANTS",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::NothingToWithdraw(_) => "NOTHING_TO_WITHDRAW",
            Self::InsufficientRewardToRestake { .. } => "INSUFFICIENT_REWARD_TO_RESTAKE",
            Self::TransferFailed { .. } => "TRANSFER_FAILED",
            Self::ArithmeticOverflow(_) => "ARITHMETIC_OVERFLOW",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the caller can succeed by correcting its input
    /// (a larger amount, a different account, a privileged identity).
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientValue { .. }
                | Self::NoParticipants
                | Self::Unauthorized { .. }
                | Self::NothingToWithdraw(_)
                | Self::InsufficientRewardToRestake { .. }
        )
    }
}

impl From<PoolError> for AppError {
    fn from(err: PoolError) -> Self {
        let message = err.to_string();
        match err {
            PoolError::InsufficientValue { .. } | PoolError::InsufficientRewardToRestake { .. } => {
                Self::Validation(message)
            }
            PoolError::Unauthorized { .. } => Self::Forbidden(message),
            PoolError::NothingToWithdraw(_) => Self::NotFound(message),
            PoolError::NoParticipants => Self::BusinessRule(message),
            PoolError::TransferFailed { .. } => Self::ExternalService(message),
            PoolError::ArithmeticOverflow(_) | PoolError::Internal(_) => Self::Internal(message),
        }
    }
}

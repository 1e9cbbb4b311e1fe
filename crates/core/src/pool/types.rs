//! Pool domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stakepool_shared::Wei;

/// One participant's position in the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Principal eligible for the next reward injection.
    pub stake: Wei,
    /// Reward accrued and not yet withdrawn or restaked.
    pub reward: Wei,
}

impl Account {
    /// Returns true if the account counts towards `active_user_count`.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.stake.is_zero()
    }

    /// Returns true if the account holds anything at all.
    ///
    /// An account with neither stake nor reward is logically absent even
    /// though its record is kept.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        !self.stake.is_zero() || !self.reward.is_zero()
    }
}

/// Outcome of a reward injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    /// Value injected by the reward depositor.
    pub injected: Wei,
    /// Sum of the shares credited to accounts.
    pub distributed: Wei,
    /// `injected - distributed`, left in custody by floor division.
    pub dust: Wei,
    /// Number of accounts credited (including zero shares).
    pub recipients: u64,
}

/// Point-in-time view of the pool aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Sum of all stakes.
    pub total_stake: Wei,
    /// Sum of all outstanding rewards.
    pub total_rewards: Wei,
    /// Value held by the pool.
    pub custody: Wei,
    /// Custody backing neither stake nor reward (dust and plain receipts).
    pub surplus: Wei,
    /// Accounts with nonzero stake.
    pub active_user_count: u64,
    /// Exclusive lower bound applied by the guards.
    pub min_unit: Wei,
}

impl PoolSnapshot {
    /// Custody expressed in ether, if representable.
    #[must_use]
    pub fn custody_ether(&self) -> Option<Decimal> {
        self.custody.to_ether()
    }
}

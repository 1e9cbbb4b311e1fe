//! The pool ledger: deposits, proportional reward injection, withdrawal and
//! restaking.
//!
//! Every operation validates and computes its new state first, then commits
//! it in one step. Outbound transfers happen only after the commit, and a
//! refused transfer credits the payout back, so no caller ever observes a
//! half-applied operation.

use std::collections::HashMap;

use stakepool_shared::{MIN_UNIT, ParticipantId, PoolConfig, Wei};
use tracing::{debug, info, warn};

use super::access::{CapabilityCheck, Role};
use super::error::PoolError;
use super::transport::{TransferError, ValueTransport};
use super::types::{Account, Distribution, PoolSnapshot};

/// A payout already debited from the ledger and not yet delivered.
///
/// `refund` is the part of the recipient's account the debit removed. A
/// refused delivery credits it back on top of whatever the account holds by
/// then, so operations that ran while the transfer was in flight survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingPayout {
    pub(crate) recipient: ParticipantId,
    pub(crate) amount: Wei,
    refund: Account,
}

impl PendingPayout {
    pub(crate) fn refused(&self, err: &TransferError) -> PoolError {
        warn!(
            participant = %self.recipient,
            payout = %self.amount,
            error = %err,
            "payout refused, state restored"
        );
        PoolError::TransferFailed {
            recipient: self.recipient,
            amount: self.amount,
            reason: err.to_string(),
        }
    }
}

/// Pooled-staking accounting state.
///
/// Owns every account record and the aggregates derived from them:
/// - `total_stake` always equals the sum of all stakes
/// - `active_user_count` always equals the number of accounts with stake
/// - `custody` always covers `total_stake` plus all outstanding rewards
#[derive(Debug, Clone)]
pub struct PoolLedger {
    min_unit: Wei,
    accounts: HashMap<ParticipantId, Account>,
    total_stake: Wei,
    active_user_count: u64,
    custody: Wei,
}

impl Default for PoolLedger {
    fn default() -> Self {
        Self::new(MIN_UNIT)
    }
}

impl PoolLedger {
    /// Creates an empty ledger guarding amounts with `min_unit`.
    #[must_use]
    pub fn new(min_unit: Wei) -> Self {
        Self {
            min_unit,
            accounts: HashMap::new(),
            total_stake: Wei::ZERO,
            active_user_count: 0,
            custody: Wei::ZERO,
        }
    }

    /// Creates an empty ledger from configuration.
    #[must_use]
    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.min_unit())
    }

    // ========== Mutating operations ==========

    /// Deposits `value`, attached to the call, into `caller`'s stake.
    ///
    /// # Errors
    ///
    /// - `InsufficientValue` if `value <= min_unit`
    /// - `ArithmeticOverflow` if a balance would overflow
    pub fn deposit_pool(&mut self, caller: ParticipantId, value: Wei) -> Result<Account, PoolError> {
        self.require_above_min(value)?;

        let current = self.account(&caller);
        let stake = current
            .stake
            .checked_add(value)
            .ok_or(PoolError::ArithmeticOverflow("stake"))?;
        let total_stake = self
            .total_stake
            .checked_add(value)
            .ok_or(PoolError::ArithmeticOverflow("total_stake"))?;
        let custody = self
            .custody
            .checked_add(value)
            .ok_or(PoolError::ArithmeticOverflow("custody"))?;
        let activated = current.stake.is_zero();
        let active_user_count = self.counted_with(activated)?;

        let account = self.account_mut(caller);
        account.stake = stake;
        let updated = *account;
        self.total_stake = total_stake;
        self.custody = custody;
        self.active_user_count = active_user_count;

        info!(
            participant = %caller,
            %value,
            stake = %updated.stake,
            total_stake = %self.total_stake,
            activated,
            "pool deposit"
        );
        Ok(updated)
    }

    /// Injects `value` as reward, split across active accounts in
    /// proportion to their stake.
    ///
    /// Each account receives `floor(value * stake / total_stake)`. What the
    /// floors leave over stays in custody as dust.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// - `Unauthorized` if `caller` lacks `Role::RewardDepositor`
    /// - `InsufficientValue` if `value <= min_unit`
    /// - `NoParticipants` if no account has stake
    pub fn deposit_rewards<C>(
        &mut self,
        roles: &C,
        caller: ParticipantId,
        value: Wei,
    ) -> Result<Distribution, PoolError>
    where
        C: CapabilityCheck + ?Sized,
    {
        if !roles.has_role(&caller, Role::RewardDepositor) {
            warn!(participant = %caller, %value, "reward injection by unauthorized caller");
            return Err(PoolError::Unauthorized {
                caller,
                role: Role::RewardDepositor,
            });
        }
        self.require_above_min(value)?;
        if self.active_user_count == 0 || self.total_stake.is_zero() {
            warn!(participant = %caller, %value, "reward injection into empty pool");
            return Err(PoolError::NoParticipants);
        }

        let custody = self
            .custody
            .checked_add(value)
            .ok_or(PoolError::ArithmeticOverflow("custody"))?;

        let mut credits = Vec::with_capacity(self.accounts.len());
        let mut distributed = Wei::ZERO;
        for (id, account) in self.accounts.iter().filter(|(_, a)| a.is_active()) {
            let share = value
                .mul_div_floor(account.stake, self.total_stake)
                .ok_or_else(|| PoolError::Internal("stake exceeds total stake".to_string()))?;
            let reward = account
                .reward
                .checked_add(share)
                .ok_or(PoolError::ArithmeticOverflow("reward"))?;
            distributed = distributed
                .checked_add(share)
                .ok_or(PoolError::ArithmeticOverflow("distributed"))?;
            debug!(participant = %id, stake = %account.stake, %share, "reward share");
            credits.push((*id, reward));
        }
        let dust = value
            .checked_sub(distributed)
            .ok_or_else(|| PoolError::Internal("distributed more than injected".to_string()))?;

        let recipients = credits.len() as u64;
        for (id, reward) in credits {
            self.account_mut(id).reward = reward;
        }
        self.custody = custody;

        info!(
            participant = %caller,
            %value,
            %distributed,
            %dust,
            recipients,
            "rewards deposited"
        );
        Ok(Distribution {
            injected: value,
            distributed,
            dust,
            recipients,
        })
    }

    /// Withdraws `caller`'s whole position, stake and reward, and pays it
    /// out through `transport`.
    ///
    /// The account is zeroed and the aggregates updated before the transfer
    /// is attempted. If the transport refuses, the position is credited back.
    ///
    /// # Errors
    ///
    /// - `NothingToWithdraw` if `caller` has no stake
    /// - `TransferFailed` if the transport refused the payout
    pub fn withdraw_pool<T>(
        &mut self,
        transport: &mut T,
        caller: ParticipantId,
    ) -> Result<Wei, PoolError>
    where
        T: ValueTransport + ?Sized,
    {
        let pending = self.debit_pool(caller)?;
        self.settle(transport, &pending)
    }

    /// Pays out `caller`'s accrued reward, leaving the stake in place.
    ///
    /// A zero reward, including an unknown caller, succeeds without
    /// invoking the transport and returns zero.
    ///
    /// # Errors
    ///
    /// - `TransferFailed` if the transport refused the payout
    pub fn withdraw_rewards<T>(
        &mut self,
        transport: &mut T,
        caller: ParticipantId,
    ) -> Result<Wei, PoolError>
    where
        T: ValueTransport + ?Sized,
    {
        match self.debit_rewards(caller)? {
            Some(pending) => self.settle(transport, &pending),
            None => Ok(Wei::ZERO),
        }
    }

    /// Folds `caller`'s accrued reward into their stake. No value leaves
    /// the pool.
    ///
    /// # Errors
    ///
    /// - `InsufficientRewardToRestake` if the reward is `<= min_unit`
    /// - `ArithmeticOverflow` if a balance would overflow
    pub fn restake_rewards(&mut self, caller: ParticipantId) -> Result<Wei, PoolError> {
        let current = self.account(&caller);
        let amount = current.reward;
        if amount <= self.min_unit {
            return Err(PoolError::InsufficientRewardToRestake {
                caller,
                reward: amount,
                min_unit: self.min_unit,
            });
        }

        let stake = current
            .stake
            .checked_add(amount)
            .ok_or(PoolError::ArithmeticOverflow("stake"))?;
        let total_stake = self
            .total_stake
            .checked_add(amount)
            .ok_or(PoolError::ArithmeticOverflow("total_stake"))?;
        // Reward only accrues to staked accounts and withdraw_pool clears it,
        // so an account with reward is already counted as active.
        let activated = current.stake.is_zero();
        let active_user_count = self.counted_with(activated)?;

        let account = self.account_mut(caller);
        account.stake = stake;
        account.reward = Wei::ZERO;
        self.total_stake = total_stake;
        self.active_user_count = active_user_count;

        info!(
            participant = %caller,
            %amount,
            %stake,
            total_stake = %self.total_stake,
            "rewards restaked"
        );
        Ok(amount)
    }

    /// Accepts value sent to the pool without a call.
    ///
    /// The value enters custody but backs no account; it shows up as surplus.
    ///
    /// # Errors
    ///
    /// - `ArithmeticOverflow` if custody would overflow
    pub fn receive(&mut self, value: Wei) -> Result<(), PoolError> {
        self.custody = self
            .custody
            .checked_add(value)
            .ok_or(PoolError::ArithmeticOverflow("custody"))?;
        debug!(%value, custody = %self.custody, "plain value received");
        Ok(())
    }

    // ========== Accessors ==========

    /// Returns `who`'s account, zero if unknown.
    #[must_use]
    pub fn account(&self, who: &ParticipantId) -> Account {
        self.accounts.get(who).copied().unwrap_or_default()
    }

    /// Returns `who`'s stake.
    #[must_use]
    pub fn stake_of(&self, who: &ParticipantId) -> Wei {
        self.account(who).stake
    }

    /// Returns `who`'s accrued reward.
    #[must_use]
    pub fn reward_of(&self, who: &ParticipantId) -> Wei {
        self.account(who).reward
    }

    /// Returns true if `who` has stake in the pool.
    #[must_use]
    pub fn is_active(&self, who: &ParticipantId) -> bool {
        self.account(who).is_active()
    }

    /// Sum of all stakes.
    #[must_use]
    pub fn total_stake(&self) -> Wei {
        self.total_stake
    }

    /// Number of accounts with stake.
    #[must_use]
    pub fn active_user_count(&self) -> u64 {
        self.active_user_count
    }

    /// Value currently held by the pool.
    #[must_use]
    pub fn custody_balance(&self) -> Wei {
        self.custody
    }

    /// Sum of all outstanding rewards.
    #[must_use]
    pub fn total_rewards(&self) -> Wei {
        // Bounded by custody, so the sum cannot saturate.
        self.accounts
            .values()
            .fold(Wei::ZERO, |sum, a| sum.saturating_add(a.reward))
    }

    /// Custody backing neither stake nor reward.
    #[must_use]
    pub fn surplus(&self) -> Wei {
        self.custody
            .saturating_sub(self.total_stake)
            .saturating_sub(self.total_rewards())
    }

    /// Exclusive lower bound applied by the guards.
    #[must_use]
    pub fn min_unit(&self) -> Wei {
        self.min_unit
    }

    /// Iterates over accounts that hold stake or reward.
    pub fn participants(&self) -> impl Iterator<Item = (&ParticipantId, &Account)> {
        self.accounts.iter().filter(|(_, a)| a.is_present())
    }

    /// Returns the current aggregates.
    #[must_use]
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            total_stake: self.total_stake,
            total_rewards: self.total_rewards(),
            custody: self.custody,
            surplus: self.surplus(),
            active_user_count: self.active_user_count,
            min_unit: self.min_unit,
        }
    }

    // ========== Internals ==========

    fn account_mut(&mut self, who: ParticipantId) -> &mut Account {
        self.accounts.entry(who).or_default()
    }

    fn require_above_min(&self, value: Wei) -> Result<(), PoolError> {
        if value <= self.min_unit {
            return Err(PoolError::InsufficientValue {
                value,
                min_unit: self.min_unit,
            });
        }
        Ok(())
    }

    fn debited_custody(&self, payout: Wei) -> Result<Wei, PoolError> {
        self.custody
            .checked_sub(payout)
            .ok_or_else(|| PoolError::Internal("custody below owed payout".to_string()))
    }

    fn counted_with(&self, activated: bool) -> Result<u64, PoolError> {
        if activated {
            self.active_user_count
                .checked_add(1)
                .ok_or(PoolError::ArithmeticOverflow("active_user_count"))
        } else {
            Ok(self.active_user_count)
        }
    }

    // ========== Payouts ==========

    /// Zeroes `caller`'s position and debits it from the aggregates.
    pub(crate) fn debit_pool(&mut self, caller: ParticipantId) -> Result<PendingPayout, PoolError> {
        let current = self.account(&caller);
        if current.stake.is_zero() {
            return Err(PoolError::NothingToWithdraw(caller));
        }

        let payout = current
            .stake
            .checked_add(current.reward)
            .ok_or(PoolError::ArithmeticOverflow("payout"))?;
        let total_stake = self
            .total_stake
            .checked_sub(current.stake)
            .ok_or_else(|| PoolError::Internal("total stake below account stake".to_string()))?;
        let custody = self.debited_custody(payout)?;
        let active_user_count = self
            .active_user_count
            .checked_sub(1)
            .ok_or_else(|| PoolError::Internal("active user count underflow".to_string()))?;

        *self.account_mut(caller) = Account::default();
        self.total_stake = total_stake;
        self.active_user_count = active_user_count;
        self.custody = custody;

        info!(
            participant = %caller,
            %payout,
            stake = %current.stake,
            reward = %current.reward,
            total_stake = %self.total_stake,
            "pool withdrawal debited"
        );
        Ok(PendingPayout {
            recipient: caller,
            amount: payout,
            refund: current,
        })
    }

    /// Zeroes `caller`'s reward and debits it from custody. Returns `None`
    /// when there is nothing to pay.
    pub(crate) fn debit_rewards(
        &mut self,
        caller: ParticipantId,
    ) -> Result<Option<PendingPayout>, PoolError> {
        let payout = self.reward_of(&caller);
        if payout.is_zero() {
            debug!(participant = %caller, "no reward to withdraw");
            return Ok(None);
        }

        let custody = self.debited_custody(payout)?;
        self.account_mut(caller).reward = Wei::ZERO;
        self.custody = custody;

        info!(participant = %caller, %payout, "reward withdrawal debited");
        Ok(Some(PendingPayout {
            recipient: caller,
            amount: payout,
            refund: Account {
                stake: Wei::ZERO,
                reward: payout,
            },
        }))
    }

    /// Credits a refused payout back to its recipient.
    pub(crate) fn refund(&mut self, pending: &PendingPayout) -> Result<(), PoolError> {
        let current = self.account(&pending.recipient);
        let stake = current
            .stake
            .checked_add(pending.refund.stake)
            .ok_or(PoolError::ArithmeticOverflow("stake"))?;
        let reward = current
            .reward
            .checked_add(pending.refund.reward)
            .ok_or(PoolError::ArithmeticOverflow("reward"))?;
        let total_stake = self
            .total_stake
            .checked_add(pending.refund.stake)
            .ok_or(PoolError::ArithmeticOverflow("total_stake"))?;
        let custody = self
            .custody
            .checked_add(pending.amount)
            .ok_or(PoolError::ArithmeticOverflow("custody"))?;
        let active_user_count =
            self.counted_with(current.stake.is_zero() && !pending.refund.stake.is_zero())?;

        *self.account_mut(pending.recipient) = Account { stake, reward };
        self.total_stake = total_stake;
        self.active_user_count = active_user_count;
        self.custody = custody;
        Ok(())
    }

    /// Delivers `pending`, refunding it if the transport refuses.
    fn settle<T>(&mut self, transport: &mut T, pending: &PendingPayout) -> Result<Wei, PoolError>
    where
        T: ValueTransport + ?Sized,
    {
        if let Err(e) = transport.transfer(&pending.recipient, pending.amount) {
            self.refund(pending)?;
            return Err(pending.refused(&e));
        }
        Ok(pending.amount)
    }
}

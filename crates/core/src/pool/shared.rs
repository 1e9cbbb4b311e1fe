//! A ledger handle for hosts that call in from several threads.
//!
//! The whole ledger sits behind one mutex, so each operation's state change
//! runs as a single critical section. Payouts are the exception: the debit
//! is committed under the lock and the lock is released before the
//! transport runs, so a transport that calls back into the same handle sees
//! the debited account instead of blocking.

use std::sync::{Arc, Mutex, MutexGuard};

use stakepool_shared::{ParticipantId, Wei};

use super::access::CapabilityCheck;
use super::error::PoolError;
use super::ledger::{PendingPayout, PoolLedger};
use super::transport::ValueTransport;
use super::types::{Account, Distribution, PoolSnapshot};

/// Cloneable, thread-safe handle to one [`PoolLedger`].
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<PoolLedger>>,
}

impl SharedLedger {
    /// Wraps `ledger`.
    #[must_use]
    pub fn new(ledger: PoolLedger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Runs `f` with exclusive access to the ledger.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Internal` if a previous holder panicked, otherwise
    /// whatever `f` returns.
    pub fn with<R, F>(&self, f: F) -> Result<R, PoolError>
    where
        F: FnOnce(&mut PoolLedger) -> Result<R, PoolError>,
    {
        let mut guard = self.lock()?;
        f(&mut *guard)
    }

    /// See [`PoolLedger::deposit_pool`].
    pub fn deposit_pool(&self, caller: ParticipantId, value: Wei) -> Result<Account, PoolError> {
        self.with(|ledger| ledger.deposit_pool(caller, value))
    }

    /// See [`PoolLedger::deposit_rewards`].
    pub fn deposit_rewards<C>(
        &self,
        roles: &C,
        caller: ParticipantId,
        value: Wei,
    ) -> Result<Distribution, PoolError>
    where
        C: CapabilityCheck + ?Sized,
    {
        self.with(|ledger| ledger.deposit_rewards(roles, caller, value))
    }

    /// See [`PoolLedger::withdraw_pool`]. The transport runs without the
    /// lock held.
    pub fn withdraw_pool<T>(&self, transport: &mut T, caller: ParticipantId) -> Result<Wei, PoolError>
    where
        T: ValueTransport + ?Sized,
    {
        let pending = self.with(|ledger| ledger.debit_pool(caller))?;
        self.deliver(transport, &pending)
    }

    /// See [`PoolLedger::withdraw_rewards`]. The transport runs without the
    /// lock held.
    pub fn withdraw_rewards<T>(
        &self,
        transport: &mut T,
        caller: ParticipantId,
    ) -> Result<Wei, PoolError>
    where
        T: ValueTransport + ?Sized,
    {
        match self.with(|ledger| ledger.debit_rewards(caller))? {
            Some(pending) => self.deliver(transport, &pending),
            None => Ok(Wei::ZERO),
        }
    }

    /// See [`PoolLedger::restake_rewards`].
    pub fn restake_rewards(&self, caller: ParticipantId) -> Result<Wei, PoolError> {
        self.with(|ledger| ledger.restake_rewards(caller))
    }

    /// See [`PoolLedger::snapshot`].
    pub fn snapshot(&self) -> Result<PoolSnapshot, PoolError> {
        self.with(|ledger| Ok(ledger.snapshot()))
    }

    /// See [`PoolLedger::account`].
    pub fn account(&self, who: &ParticipantId) -> Result<Account, PoolError> {
        self.with(|ledger| Ok(ledger.account(who)))
    }

    fn deliver<T>(&self, transport: &mut T, pending: &PendingPayout) -> Result<Wei, PoolError>
    where
        T: ValueTransport + ?Sized,
    {
        if let Err(e) = transport.transfer(&pending.recipient, pending.amount) {
            self.with(|ledger| ledger.refund(pending))?;
            return Err(pending.refused(&e));
        }
        Ok(pending.amount)
    }

    fn lock(&self) -> Result<MutexGuard<'_, PoolLedger>, PoolError> {
        self.inner
            .lock()
            .map_err(|_| PoolError::Internal("pool ledger lock poisoned".to_string()))
    }
}

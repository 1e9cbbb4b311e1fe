//! Outbound value transfers.
//!
//! Value arriving with a call is credited by the ledger itself; the host's
//! transport is only consulted to pay value out.

use std::collections::{HashMap, HashSet};

use stakepool_shared::{ParticipantId, Wei};
use thiserror::Error;

/// Why a payout could not be delivered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    /// The recipient refused the value.
    #[error("recipient {0} cannot accept the transfer")]
    Rejected(ParticipantId),

    /// The transport itself failed.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Pays value out of the pool's custody.
pub trait ValueTransport {
    /// Moves `amount` from the pool to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns `TransferError` if the value was not delivered. The transport
    /// must not have moved anything in that case.
    fn transfer(&mut self, recipient: &ParticipantId, amount: Wei) -> Result<(), TransferError>;
}

/// Transport that keeps external balances in memory.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    balances: HashMap<ParticipantId, Wei>,
    refusing: HashSet<ParticipantId>,
    payouts: Vec<(ParticipantId, Wei)>,
}

impl InMemoryTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `who` refuse every subsequent transfer.
    pub fn refuse(&mut self, who: ParticipantId) {
        self.refusing.insert(who);
    }

    /// Makes `who` accept transfers again.
    pub fn accept(&mut self, who: &ParticipantId) {
        self.refusing.remove(who);
    }

    /// Returns the total value delivered to `who`.
    #[must_use]
    pub fn balance_of(&self, who: &ParticipantId) -> Wei {
        self.balances.get(who).copied().unwrap_or_default()
    }

    /// Returns every delivered payout, oldest first.
    #[must_use]
    pub fn payouts(&self) -> &[(ParticipantId, Wei)] {
        &self.payouts
    }
}

impl ValueTransport for InMemoryTransport {
    fn transfer(&mut self, recipient: &ParticipantId, amount: Wei) -> Result<(), TransferError> {
        if self.refusing.contains(recipient) {
            return Err(TransferError::Rejected(*recipient));
        }

        let balance = self.balances.entry(*recipient).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Unavailable("recipient balance overflow".to_string()))?;
        self.payouts.push((*recipient, amount));
        Ok(())
    }
}

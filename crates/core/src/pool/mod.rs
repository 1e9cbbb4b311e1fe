//! Pooled-staking accounting.
//!
//! Participants deposit value into a shared pool, a reward depositor
//! injects rewards that accrue pro rata to stake, and participants withdraw
//! or restake what they are owed.
//!
//! # Modules
//!
//! - `ledger` - The accounting state machine
//! - `types` - Account records, distribution results, snapshots
//! - `access` - Role checks consumed by reward injection
//! - `transport` - Outbound value transfers
//! - `shared` - Mutex-guarded handle for multi-threaded hosts
//! - `error` - Pool error types

pub mod access;
pub mod error;
pub mod ledger;
pub mod shared;
pub mod transport;
pub mod types;

#[cfg(test)]
mod ledger_props;

pub use access::{CapabilityCheck, Role, RoleRegistry};
pub use error::PoolError;
pub use ledger::PoolLedger;
pub use shared::SharedLedger;
pub use transport::{InMemoryTransport, TransferError, ValueTransport};
pub use types::{Account, Distribution, PoolSnapshot};

//! Core accounting logic for Stakepool.
//!
//! This crate contains pure accounting logic with ZERO transport or storage
//! dependencies. Value movement and role administration are supplied by the
//! host through the traits in `pool::transport` and `pool::access`.
//!
//! # Modules
//!
//! - `pool` - Pooled staking: deposits, proportional rewards, withdrawal, restaking

pub mod pool;

pub use pool::{
    Account, CapabilityCheck, Distribution, InMemoryTransport, PoolError, PoolLedger,
    PoolSnapshot, Role, RoleRegistry, SharedLedger, TransferError, ValueTransport,
};

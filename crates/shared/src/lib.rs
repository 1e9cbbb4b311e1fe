//! Shared types, errors, and configuration for Stakepool.
//!
//! This crate provides common pieces used across the workspace:
//! - `Wei` amounts with checked integer arithmetic
//! - Participant identities
//! - Application-wide error types
//! - Configuration management
//! - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::{AppConfig, LogConfig, MIN_UNIT, MIN_UNIT_WEI, PoolConfig};
pub use error::{AppError, AppResult};
pub use types::{ParticipantId, Wei};

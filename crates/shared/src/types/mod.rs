//! Common types used across the workspace.

pub mod amount;
pub mod id;

pub use amount::Wei;
pub use id::ParticipantId;

//! Role-gated capabilities.
//!
//! The ledger only ever asks one question, "does this identity hold this
//! role?", through [`CapabilityCheck`]. Hosts answer it from whatever
//! authorization system they run; [`RoleRegistry`] is a self-contained
//! answer for hosts that have none.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use stakepool_shared::ParticipantId;
use tracing::info;

use super::error::PoolError;

/// A capability an identity may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May grant and revoke roles.
    Admin,
    /// May inject rewards into the pool.
    RewardDepositor,
}

impl Role {
    /// Parse a role from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "reward_depositor" => Some(Self::RewardDepositor),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::RewardDepositor => "reward_depositor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers whether an identity currently holds a role.
pub trait CapabilityCheck {
    /// Returns true if `who` holds `role`.
    fn has_role(&self, who: &ParticipantId, role: Role) -> bool;
}

impl<F> CapabilityCheck for F
where
    F: Fn(&ParticipantId, Role) -> bool,
{
    fn has_role(&self, who: &ParticipantId, role: Role) -> bool {
        self(who, role)
    }
}

/// In-memory role assignments.
///
/// The deploying identity starts with every role.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    members: HashMap<Role, HashSet<ParticipantId>>,
}

impl RoleRegistry {
    /// Creates a registry where `deployer` holds `Admin` and `RewardDepositor`.
    #[must_use]
    pub fn new(deployer: ParticipantId) -> Self {
        let mut members: HashMap<Role, HashSet<ParticipantId>> = HashMap::new();
        members.entry(Role::Admin).or_default().insert(deployer);
        members
            .entry(Role::RewardDepositor)
            .or_default()
            .insert(deployer);
        Self { members }
    }

    /// Grants `role` to `who`. Granting a held role is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Unauthorized` if `caller` is not an admin.
    pub fn grant(
        &mut self,
        caller: &ParticipantId,
        role: Role,
        who: ParticipantId,
    ) -> Result<(), PoolError> {
        self.require(caller, Role::Admin)?;
        if self.members.entry(role).or_default().insert(who) {
            info!(%caller, %who, %role, "role granted");
        }
        Ok(())
    }

    /// Revokes `role` from `who`. Revoking an unheld role is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Unauthorized` if `caller` is not an admin.
    pub fn revoke(
        &mut self,
        caller: &ParticipantId,
        role: Role,
        who: &ParticipantId,
    ) -> Result<(), PoolError> {
        self.require(caller, Role::Admin)?;
        if self
            .members
            .get_mut(&role)
            .is_some_and(|set| set.remove(who))
        {
            info!(%caller, %who, %role, "role revoked");
        }
        Ok(())
    }

    fn require(&self, caller: &ParticipantId, role: Role) -> Result<(), PoolError> {
        if self.has_role(caller, role) {
            Ok(())
        } else {
            Err(PoolError::Unauthorized {
                caller: *caller,
                role,
            })
        }
    }
}

impl CapabilityCheck for RoleRegistry {
    fn has_role(&self, who: &ParticipantId, role: Role) -> bool {
        self.members.get(&role).is_some_and(|set| set.contains(who))
    }
}

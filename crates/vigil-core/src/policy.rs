//! Per-agent spending policies.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::types::{AgentId, Timestamp};

/// The configured spending limits and allowlist governing one agent.
///
/// Exactly one *active* policy exists per agent at a time; that invariant is
/// maintained by the policy store's write discipline, not by this type.
/// All amounts are non-negative values in the chain's native unit.
///
/// Note: `per_tx_limit <= daily_limit` is a UI-level recommendation and is
/// deliberately not enforced here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingPolicy {
    /// The agent this policy governs.
    pub agent_id: AgentId,
    /// Aggregate limit for one UTC day.
    pub daily_limit: f64,
    /// Limit for any single transaction.
    pub per_tx_limit: f64,
    /// Program/contract identifiers the agent may target.
    ///
    /// An empty set means all targets are allowed.
    pub allowlist: HashSet<String>,
    /// Amounts above this always require human approval.
    pub require_approval_above: f64,
    /// Whether this policy is the agent's active one.
    pub active: bool,
    /// When the policy was last changed.
    pub updated_at: Timestamp,
}

impl SpendingPolicy {
    /// Create an active policy with an empty (allow-all) allowlist.
    #[must_use]
    pub fn new(
        agent_id: AgentId,
        daily_limit: f64,
        per_tx_limit: f64,
        require_approval_above: f64,
    ) -> Self {
        Self {
            agent_id,
            daily_limit,
            per_tx_limit,
            allowlist: HashSet::new(),
            require_approval_above,
            active: true,
            updated_at: Timestamp::now(),
        }
    }

    /// Replace the allowlist.
    #[must_use]
    pub fn with_allowlist(mut self, programs: impl IntoIterator<Item = String>) -> Self {
        self.allowlist = programs.into_iter().collect();
        self
    }

    /// Whether a proposed target program passes the allowlist check.
    ///
    /// Passes when no target is supplied, when the allowlist is empty, or
    /// when the target is a member.
    #[must_use]
    pub fn allows_target(&self, target: Option<&str>) -> bool {
        match target {
            None => true,
            Some(t) => self.allowlist.is_empty() || self.allowlist.contains(t),
        }
    }
}

impl fmt::Display for SpendingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "policy[{}]: daily {} / per-tx {} / approval above {}",
            self.agent_id, self.daily_limit, self.per_tx_limit, self.require_approval_above
        )
    }
}

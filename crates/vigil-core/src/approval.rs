//! Approval request entity and its state machine vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{AgentId, ApprovalId, Timestamp, TxKind};

/// Default time-to-live for a pending approval request, in minutes.
pub const DEFAULT_TTL_MINUTES: u32 = 15;

/// Disposition of an approval request.
///
/// `pending` is the sole non-terminal state. `approved`, `denied`, and
/// `expired` are terminal and never revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a human decision.
    Pending,
    /// Approved, either by a human or instantaneously by policy.
    Approved,
    /// Denied by a human.
    Denied,
    /// The TTL elapsed before a decision was made.
    Expired,
}

impl ApprovalStatus {
    /// Whether this state admits no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Denied => write!(f, "denied"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// Metadata of the transaction an agent proposes to execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxMetadata {
    /// Semantic kind of the proposed transaction.
    pub kind: TxKind,
    /// Estimated cost in the chain's native unit. Non-negative.
    pub estimated_cost: f64,
    /// Program/contract the transaction targets, if any.
    pub target_program: Option<String>,
    /// Counter-party address, if any.
    pub target_address: Option<String>,
    /// Asset amount being moved, if distinct from the cost estimate.
    pub amount: Option<f64>,
    /// Symbol of the asset being moved.
    pub token_symbol: Option<String>,
}

impl TxMetadata {
    /// Create metadata with just a kind and cost estimate.
    #[must_use]
    pub fn new(kind: TxKind, estimated_cost: f64) -> Self {
        Self {
            kind,
            estimated_cost,
            target_program: None,
            target_address: None,
            amount: None,
            token_symbol: None,
        }
    }

    /// Set the target program.
    #[must_use]
    pub fn with_target_program(mut self, program: impl Into<String>) -> Self {
        self.target_program = Some(program.into());
        self
    }

    /// Set the counter-party address.
    #[must_use]
    pub fn with_target_address(mut self, address: impl Into<String>) -> Self {
        self.target_address = Some(address.into());
        self
    }

    /// Set the asset amount and symbol.
    #[must_use]
    pub fn with_asset(mut self, amount: f64, symbol: impl Into<String>) -> Self {
        self.amount = Some(amount);
        self.token_symbol = Some(symbol.into());
        self
    }
}

/// A record of a proposed transaction awaiting or having received a disposition.
///
/// Created atomically with the initial policy verdict. Mutated exactly once:
/// by a human response, or by lazy expiry detection on a read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique request identifier.
    pub id: ApprovalId,
    /// The agent that proposed the transaction.
    pub agent_id: AgentId,
    /// Agent display name, denormalized for human-facing surfaces.
    pub agent_name: String,
    /// Free-text description of what the agent wants to do.
    pub description: String,
    /// The proposed transaction.
    pub tx: TxMetadata,
    /// Current disposition.
    pub status: ApprovalStatus,
    /// When the request was created.
    pub created_at: Timestamp,
    /// When a still-pending request lapses.
    pub expires_at: Timestamp,
    /// When a human (or instantaneous auto-approval) responded.
    pub responded_at: Option<Timestamp>,
    /// The policy evaluation reason captured at creation time.
    pub policy_reason: String,
}

impl ApprovalRequest {
    /// Create a request pending human review.
    #[must_use]
    pub fn pending(
        agent_id: AgentId,
        agent_name: impl Into<String>,
        description: impl Into<String>,
        tx: TxMetadata,
        ttl_minutes: u32,
        policy_reason: impl Into<String>,
    ) -> Self {
        let created_at = Timestamp::now();
        Self {
            id: ApprovalId::new(),
            agent_id,
            agent_name: agent_name.into(),
            description: description.into(),
            tx,
            status: ApprovalStatus::Pending,
            created_at,
            expires_at: created_at.plus_minutes(ttl_minutes),
            responded_at: None,
            policy_reason: policy_reason.into(),
        }
    }

    /// Create a request already approved by policy.
    ///
    /// Auto-approval is an instantaneous transition, not a separate state:
    /// the request is born `approved` with `responded_at` equal to creation.
    #[must_use]
    pub fn auto_approved(
        agent_id: AgentId,
        agent_name: impl Into<String>,
        description: impl Into<String>,
        tx: TxMetadata,
        ttl_minutes: u32,
        policy_reason: impl Into<String>,
    ) -> Self {
        let mut request = Self::pending(
            agent_id,
            agent_name,
            description,
            tx,
            ttl_minutes,
            policy_reason,
        );
        request.status = ApprovalStatus::Approved;
        request.responded_at = Some(request.created_at);
        request
    }

    /// Whether a `pending` request should be treated as expired at `now`.
    ///
    /// Terminal requests are never past expiry: their disposition is fixed.
    #[must_use]
    pub fn is_past_expiry(&self, now: Timestamp) -> bool {
        self.status == ApprovalStatus::Pending && now > self.expires_at
    }
}

impl fmt::Display for ApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} ({})",
            self.id, self.status, self.description, self.agent_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx() -> TxMetadata {
        TxMetadata::new(TxKind::Transfer, 0.25)
    }

    #[test]
    fn test_pending_request() {
        let request = ApprovalRequest::pending(
            AgentId::new(),
            "trader-1",
            "rebalance position",
            tx(),
            DEFAULT_TTL_MINUTES,
            "amount exceeds approval threshold",
        );
        assert_eq!(request.status, ApprovalStatus::Pending);
        assert!(request.responded_at.is_none());
        assert_eq!(
            request.expires_at,
            request.created_at.plus_minutes(DEFAULT_TTL_MINUTES)
        );
    }

    #[test]
    fn test_auto_approved_is_instantaneous() {
        let request = ApprovalRequest::auto_approved(
            AgentId::new(),
            "trader-1",
            "small transfer",
            tx(),
            DEFAULT_TTL_MINUTES,
            "within policy limits",
        );
        assert_eq!(request.status, ApprovalStatus::Approved);
        assert_eq!(request.responded_at, Some(request.created_at));
    }

    #[test]
    fn test_expiry_only_applies_to_pending() {
        let mut request = ApprovalRequest::pending(
            AgentId::new(),
            "trader-1",
            "slow decision",
            tx(),
            1,
            "needs review",
        );
        let way_later = request.expires_at.plus_minutes(60);
        assert!(request.is_past_expiry(way_later));

        // A terminal request is never past expiry
        request.status = ApprovalStatus::Denied;
        assert!(!request.is_past_expiry(way_later));
    }

    #[test]
    fn test_not_expired_before_deadline() {
        let request = ApprovalRequest::pending(
            AgentId::new(),
            "trader-1",
            "quick decision",
            tx(),
            DEFAULT_TTL_MINUTES,
            "needs review",
        );
        assert!(!request.is_past_expiry(request.created_at));
        assert!(!request.is_past_expiry(request.expires_at));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ApprovalStatus::Pending.is_terminal());
        assert!(ApprovalStatus::Approved.is_terminal());
        assert!(ApprovalStatus::Denied.is_terminal());
        assert!(ApprovalStatus::Expired.is_terminal());
    }

    #[test]
    fn test_metadata_builders() {
        let tx = TxMetadata::new(TxKind::Swap, 0.4)
            .with_target_program("JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4")
            .with_asset(12.5, "USDC");
        assert_eq!(tx.kind, TxKind::Swap);
        assert_eq!(tx.amount, Some(12.5));
        assert_eq!(tx.token_symbol.as_deref(), Some("USDC"));
    }
}

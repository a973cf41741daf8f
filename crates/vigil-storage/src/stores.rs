//! Store traits — the engine's contract with its database.
//!
//! Every trait here is the narrow slice of "transactional document store"
//! the governance engine actually needs: equality lookups, one
//! range-on-timestamp query, and an atomic multi-record append. Anything a
//! backend offers beyond this is deliberately out of reach.

use async_trait::async_trait;

use vigil_core::{
    Agent, AgentId, AgentStatus, ApprovalId, ApprovalRequest, ApprovalStatus, SpendingPolicy,
    Timestamp, TransactionRecord, WalletAddress,
};

use crate::error::StorageResult;

/// Agent directory: id, wallet-address, and credential lookups.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Persist a newly registered agent.
    async fn insert(&self, agent: Agent) -> StorageResult<()>;

    /// Fetch an agent by id.
    async fn get(&self, id: &AgentId) -> StorageResult<Option<Agent>>;

    /// All agents registered with the given wallet address.
    ///
    /// Wallet uniqueness across agents is deliberately not enforced;
    /// first-match resolution is the caller's policy.
    async fn find_by_wallet(&self, wallet: &WalletAddress) -> StorageResult<Vec<Agent>>;

    /// Fetch the agent whose credential hashes to the given digest.
    async fn find_by_credential_hash(&self, hash: &str) -> StorageResult<Option<Agent>>;

    /// Refresh an agent's last-seen timestamp.
    async fn touch_last_seen(&self, id: &AgentId, at: Timestamp) -> StorageResult<()>;

    /// Move an agent to a new soft lifecycle status.
    async fn set_status(&self, id: &AgentId, status: AgentStatus) -> StorageResult<()>;
}

/// Spending policy store. Read-only from the engine's perspective;
/// [`set_active`](PolicyStore::set_active) exists for the owner-facing
/// surface and for tests.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// The agent's active policy, if one is configured.
    async fn active_for(&self, agent_id: &AgentId) -> StorageResult<Option<SpendingPolicy>>;

    /// Install a policy as the agent's active one.
    ///
    /// Deactivates any previously active policy for the same agent; the
    /// one-active-per-agent invariant lives in this write discipline, not
    /// in a schema constraint.
    async fn set_active(&self, policy: SpendingPolicy) -> StorageResult<()>;
}

/// Approval request store.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Persist a newly created request together with its initial verdict.
    async fn insert(&self, request: ApprovalRequest) -> StorageResult<()>;

    /// Fetch a request by id.
    async fn get(&self, id: &ApprovalId) -> StorageResult<Option<ApprovalRequest>>;

    /// Write a request's disposition.
    ///
    /// Idempotent: writing the same target state twice is harmless, which
    /// keeps concurrent lazy-expiry observations safe.
    async fn update_status(
        &self,
        id: &ApprovalId,
        status: ApprovalStatus,
        responded_at: Option<Timestamp>,
    ) -> StorageResult<()>;

    /// All pending requests for an agent, oldest first.
    async fn pending_for_agent(&self, agent_id: &AgentId) -> StorageResult<Vec<ApprovalRequest>>;
}

/// Append-only transaction ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append a batch of records as a single atomic write.
    ///
    /// Either the whole batch becomes visible to readers or none of it;
    /// partial visibility is disallowed.
    async fn append_batch(&self, records: Vec<TransactionRecord>) -> StorageResult<()>;

    /// Records for an agent with `timestamp >= since`, oldest first.
    async fn for_agent_since(
        &self,
        agent_id: &AgentId,
        since: Timestamp,
    ) -> StorageResult<Vec<TransactionRecord>>;

    /// Total number of records attributed to an agent.
    async fn count_for_agent(&self, agent_id: &AgentId) -> StorageResult<usize>;
}

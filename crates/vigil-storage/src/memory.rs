//! In-memory store implementations.
//!
//! Thread-safe via internal [`RwLock`]s. Used by tests and by dev runs of
//! the gateway (`--memory`). Semantics match the `SurrealDB` backend:
//! batch appends are atomic (one write lock covers the whole batch) and
//! status writes are idempotent.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;

use vigil_core::{
    Agent, AgentId, AgentStatus, ApprovalId, ApprovalRequest, ApprovalStatus, SpendingPolicy,
    Timestamp, TransactionRecord, WalletAddress,
};

use crate::error::{StorageError, StorageResult};
use crate::stores::{AgentStore, ApprovalStore, LedgerStore, PolicyStore};

/// In-memory agent directory.
#[derive(Default)]
pub struct MemoryAgentStore {
    agents: RwLock<HashMap<AgentId, Agent>>,
}

impl MemoryAgentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered agents.
    #[must_use]
    pub fn count(&self) -> usize {
        self.agents.read().map(|a| a.len()).unwrap_or(0)
    }
}

#[async_trait]
impl AgentStore for MemoryAgentStore {
    async fn insert(&self, agent: Agent) -> StorageResult<()> {
        let mut agents = self
            .agents
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        agents.insert(agent.id, agent);
        Ok(())
    }

    async fn get(&self, id: &AgentId) -> StorageResult<Option<Agent>> {
        let agents = self
            .agents
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(agents.get(id).cloned())
    }

    async fn find_by_wallet(&self, wallet: &WalletAddress) -> StorageResult<Vec<Agent>> {
        let agents = self
            .agents
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let mut found: Vec<Agent> = agents
            .values()
            .filter(|a| &a.wallet == wallet)
            .cloned()
            .collect();
        // Stable order so first-match resolution is deterministic
        found.sort_by_key(|a| a.created_at);
        Ok(found)
    }

    async fn find_by_credential_hash(&self, hash: &str) -> StorageResult<Option<Agent>> {
        let agents = self
            .agents
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(agents
            .values()
            .find(|a| a.credential_hash == hash)
            .cloned())
    }

    async fn touch_last_seen(&self, id: &AgentId, at: Timestamp) -> StorageResult<()> {
        let mut agents = self
            .agents
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let agent = agents
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        agent.last_seen = at;
        Ok(())
    }

    async fn set_status(&self, id: &AgentId, status: AgentStatus) -> StorageResult<()> {
        let mut agents = self
            .agents
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let agent = agents
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        agent.status = status;
        Ok(())
    }
}

impl fmt::Debug for MemoryAgentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAgentStore")
            .field("count", &self.count())
            .finish()
    }
}

/// In-memory policy store.
#[derive(Default)]
pub struct MemoryPolicyStore {
    policies: RwLock<Vec<SpendingPolicy>>,
}

impl MemoryPolicyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn active_for(&self, agent_id: &AgentId) -> StorageResult<Option<SpendingPolicy>> {
        let policies = self
            .policies
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(policies
            .iter()
            .find(|p| &p.agent_id == agent_id && p.active)
            .cloned())
    }

    async fn set_active(&self, policy: SpendingPolicy) -> StorageResult<()> {
        let mut policies = self
            .policies
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        for existing in policies.iter_mut() {
            if existing.agent_id == policy.agent_id {
                existing.active = false;
            }
        }
        policies.push(policy);
        Ok(())
    }
}

impl fmt::Debug for MemoryPolicyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPolicyStore").finish_non_exhaustive()
    }
}

/// In-memory approval request store.
#[derive(Default)]
pub struct MemoryApprovalStore {
    requests: RwLock<HashMap<ApprovalId, ApprovalRequest>>,
}

impl MemoryApprovalStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApprovalStore for MemoryApprovalStore {
    async fn insert(&self, request: ApprovalRequest) -> StorageResult<()> {
        let mut requests = self
            .requests
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        requests.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: &ApprovalId) -> StorageResult<Option<ApprovalRequest>> {
        let requests = self
            .requests
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(requests.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &ApprovalId,
        status: ApprovalStatus,
        responded_at: Option<Timestamp>,
    ) -> StorageResult<()> {
        let mut requests = self
            .requests
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let request = requests
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        request.status = status;
        request.responded_at = responded_at;
        Ok(())
    }

    async fn pending_for_agent(&self, agent_id: &AgentId) -> StorageResult<Vec<ApprovalRequest>> {
        let requests = self
            .requests
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let mut pending: Vec<ApprovalRequest> = requests
            .values()
            .filter(|r| &r.agent_id == agent_id && r.status == ApprovalStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }
}

impl fmt::Debug for MemoryApprovalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.requests.read().map(|r| r.len()).unwrap_or(0);
        f.debug_struct("MemoryApprovalStore")
            .field("count", &count)
            .finish()
    }
}

/// In-memory append-only ledger.
#[derive(Default)]
pub struct MemoryLedgerStore {
    records: RwLock<Vec<TransactionRecord>>,
}

impl MemoryLedgerStore {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records (matched and unmatched).
    #[must_use]
    pub fn total(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn append_batch(&self, mut batch: Vec<TransactionRecord>) -> StorageResult<()> {
        // One write lock for the whole batch: readers see all of it or none
        let mut records = self
            .records
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        records.append(&mut batch);
        Ok(())
    }

    async fn for_agent_since(
        &self,
        agent_id: &AgentId,
        since: Timestamp,
    ) -> StorageResult<Vec<TransactionRecord>> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let mut found: Vec<TransactionRecord> = records
            .iter()
            .filter(|r| r.agent_id.as_ref() == Some(agent_id) && r.timestamp >= since)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.timestamp);
        Ok(found)
    }

    async fn count_for_agent(&self, agent_id: &AgentId) -> StorageResult<usize> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(records
            .iter()
            .filter(|r| r.agent_id.as_ref() == Some(agent_id))
            .count())
    }
}

impl fmt::Debug for MemoryLedgerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLedgerStore")
            .field("total", &self.total())
            .finish()
    }
}

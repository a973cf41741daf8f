//! `SurrealDB`-backed store implementations.
//!
//! Each entity is stored as a document under a `doc` field so application
//! identifiers never collide with the record-id namespace. Range queries on
//! the ledger use a sibling `ts` field holding the record's timestamp as
//! Unix milliseconds, which keeps the range-on-timestamp comparison numeric.
//!
//! Batch appends run as a single `BEGIN .. COMMIT` transaction; either the
//! whole batch commits or none of it does.

use async_trait::async_trait;

use vigil_core::{
    Agent, AgentId, AgentStatus, ApprovalId, ApprovalRequest, ApprovalStatus, SpendingPolicy,
    Timestamp, TransactionRecord, WalletAddress,
};

use crate::db::Database;
use crate::error::{StorageError, StorageResult};
use crate::stores::{AgentStore, ApprovalStore, LedgerStore, PolicyStore};

fn internal(e: surrealdb::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// Agent directory over `SurrealDB`.
#[derive(Debug, Clone)]
pub struct SurrealAgentStore {
    db: Database,
}

impl SurrealAgentStore {
    /// Create a store over an existing connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AgentStore for SurrealAgentStore {
    async fn insert(&self, agent: Agent) -> StorageResult<()> {
        self.db
            .client()
            .query("CREATE agent SET doc = $doc")
            .bind(("doc", agent))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        Ok(())
    }

    async fn get(&self, id: &AgentId) -> StorageResult<Option<Agent>> {
        let mut response = self
            .db
            .client()
            .query("SELECT VALUE doc FROM agent WHERE doc.id = $id LIMIT 1")
            .bind(("id", id.0))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        let mut found: Vec<Agent> = response.take(0).map_err(internal)?;
        Ok(found.pop())
    }

    async fn find_by_wallet(&self, wallet: &WalletAddress) -> StorageResult<Vec<Agent>> {
        let mut response = self
            .db
            .client()
            .query("SELECT VALUE doc FROM agent WHERE doc.wallet = $wallet")
            .bind(("wallet", wallet.as_str().to_string()))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        let mut found: Vec<Agent> = response.take(0).map_err(internal)?;
        // Stable order so first-match resolution is deterministic
        found.sort_by_key(|a| a.created_at);
        Ok(found)
    }

    async fn find_by_credential_hash(&self, hash: &str) -> StorageResult<Option<Agent>> {
        let mut response = self
            .db
            .client()
            .query("SELECT VALUE doc FROM agent WHERE doc.credential_hash = $hash LIMIT 1")
            .bind(("hash", hash.to_string()))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        let mut found: Vec<Agent> = response.take(0).map_err(internal)?;
        Ok(found.pop())
    }

    async fn touch_last_seen(&self, id: &AgentId, at: Timestamp) -> StorageResult<()> {
        let mut response = self
            .db
            .client()
            .query("UPDATE agent SET doc.last_seen = $at WHERE doc.id = $id RETURN VALUE doc")
            .bind(("at", at))
            .bind(("id", id.0))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        let updated: Vec<Agent> = response.take(0).map_err(internal)?;
        if updated.is_empty() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_status(&self, id: &AgentId, status: AgentStatus) -> StorageResult<()> {
        let mut response = self
            .db
            .client()
            .query("UPDATE agent SET doc.status = $status WHERE doc.id = $id RETURN VALUE doc")
            .bind(("status", status))
            .bind(("id", id.0))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        let updated: Vec<Agent> = response.take(0).map_err(internal)?;
        if updated.is_empty() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Policy store over `SurrealDB`.
#[derive(Debug, Clone)]
pub struct SurrealPolicyStore {
    db: Database,
}

impl SurrealPolicyStore {
    /// Create a store over an existing connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PolicyStore for SurrealPolicyStore {
    async fn active_for(&self, agent_id: &AgentId) -> StorageResult<Option<SpendingPolicy>> {
        let mut response = self
            .db
            .client()
            .query(
                "SELECT VALUE doc FROM policy \
                 WHERE doc.agent_id = $agent AND doc.active = true LIMIT 1",
            )
            .bind(("agent", agent_id.0))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        let mut found: Vec<SpendingPolicy> = response.take(0).map_err(internal)?;
        Ok(found.pop())
    }

    async fn set_active(&self, policy: SpendingPolicy) -> StorageResult<()> {
        // Deactivate-then-create in one transaction keeps the
        // one-active-per-agent invariant under concurrent writers.
        let agent = policy.agent_id.0;
        self.db
            .client()
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE policy SET doc.active = false WHERE doc.agent_id = $agent; \
                 CREATE policy SET doc = $doc; \
                 COMMIT TRANSACTION;",
            )
            .bind(("agent", agent))
            .bind(("doc", policy))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        Ok(())
    }
}

/// Approval request store over `SurrealDB`.
#[derive(Debug, Clone)]
pub struct SurrealApprovalStore {
    db: Database,
}

impl SurrealApprovalStore {
    /// Create a store over an existing connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ApprovalStore for SurrealApprovalStore {
    async fn insert(&self, request: ApprovalRequest) -> StorageResult<()> {
        self.db
            .client()
            .query("CREATE approval SET doc = $doc")
            .bind(("doc", request))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        Ok(())
    }

    async fn get(&self, id: &ApprovalId) -> StorageResult<Option<ApprovalRequest>> {
        let mut response = self
            .db
            .client()
            .query("SELECT VALUE doc FROM approval WHERE doc.id = $id LIMIT 1")
            .bind(("id", id.0))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        let mut found: Vec<ApprovalRequest> = response.take(0).map_err(internal)?;
        Ok(found.pop())
    }

    async fn update_status(
        &self,
        id: &ApprovalId,
        status: ApprovalStatus,
        responded_at: Option<Timestamp>,
    ) -> StorageResult<()> {
        let mut response = self
            .db
            .client()
            .query(
                "UPDATE approval SET doc.status = $status, doc.responded_at = $responded \
                 WHERE doc.id = $id RETURN VALUE doc",
            )
            .bind(("status", status))
            .bind(("responded", responded_at))
            .bind(("id", id.0))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        let updated: Vec<ApprovalRequest> = response.take(0).map_err(internal)?;
        if updated.is_empty() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn pending_for_agent(&self, agent_id: &AgentId) -> StorageResult<Vec<ApprovalRequest>> {
        let mut response = self
            .db
            .client()
            .query(
                "SELECT VALUE doc FROM approval \
                 WHERE doc.agent_id = $agent AND doc.status = 'pending'",
            )
            .bind(("agent", agent_id.0))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        let mut found: Vec<ApprovalRequest> = response.take(0).map_err(internal)?;
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }
}

/// Append-only ledger over `SurrealDB`.
#[derive(Debug, Clone)]
pub struct SurrealLedgerStore {
    db: Database,
}

impl SurrealLedgerStore {
    /// Create a store over an existing connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for SurrealLedgerStore {
    async fn append_batch(&self, records: Vec<TransactionRecord>) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut sql = String::from("BEGIN TRANSACTION; ");
        for i in 0..records.len() {
            sql.push_str(&format!(
                "CREATE ledger SET doc = $doc{i}, ts = $ts{i}, agent = $agent{i}; "
            ));
        }
        sql.push_str("COMMIT TRANSACTION;");

        let mut query = self.db.client().query(sql);
        for (i, record) in records.into_iter().enumerate() {
            let ts = record.timestamp.datetime().timestamp_millis();
            let agent = record.agent_id.map(|a| a.0.to_string());
            query = query
                .bind((format!("ts{i}"), ts))
                .bind((format!("agent{i}"), agent))
                .bind((format!("doc{i}"), record));
        }

        query.await.map_err(internal)?.check().map_err(internal)?;
        Ok(())
    }

    async fn for_agent_since(
        &self,
        agent_id: &AgentId,
        since: Timestamp,
    ) -> StorageResult<Vec<TransactionRecord>> {
        let mut response = self
            .db
            .client()
            .query("SELECT VALUE doc FROM ledger WHERE agent = $agent AND ts >= $since")
            .bind(("agent", agent_id.0.to_string()))
            .bind(("since", since.datetime().timestamp_millis()))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        let mut found: Vec<TransactionRecord> = response.take(0).map_err(internal)?;
        found.sort_by_key(|r| r.timestamp);
        Ok(found)
    }

    async fn count_for_agent(&self, agent_id: &AgentId) -> StorageResult<usize> {
        let mut response = self
            .db
            .client()
            .query("SELECT VALUE ts FROM ledger WHERE agent = $agent")
            .bind(("agent", agent_id.0.to_string()))
            .await
            .map_err(internal)?
            .check()
            .map_err(internal)?;
        let found: Vec<i64> = response.take(0).map_err(internal)?;
        Ok(found.len())
    }
}

//! Shared application state for the HTTP surface.

use std::fmt;
use std::sync::Arc;

use vigil_core::DEFAULT_TTL_MINUTES;
use vigil_engine::{
    AgentDirectory, ApprovalManager, Dispatcher, IngestionPipeline, LedgerReader, PolicyEvaluator,
};
use vigil_storage::{AgentStore, ApprovalStore, LedgerStore, PolicyStore};

/// The store handles one backend provides.
pub struct Stores {
    /// Agent directory store.
    pub agents: Arc<dyn AgentStore>,
    /// Spending policy store.
    pub policies: Arc<dyn PolicyStore>,
    /// Approval request store.
    pub approvals: Arc<dyn ApprovalStore>,
    /// Transaction ledger store.
    pub ledger: Arc<dyn LedgerStore>,
}

/// Everything the handlers need, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Agent directory store, for registration and credential lookups.
    pub agents: Arc<dyn AgentStore>,
    /// Policy store, for the owner-facing policy surface.
    pub policies: Arc<dyn PolicyStore>,
    /// Approval lifecycle manager.
    pub manager: Arc<ApprovalManager>,
    /// Transaction ingestion pipeline.
    pub pipeline: Arc<IngestionPipeline>,
    /// Token the indexer must present on the ingestion webhook.
    pub ingest_token: Option<String>,
    /// Token guarding the human surface: decisions, pending queue, policy
    /// writes.
    pub admin_token: Option<String>,
    /// Default TTL for pending approval requests, in minutes.
    pub default_ttl_minutes: u32,
}

impl AppState {
    /// Wire the engine services over a set of stores.
    #[must_use]
    pub fn new(stores: Stores, dispatcher: Arc<Dispatcher>) -> Self {
        let evaluator = PolicyEvaluator::new(
            Arc::clone(&stores.policies),
            LedgerReader::new(Arc::clone(&stores.ledger)),
        );
        let manager = Arc::new(ApprovalManager::new(
            Arc::clone(&stores.approvals),
            evaluator,
            Arc::clone(&dispatcher),
        ));
        let pipeline = Arc::new(IngestionPipeline::new(
            Arc::clone(&stores.ledger),
            AgentDirectory::new(Arc::clone(&stores.agents)),
            dispatcher,
        ));
        Self {
            agents: stores.agents,
            policies: stores.policies,
            manager,
            pipeline,
            ingest_token: None,
            admin_token: None,
            default_ttl_minutes: DEFAULT_TTL_MINUTES,
        }
    }

    /// Set the ingest webhook token.
    #[must_use]
    pub fn with_ingest_token(mut self, token: Option<String>) -> Self {
        self.ingest_token = token;
        self
    }

    /// Set the admin token for the human decision and policy surface.
    #[must_use]
    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token;
        self
    }

    /// Set the default approval TTL.
    #[must_use]
    pub fn with_default_ttl(mut self, minutes: u32) -> Self {
        self.default_ttl_minutes = minutes;
        self
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("ingest_token_set", &self.ingest_token.is_some())
            .field("admin_token_set", &self.admin_token.is_some())
            .field("default_ttl_minutes", &self.default_ttl_minutes)
            .finish_non_exhaustive()
    }
}

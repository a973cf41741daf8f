//! Approval request lifecycle.
//!
//! The manager owns the `pending -> approved | denied | expired` state
//! machine. Expiry is lazy: no background sweeper runs, and a lapsed
//! pending request is detected and persisted the first time any read path
//! touches it. Between the deadline and that first read the request is
//! *effectively* expired — every read observes `expired` — so the stored
//! status is an implementation detail, never a behavioral one.

use std::fmt;
use std::sync::Arc;

use vigil_core::{
    Agent, AgentId, ApprovalId, ApprovalRequest, ApprovalStatus, Timestamp, TxMetadata,
    DEFAULT_TTL_MINUTES,
};
use vigil_storage::ApprovalStore;

use crate::error::{EngineError, EngineResult};
use crate::evaluator::PolicyEvaluator;
use crate::notify::{Dispatcher, Notification};

/// Parameters for a new approval request.
#[derive(Debug, Clone)]
pub struct NewApprovalRequest {
    /// Free-text description of what the agent wants to do.
    pub description: String,
    /// The proposed transaction.
    pub tx: TxMetadata,
    /// TTL override in minutes; defaults to [`DEFAULT_TTL_MINUTES`].
    pub ttl_minutes: Option<u32>,
}

/// Creates approval requests and drives their lifecycle.
pub struct ApprovalManager {
    approvals: Arc<dyn ApprovalStore>,
    evaluator: PolicyEvaluator,
    dispatcher: Arc<Dispatcher>,
}

impl ApprovalManager {
    /// Create a manager over an approval store, evaluator, and dispatcher.
    #[must_use]
    pub fn new(
        approvals: Arc<dyn ApprovalStore>,
        evaluator: PolicyEvaluator,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            approvals,
            evaluator,
            dispatcher,
        }
    }

    /// Create an approval request for a proposed transaction.
    ///
    /// The request is persisted atomically with its initial policy verdict:
    /// it is born either `approved` (auto-approval is an instantaneous
    /// transition, not a separate state) or `pending`. A pending request
    /// notifies the agent's owner; delivery is fire-and-forget and never
    /// delays or fails the creation.
    ///
    /// # Errors
    ///
    /// Returns a storage error if evaluation or the insert fails.
    pub async fn create(
        &self,
        agent: &Agent,
        new: NewApprovalRequest,
    ) -> EngineResult<ApprovalRequest> {
        let verdict = self
            .evaluator
            .evaluate(
                &agent.id,
                new.tx.estimated_cost,
                new.tx.target_program.as_deref(),
            )
            .await?;

        let ttl = new.ttl_minutes.unwrap_or(DEFAULT_TTL_MINUTES);
        let request = if verdict.auto_approved {
            ApprovalRequest::auto_approved(
                agent.id,
                &agent.name,
                &new.description,
                new.tx,
                ttl,
                &verdict.reason,
            )
        } else {
            ApprovalRequest::pending(
                agent.id,
                &agent.name,
                &new.description,
                new.tx,
                ttl,
                &verdict.reason,
            )
        };

        self.approvals.insert(request.clone()).await?;
        tracing::info!(
            request = %request.id,
            agent = %agent.id,
            status = %request.status,
            reason = %request.policy_reason,
            "approval request created"
        );

        if request.status == ApprovalStatus::Pending {
            let notification = Notification::ApprovalRequested {
                agent_id: agent.id,
                agent_name: agent.name.clone(),
                owner_id: agent.owner_id.clone(),
                description: request.description.clone(),
                estimated_cost: request.tx.estimated_cost,
                expires_at: request.expires_at,
            };
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                dispatcher.dispatch(notification).await;
            });
        }

        Ok(request)
    }

    /// Fetch a request, expiring it first if its TTL has lapsed.
    ///
    /// This is the lazy-expiry read path: a pending request past its
    /// deadline is persisted as `expired` before being returned, so no
    /// caller ever observes a stale `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ApprovalNotFound`] or a storage error.
    pub async fn poll(&self, id: &ApprovalId) -> EngineResult<ApprovalRequest> {
        let mut request = self
            .approvals
            .get(id)
            .await?
            .ok_or(EngineError::ApprovalNotFound(*id))?;

        if request.is_past_expiry(Timestamp::now()) {
            // Idempotent write: concurrent observers may race to this
            self.approvals
                .update_status(id, ApprovalStatus::Expired, None)
                .await?;
            request.status = ApprovalStatus::Expired;
            tracing::info!(request = %id, "pending request lapsed");
        }

        Ok(request)
    }

    /// Record a human decision on a pending request.
    ///
    /// Expiry wins over a late response: if the TTL lapsed, the decision is
    /// rejected even when no read had yet persisted the expiry. Decisions
    /// against any non-pending request are rejected, which makes a repeated
    /// response an error rather than a silent success.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] when the request is not
    /// pending, [`EngineError::ApprovalNotFound`], or a storage error.
    pub async fn respond(&self, id: &ApprovalId, approve: bool) -> EngineResult<ApprovalRequest> {
        let mut request = self.poll(id).await?;
        if request.status != ApprovalStatus::Pending {
            return Err(EngineError::InvalidTransition {
                status: request.status,
            });
        }

        let status = if approve {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Denied
        };
        let responded_at = Timestamp::now();
        self.approvals
            .update_status(id, status, Some(responded_at))
            .await?;
        request.status = status;
        request.responded_at = Some(responded_at);

        tracing::info!(request = %id, status = %status, "decision recorded");
        Ok(request)
    }

    /// All still-pending requests for an agent, oldest first.
    ///
    /// Requests past their deadline are expired on the way through and
    /// excluded from the result.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query or an expiry write fails.
    pub async fn pending_for_agent(
        &self,
        agent_id: &AgentId,
    ) -> EngineResult<Vec<ApprovalRequest>> {
        let now = Timestamp::now();
        let mut live = Vec::new();
        for request in self.approvals.pending_for_agent(agent_id).await? {
            if request.is_past_expiry(now) {
                self.approvals
                    .update_status(&request.id, ApprovalStatus::Expired, None)
                    .await?;
            } else {
                live.push(request);
            }
        }
        Ok(live)
    }
}

impl fmt::Debug for ApprovalManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApprovalManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerReader;
    use crate::notify::{NotificationSink, RecordingSink};
    use std::time::Duration;
    use vigil_core::{SpendingPolicy, TxKind};
    use vigil_storage::{
        LedgerStore, MemoryApprovalStore, MemoryLedgerStore, MemoryPolicyStore, PolicyStore,
        StorageResult,
    };

    struct Fixture {
        manager: ApprovalManager,
        approvals: Arc<MemoryApprovalStore>,
        policies: Arc<MemoryPolicyStore>,
        recording: Arc<RecordingSink>,
        agent: Agent,
    }

    fn fixture() -> Fixture {
        let approvals = Arc::new(MemoryApprovalStore::new());
        let policies = Arc::new(MemoryPolicyStore::new());
        let ledger = Arc::new(MemoryLedgerStore::new());
        let recording = Arc::new(RecordingSink::default());
        let dispatcher = Arc::new(
            Dispatcher::new().with_sink(Arc::clone(&recording) as Arc<dyn NotificationSink>),
        );
        let evaluator = PolicyEvaluator::new(
            Arc::clone(&policies) as Arc<dyn PolicyStore>,
            LedgerReader::new(ledger as Arc<dyn LedgerStore>),
        );
        let manager = ApprovalManager::new(
            Arc::clone(&approvals) as Arc<dyn ApprovalStore>,
            evaluator,
            dispatcher,
        );
        let agent = Agent::register(
            "trader-1",
            "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU"
                .parse()
                .unwrap(),
            "owner-1",
            "hash",
        );
        Fixture {
            manager,
            approvals,
            policies,
            recording,
            agent,
        }
    }

    /// daily 1.0 / per-tx 0.5 / approval above 0.1
    async fn install_policy(fx: &Fixture) -> StorageResult<()> {
        fx.policies
            .set_active(SpendingPolicy::new(fx.agent.id, 1.0, 0.5, 0.1))
            .await
    }

    fn new_request(cost: f64) -> NewApprovalRequest {
        NewApprovalRequest {
            description: "rebalance position".to_string(),
            tx: TxMetadata::new(TxKind::Transfer, cost),
            ttl_minutes: None,
        }
    }

    #[tokio::test]
    async fn test_auto_approval_skips_notification() {
        let fx = fixture();
        install_policy(&fx).await.unwrap();

        let request = fx.manager.create(&fx.agent, new_request(0.05)).await.unwrap();
        assert_eq!(request.status, ApprovalStatus::Approved);
        assert_eq!(request.responded_at, Some(request.created_at));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fx.recording.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_request_notifies_owner() {
        let fx = fixture();
        install_policy(&fx).await.unwrap();

        let request = fx.manager.create(&fx.agent, new_request(0.3)).await.unwrap();
        assert_eq!(request.status, ApprovalStatus::Pending);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let delivered = fx.recording.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].owner_id(), "owner-1");
    }

    #[tokio::test]
    async fn test_respond_approve_and_deny() {
        let fx = fixture();
        install_policy(&fx).await.unwrap();

        let pending = fx.manager.create(&fx.agent, new_request(0.3)).await.unwrap();
        let approved = fx.manager.respond(&pending.id, true).await.unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);
        assert!(approved.responded_at.is_some());

        let pending = fx.manager.create(&fx.agent, new_request(0.3)).await.unwrap();
        let denied = fx.manager.respond(&pending.id, false).await.unwrap();
        assert_eq!(denied.status, ApprovalStatus::Denied);
    }

    #[tokio::test]
    async fn test_repeated_response_rejected() {
        let fx = fixture();
        install_policy(&fx).await.unwrap();

        let pending = fx.manager.create(&fx.agent, new_request(0.3)).await.unwrap();
        fx.manager.respond(&pending.id, true).await.unwrap();

        let second = fx.manager.respond(&pending.id, true).await;
        assert!(matches!(
            second,
            Err(EngineError::InvalidTransition {
                status: ApprovalStatus::Approved
            })
        ));
    }

    #[tokio::test]
    async fn test_lazy_expiry_on_poll() {
        let fx = fixture();
        install_policy(&fx).await.unwrap();

        let mut request = fx.manager.create(&fx.agent, new_request(0.3)).await.unwrap();
        assert_eq!(request.status, ApprovalStatus::Pending);

        // Push the deadline into the past directly in the store
        request.expires_at = Timestamp::now().minus_minutes(1);
        fx.approvals.insert(request.clone()).await.unwrap();

        let observed = fx.manager.poll(&request.id).await.unwrap();
        assert_eq!(observed.status, ApprovalStatus::Expired);

        // Expiry is persisted, not just reported
        let stored = fx.approvals.get(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApprovalStatus::Expired);
    }

    #[tokio::test]
    async fn test_late_response_loses_to_expiry() {
        let fx = fixture();
        install_policy(&fx).await.unwrap();

        let mut request = fx.manager.create(&fx.agent, new_request(0.3)).await.unwrap();
        request.expires_at = Timestamp::now().minus_minutes(1);
        fx.approvals.insert(request.clone()).await.unwrap();

        // No read has persisted the expiry yet; the response still loses
        let result = fx.manager.respond(&request.id, true).await;
        assert!(matches!(
            result,
            Err(EngineError::InvalidTransition {
                status: ApprovalStatus::Expired
            })
        ));
    }

    #[tokio::test]
    async fn test_pending_list_excludes_lapsed() {
        let fx = fixture();
        install_policy(&fx).await.unwrap();

        let live = fx.manager.create(&fx.agent, new_request(0.3)).await.unwrap();
        let mut lapsed = fx.manager.create(&fx.agent, new_request(0.4)).await.unwrap();
        lapsed.expires_at = Timestamp::now().minus_minutes(1);
        fx.approvals.insert(lapsed.clone()).await.unwrap();

        let pending = fx.manager.pending_for_agent(&fx.agent.id).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, live.id);

        let stored = fx.approvals.get(&lapsed.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApprovalStatus::Expired);
    }

    #[tokio::test]
    async fn test_no_policy_creates_pending_request() {
        let fx = fixture();
        // No policy installed: fail closed, everything needs a human
        let request = fx
            .manager
            .create(&fx.agent, new_request(0.000_001))
            .await
            .unwrap();
        assert_eq!(request.status, ApprovalStatus::Pending);
        assert!(request.policy_reason.contains("no active spending policy"));
    }

    #[tokio::test]
    async fn test_poll_missing_request() {
        let fx = fixture();
        let missing = ApprovalId::new();
        assert!(matches!(
            fx.manager.poll(&missing).await,
            Err(EngineError::ApprovalNotFound(_))
        ));
    }
}

//! Policy evaluation — the auto-approve / require-approval decision.

use std::fmt;
use std::sync::Arc;

use vigil_core::{AgentId, Timestamp};
use vigil_storage::PolicyStore;

use crate::error::EngineResult;
use crate::ledger::LedgerReader;

/// The outcome of evaluating a proposed transaction against policy.
#[derive(Debug, Clone)]
pub struct Verdict {
    /// Whether the transaction may proceed without a human decision.
    pub auto_approved: bool,
    /// Human-readable reason, recorded on the approval request.
    pub reason: String,
}

impl Verdict {
    fn auto(reason: impl Into<String>) -> Self {
        Self {
            auto_approved: true,
            reason: reason.into(),
        }
    }

    fn escalate(reason: impl Into<String>) -> Self {
        Self {
            auto_approved: false,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let disposition = if self.auto_approved {
            "auto-approved"
        } else {
            "requires approval"
        };
        write!(f, "{disposition}: {}", self.reason)
    }
}

/// Evaluates proposed transactions against the agent's active policy.
///
/// Checks run in a fixed order and the first failing check decides the
/// verdict; a transaction that violates several limits reports the
/// earliest one. The order, from cheapest to most expensive:
///
/// 1. no active policy (fail closed)
/// 2. per-transaction limit
/// 3. projected daily limit (spent so far plus this amount)
/// 4. target allowlist
/// 5. approval threshold
///
/// The daily-limit check is *projected*: it asks whether completing this
/// transaction would breach the limit, not whether the limit is already
/// breached.
pub struct PolicyEvaluator {
    policies: Arc<dyn PolicyStore>,
    ledger: LedgerReader,
}

impl PolicyEvaluator {
    /// Create an evaluator over a policy store and ledger reader.
    #[must_use]
    pub fn new(policies: Arc<dyn PolicyStore>, ledger: LedgerReader) -> Self {
        Self { policies, ledger }
    }

    /// Evaluate a proposed spend of `amount` against the agent's policy.
    ///
    /// `target` is the program/contract the transaction would touch, when
    /// known.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the policy or ledger read fails. Policy
    /// *outcomes* are never errors; they are verdicts.
    pub async fn evaluate(
        &self,
        agent_id: &AgentId,
        amount: f64,
        target: Option<&str>,
    ) -> EngineResult<Verdict> {
        let Some(policy) = self.policies.active_for(agent_id).await? else {
            // Fail closed: no configuration never means unrestricted spending
            return Ok(Verdict::escalate(
                "no active spending policy is configured; automatic approval is disabled",
            ));
        };

        if amount > policy.per_tx_limit {
            return Ok(Verdict::escalate(format!(
                "amount {amount} exceeds the per-tx limit {limit}",
                limit = policy.per_tx_limit
            )));
        }

        let spent = self.ledger.daily_spent(agent_id, Timestamp::now()).await?;
        let projected = spent + amount;
        if projected > policy.daily_limit {
            return Ok(Verdict::escalate(format!(
                "Daily limit {limit} would be exceeded: {spent} spent today, {projected} projected",
                limit = policy.daily_limit
            )));
        }

        if !policy.allows_target(target) {
            let shown = target.unwrap_or_default();
            return Ok(Verdict::escalate(format!(
                "target program {shown} is not on the allowlist"
            )));
        }

        if amount > policy.require_approval_above {
            return Ok(Verdict::escalate(format!(
                "amount {amount} exceeds the approval threshold {threshold}",
                threshold = policy.require_approval_above
            )));
        }

        Ok(Verdict::auto("within policy limits"))
    }
}

impl fmt::Debug for PolicyEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyEvaluator").finish_non_exhaustive()
    }
}

//! Spending ledger reader — rolling daily spend totals.

use std::fmt;
use std::sync::Arc;

use vigil_core::{AgentId, Timestamp};
use vigil_storage::LedgerStore;

use crate::error::EngineResult;

/// Computes an agent's spend total for the rolling daily accounting window.
///
/// The window is the current UTC day; a record contributes `amount + fee`
/// when it succeeded. Because the ledger is append-only, the same snapshot
/// always yields the same total.
pub struct LedgerReader {
    ledger: Arc<dyn LedgerStore>,
}

impl LedgerReader {
    /// Create a reader over a ledger store.
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    /// Total successful spend for the UTC day containing `now`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the range query fails.
    pub async fn daily_spent(&self, agent_id: &AgentId, now: Timestamp) -> EngineResult<f64> {
        let since = now.start_of_utc_day();
        let records = self.ledger.for_agent_since(agent_id, since).await?;
        Ok(records
            .iter()
            .filter(|r| r.counts_toward_spend())
            .map(vigil_core::TransactionRecord::spend_value)
            .sum())
    }
}

impl fmt::Debug for LedgerReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerReader").finish_non_exhaustive()
    }
}

//! Agent directory — wallet-address and identity lookups for the engine.

use std::fmt;
use std::sync::Arc;

use vigil_core::{Agent, AgentId, Timestamp, WalletAddress};
use vigil_storage::AgentStore;

use crate::error::{EngineError, EngineResult};

/// Resolves observed counter-party addresses to registered agents.
///
/// Wallet-address uniqueness across agents is not enforced by the store, so
/// a lookup can in principle return several agents; the directory resolves
/// ambiguity by first match (oldest registration wins).
pub struct AgentDirectory {
    agents: Arc<dyn AgentStore>,
}

impl AgentDirectory {
    /// Create a directory over an agent store.
    #[must_use]
    pub fn new(agents: Arc<dyn AgentStore>) -> Self {
        Self { agents }
    }

    /// Fetch an agent by id, as a typed not-found error when missing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AgentNotFound`] or a storage error.
    pub async fn require(&self, id: &AgentId) -> EngineResult<Agent> {
        self.agents
            .get(id)
            .await?
            .ok_or(EngineError::AgentNotFound(*id))
    }

    /// Match a counter-party pair against registered agent wallets.
    ///
    /// Checks the sending address first, then the receiving one; the first
    /// registered agent found wins. Addresses that do not parse as valid
    /// wallet addresses simply never match.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a lookup fails.
    pub async fn resolve_counterparty(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> EngineResult<Option<Agent>> {
        for candidate in [from, to].into_iter().flatten() {
            let Ok(wallet) = candidate.parse::<WalletAddress>() else {
                continue;
            };
            let mut matches = self.agents.find_by_wallet(&wallet).await?;
            if !matches.is_empty() {
                return Ok(Some(matches.remove(0)));
            }
        }
        Ok(None)
    }

    /// Refresh an agent's last-seen timestamp.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub async fn touch(&self, id: &AgentId, at: Timestamp) -> EngineResult<()> {
        self.agents.touch_last_seen(id, at).await?;
        Ok(())
    }
}

impl fmt::Debug for AgentDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentDirectory").finish_non_exhaustive()
    }
}

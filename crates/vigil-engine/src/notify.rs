//! Best-effort notification fan-out.
//!
//! Notifications are advisory, not authoritative. The [`Dispatcher`]
//! contract is **at-most-once, no retry**: a failed delivery is logged and
//! dropped, never replayed, and never propagates to the caller. The
//! non-guarantee lives here in the interface instead of being buried as a
//! swallowed exception somewhere in a handler.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use vigil_core::{AgentId, Timestamp};

/// A human-facing alert emitted by the governance engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Notification {
    /// An agent's proposed transaction is waiting on a human decision.
    ApprovalRequested {
        /// The agent that proposed the transaction.
        agent_id: AgentId,
        /// Agent display name.
        agent_name: String,
        /// The human who should decide.
        owner_id: String,
        /// What the agent wants to do.
        description: String,
        /// Estimated cost in the chain's native unit.
        estimated_cost: f64,
        /// When the pending request lapses.
        expires_at: Timestamp,
    },
    /// New confirmed on-chain activity was attributed to an agent.
    AgentActivity {
        /// The matched agent.
        agent_id: AgentId,
        /// Agent display name.
        agent_name: String,
        /// The agent's owner.
        owner_id: String,
        /// Number of new transactions in this batch.
        tx_count: usize,
    },
}

impl Notification {
    /// The owner this notification is addressed to.
    #[must_use]
    pub fn owner_id(&self) -> &str {
        match self {
            Self::ApprovalRequested { owner_id, .. } | Self::AgentActivity { owner_id, .. } => {
                owner_id
            },
        }
    }

    /// Short human-readable headline.
    #[must_use]
    pub fn headline(&self) -> String {
        match self {
            Self::ApprovalRequested {
                agent_name,
                estimated_cost,
                ..
            } => format!("{agent_name} requests approval to spend {estimated_cost}"),
            Self::AgentActivity {
                agent_name,
                tx_count,
                ..
            } => {
                if *tx_count == 1 {
                    format!("{agent_name}: 1 new transaction")
                } else {
                    format!("{agent_name}: {tx_count} new transactions")
                }
            },
        }
    }
}

/// Errors from a delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The sink could not deliver the notification.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// A delivery channel for human-facing alerts.
///
/// Push tokens, chat bots, and e-mail bridges all sit behind this trait;
/// the engine neither knows nor cares which transport is wired in.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Attempt to deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when delivery fails. The dispatcher logs the
    /// failure and moves on; it never retries.
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Whether the sink can currently accept deliveries.
    fn is_available(&self) -> bool {
        true
    }
}

/// A sink that logs notifications through `tracing`.
///
/// The default sink for dev runs and the fallback when no real transport
/// is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            owner = notification.owner_id(),
            headline = %notification.headline(),
            "notification"
        );
        Ok(())
    }
}

/// Fans notifications out to every configured sink.
///
/// Delivery is settle-all, not fail-fast: every sink gets every
/// notification, failures are logged individually, and the dispatcher
/// itself never fails.
pub struct Dispatcher {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl Dispatcher {
    /// Create a dispatcher with no sinks (notifications are dropped).
    #[must_use]
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add a sink, builder style.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of configured sinks.
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver one notification to every available sink.
    ///
    /// Returns the number of successful deliveries.
    pub async fn dispatch(&self, notification: Notification) -> usize {
        let attempts = self
            .sinks
            .iter()
            .filter(|s| s.is_available())
            .map(|sink| {
                let sink = Arc::clone(sink);
                let notification = notification.clone();
                async move { sink.deliver(&notification).await }
            })
            .collect::<Vec<_>>();

        let mut delivered = 0;
        for result in join_all(attempts).await {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    // At-most-once: log and drop, never retry
                    tracing::warn!(error = %e, "notification delivery failed");
                },
            }
        }
        delivered
    }

    /// Deliver a batch of notifications, settle-all.
    ///
    /// Returns the total number of successful deliveries.
    pub async fn dispatch_all(&self, notifications: Vec<Notification>) -> usize {
        let results = join_all(notifications.into_iter().map(|n| self.dispatch(n))).await;
        results.into_iter().sum()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Test sink that records everything it is asked to deliver.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    /// Delivered notifications, in order.
    pub(crate) delivered: std::sync::Mutex<Vec<Notification>>,
}

#[cfg(test)]
#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.delivered
            .lock()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?
            .push(notification.clone());
        Ok(())
    }
}

//! Transaction ingestion — folding confirmed indexer events into the ledger.
//!
//! The pipeline is lenient per event and strict per batch: a malformed or
//! unmatchable event is logged and skipped without poisoning its siblings,
//! but the surviving records are appended in one atomic write so re-running
//! an ingestion never leaves the ledger half-updated.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use vigil_core::{Agent, AgentId, Timestamp, TransactionRecord, TxKind};
use vigil_storage::LedgerStore;

use crate::directory::AgentDirectory;
use crate::error::{EngineError, EngineResult};
use crate::notify::{Dispatcher, Notification};

/// Lamports per native unit.
const LAMPORTS_PER_UNIT: f64 = 1_000_000_000.0;

/// A confirmed transaction event as the indexer reports it.
///
/// Deserialization is lenient: everything except the signature is optional,
/// because indexer payloads vary by transaction kind and indexer version.
/// Validation happens in [`RawTxEvent::normalize`], not in serde.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTxEvent {
    /// On-chain transaction signature. The only mandatory field.
    #[serde(default)]
    pub signature: String,
    /// Indexer's transaction type tag, e.g. `"TRANSFER"`.
    #[serde(rename = "type")]
    pub raw_type: Option<String>,
    /// Indexer-generated human description.
    pub description: Option<String>,
    /// Block time as unix seconds.
    pub timestamp: Option<i64>,
    /// Network fee in lamports.
    pub fee: Option<u64>,
    /// Whether the transaction succeeded on chain.
    pub success: Option<bool>,
    /// Sending address.
    pub from_address: Option<String>,
    /// Receiving address.
    pub to_address: Option<String>,
    /// Amount in the native unit, when the indexer pre-converts.
    pub amount: Option<f64>,
    /// Amount in lamports, when it does not.
    pub lamports: Option<u64>,
    /// Symbol of the moved asset.
    pub token_symbol: Option<String>,
}

impl RawTxEvent {
    /// Validate and convert into a ledger record.
    ///
    /// Conversions applied:
    /// - an absent `type` defaults to [`TxKind::Unknown`]; a present one
    ///   maps through [`TxKind::from_raw`]
    /// - `lamports` is divided down to the native unit when `amount` is
    ///   absent
    /// - a missing or unparseable block time falls back to `now`
    /// - missing `success` is treated as `true` (indexers only omit it for
    ///   confirmed transactions)
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MalformedEvent`] when the signature is empty.
    pub fn normalize(self, now: Timestamp) -> EngineResult<TransactionRecord> {
        if self.signature.is_empty() {
            return Err(EngineError::MalformedEvent(
                "event has no signature".to_string(),
            ));
        }

        let kind = self
            .raw_type
            .as_deref()
            .map_or(TxKind::Unknown, TxKind::from_raw);

        #[allow(clippy::cast_precision_loss)]
        let amount = self
            .amount
            .or_else(|| self.lamports.map(|l| l as f64 / LAMPORTS_PER_UNIT));
        #[allow(clippy::cast_precision_loss)]
        let fee = self.fee.map_or(0.0, |f| f as f64 / LAMPORTS_PER_UNIT);

        let timestamp = self
            .timestamp
            .and_then(Timestamp::from_unix_seconds)
            .unwrap_or(now);

        Ok(TransactionRecord {
            signature: self.signature,
            kind,
            description: self.description.unwrap_or_default(),
            timestamp,
            success: self.success.unwrap_or(true),
            fee,
            from_address: self.from_address,
            to_address: self.to_address,
            agent_id: None,
            amount,
            token_symbol: self.token_symbol,
        })
    }
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Records appended to the ledger.
    pub processed: usize,
    /// Of those, records attributed to a registered agent.
    pub matched: usize,
    /// Events dropped as malformed.
    pub skipped: usize,
}

/// Folds batches of indexer events into the spending ledger.
pub struct IngestionPipeline {
    ledger: Arc<dyn LedgerStore>,
    directory: AgentDirectory,
    dispatcher: Arc<Dispatcher>,
}

impl IngestionPipeline {
    /// Create a pipeline over a ledger, directory, and dispatcher.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        directory: AgentDirectory,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            ledger,
            directory,
            dispatcher,
        }
    }

    /// Ingest a batch of confirmed indexer events.
    ///
    /// Each event is normalized and matched against registered agent
    /// wallets; unmatched events are persisted anyway with no agent
    /// attribution, so history is never discarded just because registration
    /// came later. Matched agents get their last-seen timestamp refreshed
    /// and their owners a fire-and-forget activity notification.
    ///
    /// Re-ingesting the same events appends duplicates: deduplication is
    /// the indexer subscription's job, not the ledger's.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the atomic append fails; in that case
    /// nothing was written.
    pub async fn ingest(&self, events: Vec<RawTxEvent>) -> EngineResult<IngestReport> {
        let now = Timestamp::now();
        let mut report = IngestReport::default();
        let mut records = Vec::with_capacity(events.len());
        let mut activity: HashMap<AgentId, (String, String, usize)> = HashMap::new();

        for event in events {
            let signature = event.signature.clone();
            // Per-event failures drop that event only, never the batch
            match self.stage(event, now).await {
                Ok((record, matched)) => {
                    if let Some(agent) = matched {
                        report.matched += 1;
                        let entry = activity
                            .entry(agent.id)
                            .or_insert_with(|| (agent.name, agent.owner_id, 0));
                        entry.2 += 1;
                    }
                    records.push(record);
                },
                Err(e) => {
                    tracing::warn!(signature = %signature, error = %e, "skipping event");
                    report.skipped += 1;
                },
            }
        }

        report.processed = records.len();
        if !records.is_empty() {
            self.ledger.append_batch(records).await?;
        }

        tracing::info!(
            processed = report.processed,
            matched = report.matched,
            skipped = report.skipped,
            "ingestion complete"
        );

        if !activity.is_empty() {
            let notifications = activity
                .into_iter()
                .map(
                    |(agent_id, (agent_name, owner_id, tx_count))| Notification::AgentActivity {
                        agent_id,
                        agent_name,
                        owner_id,
                        tx_count,
                    },
                )
                .collect();
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                dispatcher.dispatch_all(notifications).await;
            });
        }

        Ok(report)
    }

    /// Normalize and match one event: the per-event, fallible stage.
    async fn stage(
        &self,
        event: RawTxEvent,
        now: Timestamp,
    ) -> EngineResult<(TransactionRecord, Option<Agent>)> {
        let mut record = event.normalize(now)?;
        let matched = self
            .directory
            .resolve_counterparty(record.from_address.as_deref(), record.to_address.as_deref())
            .await?;
        if let Some(agent) = &matched {
            record.agent_id = Some(agent.id);
            self.directory.touch(&agent.id, now).await?;
        }
        Ok((record, matched))
    }
}

impl fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionPipeline").finish_non_exhaustive()
    }
}

//! Append-only ledger entries for observed on-chain activity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{AgentId, Timestamp, TxKind};

/// An immutable ledger entry representing one observed on-chain event.
///
/// Created only by the ingestion pipeline and never mutated afterwards.
/// Append-only discipline is what keeps the ledger reader's daily sums
/// stable and auditable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Chain signature / transaction id.
    pub signature: String,
    /// Inferred semantic kind.
    pub kind: TxKind,
    /// Human-readable description from the indexer.
    pub description: String,
    /// When the transaction was confirmed on-chain.
    pub timestamp: Timestamp,
    /// Whether the transaction succeeded.
    pub success: bool,
    /// Fee paid, in the chain's native unit.
    pub fee: f64,
    /// Sending counter-party address.
    pub from_address: Option<String>,
    /// Receiving counter-party address.
    pub to_address: Option<String>,
    /// The registered agent this event was matched to, if any.
    pub agent_id: Option<AgentId>,
    /// Asset amount moved, in the chain's native unit.
    pub amount: Option<f64>,
    /// Symbol of the asset moved.
    pub token_symbol: Option<String>,
}

impl TransactionRecord {
    /// What this record contributes to an agent's daily spend: amount + fee.
    ///
    /// Records without an amount still contribute their fee.
    #[must_use]
    pub fn spend_value(&self) -> f64 {
        self.amount.unwrap_or(0.0) + self.fee
    }

    /// Whether this record counts toward the spending window.
    ///
    /// Only successful activity consumes budget; a failed transaction's fee
    /// is not charged against the daily limit.
    #[must_use]
    pub fn counts_toward_spend(&self) -> bool {
        self.success
    }
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} at {}",
            self.signature, self.kind, self.description, self.timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(success: bool, amount: Option<f64>, fee: f64) -> TransactionRecord {
        TransactionRecord {
            signature: "5VERYFAKESIG".to_string(),
            kind: TxKind::Transfer,
            description: "transfer".to_string(),
            timestamp: Timestamp::now(),
            success,
            fee,
            from_address: None,
            to_address: None,
            agent_id: None,
            amount,
            token_symbol: None,
        }
    }

    #[test]
    fn test_spend_value_sums_amount_and_fee() {
        assert!((record(true, Some(0.5), 0.000_005).spend_value() - 0.500_005).abs() < 1e-12);
    }

    #[test]
    fn test_spend_value_without_amount_is_fee_only() {
        assert!((record(true, None, 0.000_005).spend_value() - 0.000_005).abs() < 1e-12);
    }

    #[test]
    fn test_failed_transactions_do_not_count() {
        assert!(!record(false, Some(1.0), 0.0).counts_toward_spend());
        assert!(record(true, Some(1.0), 0.0).counts_toward_spend());
    }
}

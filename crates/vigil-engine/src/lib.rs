//! Vigil Engine - the agent spending governance engine.
//!
//! This crate interposes a governance layer between an agent's intent to
//! transact and the transaction reaching the chain:
//!
//! - [`PolicyEvaluator`] — pure decision function combining a spending
//!   policy and a proposed transaction into an auto-approve /
//!   require-approval [`Verdict`]
//! - [`LedgerReader`] — rolling daily spend totals from the transaction
//!   ledger
//! - [`ApprovalManager`] — creates approval requests with their initial
//!   verdict and drives the `pending -> approved | denied | expired` state
//!   machine, including lazy read-triggered expiry
//! - [`IngestionPipeline`] — folds confirmed indexer events back into the
//!   ledger, matching them to registered agents via the [`AgentDirectory`]
//! - [`Dispatcher`] — best-effort, at-most-once notification fan-out
//!
//! The engine never constructs or signs transactions; it only gates
//! *permission* to proceed.
//!
//! # Fail-closed default
//!
//! An agent without an active spending policy is never auto-approved.
//! Absence of configuration must not imply unrestricted spending.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod directory;
pub mod error;
pub mod evaluator;
pub mod ingest;
pub mod ledger;
pub mod manager;
pub mod notify;

pub use directory::AgentDirectory;
pub use error::{EngineError, EngineResult};
pub use evaluator::{PolicyEvaluator, Verdict};
pub use ingest::{IngestReport, IngestionPipeline, RawTxEvent};
pub use ledger::LedgerReader;
pub use manager::{ApprovalManager, NewApprovalRequest};
pub use notify::{Dispatcher, Notification, NotificationSink, NotifyError, TracingSink};

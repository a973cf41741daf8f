//! Vigil Core - Foundation types for the agent spending governance engine.
//!
//! This crate provides the domain entities shared by every other Vigil crate:
//!
//! - Identifiers and timestamps ([`AgentId`], [`ApprovalId`], [`Timestamp`])
//! - The registered [`Agent`] and its validated [`WalletAddress`]
//! - The per-agent [`SpendingPolicy`] read by the policy evaluator
//! - The [`ApprovalRequest`] state machine entity and its [`ApprovalStatus`]
//! - The append-only [`TransactionRecord`] ledger entry
//!
//! Everything here is plain data: no async, no I/O, no storage. The engine
//! crates own the behaviour; this crate owns the vocabulary.
//!
//! # Example
//!
//! ```
//! use vigil_core::{TxKind, WalletAddress};
//!
//! // Indexer raw types map onto a fixed set of semantic kinds.
//! assert_eq!(TxKind::from_raw("TRANSFER"), TxKind::Transfer);
//! assert_eq!(TxKind::from_raw("SOME_NEW_PROGRAM"), TxKind::ProgramInteraction);
//!
//! // Wallet addresses are validated on parse.
//! let addr: WalletAddress = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU".parse().unwrap();
//! assert_eq!(addr.as_str().len(), 44);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod agent;
pub mod approval;
pub mod ledger;
pub mod policy;
pub mod types;

pub use agent::{AddressError, Agent, WalletAddress};
pub use approval::{ApprovalRequest, ApprovalStatus, TxMetadata, DEFAULT_TTL_MINUTES};
pub use ledger::TransactionRecord;
pub use policy::SpendingPolicy;
pub use types::{AgentId, AgentStatus, ApprovalId, IdParseError, Timestamp, TxKind};

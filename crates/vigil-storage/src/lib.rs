//! Vigil Storage — persistence layer for the governance engine.
//!
//! The engine treats its database as an external collaborator: a
//! transactional document store with query-by-equality and
//! range-on-timestamp. This crate pins that contract down as four traits:
//!
//! - [`AgentStore`] — agent directory lookups (id, wallet, credential hash)
//! - [`PolicyStore`] — one active spending policy per agent
//! - [`ApprovalStore`] — approval request reads and idempotent status writes
//! - [`LedgerStore`] — append-only transaction records with atomic batches
//!
//! Two implementations ship:
//!
//! - [`memory`] — thread-safe in-memory stores for tests and dev runs
//! - [`surreal`] — `SurrealDB` documents (embedded `SurrealKV` in production,
//!   `mem://` in tests), connected through [`Database`]
//!
//! Stores are explicitly constructed and injected; there are no ambient
//! singletons. Swapping backends is a wiring change, not a code change.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod db;
pub mod error;
pub mod memory;
pub mod stores;
pub mod surreal;

pub use db::Database;
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryAgentStore, MemoryApprovalStore, MemoryLedgerStore, MemoryPolicyStore};
pub use stores::{AgentStore, ApprovalStore, LedgerStore, PolicyStore};
pub use surreal::{SurrealAgentStore, SurrealApprovalStore, SurrealLedgerStore, SurrealPolicyStore};

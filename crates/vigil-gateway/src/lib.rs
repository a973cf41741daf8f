//! Vigil Gateway - the JSON-over-HTTP surface of the governance engine.
//!
//! Four caller roles share one router:
//!
//! - anonymous: agent registration (`POST /api/agents`)
//! - agents (bearer credential): approval requests, polling, policy reads
//! - the indexer (shared token): the transaction ingestion webhook
//! - the supervising human (shared admin token): approval decisions,
//!   pending-queue listing, policy writes
//!
//! Agents never decide their own requests: the respond route only accepts
//! the admin token, so an agent credential is refused there.
//!
//! Failures are uniform `{"error": "..."}` bodies; internal detail is
//! logged server-side and never leaked. The `vigild` binary wires this
//! router over either the embedded database or in-memory stores.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, Stores};

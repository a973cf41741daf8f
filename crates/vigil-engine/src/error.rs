//! Engine error types.

use vigil_core::{AgentId, ApprovalId, ApprovalStatus};
use vigil_storage::StorageError;

/// Errors from governance engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The referenced agent does not exist.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// The referenced approval request does not exist.
    #[error("approval request not found: {0}")]
    ApprovalNotFound(ApprovalId),

    /// A decision was issued against a request that is no longer pending.
    ///
    /// Responses are idempotent-by-rejection: re-issuing a decision fails
    /// loudly instead of silently succeeding.
    #[error("request is {status}, not pending; decision rejected")]
    InvalidTransition {
        /// The request's current (terminal or effective) status.
        status: ApprovalStatus,
    },

    /// An indexer event did not have the shape the pipeline requires.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

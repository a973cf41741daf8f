//! `SurrealDB` connection wrapper.
//!
//! The [`Database`] struct owns one `SurrealDB` connection used by the
//! surreal-backed stores. In embedded mode it runs on `SurrealKV`; tests
//! use the in-memory engine.
//!
//! | Mode | Connection string | Backend |
//! |------|-------------------|---------|
//! | Embedded (production) | `surrealkv://path/to/data` | `SurrealKV` |
//! | In-memory (tests, `--memory`) | `mem://` | In-memory |

use crate::error::{StorageError, StorageResult};

/// Re-export `SurrealDB` for direct query access when needed.
pub use surrealdb;

/// Namespace all Vigil data lives under.
const NAMESPACE: &str = "vigil";

/// Database name for the governance stores.
const DATABASE: &str = "governance";

/// A `SurrealDB` connection scoped to the Vigil governance stores.
///
/// Cheap to clone; clones share the underlying connection.
#[derive(Clone)]
pub struct Database {
    inner: surrealdb::Surreal<surrealdb::engine::any::Any>,
}

impl Database {
    /// Connect to an arbitrary endpoint and select the Vigil namespace.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the connection or namespace
    /// selection fails.
    pub async fn connect(endpoint: &str) -> StorageResult<Self> {
        let db: surrealdb::Surreal<surrealdb::engine::any::Any> = surrealdb::Surreal::init();
        db.connect(endpoint.to_string())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        tracing::debug!(endpoint, ns = NAMESPACE, db = DATABASE, "database connected");
        Ok(Self { inner: db })
    }

    /// Connect to an embedded `SurrealKV` datastore persisted at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the connection fails.
    pub async fn connect_embedded(path: &str) -> StorageResult<Self> {
        Self::connect(&format!("surrealkv://{path}")).await
    }

    /// Connect to a fresh in-memory datastore (tests and dev runs).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the connection fails.
    pub async fn connect_memory() -> StorageResult<Self> {
        Self::connect("mem://").await
    }

    /// The underlying `SurrealDB` client, for direct queries.
    #[must_use]
    pub fn client(&self) -> &surrealdb::Surreal<surrealdb::engine::any::Any> {
        &self.inner
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

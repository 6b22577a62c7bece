//! Error types for schema diffing and DDL generation.

use std::path::PathBuf;

/// Errors that can occur while diffing, sequencing or rendering a migration.
///
/// Every variant is a deterministic function of the input: running the same
/// diff again reproduces the same error.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The requested structural change has no valid expression in the
    /// target dialect.
    #[error("Operation not supported by {dialect}: {operation}")]
    UnsupportedOperation {
        /// Dialect name.
        dialect: &'static str,
        /// Description of the rejected operation.
        operation: String,
    },

    /// New (or dropped) tables reference each other through NOT NULL
    /// foreign keys, so no valid creation order exists.
    #[error("Unresolvable foreign key cycle between tables: {}", .tables.join(", "))]
    DependencyCycle {
        /// Tables participating in the cycle, sorted by name.
        tables: Vec<String>,
    },

    /// A schema description violates one of its invariants.
    #[error("Malformed schema description: {0}")]
    MalformedDescription(String),

    /// An operator does not fit the schema it was applied to.
    #[error("Invalid schema state: {0}")]
    InvalidState(String),

    /// Snapshot (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (reading/writing snapshot files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Dialect name not recognized.
    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    /// Snapshot file does not exist.
    #[error("Snapshot file not found: {0}")]
    SnapshotNotFound(PathBuf),
}

impl MigrateError {
    /// Builds an [`MigrateError::UnsupportedOperation`].
    #[must_use]
    pub fn unsupported(dialect: &'static str, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            dialect,
            operation: operation.into(),
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

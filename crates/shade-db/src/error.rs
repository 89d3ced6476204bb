//! Database error types for shade-db.

use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or returned malformed data.
    #[error("Query failed: {0}")]
    Query(String),

    /// A migration failed and was rolled back.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// A migration with this name is already in the ledger.
    #[error("Migration already applied: {0}")]
    AlreadyApplied(String),

    /// `revert_last` was called on an empty ledger.
    #[error("No applied migration to revert")]
    NothingToRevert,

    /// Stored operation taxonomy no longer matches `OperationCode`.
    #[error("Operation taxonomy drift: {0}")]
    TaxonomyDrift(String),

    /// The entity has no audit table version.
    #[error("Entity is not tracked: {0}")]
    UnknownEntity(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., request conflicts with the registry).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Model-level error (validation, registry ordering).
    #[error(transparent)]
    Core(#[from] shade_core::CoreError),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}

//! Cross-cutting error types for shade.
//!
//! Errors raised while describing entities, interpreting operation codes, or
//! evolving the audit registry. Storage errors (`DatabaseError`) live in
//! `shade-db`; the CLI converges everything into `anyhow`.

use thiserror::Error;

/// Errors that can be raised by the pure model layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A tracked-entity descriptor failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An integer did not map to any `OperationCode`.
    #[error("Unknown operation code: {0}")]
    UnknownOperation(i64),

    /// The append-only audit registry rejected a change.
    #[error("Registry error: {0}")]
    Registry(String),

    /// A descriptor manifest could not be read or parsed.
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

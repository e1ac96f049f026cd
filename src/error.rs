//! Error taxonomy shared across the store, funnel, and HTTP surface.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Ill-formed input: missing required fields, malformed hex/email,
    /// non-10-digit phone, commas in facet values, unknown sort key.
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Slug collision after retry exhaustion, or deletion of a taxonomy
    /// node that still has children or referencing products.
    #[error("{0}")]
    Conflict(String),

    /// Lost connection, pool timeout. The caller may retry.
    #[error("database error: {0}")]
    Transient(#[from] sqlx::Error),

    /// Misconfigured environment or an internal invariant breach.
    #[error("{0}")]
    Fatal(String),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Whether the underlying failure was a unique-index violation.
    /// Slug and publicId writers use this to lose races gracefully.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Transient(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

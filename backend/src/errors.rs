//! Error taxonomy of the ledger core.
//!
//! Rate-limit refusals (`cooldown`, `daily_limit`) are **not** errors: they
//! are expected outcomes and travel inside
//! [`InteractionOutcome`](crate::domain::commands::InteractionOutcome).
//! Everything here aborts the current operation with no partial state.

use thiserror::Error;

/// Result alias used across the domain and storage layers.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Unknown child/action/group id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Adjustment is zero or would drive a balance negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Missing or malformed required input (name, comment, date).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation conflicts with current state (e.g. group still has children).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller's role is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Durable-write or query failure; fatal to the request, retryable.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        LedgerError::NotFound { entity, id: id.into() }
    }
}

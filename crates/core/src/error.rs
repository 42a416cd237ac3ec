//! Error model for the derivation layer.

use thiserror::Error;

/// Result type used across the analytics layer.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Analytics-level error.
///
/// Deterministic failures only: an unknown referenced id, a snapshot that
/// could not be fetched, or a value that failed validation. Ratio edge cases
/// (zero copies, empty history) are defined to safe defaults in the
/// components and never surface here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// A referenced entity (book, user) does not exist in the snapshot.
    #[error("not found")]
    NotFound,

    /// The entity store could not supply a snapshot. Fatal for the whole
    /// report; no partial snapshot is ever used.
    #[error("entity store unavailable: {0}")]
    StoreUnavailable(String),

    /// A value failed validation (e.g. rating out of range).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl AnalyticsError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

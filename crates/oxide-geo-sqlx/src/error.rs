//! Error types for query execution.

use oxide_geo_core::GeoError;
use thiserror::Error;

/// Execution errors.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The query could not be compiled.
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// Database error from sqlx, passed through unchanged.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias for execution.
pub type Result<T> = std::result::Result<T, ExecError>;

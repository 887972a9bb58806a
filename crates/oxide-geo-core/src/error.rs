//! Error types for query compilation.

use thiserror::Error;

/// Errors raised while compiling or finalizing a geo query.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The connection's driver is neither MySQL nor PostgreSQL.
    #[error("unsupported dialect '{driver}': only MySQL and PostgreSQL are supported")]
    UnsupportedDialect {
        /// The driver name that was rejected.
        driver: String,
    },

    /// The origin could not be read as a `lat,lng` pair.
    #[error("malformed origin '{input}': expected \"lat,lng\"")]
    MalformedOrigin {
        /// The rejected input.
        input: String,
    },

    /// The distance attribute is not a column identifier.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// Unknown distance unit.
    #[error("unknown distance unit: {0}")]
    UnknownUnit(String),

    /// Configuration or schema file could not be decoded.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// IO error while reading a configuration or schema file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for geo query operations.
pub type Result<T> = std::result::Result<T, GeoError>;

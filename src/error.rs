//! Error types for the precast pricing engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the engine can escalate. Data gaps found while
//! calculating a breakdown are not errors; they are reported as flags and
//! warnings on the breakdown itself.

use thiserror::Error;

/// The main error type for the precast pricing engine.
///
/// # Example
///
/// ```
/// use precast_pricing::error::EngineError;
///
/// let error = EngineError::not_found("piece", "PC-404");
/// assert_eq!(error.to_string(), "piece not found: PC-404");
/// assert_eq!(error.code(), "PIECE_NOT_FOUND");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Malformed input, or an operation blocked by incomplete data.
    #[error("{message}")]
    Validation {
        /// Machine-readable error code (e.g. `MISSING_MATERIAL_PRICES`).
        code: String,
        /// Human-readable description.
        message: String,
        /// Optional structured details (offending ids, row errors, ...).
        details: Option<serde_json::Value>,
    },

    /// A referenced piece, zone, material or ledger row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (`piece`, `zone`, `material`, ...).
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The operation conflicts with the current ledger state.
    #[error("{message}")]
    Conflict {
        /// Machine-readable error code (e.g. `PERIOD_CLOSED`).
        code: String,
        /// Human-readable description.
        message: String,
    },

    /// The underlying store failed.
    #[error("Persistence error: {message}")]
    Persistence {
        /// A description of the store failure.
        message: String,
    },
}

impl EngineError {
    /// Creates a validation error without details.
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a validation error carrying structured details.
    pub fn validation_with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        EngineError::Validation {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    /// Creates a not-found error for the given entity kind and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Conflict {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Returns the machine-readable code for this error.
    pub fn code(&self) -> String {
        match self {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                "CONFIG_ERROR".to_string()
            }
            EngineError::Validation { code, .. } | EngineError::Conflict { code, .. } => {
                code.clone()
            }
            EngineError::NotFound { entity, .. } => format!(
                "{}_NOT_FOUND",
                entity.to_uppercase().replace([' ', '-'], "_")
            ),
            EngineError::Persistence { .. } => "PERSISTENCE_ERROR".to_string(),
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::Persistence {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for EngineError {
    fn from(err: csv::Error) -> Self {
        EngineError::validation("MALFORMED_CSV", format!("Failed to read CSV: {}", err))
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

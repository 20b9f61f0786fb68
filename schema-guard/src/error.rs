//! Error types for schema inference and validation.
//!
//! All fallible operations in this crate return [`SchemaGuardError`]. Anomalies
//! found while diffing a schema against statistics are *not* errors; they are
//! the normal output of [`crate::anomalies::AnomalyDetector`].

use thiserror::Error;

/// The main error type for schema inference and validation.
#[derive(Error, Debug)]
pub enum SchemaGuardError {
    /// A serialized schema or statistics payload could not be parsed.
    #[error("Failed to parse {payload}: {message}")]
    InputParse {
        /// Kind of payload (e.g. "schema", "statistics")
        payload: String,
        /// Parser message
        message: String,
    },

    /// The schema is internally contradictory.
    #[error("Schema consistency error: {0}")]
    SchemaConsistency(String),

    /// A statistics snapshot is internally contradictory.
    #[error("Statistics inconsistency: {0}")]
    StatisticsInconsistency(String),

    /// Observed statistics cannot be reconciled with the request.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An operation was called out of order.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Error from serialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A type alias for `Result<T, SchemaGuardError>`.
pub type Result<T> = std::result::Result<T, SchemaGuardError>;

impl SchemaGuardError {
    /// Creates an input parse error for the given payload kind.
    pub fn input_parse(payload: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputParse {
            payload: payload.into(),
            message: message.into(),
        }
    }

    /// Creates a schema consistency error with the given message.
    pub fn schema_consistency(msg: impl Into<String>) -> Self {
        Self::SchemaConsistency(msg.into())
    }

    /// Creates a statistics inconsistency error with the given message.
    pub fn statistics_inconsistency(msg: impl Into<String>) -> Self {
        Self::StatisticsInconsistency(msg.into())
    }

    /// Creates an invalid input error with the given message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates an invalid state error with the given message.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Returns true for errors caused by malformed caller input, including
    /// inconsistent snapshots.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::StatisticsInconsistency(_) | Self::InputParse { .. }
        )
    }

    /// Returns true for errors caused by a contradictory schema.
    pub fn is_invalid_schema(&self) -> bool {
        matches!(self, Self::SchemaConsistency(_))
    }
}

impl From<serde_json::Error> for SchemaGuardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

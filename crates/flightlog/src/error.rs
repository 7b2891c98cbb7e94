//! Error types for flightlog.
//!
//! This module defines the batch-level error type used by the I/O, configuration
//! and CLI layers. Problems confined to a single flight row are not errors; they
//! are reported as [`crate::transform::Issue`] diagnostics and never abort a batch.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flightlog operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Reference Data Errors ===
    /// Failed to load the airport database.
    #[error("failed to load airport database at {path}: {source}")]
    AirportDatabase {
        /// Path to the airport database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    /// Reference data required by the requested run is missing.
    #[error("missing reference data: {message}")]
    MissingReferenceData {
        /// Description of what is missing.
        message: String,
    },

    /// A timezone identifier could not be resolved.
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Input/Output Errors ===
    /// Failed to read or write a CSV table.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required input file does not exist.
    #[error("input file not found: {path}")]
    InputNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for flightlog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a missing reference data error.
    #[must_use]
    pub fn missing_reference_data(message: impl Into<String>) -> Self {
        Self::MissingReferenceData {
            message: message.into(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error indicates absent reference data.
    #[must_use]
    pub fn is_missing_reference_data(&self) -> bool {
        matches!(self, Self::MissingReferenceData { .. })
    }
}

//! Typed errors for the deal pipeline.
//!
//! Library code returns these; the binary and config layer wrap them with
//! `anyhow` context.

use thiserror::Error;

/// Why a delimited deal line was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DealParseError {
    #[error("Invalid deal string format")]
    Empty,

    #[error("Expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("Invalid {field} value '{raw}'. Must be a number or '&'")]
    InvalidNumber { field: &'static str, raw: String },

    #[error("Missing required fields: {}", .missing.join(", "))]
    MissingFields { missing: Vec<&'static str> },

    /// Anything the field rules did not anticipate. Carries the input for
    /// diagnostics.
    #[error("Error parsing deal: {input}")]
    Unexpected { input: String },
}

/// Errors from review-session transitions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReviewError {
    #[error("deal index {index} is out of range ({total} deals)")]
    OutOfRange { index: usize, total: usize },

    #[error("no field is being edited")]
    NotEditing,

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Rejected input while editing a single deal field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Failure reported by the text-structuring oracle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    /// The provider asked us to slow down. Retried by the retry policy.
    #[error("oracle rate limited: {0}")]
    RateLimited(String),

    #[error("oracle call failed: {0}")]
    Failed(String),
}

impl OracleError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Errors that abort a structured extraction run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("structure analysis failed: {0}")]
    Structure(#[source] OracleError),
}

/// Errors from the external deal store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Company name cannot be empty")]
    EmptyCompanyName,

    #[error("Error handling company {name}: {reason}")]
    Company { name: String, reason: String },

    #[error("Error creating deal record: {0}")]
    Record(String),
}

/// Errors from the chat transport.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("chat transport error: {0}")]
pub struct TransportError(pub String);

/// Result type alias for delimited parsing.
pub type ParseResult<T> = std::result::Result<T, DealParseError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

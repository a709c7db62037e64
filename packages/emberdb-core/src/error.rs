//! Typed error surface for the keyspace engine.

use thiserror::Error;

/// Every failure mode the core can produce.
///
/// Operations that cannot fail for structural reasons (e.g. `len()`)
/// return a bare value; everything that touches a specific key, parses
/// user-supplied bytes, or performs I/O returns `Result<_, DbError>`.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    #[error("wrong type for key {key}: found {found}, expected {expected}")]
    WrongType { key: String, found: &'static str, expected: &'static str },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("contract violation: {0}")]
    ContractViolation(&'static str),
}

impl DbError {
    pub fn key_not_found(key: impl Into<String>) -> Self {
        DbError::KeyNotFound { key: key.into() }
    }

    pub fn wrong_type(key: impl Into<String>, found: &'static str, expected: &'static str) -> Self {
        DbError::WrongType { key: key.into(), found, expected }
    }

    /// Stable string tag for the router's JSON error envelope.
    pub fn tag(&self) -> &'static str {
        match self {
            DbError::KeyNotFound { .. } => "key_not_found",
            DbError::WrongType { .. } => "wrong_type",
            DbError::IndexOutOfRange { .. } => "index_out_of_range",
            DbError::Parse(_) => "parse_error",
            DbError::Io(_) => "io_error",
            DbError::ContractViolation(_) => "contract_violation",
        }
    }
}

impl From<rmp_serde::encode::Error> for DbError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        DbError::Parse(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for DbError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        DbError::Parse(e.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

//! Error types for relq-sql

use relq_core::{ResolutionError, SchemaError, ShapeError};
use thiserror::Error;

/// Translation errors
#[derive(Error, Debug)]
pub enum TranslateError {
    /// TR001: SQL parse error from the external parser
    #[error("[TR001] SQL parse error: {0}")]
    Parse(String),

    /// TR002: deliberately unimplemented SQL construct
    #[error("[TR002] unsupported SQL construct: {0}")]
    Unsupported(String),

    /// TR003: schema lookup failure
    #[error("[TR003] {0}")]
    Schema(#[from] SchemaError),

    /// TR004: name resolution failure
    #[error("[TR004] {0}")]
    Resolution(#[from] ResolutionError),

    /// TR005: structural failure
    #[error("[TR005] {0}")]
    Shape(#[from] ShapeError),
}

/// Result type alias for TranslateError
pub type TranslateResult<T> = Result<T, TranslateError>;

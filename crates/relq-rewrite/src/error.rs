//! Error types for relq-rewrite

use relq_core::ShapeError;
use thiserror::Error;

/// Rewrite errors
#[derive(Error, Debug)]
pub enum RewriteError {
    /// RW001: a node of the wrong kind was passed to a rule
    #[error("[RW001] {0}")]
    Shape(#[from] ShapeError),

    /// RW002: a structural precondition of the rule does not hold
    #[error("[RW002] rule not applicable: {0}")]
    Inapplicable(String),
}

/// Result type alias for RewriteError
pub type RewriteResult<T> = Result<T, RewriteError>;

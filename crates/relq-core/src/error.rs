//! Error types shared across the relq crates

use thiserror::Error;

/// Schema lookup and catalog construction errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// SC001: relation name not present in the catalog
    #[error("[SC001] unknown relation '{0}'")]
    UnknownRelation(String),

    /// SC002: qualified column lookup failed on a known relation
    #[error("[SC002] relation '{relation}' has no column '{column}'")]
    UnknownColumn { relation: String, column: String },

    /// SC003: duplicate relation name in a catalog definition
    #[error("[SC003] duplicate relation '{0}' in catalog definition")]
    DuplicateRelation(String),

    /// SC004: duplicate column name within one relation definition
    #[error("[SC004] duplicate column '{column}' in relation '{relation}'")]
    DuplicateColumn { relation: String, column: String },
}

/// Name-resolution errors raised while translating a statement
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// RS001: unqualified column matches no registered relation
    #[error("[RS001] unknown column '{0}'")]
    UnknownColumn(String),

    /// RS002: unqualified column matches more than one registered relation
    #[error("[RS002] ambiguous column reference '{0}'")]
    AmbiguousColumn(String),

    /// RS003: GROUP BY over something that is not a plain column
    #[error("[RS003] GROUP BY target is not a column: {0}")]
    InvalidGroupBy(String),
}

/// Structural errors: a tree does not have the shape an operation requires
#[derive(Error, Debug)]
pub enum ShapeError {
    /// SH001: set-operation sides project different column counts
    #[error("[SH001] set operation degree mismatch: {left} vs {right} projected columns")]
    DegreeMismatch { left: usize, right: usize },

    /// SH002: Aggregation renames do not cover every key and aggregate
    #[error("[SH002] {renames} renames for {attributes} grouping keys and {functions} aggregates")]
    RenameCount {
        renames: usize,
        attributes: usize,
        functions: usize,
    },

    /// SH003: aggregate `*` with no enclosing relation to expand against
    #[error("[SH003] aggregate '*' has no enclosing relation to expand against")]
    UnscopedStar,

    /// SH004: a base-column reference with no owning relation
    #[error("[SH004] base column '{0}' is not attached to a relation")]
    DetachedColumn(String),

    /// SH005: a node of the wrong kind reached an operation
    #[error("[SH005] expected {expected}, found {found}")]
    UnexpectedNode {
        expected: &'static str,
        found: &'static str,
    },

    /// SH006: a subquery used as a predicate source projects no columns
    #[error("[SH006] subquery does not project columns")]
    SubqueryShape,
}

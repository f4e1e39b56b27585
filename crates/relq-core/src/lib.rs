//! relq-core: schema catalog and relational-algebra IR
//!
//! The data model shared by the relq crates: an immutable schema
//! `Catalog`, the `RelExpr` algebra tree the translator produces, and
//! involvement analysis over that tree. Deep copies are ordinary `clone()`
//! calls — owned children clone deeply while catalog handles stay shared,
//! so a copy is value-equal to its source and structurally independent of it.

pub mod catalog;
pub mod error;
pub mod involve;
pub mod ir;

pub use catalog::{Catalog, RelationHandle};
pub use error::{ResolutionError, SchemaError, ShapeError};
pub use involve::{
    classify_join_condition, projection_column_keys, ColumnKey, ColumnSource, Involvement,
    Involves, JoinOrientation,
};
pub use ir::column::{AggregateArg, AggregateCall, AggregateFunction, Column, ColumnTarget};
pub use ir::cond::{
    ArithOp, CondArg, CondRhs, Conditional, Operation, OperationArg, OperationKind, PairingOp,
    ThetaOp,
};
pub use ir::rel::{
    Aggregation, Join, JoinCondition, Projection, ProjectionItem, RelExpr, Rename, RenameInput,
    Restriction,
};

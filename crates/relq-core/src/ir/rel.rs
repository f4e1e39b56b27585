//! Relational operators — the nodes of the algebra tree

use crate::catalog::RelationHandle;
use crate::error::ShapeError;
use crate::ir::column::{AggregateCall, Column};
use crate::ir::cond::{Conditional, Operation};
use serde::Serialize;
use std::fmt;

/// How a join combines its operands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum JoinCondition {
    /// Cartesian product
    Cross,
    /// Left outer marker (no predicate)
    Left,
    /// Right outer marker (no predicate)
    Right,
    /// Theta join over an arbitrary predicate
    Theta(Conditional),
}

impl JoinCondition {
    /// Whether this is a cartesian product
    pub fn is_cross(&self) -> bool {
        matches!(self, JoinCondition::Cross)
    }

    /// Short label for messages
    pub fn label(&self) -> &'static str {
        match self {
            JoinCondition::Cross => "cross",
            JoinCondition::Left => "left",
            JoinCondition::Right => "right",
            JoinCondition::Theta(_) => "theta",
        }
    }
}

/// Join of two subtrees
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Join {
    pub lhs: Box<RelExpr>,
    pub rhs: Box<RelExpr>,
    pub condition: JoinCondition,
}

/// Selection (σ)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Restriction {
    pub condition: Conditional,
    pub input: Box<RelExpr>,
}

/// One projected output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProjectionItem {
    Column(Column),
    Literal(String),
}

impl ProjectionItem {
    /// The column, when this projects one
    pub fn as_column(&self) -> Option<&Column> {
        match self {
            ProjectionItem::Column(column) => Some(column),
            ProjectionItem::Literal(_) => None,
        }
    }
}

impl From<Column> for ProjectionItem {
    fn from(column: Column) -> Self {
        ProjectionItem::Column(column)
    }
}

/// Column selection (Π)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub columns: Vec<ProjectionItem>,
    pub input: Box<RelExpr>,
}

/// What a rename renames
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RenameInput {
    Relation(RelationHandle),
    Column(Column),
    Function(AggregateCall),
    Rename(Box<Rename>),
    Name(String),
}

/// Entity renaming (ρ): `input` becomes visible as `output` over the
/// wrapped subtree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rename {
    pub input: RenameInput,
    pub output: String,
    pub over: Box<RelExpr>,
}

/// Group-by plus aggregate functions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    /// Grouping keys
    pub attributes: Vec<Column>,
    /// Aggregate outputs
    pub functions: Vec<AggregateCall>,
    /// Input subtree
    pub input: Box<RelExpr>,
    /// Output names, one per grouping key then one per aggregate.
    /// Empty means no renaming was requested.
    pub renames: Vec<String>,
}

impl Aggregation {
    /// Build an aggregation, enforcing that a non-empty rename list names
    /// every grouping key and every aggregate positionally.
    pub fn new(
        attributes: Vec<Column>,
        functions: Vec<AggregateCall>,
        input: RelExpr,
        renames: Vec<String>,
    ) -> Result<Self, ShapeError> {
        if !renames.is_empty() && renames.len() != attributes.len() + functions.len() {
            return Err(ShapeError::RenameCount {
                renames: renames.len(),
                attributes: attributes.len(),
                functions: functions.len(),
            });
        }
        Ok(Self {
            attributes,
            functions,
            input: Box::new(input),
            renames,
        })
    }
}

/// A relational-algebra expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RelExpr {
    /// A base relation from the catalog
    Relation(RelationHandle),
    Join(Join),
    Restriction(Restriction),
    Projection(Projection),
    Rename(Rename),
    Aggregation(Aggregation),
    /// A set pairing over two subtrees
    Operation(Operation),
}

impl RelExpr {
    /// Node kind label for messages
    pub fn kind(&self) -> &'static str {
        match self {
            RelExpr::Relation(_) => "relation",
            RelExpr::Join(_) => "join",
            RelExpr::Restriction(_) => "restriction",
            RelExpr::Projection(_) => "projection",
            RelExpr::Rename(_) => "rename",
            RelExpr::Aggregation(_) => "aggregation",
            RelExpr::Operation(_) => "operation",
        }
    }

    /// Join two subtrees
    pub fn join(lhs: RelExpr, rhs: RelExpr, condition: JoinCondition) -> Self {
        RelExpr::Join(Join {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            condition,
        })
    }

    /// Cartesian product of two subtrees
    pub fn cross(lhs: RelExpr, rhs: RelExpr) -> Self {
        Self::join(lhs, rhs, JoinCondition::Cross)
    }

    /// Wrap a subtree in a selection
    pub fn restriction(condition: Conditional, input: RelExpr) -> Self {
        RelExpr::Restriction(Restriction {
            condition,
            input: Box::new(input),
        })
    }

    /// Wrap a subtree in a projection
    pub fn projection(columns: Vec<ProjectionItem>, input: RelExpr) -> Self {
        RelExpr::Projection(Projection {
            columns,
            input: Box::new(input),
        })
    }

    /// Wrap a subtree in a rename
    pub fn rename(input: RenameInput, output: impl Into<String>, over: RelExpr) -> Self {
        RelExpr::Rename(Rename {
            input,
            output: output.into(),
            over: Box::new(over),
        })
    }
}

impl fmt::Display for RelExpr {
    /// Compact single-line rendering, for logs and error context. The
    /// presentation-quality rendering lives with the external renderer.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelExpr::Relation(relation) => write!(f, "{}", relation.name()),
            RelExpr::Join(join) => write!(
                f,
                "({} {} {})",
                join.lhs,
                match &join.condition {
                    JoinCondition::Theta(cond) => format!("⋈[{cond}]"),
                    other => format!("⨉[{}]", other.label()),
                },
                join.rhs
            ),
            RelExpr::Restriction(restriction) => {
                write!(f, "σ[{}]({})", restriction.condition, restriction.input)
            }
            RelExpr::Projection(projection) => {
                write!(f, "π[")?;
                for (i, item) in projection.columns.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        ProjectionItem::Column(column) => write!(f, "{column}")?,
                        ProjectionItem::Literal(text) => write!(f, "{text}")?,
                    }
                }
                write!(f, "]({})", projection.input)
            }
            RelExpr::Rename(rename) => {
                write!(f, "ρ[{}]({})", rename.output, rename.over)
            }
            RelExpr::Aggregation(aggregation) => {
                write!(f, "γ[")?;
                for (i, attribute) in aggregation.attributes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{attribute}")?;
                }
                for (i, function) in aggregation.functions.iter().enumerate() {
                    if i > 0 || !aggregation.attributes.is_empty() {
                        write!(f, "; ")?;
                    }
                    write!(f, "{function}")?;
                }
                write!(f, "]({})", aggregation.input)
            }
            RelExpr::Operation(operation) => match operation.rel_operands() {
                Some((lhs, rhs)) => write!(f, "({} {} {})", lhs, operation.op, rhs),
                None => write!(f, "{operation}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::ir::cond::{CondArg, ThetaOp};

    fn catalog() -> Catalog {
        Catalog::from_definitions(vec![
            ("S", vec![("a", "integer")]),
            ("T", vec![("b", "integer")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_aggregation_rename_invariant() {
        let catalog = catalog();
        let s = catalog.relation("S").unwrap().clone();
        let a = s.column("a").unwrap().clone();
        let key = Column::base(s.clone(), a);

        let err = Aggregation::new(
            vec![key.clone()],
            vec![],
            RelExpr::Relation(s.clone()),
            vec!["one".into(), "two".into()],
        )
        .unwrap_err();
        assert!(matches!(err, ShapeError::RenameCount { .. }));

        // Empty renames and exact-length renames are both fine.
        assert!(Aggregation::new(
            vec![key.clone()],
            vec![],
            RelExpr::Relation(s.clone()),
            vec![]
        )
        .is_ok());
        assert!(
            Aggregation::new(vec![key], vec![], RelExpr::Relation(s), vec!["one".into()]).is_ok()
        );
    }

    #[test]
    fn test_clone_is_independent() {
        let catalog = catalog();
        let s = catalog.relation("S").unwrap().clone();
        let original = RelExpr::restriction(
            Conditional::comparison(
                ThetaOp::Eq,
                CondArg::Literal("1".into()),
                CondArg::Literal("1".into()),
            ),
            RelExpr::Relation(s),
        );

        let mut copy = original.clone();
        assert_eq!(copy, original);

        if let RelExpr::Restriction(restriction) = &mut copy {
            restriction.condition.op = ThetaOp::Neq;
        }
        assert_ne!(copy, original, "mutating the copy must not affect the original");
    }

    #[test]
    fn test_display_restriction_over_join() {
        let catalog = catalog();
        let s = catalog.relation("S").unwrap().clone();
        let t = catalog.relation("T").unwrap().clone();
        let tree = RelExpr::restriction(
            Conditional::comparison(
                ThetaOp::Gt,
                CondArg::Literal("a".into()),
                CondArg::Literal("1".into()),
            ),
            RelExpr::cross(RelExpr::Relation(s), RelExpr::Relation(t)),
        );
        assert_eq!(tree.to_string(), "σ[a > 1]((S ⨉[cross] T))");
    }
}

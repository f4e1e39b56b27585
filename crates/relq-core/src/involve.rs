//! Involvement analysis — the transitive base relations and columns a
//! subtree references

use crate::catalog;
use crate::catalog::RelationHandle;
use crate::error::ShapeError;
use crate::ir::column::{AggregateArg, AggregateCall, Column, ColumnTarget};
use crate::ir::cond::{CondArg, CondRhs, Conditional, Operation, OperationArg};
use crate::ir::rel::{
    Aggregation, Join, JoinCondition, Projection, ProjectionItem, RelExpr, Rename, Restriction,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Identity of a base catalog column
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ColumnKey {
    pub relation: String,
    pub column: String,
}

impl ColumnKey {
    pub fn new(relation: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.relation, self.column)
    }
}

/// The catalog objects behind an involved column
#[derive(Debug, Clone)]
pub struct ColumnSource {
    pub relation: RelationHandle,
    pub column: Arc<catalog::Column>,
}

/// The base relations and columns a subtree transitively references
#[derive(Debug, Clone, Default)]
pub struct Involvement {
    relations: BTreeMap<String, RelationHandle>,
    columns: BTreeMap<ColumnKey, ColumnSource>,
}

impl Involvement {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_relation(&mut self, relation: &RelationHandle) {
        self.relations
            .entry(relation.name().to_string())
            .or_insert_with(|| relation.clone());
    }

    fn add_column(&mut self, relation: &RelationHandle, column: &Arc<catalog::Column>) {
        self.add_relation(relation);
        self.columns
            .entry(ColumnKey::new(relation.name(), column.name()))
            .or_insert_with(|| ColumnSource {
                relation: relation.clone(),
                column: column.clone(),
            });
    }

    /// Merge another involvement into this one
    pub fn absorb(&mut self, other: Involvement) {
        self.relations.extend(other.relations);
        self.columns.extend(other.columns);
    }

    /// Involved relation names, sorted
    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    /// Involved column keys, sorted
    pub fn column_keys(&self) -> impl Iterator<Item = &ColumnKey> {
        self.columns.keys()
    }

    /// Involved columns with their catalog objects
    pub fn columns(&self) -> impl Iterator<Item = (&ColumnKey, &ColumnSource)> {
        self.columns.iter()
    }

    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn has_column(&self, key: &ColumnKey) -> bool {
        self.columns.contains_key(key)
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_no_columns(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether every involved column also appears in `other`
    pub fn columns_subset_of(&self, other: &Involvement) -> bool {
        self.columns.keys().all(|key| other.has_column(key))
    }

    /// Whether every involved column belongs to a relation `other` involves.
    /// A base relation involves no columns of its own, so side membership
    /// is decided at the relation level.
    pub fn columns_within(&self, other: &Involvement) -> bool {
        self.columns
            .keys()
            .all(|key| other.has_relation(&key.relation))
    }
}

/// Computes the base relations and columns a node transitively references
pub trait Involves {
    fn involvement(&self) -> Result<Involvement, ShapeError>;
}

impl Involves for RelExpr {
    fn involvement(&self) -> Result<Involvement, ShapeError> {
        match self {
            RelExpr::Relation(relation) => {
                let mut acc = Involvement::new();
                acc.add_relation(relation);
                Ok(acc)
            }
            RelExpr::Join(join) => join.involvement(),
            RelExpr::Restriction(restriction) => restriction.involvement(),
            RelExpr::Projection(projection) => projection.involvement(),
            RelExpr::Rename(rename) => rename.involvement(),
            RelExpr::Aggregation(aggregation) => aggregation.involvement(),
            RelExpr::Operation(operation) => operation.involvement(),
        }
    }
}

impl Involves for Join {
    fn involvement(&self) -> Result<Involvement, ShapeError> {
        let mut acc = self.lhs.involvement()?;
        acc.absorb(self.rhs.involvement()?);
        if let JoinCondition::Theta(condition) = &self.condition {
            acc.absorb(condition.involvement()?);
        }
        Ok(acc)
    }
}

impl Involves for Restriction {
    fn involvement(&self) -> Result<Involvement, ShapeError> {
        let mut acc = self.condition.involvement()?;
        acc.absorb(self.input.involvement()?);
        Ok(acc)
    }
}

impl Involves for Projection {
    fn involvement(&self) -> Result<Involvement, ShapeError> {
        let mut acc = Involvement::new();
        for item in &self.columns {
            if let ProjectionItem::Column(column) = item {
                acc.absorb(column.involvement()?);
            }
        }
        acc.absorb(self.input.involvement()?);
        Ok(acc)
    }
}

impl Involves for Rename {
    /// A rename neither adds nor removes involvement.
    fn involvement(&self) -> Result<Involvement, ShapeError> {
        self.over.involvement()
    }
}

impl Involves for Aggregation {
    fn involvement(&self) -> Result<Involvement, ShapeError> {
        let mut acc = Involvement::new();
        for attribute in &self.attributes {
            acc.absorb(attribute.involvement()?);
        }
        for function in &self.functions {
            acc.absorb(function.involvement()?);
        }
        acc.absorb(self.input.involvement()?);
        Ok(acc)
    }
}

impl Involves for Column {
    fn involvement(&self) -> Result<Involvement, ShapeError> {
        let mut acc = Involvement::new();
        match &self.target {
            ColumnTarget::Base(column) => match &self.relation {
                Some(relation) => acc.add_column(relation, column),
                None => return Err(ShapeError::DetachedColumn(column.name().to_string())),
            },
            ColumnTarget::Aggregate(call) => acc.absorb(call.involvement()?),
            ColumnTarget::Literal(_) => {
                if let Some(relation) = &self.relation {
                    acc.add_relation(relation);
                }
            }
        }
        Ok(acc)
    }
}

impl Involves for AggregateCall {
    fn involvement(&self) -> Result<Involvement, ShapeError> {
        match &self.arg {
            AggregateArg::Column(column) => column.involvement(),
            AggregateArg::Star => match &self.scope {
                Some(scope) => scope.involvement(),
                None => Err(ShapeError::UnscopedStar),
            },
        }
    }
}

impl Involves for CondArg {
    fn involvement(&self) -> Result<Involvement, ShapeError> {
        match self {
            CondArg::Column(column) => column.involvement(),
            CondArg::Literal(_) => Ok(Involvement::new()),
            CondArg::Function(call) => call.involvement(),
            CondArg::Operation(operation) => operation.involvement(),
            CondArg::Cond(conditional) => conditional.involvement(),
        }
    }
}

impl Involves for Conditional {
    fn involvement(&self) -> Result<Involvement, ShapeError> {
        let mut acc = self.lhs.involvement()?;
        match &self.rhs {
            CondRhs::Arg(arg) => acc.absorb(arg.involvement()?),
            CondRhs::List(items) => {
                for item in items {
                    acc.absorb(item.involvement()?);
                }
            }
        }
        Ok(acc)
    }
}

impl Involves for OperationArg {
    fn involvement(&self) -> Result<Involvement, ShapeError> {
        match self {
            OperationArg::Column(column) => column.involvement(),
            OperationArg::Literal(_) => Ok(Involvement::new()),
            OperationArg::Operation(operation) => operation.involvement(),
            OperationArg::Rel(rel) => rel.involvement(),
        }
    }
}

impl Involves for Operation {
    fn involvement(&self) -> Result<Involvement, ShapeError> {
        let mut acc = self.lhs.involvement()?;
        acc.absorb(self.rhs.involvement()?);
        Ok(acc)
    }
}

/// Which way round a condition lines up with a join's operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOrientation {
    /// Condition lhs references the left operand, rhs the right
    Direct,
    /// Condition lhs references the right operand, rhs the left
    Swapped,
}

/// Classify whether `condition`'s two sides reference columns exclusively
/// from one operand side each — the shape that lets σ∘⨉ fuse into a theta
/// join. `None` means the condition straddles or touches neither side.
pub fn classify_join_condition(
    condition: &Conditional,
    left: &Involvement,
    right: &Involvement,
) -> Result<Option<JoinOrientation>, ShapeError> {
    let lhs = condition.lhs.involvement()?;
    let rhs = match &condition.rhs {
        CondRhs::Arg(arg) => arg.involvement()?,
        CondRhs::List(items) => {
            let mut acc = Involvement::new();
            for item in items {
                acc.absorb(item.involvement()?);
            }
            acc
        }
    };

    if lhs.has_no_columns() || rhs.has_no_columns() {
        return Ok(None);
    }
    if lhs.columns_within(left) && rhs.columns_within(right) {
        return Ok(Some(JoinOrientation::Direct));
    }
    if lhs.columns_within(right) && rhs.columns_within(left) {
        return Ok(Some(JoinOrientation::Swapped));
    }
    Ok(None)
}

/// Keys of the base columns a projection list carries. Literals and
/// aggregate outputs have no base identity and are skipped.
pub fn projection_column_keys(items: &[ProjectionItem]) -> BTreeSet<ColumnKey> {
    items
        .iter()
        .filter_map(ProjectionItem::as_column)
        .filter_map(|column| {
            column
                .base_parts()
                .map(|(relation, base)| ColumnKey::new(relation.name(), base.name()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::ir::column::AggregateFunction;
    use crate::ir::cond::ThetaOp;
    use crate::ir::rel::RenameInput;

    fn catalog() -> Catalog {
        Catalog::from_definitions(vec![
            ("Sailors", vec![("sid", "integer"), ("sname", "string")]),
            ("Reserves", vec![("sid", "integer"), ("bid", "integer")]),
        ])
        .unwrap()
    }

    fn base_column(catalog: &Catalog, relation: &str, column: &str) -> Column {
        let handle = catalog.relation(relation).unwrap().clone();
        let base = handle.column(column).unwrap().clone();
        Column::base(handle, base)
    }

    #[test]
    fn test_restriction_involvement() {
        let catalog = catalog();
        let sailors = catalog.relation("Sailors").unwrap().clone();
        let reserves = catalog.relation("Reserves").unwrap().clone();

        let condition = Conditional::comparison(
            ThetaOp::Eq,
            CondArg::Column(base_column(&catalog, "Sailors", "sid")),
            CondArg::Column(base_column(&catalog, "Reserves", "sid")),
        );
        let tree = RelExpr::restriction(
            condition,
            RelExpr::cross(RelExpr::Relation(sailors), RelExpr::Relation(reserves)),
        );

        let involvement = tree.involvement().unwrap();
        let relations: Vec<_> = involvement.relation_names().collect();
        assert_eq!(relations, vec!["Reserves", "Sailors"]);
        assert!(involvement.has_column(&ColumnKey::new("Sailors", "sid")));
        assert!(involvement.has_column(&ColumnKey::new("Reserves", "sid")));
        assert_eq!(involvement.column_count(), 2);
    }

    #[test]
    fn test_rename_is_transparent() {
        let catalog = catalog();
        let sailors = catalog.relation("Sailors").unwrap().clone();
        let bare = RelExpr::Relation(sailors.clone());
        let renamed = RelExpr::rename(
            RenameInput::Relation(sailors),
            "S",
            bare.clone(),
        );

        let bare_inv = bare.involvement().unwrap();
        let renamed_inv = renamed.involvement().unwrap();
        assert_eq!(
            bare_inv.relation_names().collect::<Vec<_>>(),
            renamed_inv.relation_names().collect::<Vec<_>>()
        );
        assert_eq!(bare_inv.column_count(), renamed_inv.column_count());
    }

    #[test]
    fn test_star_requires_scope() {
        let catalog = catalog();
        let sailors = catalog.relation("Sailors").unwrap().clone();

        let bare = AggregateCall::new(AggregateFunction::Count, AggregateArg::Star);
        assert!(matches!(
            bare.involvement(),
            Err(ShapeError::UnscopedStar)
        ));

        let scoped = AggregateCall::new(AggregateFunction::Count, AggregateArg::Star)
            .with_scope(RelExpr::Relation(sailors));
        let involvement = scoped.involvement().unwrap();
        assert!(involvement.has_relation("Sailors"));
    }

    #[test]
    fn test_classify_join_condition() {
        let catalog = catalog();

        // Operand sides as a cross join would present them: bare relations.
        let left = RelExpr::Relation(catalog.relation("Sailors").unwrap().clone())
            .involvement()
            .unwrap();
        let right = RelExpr::Relation(catalog.relation("Reserves").unwrap().clone())
            .involvement()
            .unwrap();

        let direct = Conditional::comparison(
            ThetaOp::Eq,
            CondArg::Column(base_column(&catalog, "Sailors", "sid")),
            CondArg::Column(base_column(&catalog, "Reserves", "sid")),
        );
        assert_eq!(
            classify_join_condition(&direct, &left, &right).unwrap(),
            Some(JoinOrientation::Direct)
        );

        let swapped = Conditional::comparison(
            ThetaOp::Eq,
            CondArg::Column(base_column(&catalog, "Reserves", "sid")),
            CondArg::Column(base_column(&catalog, "Sailors", "sid")),
        );
        assert_eq!(
            classify_join_condition(&swapped, &left, &right).unwrap(),
            Some(JoinOrientation::Swapped)
        );

        let one_sided = Conditional::comparison(
            ThetaOp::Eq,
            CondArg::Column(base_column(&catalog, "Reserves", "bid")),
            CondArg::Literal("103".into()),
        );
        assert_eq!(
            classify_join_condition(&one_sided, &left, &right).unwrap(),
            None
        );
    }
}

//! FROM-clause translation: table factors and join trees

use crate::error::{TranslateError, TranslateResult};
use crate::translate::cond::translate_conditional;
use crate::translate::scope::Scope;
use relq_core::{
    CondArg, Conditional, JoinCondition, RelExpr, RenameInput, ResolutionError, ThetaOp,
};
use sqlparser::ast::{
    Join, JoinConstraint, JoinOperator, ObjectName, TableFactor, TableWithJoins,
};

/// Translate a FROM clause into a relation/join tree, registering every
/// relation name and alias into the scope. Comma-separated items become
/// cartesian products.
pub(crate) fn translate_from(
    from: &[TableWithJoins],
    scope: &mut Scope<'_>,
) -> TranslateResult<RelExpr> {
    let Some((first, rest)) = from.split_first() else {
        return Err(TranslateError::Unsupported(
            "SELECT without a FROM clause".to_string(),
        ));
    };
    let mut tree = translate_table_with_joins(first, scope)?;
    for item in rest {
        let rhs = translate_table_with_joins(item, scope)?;
        tree = RelExpr::cross(tree, rhs);
    }
    Ok(tree)
}

fn translate_table_with_joins(
    item: &TableWithJoins,
    scope: &mut Scope<'_>,
) -> TranslateResult<RelExpr> {
    let mut tree = translate_table_factor(&item.relation, scope)?;
    for join in &item.joins {
        tree = translate_join(tree, join, scope)?;
    }
    Ok(tree)
}

fn translate_table_factor(
    factor: &TableFactor,
    scope: &mut Scope<'_>,
) -> TranslateResult<RelExpr> {
    match factor {
        TableFactor::Table { name, alias, .. } => {
            let table_name = simple_object_name(name)?;
            let handle = scope.register_relation(&table_name)?;
            match alias {
                Some(alias) => {
                    if !alias.columns.is_empty() {
                        return Err(TranslateError::Unsupported(
                            "column list on a table alias".to_string(),
                        ));
                    }
                    let alias_name = alias.name.value.clone();
                    scope.register_alias(&alias_name, handle.clone());
                    Ok(RelExpr::rename(
                        RenameInput::Relation(handle.clone()),
                        alias_name,
                        RelExpr::Relation(handle),
                    ))
                }
                None => Ok(RelExpr::Relation(handle)),
            }
        }
        TableFactor::Derived { .. } => Err(TranslateError::Unsupported(
            "subquery in FROM".to_string(),
        )),
        TableFactor::NestedJoin {
            table_with_joins,
            alias,
        } => {
            if alias.is_some() {
                return Err(TranslateError::Unsupported(
                    "renaming a join".to_string(),
                ));
            }
            translate_table_with_joins(table_with_joins, scope)
        }
        other => Err(TranslateError::Unsupported(format!(
            "table factor {other}"
        ))),
    }
}

fn translate_join(lhs: RelExpr, join: &Join, scope: &mut Scope<'_>) -> TranslateResult<RelExpr> {
    let rhs = translate_table_factor(&join.relation, scope)?;

    let (constraint, bare) = match &join.join_operator {
        JoinOperator::Join(constraint) | JoinOperator::Inner(constraint) => {
            (Some(constraint), JoinCondition::Cross)
        }
        JoinOperator::Left(constraint) | JoinOperator::LeftOuter(constraint) => {
            (Some(constraint), JoinCondition::Left)
        }
        JoinOperator::Right(constraint) | JoinOperator::RightOuter(constraint) => {
            (Some(constraint), JoinCondition::Right)
        }
        JoinOperator::FullOuter(_) => {
            return Err(TranslateError::Unsupported(
                "FULL OUTER JOIN".to_string(),
            ))
        }
        JoinOperator::CrossJoin(_) => (None, JoinCondition::Cross),
        other => {
            return Err(TranslateError::Unsupported(format!(
                "join operator {other:?}"
            )))
        }
    };

    let condition = match constraint {
        Some(JoinConstraint::On(expr)) => {
            let mut pending = Vec::new();
            let cond = translate_conditional(expr, scope, &mut pending)?;
            if !pending.is_empty() {
                return Err(TranslateError::Unsupported(
                    "subquery in a join condition".to_string(),
                ));
            }
            JoinCondition::Theta(cond)
        }
        Some(JoinConstraint::Using(columns)) => {
            JoinCondition::Theta(expand_using(columns, &lhs, &rhs)?)
        }
        Some(JoinConstraint::Natural) => {
            return Err(TranslateError::Unsupported("NATURAL JOIN".to_string()))
        }
        Some(JoinConstraint::None) | None => bare,
    };

    Ok(RelExpr::join(lhs, rhs, condition))
}

/// Expand `USING (c1, ...)` into `lhs.c1 = rhs.c1 AND ...`, resolving each
/// column once per side.
fn expand_using(
    columns: &[ObjectName],
    lhs: &RelExpr,
    rhs: &RelExpr,
) -> TranslateResult<Conditional> {
    let mut condition: Option<Conditional> = None;
    for name in columns {
        let column_name = simple_object_name(name)?;
        let eq = Conditional::comparison(
            ThetaOp::Eq,
            CondArg::Column(resolve_in_tree(lhs, &column_name)?),
            CondArg::Column(resolve_in_tree(rhs, &column_name)?),
        );
        condition = Some(match condition {
            Some(acc) => Conditional::conjunction(acc, eq),
            None => eq,
        });
    }
    condition.ok_or_else(|| {
        TranslateError::Unsupported("USING with no columns".to_string())
    })
}

/// Resolve a column name against the base relations of one join operand:
/// exactly one of the operand's relations must declare it.
fn resolve_in_tree(tree: &RelExpr, column: &str) -> TranslateResult<relq_core::Column> {
    let mut handles = Vec::new();
    collect_relations(tree, &mut handles);

    let mut matches: Vec<relq_core::Column> = Vec::new();
    for handle in handles {
        let Some(base) = handle.column(column) else {
            continue;
        };
        let candidate = relq_core::Column::base(handle.clone(), base.clone());
        if !matches.contains(&candidate) {
            matches.push(candidate);
        }
    }
    match matches.len() {
        0 => Err(ResolutionError::UnknownColumn(column.to_string()).into()),
        1 => Ok(matches.remove(0)),
        _ => Err(ResolutionError::AmbiguousColumn(column.to_string()).into()),
    }
}

/// Collect every base relation referenced inside a subtree
fn collect_relations(tree: &RelExpr, out: &mut Vec<relq_core::RelationHandle>) {
    match tree {
        RelExpr::Relation(handle) => out.push(handle.clone()),
        RelExpr::Join(join) => {
            collect_relations(&join.lhs, out);
            collect_relations(&join.rhs, out);
        }
        RelExpr::Rename(rename) => collect_relations(&rename.over, out),
        RelExpr::Restriction(restriction) => collect_relations(&restriction.input, out),
        RelExpr::Projection(projection) => collect_relations(&projection.input, out),
        RelExpr::Aggregation(aggregation) => collect_relations(&aggregation.input, out),
        RelExpr::Operation(operation) => {
            if let Some((lhs, rhs)) = operation.rel_operands() {
                collect_relations(lhs, out);
                collect_relations(rhs, out);
            }
        }
    }
}

/// The single identifier of an unqualified object name
fn simple_object_name(name: &ObjectName) -> TranslateResult<String> {
    if name.0.len() == 1 {
        if let Some(ident) = name.0[0].as_ident() {
            return Ok(ident.value.clone());
        }
    }
    Err(TranslateError::Unsupported(format!(
        "qualified name '{name}'"
    )))
}

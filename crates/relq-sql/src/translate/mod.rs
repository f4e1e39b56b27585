//! AST-to-algebra translation — converts sqlparser statements into RelExpr

mod cond;
mod from;
mod scope;
mod select;

use crate::error::{TranslateError, TranslateResult};
use relq_core::catalog::Catalog;
use relq_core::{Operation, PairingOp, RelExpr, ShapeError};
use sqlparser::ast::{Query, SetExpr, SetOperator, SetQuantifier, Statement};

/// Translate a statement batch that must hold exactly one statement
pub fn translate(statements: &[Statement], catalog: &Catalog) -> TranslateResult<RelExpr> {
    match statements {
        [statement] => translate_statement(statement, catalog),
        [] => Err(TranslateError::Parse("no statement to translate".to_string())),
        _ => Err(TranslateError::Unsupported(format!(
            "multi-statement input ({} statements)",
            statements.len()
        ))),
    }
}

/// Translate one statement: a single SELECT, or a pair of SELECTs combined
/// by UNION/INTERSECT/EXCEPT.
pub fn translate_statement(
    statement: &Statement,
    catalog: &Catalog,
) -> TranslateResult<RelExpr> {
    match statement {
        Statement::Query(query) => translate_query(query, catalog),
        other => Err(TranslateError::Unsupported(format!(
            "{} statement",
            statement_kind(other)
        ))),
    }
}

pub(crate) fn translate_query(query: &Query, catalog: &Catalog) -> TranslateResult<RelExpr> {
    if query.with.is_some() {
        return Err(TranslateError::Unsupported("WITH".to_string()));
    }
    if query.limit_clause.is_some() {
        return Err(TranslateError::Unsupported("LIMIT".to_string()));
    }
    translate_set_expr(&query.body, query.order_by.as_ref(), catalog)
}

fn translate_set_expr(
    set_expr: &SetExpr,
    order_by: Option<&sqlparser::ast::OrderBy>,
    catalog: &Catalog,
) -> TranslateResult<RelExpr> {
    match set_expr {
        SetExpr::Select(select) => select::translate_select(select, order_by, catalog),

        SetExpr::SetOperation {
            op,
            set_quantifier,
            left,
            right,
        } => {
            if order_by.is_some() {
                return Err(TranslateError::Unsupported(
                    "ORDER BY over a set operation".to_string(),
                ));
            }
            let pairing = match op {
                SetOperator::Union => PairingOp::Union,
                SetOperator::Intersect => PairingOp::Intersect,
                SetOperator::Except => PairingOp::Except,
                other => {
                    return Err(TranslateError::Unsupported(format!(
                        "set operator {other}"
                    )))
                }
            };
            if !matches!(
                set_quantifier,
                SetQuantifier::None | SetQuantifier::Distinct
            ) {
                log::warn!("set quantifier '{set_quantifier}' ignored");
            }
            let lhs = translate_set_expr(left, None, catalog)?;
            let rhs = translate_set_expr(right, None, catalog)?;
            combine_pair(pairing, lhs, rhs)
        }

        SetExpr::Query(query) => translate_query(query, catalog),

        other => Err(TranslateError::Unsupported(format!("query body {other}"))),
    }
}

/// Combine a SELECT pair. When both sides project, the pair collapses into
/// one projection over an operation on the un-projected inputs; the sides
/// must then project the same number of columns.
fn combine_pair(op: PairingOp, lhs: RelExpr, rhs: RelExpr) -> TranslateResult<RelExpr> {
    match (lhs, rhs) {
        (RelExpr::Projection(left), RelExpr::Projection(right)) => {
            if left.columns.len() != right.columns.len() {
                return Err(ShapeError::DegreeMismatch {
                    left: left.columns.len(),
                    right: right.columns.len(),
                }
                .into());
            }
            let operation = Operation::pairing(op, *left.input, *right.input);
            Ok(RelExpr::projection(
                left.columns,
                RelExpr::Operation(operation),
            ))
        }
        (lhs, rhs) => Ok(RelExpr::Operation(Operation::pairing(op, lhs, rhs))),
    }
}

/// Human-readable name for a statement variant
fn statement_kind(statement: &Statement) -> &'static str {
    match statement {
        Statement::Query(_) => "SELECT",
        Statement::Insert(_) => "INSERT",
        Statement::Update { .. } => "UPDATE",
        Statement::Delete(_) => "DELETE",
        Statement::CreateTable(_) => "CREATE TABLE",
        Statement::Drop { .. } => "DROP",
        _ => "unsupported",
    }
}

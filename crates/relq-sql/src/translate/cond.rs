//! Conditional and operand translation, including subquery flattening

use crate::error::{TranslateError, TranslateResult};
use crate::translate::scope::{Resolved, Scope};
use relq_core::{
    AggregateArg, AggregateCall, AggregateFunction, ArithOp, CondArg, Conditional, Operation,
    OperationArg, OperationKind, ProjectionItem, RelExpr, ShapeError, ThetaOp,
};
use sqlparser::ast::{
    BinaryOperator, Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments, Query,
    UnaryOperator, Value,
};

/// Translate a predicate expression. Subqueries encountered on the right of
/// a comparison (or in `IN`) push their restriction-bearing bodies onto
/// `pending`; the caller cross-joins those bodies into its FROM tree.
pub(crate) fn translate_conditional(
    expr: &Expr,
    scope: &Scope<'_>,
    pending: &mut Vec<RelExpr>,
) -> TranslateResult<Conditional> {
    match expr {
        Expr::BinaryOp { left, op, right } => {
            let Some(theta) = theta_op(op) else {
                return Err(TranslateError::Unsupported(format!(
                    "'{op}' as a condition"
                )));
            };
            match theta {
                ThetaOp::And | ThetaOp::Or => {
                    let lhs = translate_conditional(left, scope, pending)?;
                    let rhs = translate_conditional(right, scope, pending)?;
                    Ok(Conditional::comparison(
                        theta,
                        CondArg::Cond(Box::new(lhs)),
                        CondArg::Cond(Box::new(rhs)),
                    ))
                }
                _ => {
                    let lhs = translate_operand(left, scope, pending)?;
                    if let Expr::Subquery(query) = strip_nesting(right) {
                        return translate_subquery_compare(lhs, theta, query, scope, pending);
                    }
                    let rhs = translate_operand(right, scope, pending)?;
                    Ok(Conditional::comparison(theta, lhs, rhs))
                }
            }
        }

        Expr::InList {
            expr: lhs,
            list,
            negated,
        } => {
            if *negated {
                return Err(TranslateError::Unsupported("NOT IN".to_string()));
            }
            let lhs = translate_operand(lhs, scope, pending)?;
            let items = list
                .iter()
                .map(|item| translate_operand(item, scope, pending))
                .collect::<TranslateResult<Vec<_>>>()?;
            Ok(Conditional::membership(lhs, items))
        }

        Expr::InSubquery {
            expr: lhs,
            subquery,
            negated,
        } => {
            if *negated {
                return Err(TranslateError::Unsupported("NOT IN".to_string()));
            }
            let lhs = translate_operand(lhs, scope, pending)?;
            translate_subquery_compare(lhs, ThetaOp::In, subquery, scope, pending)
        }

        Expr::Nested(inner) => translate_conditional(inner, scope, pending),

        Expr::Between { .. } => Err(TranslateError::Unsupported("BETWEEN".to_string())),
        Expr::Like { .. } | Expr::ILike { .. } => {
            Err(TranslateError::Unsupported("LIKE".to_string()))
        }
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            ..
        } => Err(TranslateError::Unsupported("unary NOT".to_string())),
        Expr::IsNull(_) | Expr::IsNotNull(_) => {
            Err(TranslateError::Unsupported("IS NULL".to_string()))
        }
        Expr::Exists { .. } => Err(TranslateError::Unsupported("EXISTS".to_string())),

        other => Err(TranslateError::Unsupported(format!(
            "condition {other}"
        ))),
    }
}

/// Translate an operand position inside a conditional
fn translate_operand(
    expr: &Expr,
    scope: &Scope<'_>,
    pending: &mut Vec<RelExpr>,
) -> TranslateResult<CondArg> {
    match expr {
        Expr::Identifier(ident) => Ok(resolved_arg(scope.lookup(&ident.value, None)?)),

        Expr::CompoundIdentifier(idents) => match idents.as_slice() {
            [relation, column] => Ok(resolved_arg(
                scope.lookup(&column.value, Some(&relation.value))?,
            )),
            _ => Err(TranslateError::Unsupported(format!(
                "multi-part identifier {expr}"
            ))),
        },

        Expr::Value(value) => Ok(CondArg::Literal(literal_text(&value.value)?)),

        Expr::Function(function) => Ok(CondArg::Function(translate_aggregate(function, scope)?)),

        Expr::Nested(inner) => translate_operand(inner, scope, pending),

        Expr::BinaryOp { left, op, right } => match arith_op(op) {
            Some(arith) => Ok(CondArg::Operation(Box::new(translate_arith(
                arith, left, right, scope, pending,
            )?))),
            None => Ok(CondArg::Cond(Box::new(translate_conditional(
                expr, scope, pending,
            )?))),
        },

        Expr::Subquery(_) => Err(TranslateError::Unsupported(
            "subquery outside a comparison".to_string(),
        )),

        other => Err(TranslateError::Unsupported(format!("operand {other}"))),
    }
}

/// Translate a binary arithmetic expression into an `Operation`
fn translate_arith(
    op: ArithOp,
    left: &Expr,
    right: &Expr,
    scope: &Scope<'_>,
    pending: &mut Vec<RelExpr>,
) -> TranslateResult<Operation> {
    let lhs = operation_arg(translate_operand(left, scope, pending)?)?;
    let rhs = operation_arg(translate_operand(right, scope, pending)?)?;
    Ok(Operation {
        op: OperationKind::Arith(op),
        lhs,
        rhs,
    })
}

fn operation_arg(arg: CondArg) -> TranslateResult<OperationArg> {
    match arg {
        CondArg::Column(column) => Ok(OperationArg::Column(column)),
        CondArg::Literal(text) => Ok(OperationArg::Literal(text)),
        CondArg::Operation(operation) => Ok(OperationArg::Operation(operation)),
        CondArg::Function(_) => Err(TranslateError::Unsupported(
            "aggregate inside arithmetic".to_string(),
        )),
        CondArg::Cond(_) => Err(TranslateError::Unsupported(
            "condition inside arithmetic".to_string(),
        )),
    }
}

/// Flatten a subquery used as the right side of a comparison or `IN`.
///
/// The subquery must translate to a projection. Its projected columns turn
/// the predicate into a conjunction of per-column comparisons, and the tree
/// under the projection bubbles up for the caller to cross-join.
fn translate_subquery_compare(
    lhs: CondArg,
    op: ThetaOp,
    query: &Query,
    scope: &Scope<'_>,
    pending: &mut Vec<RelExpr>,
) -> TranslateResult<Conditional> {
    let sub = crate::translate::translate_query(query, scope.catalog())?;
    let RelExpr::Projection(projection) = sub else {
        return Err(ShapeError::SubqueryShape.into());
    };

    let op = if op == ThetaOp::In { ThetaOp::Eq } else { op };

    let mut condition: Option<Conditional> = None;
    for item in projection.columns {
        let rhs = match item {
            ProjectionItem::Column(column) => CondArg::Column(column),
            ProjectionItem::Literal(text) => CondArg::Literal(text),
        };
        let compare = Conditional::comparison(op, lhs.clone(), rhs);
        condition = Some(match condition {
            Some(acc) => Conditional::conjunction(acc, compare),
            None => compare,
        });
    }
    let condition = condition.ok_or(ShapeError::SubqueryShape)?;

    pending.push(*projection.input);
    Ok(condition)
}

/// Translate an aggregate function call
pub(crate) fn translate_aggregate(
    function: &Function,
    scope: &Scope<'_>,
) -> TranslateResult<AggregateCall> {
    let name = function.name.to_string();
    let Some(fname) = AggregateFunction::parse(&name) else {
        return Err(TranslateError::Unsupported(format!("function {name}")));
    };
    if function.over.is_some() {
        return Err(TranslateError::Unsupported("window function".to_string()));
    }
    let FunctionArguments::List(arg_list) = &function.args else {
        return Err(TranslateError::Unsupported(format!(
            "{fname} without an argument list"
        )));
    };
    if arg_list.args.len() != 1 {
        return Err(TranslateError::Unsupported(format!(
            "{fname} with {} arguments",
            arg_list.args.len()
        )));
    }
    let arg = match &arg_list.args[0] {
        FunctionArg::Unnamed(arg)
        | FunctionArg::Named { arg, .. }
        | FunctionArg::ExprNamed { arg, .. } => arg,
    };

    match (fname, arg) {
        (
            AggregateFunction::Count,
            FunctionArgExpr::Wildcard | FunctionArgExpr::QualifiedWildcard(_),
        ) => Ok(AggregateCall::new(
            AggregateFunction::Count,
            AggregateArg::Star,
        )),
        (AggregateFunction::Count, FunctionArgExpr::Expr(_)) => Err(TranslateError::Unsupported(
            "counting anything but *".to_string(),
        )),
        (_, FunctionArgExpr::Wildcard | FunctionArgExpr::QualifiedWildcard(_)) => Err(
            TranslateError::Unsupported(format!("{fname} over '*'")),
        ),
        (_, FunctionArgExpr::Expr(expr)) => {
            let resolved = match strip_nesting(expr) {
                Expr::Identifier(ident) => scope.lookup(&ident.value, None)?,
                Expr::CompoundIdentifier(idents) => match idents.as_slice() {
                    [relation, column] => scope.lookup(&column.value, Some(&relation.value))?,
                    _ => {
                        return Err(TranslateError::Unsupported(format!(
                            "multi-part identifier {expr}"
                        )))
                    }
                },
                other => {
                    return Err(TranslateError::Unsupported(format!(
                        "non-column aggregate operand {other}"
                    )))
                }
            };
            match resolved {
                Resolved::Column(column) => Ok(AggregateCall::new(
                    fname,
                    AggregateArg::Column(Box::new(column)),
                )),
                _ => Err(TranslateError::Unsupported(
                    "non-column aggregate operand".to_string(),
                )),
            }
        }
    }
}

/// Render a literal: strings keep single quotes, everything else its text
pub(crate) fn literal_text(value: &Value) -> TranslateResult<String> {
    match value {
        Value::Number(text, _) => Ok(text.clone()),
        Value::SingleQuotedString(text) | Value::DoubleQuotedString(text) => {
            Ok(format!("'{text}'"))
        }
        Value::Boolean(value) => Ok(value.to_string()),
        Value::Null => Ok("null".to_string()),
        other => Err(TranslateError::Unsupported(format!("literal {other}"))),
    }
}

fn resolved_arg(resolved: Resolved) -> CondArg {
    match resolved {
        Resolved::Column(column) => CondArg::Column(column),
        Resolved::Function(call) => CondArg::Function(call),
        Resolved::Literal(text) => CondArg::Literal(text),
    }
}

fn strip_nesting(expr: &Expr) -> &Expr {
    match expr {
        Expr::Nested(inner) => strip_nesting(inner),
        other => other,
    }
}

fn theta_op(op: &BinaryOperator) -> Option<ThetaOp> {
    match op {
        BinaryOperator::Eq => Some(ThetaOp::Eq),
        BinaryOperator::NotEq => Some(ThetaOp::Neq),
        BinaryOperator::LtEq => Some(ThetaOp::Leq),
        BinaryOperator::GtEq => Some(ThetaOp::Geq),
        BinaryOperator::Lt => Some(ThetaOp::Lt),
        BinaryOperator::Gt => Some(ThetaOp::Gt),
        BinaryOperator::And => Some(ThetaOp::And),
        BinaryOperator::Or => Some(ThetaOp::Or),
        _ => None,
    }
}

fn arith_op(op: &BinaryOperator) -> Option<ArithOp> {
    match op {
        BinaryOperator::Plus => Some(ArithOp::Add),
        BinaryOperator::Minus => Some(ArithOp::Sub),
        BinaryOperator::Multiply => Some(ArithOp::Mul),
        BinaryOperator::Divide => Some(ArithOp::Div),
        BinaryOperator::StringConcat => Some(ArithOp::Concat),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_single;
    use relq_core::Catalog;
    use sqlparser::ast::{SetExpr, Statement};

    fn catalog() -> Catalog {
        Catalog::from_definitions(vec![
            ("S", vec![("sid", "integer"), ("city", "string")]),
            ("SP", vec![("sid", "integer"), ("pid", "string")]),
        ])
        .unwrap()
    }

    fn where_expr(sql: &str) -> Expr {
        let statement = parse_single(sql).unwrap();
        let Statement::Query(query) = statement else {
            panic!("expected a query");
        };
        let SetExpr::Select(select) = *query.body else {
            panic!("expected a select");
        };
        select.selection.expect("query has no WHERE")
    }

    fn scope_with<'c>(catalog: &'c Catalog, names: &[&str]) -> Scope<'c> {
        let mut scope = Scope::new(catalog);
        for name in names {
            scope.register_relation(name).unwrap();
        }
        scope
    }

    #[test]
    fn test_comparison_spellings() {
        let catalog = catalog();
        let scope = scope_with(&catalog, &["S"]);
        let mut pending = Vec::new();

        let expr = where_expr("SELECT sid FROM S WHERE sid <> 3");
        let cond = translate_conditional(&expr, &scope, &mut pending).unwrap();
        assert_eq!(cond.op, ThetaOp::Neq);

        let expr = where_expr("SELECT sid FROM S WHERE sid >= 3");
        let cond = translate_conditional(&expr, &scope, &mut pending).unwrap();
        assert_eq!(cond.op, ThetaOp::Geq);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_string_literal_keeps_quotes() {
        let catalog = catalog();
        let scope = scope_with(&catalog, &["S"]);
        let mut pending = Vec::new();
        let expr = where_expr("SELECT sid FROM S WHERE city = 'Paris'");
        let cond = translate_conditional(&expr, &scope, &mut pending).unwrap();
        assert_eq!(cond.to_string(), "S.city = 'Paris'");
    }

    #[test]
    fn test_in_list() {
        let catalog = catalog();
        let scope = scope_with(&catalog, &["S"]);
        let mut pending = Vec::new();
        let expr = where_expr("SELECT sid FROM S WHERE sid IN (1, 2, 3)");
        let cond = translate_conditional(&expr, &scope, &mut pending).unwrap();
        assert_eq!(cond.op, ThetaOp::In);
        assert_eq!(cond.to_string(), "S.sid IN (1, 2, 3)");
    }

    #[test]
    fn test_unsupported_predicates() {
        let catalog = catalog();
        let scope = scope_with(&catalog, &["S"]);
        let mut pending = Vec::new();

        for sql in [
            "SELECT sid FROM S WHERE city LIKE '%E'",
            "SELECT sid FROM S WHERE sid BETWEEN 1 AND 5",
            "SELECT sid FROM S WHERE NOT sid = 1",
            "SELECT sid FROM S WHERE city IS NULL",
        ] {
            let expr = where_expr(sql);
            let result = translate_conditional(&expr, &scope, &mut pending);
            assert!(
                matches!(result, Err(TranslateError::Unsupported(_))),
                "{sql} should be unsupported"
            );
        }
    }

    #[test]
    fn test_in_subquery_bubbles_body() {
        let catalog = catalog();
        let scope = scope_with(&catalog, &["S"]);
        let mut pending = Vec::new();
        let expr =
            where_expr("SELECT sid FROM S WHERE sid IN (SELECT sid FROM SP WHERE pid = 'P2')");
        let cond = translate_conditional(&expr, &scope, &mut pending).unwrap();

        // IN becomes equality against the projected column.
        assert_eq!(cond.op, ThetaOp::Eq);
        assert_eq!(cond.to_string(), "S.sid = SP.sid");

        // The subquery's restriction-bearing body bubbled up.
        assert_eq!(pending.len(), 1);
        assert!(matches!(pending[0], RelExpr::Restriction(_)));
    }

    #[test]
    fn test_arithmetic_operand() {
        let catalog = catalog();
        let scope = scope_with(&catalog, &["S"]);
        let mut pending = Vec::new();
        let expr = where_expr("SELECT sid FROM S WHERE sid * 100 > 5");
        let cond = translate_conditional(&expr, &scope, &mut pending).unwrap();
        assert_eq!(cond.op, ThetaOp::Gt);
        assert!(matches!(*cond.lhs, CondArg::Operation(_)));
    }

    #[test]
    fn test_count_star_only() {
        let catalog = catalog();
        let scope = scope_with(&catalog, &["S"]);
        let mut pending = Vec::new();
        let expr = where_expr("SELECT sid FROM S WHERE count(sid) > 5");
        let result = translate_conditional(&expr, &scope, &mut pending);
        assert!(matches!(result, Err(TranslateError::Unsupported(_))));
    }
}

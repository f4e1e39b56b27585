//! SELECT translation: FROM → WHERE → GROUP BY/HAVING → projection, with
//! alias renames and subquery joins bubbled up and applied at the end

use crate::error::{TranslateError, TranslateResult};
use crate::translate::cond::{literal_text, translate_aggregate, translate_conditional};
use crate::translate::from::translate_from;
use crate::translate::scope::{PendingRename, Resolved, Scope};
use relq_core::catalog::Catalog;
use relq_core::{
    AggregateArg, AggregateCall, Aggregation, Column, ColumnTarget, CondArg, CondRhs, Conditional,
    ProjectionItem, RelExpr, RenameInput, ResolutionError,
};
use sqlparser::ast::{
    Expr, GroupByExpr, OrderBy, OrderByKind, Select, SelectItem,
};

/// The translated SELECT list
enum SelectList {
    /// `SELECT *`: the projection is a pass-through
    Star,
    Items(Vec<SelectItemIr>),
}

struct SelectItemIr {
    value: Resolved,
    alias: Option<String>,
}

/// Translate one SELECT into an algebra tree
pub(crate) fn translate_select(
    select: &Select,
    order_by: Option<&OrderBy>,
    catalog: &Catalog,
) -> TranslateResult<RelExpr> {
    let mut scope = Scope::new(catalog);
    let mut tree = translate_from(&select.from, &mut scope)?;

    // The SELECT list goes first: aliases it declares are visible to every
    // later clause.
    let (select_list, pending_renames) = translate_select_list(&select.projection, &mut scope)?;

    // WHERE. Subqueries bubble their bodies up; each becomes a cross-join
    // operand of the FROM tree.
    let mut pending_joins: Vec<RelExpr> = Vec::new();
    let where_condition = select
        .selection
        .as_ref()
        .map(|expr| translate_conditional(expr, &scope, &mut pending_joins))
        .transpose()?;
    for body in pending_joins {
        tree = RelExpr::cross(tree, body);
    }

    let group_exprs: &[Expr] = match &select.group_by {
        GroupByExpr::Expressions(exprs, _) => exprs,
        GroupByExpr::All(_) => {
            return Err(TranslateError::Unsupported("GROUP BY ALL".to_string()))
        }
    };
    let grouped = !group_exprs.is_empty();

    // Column aliases wrap the FROM tree, in discovery order, unless an
    // aggregation consumes them positionally below.
    if !grouped {
        for pending in &pending_renames {
            tree = apply_rename(pending, tree);
        }
    }

    if let Some(condition) = where_condition {
        tree = RelExpr::restriction(condition, tree);
    }

    if grouped {
        tree = translate_aggregation(
            group_exprs,
            &select_list,
            select.having.as_ref(),
            tree,
            &scope,
        )?;
    } else if let Some(having) = &select.having {
        // Accepted without GROUP BY, resolved for errors, then dropped.
        let mut ignored = Vec::new();
        translate_conditional(having, &scope, &mut ignored)?;
        log::warn!("HAVING without GROUP BY; condition ignored");
    }

    resolve_order_by(order_by, &scope)?;

    if grouped {
        // The aggregation's renames already name the output columns.
        return Ok(tree);
    }

    match select_list {
        SelectList::Star => Ok(tree),
        SelectList::Items(items) => {
            let columns = items
                .into_iter()
                .map(|item| projection_item(item.value, &tree))
                .collect();
            Ok(RelExpr::projection(columns, tree))
        }
    }
}

fn translate_select_list(
    items: &[SelectItem],
    scope: &mut Scope<'_>,
) -> TranslateResult<(SelectList, Vec<PendingRename>)> {
    if let [SelectItem::Wildcard(_)] = items {
        return Ok((SelectList::Star, Vec::new()));
    }

    let mut list = Vec::new();
    let mut renames = Vec::new();
    for item in items {
        match item {
            SelectItem::UnnamedExpr(expr) => {
                let value = translate_select_expr(expr, scope)?;
                list.push(SelectItemIr { value, alias: None });
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                let value = translate_select_expr(expr, scope)?;
                let output = alias.value.clone();
                scope.add_column_alias(&output, value.clone());
                renames.push(PendingRename {
                    target: value.clone(),
                    output: output.clone(),
                });
                list.push(SelectItemIr {
                    value,
                    alias: Some(output),
                });
            }
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => {
                return Err(TranslateError::Unsupported(
                    "wildcard mixed into a select list".to_string(),
                ))
            }
        }
    }
    Ok((SelectList::Items(list), renames))
}

fn translate_select_expr(expr: &Expr, scope: &Scope<'_>) -> TranslateResult<Resolved> {
    match expr {
        Expr::Identifier(ident) => scope.lookup(&ident.value, None),
        Expr::CompoundIdentifier(idents) => match idents.as_slice() {
            [relation, column] => scope.lookup(&column.value, Some(&relation.value)),
            _ => Err(TranslateError::Unsupported(format!(
                "multi-part identifier {expr}"
            ))),
        },
        Expr::Function(function) => Ok(Resolved::Function(translate_aggregate(function, scope)?)),
        Expr::Value(value) => Ok(Resolved::Literal(literal_text(&value.value)?)),
        Expr::Nested(inner) => translate_select_expr(inner, scope),
        other => Err(TranslateError::Unsupported(format!(
            "select expression {other}"
        ))),
    }
}

/// Build the aggregation for a grouped select: resolved grouping keys,
/// the select list's aggregates, and a positional rename list.
fn translate_aggregation(
    group_exprs: &[Expr],
    select_list: &SelectList,
    having: Option<&Expr>,
    input: RelExpr,
    scope: &Scope<'_>,
) -> TranslateResult<RelExpr> {
    let items: &[SelectItemIr] = match select_list {
        SelectList::Items(items) => items,
        SelectList::Star => &[],
    };

    let mut attributes = Vec::new();
    for expr in group_exprs {
        let resolved = match expr {
            Expr::Identifier(ident) => scope.lookup(&ident.value, None)?,
            Expr::CompoundIdentifier(idents) => match idents.as_slice() {
                [relation, column] => scope.lookup(&column.value, Some(&relation.value))?,
                _ => return Err(ResolutionError::InvalidGroupBy(expr.to_string()).into()),
            },
            other => return Err(ResolutionError::InvalidGroupBy(other.to_string()).into()),
        };
        match resolved {
            Resolved::Column(column) => attributes.push(column),
            _ => return Err(ResolutionError::InvalidGroupBy(expr.to_string()).into()),
        }
    }

    // Renames, positionally: every grouping key, then every aggregate.
    let mut renames = Vec::new();
    for attribute in &attributes {
        let alias = items.iter().find_map(|item| match &item.value {
            Resolved::Column(column) if column == attribute => item.alias.clone(),
            _ => None,
        });
        let name = match alias {
            Some(alias) => alias,
            None => attribute
                .output_name()
                .unwrap_or_default()
                .to_string(),
        };
        renames.push(name);
    }

    let mut functions = Vec::new();
    for item in items {
        if let Resolved::Function(call) = &item.value {
            renames.push(
                item.alias
                    .clone()
                    .unwrap_or_else(|| call.derived_name()),
            );
            let mut call = call.clone();
            attach_star_scope(&mut call, &input);
            functions.push(call);
        }
    }

    let having_condition = having
        .map(|expr| {
            let mut pending = Vec::new();
            let mut condition = translate_conditional(expr, scope, &mut pending)?;
            if !pending.is_empty() {
                return Err(TranslateError::Unsupported(
                    "subquery in HAVING".to_string(),
                ));
            }
            attach_star_scope_cond(&mut condition, &input);
            Ok(condition)
        })
        .transpose()?;

    let aggregation = Aggregation::new(attributes, functions, input, renames)?;
    let mut tree = RelExpr::Aggregation(aggregation);
    if let Some(condition) = having_condition {
        tree = RelExpr::restriction(condition, tree);
    }
    Ok(tree)
}

/// Fold one pending alias into a Rename wrapped around the tree
fn apply_rename(pending: &PendingRename, tree: RelExpr) -> RelExpr {
    let input = match pending.target.clone() {
        Resolved::Column(column) => RenameInput::Column(column),
        Resolved::Function(call) => RenameInput::Function(call),
        Resolved::Literal(text) => RenameInput::Name(text),
    };
    RelExpr::rename(input, pending.output.clone(), tree)
}

/// Turn a resolved select item into a projection entry, anchoring `count(*)`
/// to the tree it counts over.
fn projection_item(value: Resolved, tree: &RelExpr) -> ProjectionItem {
    match value {
        Resolved::Column(column) => ProjectionItem::Column(column),
        Resolved::Function(mut call) => {
            attach_star_scope(&mut call, tree);
            ProjectionItem::Column(Column::aggregate(call))
        }
        Resolved::Literal(text) => ProjectionItem::Literal(text),
    }
}

/// ORDER BY produces no algebra node; its references still must resolve.
fn resolve_order_by(order_by: Option<&OrderBy>, scope: &Scope<'_>) -> TranslateResult<()> {
    let Some(order_by) = order_by else {
        return Ok(());
    };
    let OrderByKind::Expressions(exprs) = &order_by.kind else {
        return Err(TranslateError::Unsupported("ORDER BY ALL".to_string()));
    };
    for item in exprs {
        match &item.expr {
            Expr::Identifier(ident) => {
                scope.lookup(&ident.value, None)?;
            }
            Expr::CompoundIdentifier(idents) => match idents.as_slice() {
                [relation, column] => {
                    scope.lookup(&column.value, Some(&relation.value))?;
                }
                _ => {
                    return Err(TranslateError::Unsupported(format!(
                        "multi-part identifier {}",
                        item.expr
                    )))
                }
            },
            // Positional/literal ordering names nothing to resolve.
            Expr::Value(_) => {}
            other => {
                return Err(TranslateError::Unsupported(format!(
                    "ORDER BY expression {other}"
                )))
            }
        }
    }
    Ok(())
}

fn attach_star_scope(call: &mut AggregateCall, tree: &RelExpr) {
    if matches!(call.arg, AggregateArg::Star) && call.scope.is_none() {
        call.scope = Some(Box::new(tree.clone()));
    }
}

fn attach_star_scope_cond(condition: &mut Conditional, tree: &RelExpr) {
    attach_star_scope_arg(&mut condition.lhs, tree);
    match &mut condition.rhs {
        CondRhs::Arg(arg) => attach_star_scope_arg(arg, tree),
        CondRhs::List(items) => {
            for item in items {
                attach_star_scope_arg(item, tree);
            }
        }
    }
}

fn attach_star_scope_arg(arg: &mut CondArg, tree: &RelExpr) {
    match arg {
        CondArg::Function(call) => attach_star_scope(call, tree),
        CondArg::Cond(inner) => attach_star_scope_cond(inner, tree),
        CondArg::Column(column) => {
            if let ColumnTarget::Aggregate(call) = &mut column.target {
                attach_star_scope(call, tree);
            }
        }
        CondArg::Operation(_) | CondArg::Literal(_) => {}
    }
}

//! Projection rules: cascading, commuting with σ, and pushing through joins

use crate::error::{RewriteError, RewriteResult};
use relq_core::{
    projection_column_keys, Column, Involves, JoinCondition, Projection, ProjectionItem, RelExpr,
    ShapeError,
};

/// Rule 3: collapse a projection cascade to the outermost column list over
/// the innermost input.
pub fn collapse_projections(projection: &Projection) -> RewriteResult<Projection> {
    if !matches!(projection.input.as_ref(), RelExpr::Projection(_)) {
        return Err(ShapeError::UnexpectedNode {
            expected: "projection",
            found: projection.input.kind(),
        }
        .into());
    }
    let mut bottom: &RelExpr = &projection.input;
    while let RelExpr::Projection(inner) = bottom {
        bottom = &inner.input;
    }
    Ok(Projection {
        columns: projection.columns.clone(),
        input: Box::new(bottom.clone()),
    })
}

/// Rule 4 applicability: σ and π commute exactly when every column the
/// condition references is kept by the projection. Accepts either nesting
/// order (σ over π, or π over σ).
pub fn restriction_projection_commute(tree: &RelExpr) -> RewriteResult<bool> {
    let (condition, columns) = adjacent_pair(tree)?;
    let kept = projection_column_keys(columns);
    let involved = condition.involvement()?;
    let result = involved.column_keys().all(|key| kept.contains(key));
    Ok(result)
}

/// Rule 4: swap an adjacent σ/π pair. Illegal when the condition needs
/// columns the projection drops.
pub fn commute_restriction_projection(tree: &RelExpr) -> RewriteResult<RelExpr> {
    if !restriction_projection_commute(tree)? {
        return Err(RewriteError::Inapplicable(
            "condition references columns the projection drops".to_string(),
        ));
    }
    match tree {
        RelExpr::Restriction(restriction) => {
            let RelExpr::Projection(projection) = restriction.input.as_ref() else {
                return Err(ShapeError::UnexpectedNode {
                    expected: "projection",
                    found: restriction.input.kind(),
                }
                .into());
            };
            Ok(RelExpr::projection(
                projection.columns.clone(),
                RelExpr::restriction(
                    restriction.condition.clone(),
                    (*projection.input).clone(),
                ),
            ))
        }
        RelExpr::Projection(projection) => {
            let RelExpr::Restriction(restriction) = projection.input.as_ref() else {
                return Err(ShapeError::UnexpectedNode {
                    expected: "restriction",
                    found: projection.input.kind(),
                }
                .into());
            };
            Ok(RelExpr::restriction(
                restriction.condition.clone(),
                RelExpr::projection(
                    projection.columns.clone(),
                    (*restriction.input).clone(),
                ),
            ))
        }
        other => Err(ShapeError::UnexpectedNode {
            expected: "restriction or projection",
            found: other.kind(),
        }
        .into()),
    }
}

/// Rule 7: push a projection through the join beneath it, splitting the
/// column list by operand side. Columns the join condition needs but the
/// projection drops are added as pass-through, and the original projection
/// is re-applied on top when any were added.
pub fn push_projection_into_join(projection: &Projection) -> RewriteResult<RelExpr> {
    let RelExpr::Join(join) = projection.input.as_ref() else {
        return Err(ShapeError::UnexpectedNode {
            expected: "join",
            found: projection.input.kind(),
        }
        .into());
    };
    let lhs_inv = join.lhs.involvement()?;
    let rhs_inv = join.rhs.involvement()?;

    let mut lhs_columns: Vec<ProjectionItem> = Vec::new();
    let mut rhs_columns: Vec<ProjectionItem> = Vec::new();
    for item in &projection.columns {
        let Some(column) = item.as_column() else {
            continue;
        };
        let Some(relation) = &column.relation else {
            continue;
        };
        if lhs_inv.has_relation(relation.name()) {
            lhs_columns.push(item.clone());
        }
        if rhs_inv.has_relation(relation.name()) {
            rhs_columns.push(item.clone());
        }
    }

    let mut lhs_extras: Vec<ProjectionItem> = Vec::new();
    let mut rhs_extras: Vec<ProjectionItem> = Vec::new();
    if let JoinCondition::Theta(condition) = &join.condition {
        let projected = projection_column_keys(&projection.columns);
        let condition_involvement = condition.involvement()?;
        for (key, source) in condition_involvement.columns() {
            if projected.contains(key) {
                continue;
            }
            let column = Column::base(source.relation.clone(), source.column.clone());
            if lhs_inv.has_relation(&key.relation) {
                lhs_extras.push(ProjectionItem::Column(column.clone()));
            }
            if rhs_inv.has_relation(&key.relation) {
                rhs_extras.push(ProjectionItem::Column(column));
            }
        }
    }

    let added_extras = !lhs_extras.is_empty() || !rhs_extras.is_empty();
    lhs_columns.extend(lhs_extras);
    rhs_columns.extend(rhs_extras);

    let pushed = RelExpr::join(
        RelExpr::projection(lhs_columns, (*join.lhs).clone()),
        RelExpr::projection(rhs_columns, (*join.rhs).clone()),
        join.condition.clone(),
    );
    if added_extras {
        Ok(RelExpr::projection(projection.columns.clone(), pushed))
    } else {
        Ok(pushed)
    }
}

fn adjacent_pair(tree: &RelExpr) -> RewriteResult<(&relq_core::Conditional, &[ProjectionItem])> {
    match tree {
        RelExpr::Restriction(restriction) => match restriction.input.as_ref() {
            RelExpr::Projection(projection) => {
                Ok((&restriction.condition, &projection.columns))
            }
            other => Err(ShapeError::UnexpectedNode {
                expected: "projection",
                found: other.kind(),
            }
            .into()),
        },
        RelExpr::Projection(projection) => match projection.input.as_ref() {
            RelExpr::Restriction(restriction) => {
                Ok((&restriction.condition, &projection.columns))
            }
            other => Err(ShapeError::UnexpectedNode {
                expected: "restriction",
                found: other.kind(),
            }
            .into()),
        },
        other => Err(ShapeError::UnexpectedNode {
            expected: "restriction or projection",
            found: other.kind(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relq_core::{Catalog, CondArg, Conditional, ThetaOp};

    fn catalog() -> Catalog {
        Catalog::from_definitions(vec![
            ("S", vec![("sid", "integer"), ("sname", "string")]),
            ("R", vec![("sid", "integer"), ("bid", "integer")]),
        ])
        .unwrap()
    }

    fn col(catalog: &Catalog, relation: &str, column: &str) -> Column {
        let handle = catalog.relation(relation).unwrap().clone();
        let base = handle.column(column).unwrap().clone();
        Column::base(handle, base)
    }

    fn items(columns: Vec<Column>) -> Vec<ProjectionItem> {
        columns.into_iter().map(ProjectionItem::Column).collect()
    }

    #[test]
    fn test_collapse_projection_cascade() {
        let catalog = catalog();
        let relation = RelExpr::Relation(catalog.relation("S").unwrap().clone());
        let inner = RelExpr::projection(
            items(vec![col(&catalog, "S", "sid"), col(&catalog, "S", "sname")]),
            relation,
        );
        let outer = Projection {
            columns: items(vec![col(&catalog, "S", "sname")]),
            input: Box::new(inner),
        };

        let collapsed = collapse_projections(&outer).unwrap();
        assert_eq!(collapsed.columns.len(), 1);
        assert!(matches!(collapsed.input.as_ref(), RelExpr::Relation(_)));

        let flat = Projection {
            columns: items(vec![col(&catalog, "S", "sname")]),
            input: Box::new(RelExpr::Relation(catalog.relation("S").unwrap().clone())),
        };
        assert!(matches!(
            collapse_projections(&flat),
            Err(RewriteError::Shape(_))
        ));
    }

    #[test]
    fn test_restriction_projection_commute_check() {
        let catalog = catalog();
        let relation = RelExpr::Relation(catalog.relation("S").unwrap().clone());

        // Condition over sid; projection keeps sid: commutes.
        let keeps = RelExpr::restriction(
            Conditional::comparison(
                ThetaOp::Gt,
                CondArg::Column(col(&catalog, "S", "sid")),
                CondArg::Literal("5".to_string()),
            ),
            RelExpr::projection(items(vec![col(&catalog, "S", "sid")]), relation.clone()),
        );
        assert!(restriction_projection_commute(&keeps).unwrap());

        // Projection drops sid: does not commute.
        let drops = RelExpr::restriction(
            Conditional::comparison(
                ThetaOp::Gt,
                CondArg::Column(col(&catalog, "S", "sid")),
                CondArg::Literal("5".to_string()),
            ),
            RelExpr::projection(items(vec![col(&catalog, "S", "sname")]), relation),
        );
        assert!(!restriction_projection_commute(&drops).unwrap());
        assert!(matches!(
            commute_restriction_projection(&drops),
            Err(RewriteError::Inapplicable(_))
        ));
    }

    #[test]
    fn test_commute_swaps_both_directions() {
        let catalog = catalog();
        let relation = RelExpr::Relation(catalog.relation("S").unwrap().clone());
        let condition = Conditional::comparison(
            ThetaOp::Gt,
            CondArg::Column(col(&catalog, "S", "sid")),
            CondArg::Literal("5".to_string()),
        );

        let sigma_over_pi = RelExpr::restriction(
            condition.clone(),
            RelExpr::projection(items(vec![col(&catalog, "S", "sid")]), relation),
        );
        let swapped = commute_restriction_projection(&sigma_over_pi).unwrap();
        let RelExpr::Projection(outer) = &swapped else {
            panic!("expected the projection on top after commuting");
        };
        assert!(matches!(outer.input.as_ref(), RelExpr::Restriction(_)));

        // And back.
        let back = commute_restriction_projection(&swapped).unwrap();
        assert_eq!(back, sigma_over_pi);
    }

    #[test]
    fn test_push_projection_through_cross() {
        let catalog = catalog();
        let cross = RelExpr::cross(
            RelExpr::Relation(catalog.relation("S").unwrap().clone()),
            RelExpr::Relation(catalog.relation("R").unwrap().clone()),
        );
        let projection = Projection {
            columns: items(vec![col(&catalog, "S", "sname"), col(&catalog, "R", "bid")]),
            input: Box::new(cross),
        };

        let pushed = push_projection_into_join(&projection).unwrap();
        let RelExpr::Join(join) = pushed else {
            panic!("expected the join on top, no extras were needed");
        };
        let RelExpr::Projection(lhs) = *join.lhs else {
            panic!("expected a projection on the left operand");
        };
        let RelExpr::Projection(rhs) = *join.rhs else {
            panic!("expected a projection on the right operand");
        };
        assert_eq!(lhs.columns.len(), 1);
        assert_eq!(rhs.columns.len(), 1);
    }

    #[test]
    fn test_push_projection_adds_join_condition_columns() {
        let catalog = catalog();
        let theta = RelExpr::join(
            RelExpr::Relation(catalog.relation("S").unwrap().clone()),
            RelExpr::Relation(catalog.relation("R").unwrap().clone()),
            JoinCondition::Theta(Conditional::comparison(
                ThetaOp::Eq,
                CondArg::Column(col(&catalog, "S", "sid")),
                CondArg::Column(col(&catalog, "R", "sid")),
            )),
        );
        // The projection keeps neither sid; both must be added as
        // pass-through and the original projection re-applied on top.
        let projection = Projection {
            columns: items(vec![col(&catalog, "S", "sname"), col(&catalog, "R", "bid")]),
            input: Box::new(theta),
        };

        let pushed = push_projection_into_join(&projection).unwrap();
        let RelExpr::Projection(outer) = pushed else {
            panic!("expected the outer projection to be re-applied");
        };
        assert_eq!(outer.columns.len(), 2);
        let RelExpr::Join(join) = *outer.input else {
            panic!("expected the join under the outer projection");
        };
        let RelExpr::Projection(lhs) = *join.lhs else {
            panic!("expected a projection on the left operand");
        };
        assert_eq!(lhs.columns.len(), 2, "sname plus the pass-through sid");
    }
}

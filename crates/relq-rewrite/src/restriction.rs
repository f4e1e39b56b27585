//! Restriction rules: cascading, commuting, and pushing σ through joins

use crate::error::{RewriteError, RewriteResult};
use relq_core::{
    classify_join_condition, Conditional, Involves, Join, JoinCondition, RelExpr, Restriction,
    ShapeError,
};

/// Recursively split a conjunction into its conjuncts, left to right
pub(crate) fn split_conjunction(condition: &Conditional, out: &mut Vec<Conditional>) {
    match condition.as_conjunction() {
        Some((lhs, rhs)) => {
            split_conjunction(lhs, out);
            split_conjunction(rhs, out);
        }
        None => out.push(condition.clone()),
    }
}

/// Rule 1 (split): cascade a conjunctive restriction into nested
/// unary-condition restrictions.
///
/// σ[c1 AND c2 AND c3](x) becomes σ[c3](σ[c2](σ[c1](x))).
pub fn cascade_restriction(restriction: &Restriction) -> RewriteResult<Restriction> {
    let mut conditions = Vec::new();
    split_conjunction(&restriction.condition, &mut conditions);
    let Some(top) = conditions.pop() else {
        return Err(RewriteError::Inapplicable(
            "condition produced no conjuncts".to_string(),
        ));
    };
    if conditions.is_empty() {
        return Err(RewriteError::Inapplicable(
            "condition is not a conjunction".to_string(),
        ));
    }

    let mut tree = (*restriction.input).clone();
    for condition in conditions {
        tree = RelExpr::restriction(condition, tree);
    }
    Ok(Restriction {
        condition: top,
        input: Box::new(tree),
    })
}

/// Rule 1 (merge): collapse a chain of restrictions into one conjunctive
/// restriction over the bottom of the chain.
pub fn merge_restrictions(restriction: &Restriction) -> RewriteResult<Restriction> {
    if !matches!(restriction.input.as_ref(), RelExpr::Restriction(_)) {
        return Err(RewriteError::Inapplicable(
            "input is not a restriction chain".to_string(),
        ));
    }

    let mut condition = restriction.condition.clone();
    let mut bottom: &RelExpr = &restriction.input;
    while let RelExpr::Restriction(inner) = bottom {
        condition = Conditional::conjunction(condition, inner.condition.clone());
        bottom = &inner.input;
    }
    Ok(Restriction {
        condition,
        input: Box::new(bottom.clone()),
    })
}

/// Rule 2: commute two adjacent restrictions.
///
/// σ[a](σ[b](x)) becomes σ[b](σ[a](x)).
pub fn commute_restrictions(restriction: &Restriction) -> RewriteResult<Restriction> {
    let RelExpr::Restriction(inner) = restriction.input.as_ref() else {
        return Err(ShapeError::UnexpectedNode {
            expected: "restriction",
            found: restriction.input.kind(),
        }
        .into());
    };
    Ok(Restriction {
        condition: inner.condition.clone(),
        input: Box::new(RelExpr::restriction(
            restriction.condition.clone(),
            (*inner.input).clone(),
        )),
    })
}

/// Where rule 6 can push a restriction relative to its join's operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushTarget {
    /// The condition depends only on the left operand
    Lhs,
    /// The condition depends only on the right operand
    Rhs,
    /// A conjunction whose conjuncts split one per side, in order
    Split,
    /// A conjunction that splits with the conjuncts swapped
    SplitSwap,
    /// The condition touches neither side
    Unrelated,
}

/// Rule 6 applicability: classify how a restriction's condition relates to
/// the operands of the join (or set pairing) beneath it. `None` means a
/// straddling condition that cannot be pushed.
pub fn classify_restriction_join(
    restriction: &Restriction,
) -> RewriteResult<Option<PushTarget>> {
    let (lhs, rhs) = join_operands(&restriction.input)?;
    let condition = &restriction.condition;

    let cond_inv = condition.involvement()?;
    let lhs_inv = lhs.involvement()?;
    let rhs_inv = rhs.involvement()?;

    // Side membership is decided by owning relation: a bare relation
    // operand involves no columns of its own.
    let in_lhs = cond_inv
        .column_keys()
        .filter(|key| lhs_inv.has_relation(&key.relation))
        .count();
    let in_rhs = cond_inv
        .column_keys()
        .filter(|key| rhs_inv.has_relation(&key.relation))
        .count();
    let total = cond_inv.column_count();

    if in_lhs == 0 && in_rhs == 0 {
        return Ok(Some(PushTarget::Unrelated));
    }
    if in_rhs == 0 && in_lhs == total {
        return Ok(Some(PushTarget::Lhs));
    }
    if in_lhs == 0 && in_rhs == total {
        return Ok(Some(PushTarget::Rhs));
    }

    let Some((left_cond, right_cond)) = condition.as_conjunction() else {
        return Ok(None);
    };
    let left_inv = left_cond.involvement()?;
    let right_inv = right_cond.involvement()?;

    let left_only_lhs = left_inv.columns_within(&lhs_inv)
        && left_inv
            .column_keys()
            .all(|key| !rhs_inv.has_relation(&key.relation));
    let left_only_rhs = left_inv.columns_within(&rhs_inv)
        && left_inv
            .column_keys()
            .all(|key| !lhs_inv.has_relation(&key.relation));
    let right_only_lhs = right_inv.columns_within(&lhs_inv)
        && right_inv
            .column_keys()
            .all(|key| !rhs_inv.has_relation(&key.relation));
    let right_only_rhs = right_inv.columns_within(&rhs_inv)
        && right_inv
            .column_keys()
            .all(|key| !lhs_inv.has_relation(&key.relation));

    if left_only_lhs && right_only_rhs {
        return Ok(Some(PushTarget::Split));
    }
    if left_only_rhs && right_only_lhs {
        return Ok(Some(PushTarget::SplitSwap));
    }
    Ok(None)
}

/// Rule 6: push a restriction into the dependent side(s) of the join
/// beneath it. Straddling non-conjunctive conditions are not transformable.
pub fn push_restriction_into_join(restriction: &Restriction) -> RewriteResult<RelExpr> {
    let target = classify_restriction_join(restriction)?.ok_or_else(|| {
        RewriteError::Inapplicable("condition straddles the join operands".to_string())
    })?;
    let RelExpr::Join(join) = restriction.input.as_ref() else {
        return Err(ShapeError::UnexpectedNode {
            expected: "join",
            found: restriction.input.kind(),
        }
        .into());
    };

    let condition = &restriction.condition;
    let (new_lhs, new_rhs) = match target {
        PushTarget::Unrelated => {
            return Err(RewriteError::Inapplicable(
                "condition relates to neither join operand".to_string(),
            ))
        }
        PushTarget::Lhs => (
            RelExpr::restriction(condition.clone(), (*join.lhs).clone()),
            (*join.rhs).clone(),
        ),
        PushTarget::Rhs => (
            (*join.lhs).clone(),
            RelExpr::restriction(condition.clone(), (*join.rhs).clone()),
        ),
        PushTarget::Split | PushTarget::SplitSwap => {
            let Some((left_cond, right_cond)) = condition.as_conjunction() else {
                return Err(RewriteError::Inapplicable(
                    "split push requires a conjunction".to_string(),
                ));
            };
            let (for_lhs, for_rhs) = if target == PushTarget::Split {
                (left_cond, right_cond)
            } else {
                (right_cond, left_cond)
            };
            (
                RelExpr::restriction(for_lhs.clone(), (*join.lhs).clone()),
                RelExpr::restriction(for_rhs.clone(), (*join.rhs).clone()),
            )
        }
    };

    Ok(RelExpr::join(new_lhs, new_rhs, join.condition.clone()))
}

/// Rule 12: fuse σ over a cartesian product into a theta join, when the
/// condition classifies as a join condition. `Ok(None)` when it does not.
pub fn fuse_restriction_cross(restriction: &Restriction) -> RewriteResult<Option<Join>> {
    let RelExpr::Join(join) = restriction.input.as_ref() else {
        return Err(ShapeError::UnexpectedNode {
            expected: "join",
            found: restriction.input.kind(),
        }
        .into());
    };
    if !join.condition.is_cross() {
        return Err(RewriteError::Inapplicable(
            "join is not a cartesian product".to_string(),
        ));
    }

    let orientation = classify_join_condition(
        &restriction.condition,
        &join.lhs.involvement()?,
        &join.rhs.involvement()?,
    )?;
    Ok(orientation.map(|_| Join {
        lhs: join.lhs.clone(),
        rhs: join.rhs.clone(),
        condition: JoinCondition::Theta(restriction.condition.clone()),
    }))
}

/// Operands of the join or set pairing a restriction sits on
fn join_operands(input: &RelExpr) -> RewriteResult<(&RelExpr, &RelExpr)> {
    match input {
        RelExpr::Join(join) => Ok((&join.lhs, &join.rhs)),
        RelExpr::Operation(operation) if operation.pairing_op().is_some() => operation
            .rel_operands()
            .ok_or_else(|| {
                ShapeError::UnexpectedNode {
                    expected: "set operation over subtrees",
                    found: "operation",
                }
                .into()
            }),
        other => Err(ShapeError::UnexpectedNode {
            expected: "join or set operation",
            found: other.kind(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relq_core::{Catalog, Column, CondArg, ThetaOp};

    fn catalog() -> Catalog {
        Catalog::from_definitions(vec![
            ("S", vec![("sid", "integer"), ("rating", "integer")]),
            ("R", vec![("sid", "integer"), ("bid", "integer")]),
        ])
        .unwrap()
    }

    fn col(catalog: &Catalog, relation: &str, column: &str) -> Column {
        let handle = catalog.relation(relation).unwrap().clone();
        let base = handle.column(column).unwrap().clone();
        Column::base(handle, base)
    }

    fn eq(lhs: Column, rhs: CondArg) -> Conditional {
        Conditional::comparison(ThetaOp::Eq, CondArg::Column(lhs), rhs)
    }

    fn cross(catalog: &Catalog) -> RelExpr {
        RelExpr::cross(
            RelExpr::Relation(catalog.relation("S").unwrap().clone()),
            RelExpr::Relation(catalog.relation("R").unwrap().clone()),
        )
    }

    #[test]
    fn test_cascade_and_merge_round_trip() {
        let catalog = catalog();
        let join_cond = eq(
            col(&catalog, "S", "sid"),
            CondArg::Column(col(&catalog, "R", "sid")),
        );
        let const_cond = eq(
            col(&catalog, "R", "bid"),
            CondArg::Literal("103".to_string()),
        );
        let restriction = Restriction {
            condition: Conditional::conjunction(join_cond.clone(), const_cond.clone()),
            input: Box::new(cross(&catalog)),
        };

        let cascaded = cascade_restriction(&restriction).unwrap();
        assert_eq!(cascaded.condition, const_cond);
        let RelExpr::Restriction(inner) = cascaded.input.as_ref() else {
            panic!("expected the nested restriction");
        };
        assert_eq!(inner.condition, join_cond);

        // Merging back yields the same conjunct set.
        let merged = merge_restrictions(&cascaded).unwrap();
        let mut round_tripped = Vec::new();
        split_conjunction(&merged.condition, &mut round_tripped);
        assert_eq!(round_tripped.len(), 2);
        assert!(round_tripped.contains(&join_cond));
        assert!(round_tripped.contains(&const_cond));
        assert!(matches!(merged.input.as_ref(), RelExpr::Join(_)));
    }

    #[test]
    fn test_cascade_requires_conjunction() {
        let catalog = catalog();
        let restriction = Restriction {
            condition: eq(
                col(&catalog, "R", "bid"),
                CondArg::Literal("103".to_string()),
            ),
            input: Box::new(cross(&catalog)),
        };
        assert!(matches!(
            cascade_restriction(&restriction),
            Err(RewriteError::Inapplicable(_))
        ));
    }

    #[test]
    fn test_commute_restrictions() {
        let catalog = catalog();
        let outer = eq(
            col(&catalog, "R", "bid"),
            CondArg::Literal("103".to_string()),
        );
        let inner = eq(
            col(&catalog, "S", "rating"),
            CondArg::Literal("5".to_string()),
        );
        let restriction = Restriction {
            condition: outer.clone(),
            input: Box::new(RelExpr::restriction(inner.clone(), cross(&catalog))),
        };

        let swapped = commute_restrictions(&restriction).unwrap();
        assert_eq!(swapped.condition, inner);
        let RelExpr::Restriction(nested) = swapped.input.as_ref() else {
            panic!("expected a nested restriction");
        };
        assert_eq!(nested.condition, outer);

        // Wrong shape errors rather than silently no-opping.
        let flat = Restriction {
            condition: outer,
            input: Box::new(cross(&catalog)),
        };
        assert!(matches!(
            commute_restrictions(&flat),
            Err(RewriteError::Shape(_))
        ));
    }

    #[test]
    fn test_classify_one_sided_condition() {
        let catalog = catalog();
        let restriction = Restriction {
            condition: eq(
                col(&catalog, "R", "bid"),
                CondArg::Literal("103".to_string()),
            ),
            input: Box::new(cross(&catalog)),
        };
        assert_eq!(
            classify_restriction_join(&restriction).unwrap(),
            Some(PushTarget::Rhs)
        );
    }

    #[test]
    fn test_classify_split() {
        let catalog = catalog();
        let lhs_cond = eq(
            col(&catalog, "S", "rating"),
            CondArg::Literal("5".to_string()),
        );
        let rhs_cond = eq(
            col(&catalog, "R", "bid"),
            CondArg::Literal("103".to_string()),
        );
        let restriction = Restriction {
            condition: Conditional::conjunction(lhs_cond, rhs_cond),
            input: Box::new(cross(&catalog)),
        };
        assert_eq!(
            classify_restriction_join(&restriction).unwrap(),
            Some(PushTarget::Split)
        );

        let straddling = Restriction {
            condition: eq(
                col(&catalog, "S", "sid"),
                CondArg::Column(col(&catalog, "R", "sid")),
            ),
            input: Box::new(cross(&catalog)),
        };
        assert_eq!(classify_restriction_join(&straddling).unwrap(), None);
    }

    #[test]
    fn test_push_into_one_side() {
        let catalog = catalog();
        let condition = eq(
            col(&catalog, "R", "bid"),
            CondArg::Literal("103".to_string()),
        );
        let restriction = Restriction {
            condition: condition.clone(),
            input: Box::new(cross(&catalog)),
        };

        let pushed = push_restriction_into_join(&restriction).unwrap();
        let RelExpr::Join(join) = pushed else {
            panic!("expected a join after pushing");
        };
        assert!(matches!(*join.lhs, RelExpr::Relation(_)));
        let RelExpr::Restriction(inner) = *join.rhs else {
            panic!("expected the restriction on the right operand");
        };
        assert_eq!(inner.condition, condition);
    }

    #[test]
    fn test_fuse_restriction_cross() {
        let catalog = catalog();
        let join_cond = eq(
            col(&catalog, "S", "sid"),
            CondArg::Column(col(&catalog, "R", "sid")),
        );
        let restriction = Restriction {
            condition: join_cond.clone(),
            input: Box::new(cross(&catalog)),
        };

        let fused = fuse_restriction_cross(&restriction).unwrap().unwrap();
        assert_eq!(fused.condition, JoinCondition::Theta(join_cond));

        // A one-sided condition is not a join condition.
        let one_sided = Restriction {
            condition: eq(
                col(&catalog, "R", "bid"),
                CondArg::Literal("103".to_string()),
            ),
            input: Box::new(cross(&catalog)),
        };
        assert!(fuse_restriction_cross(&one_sided).unwrap().is_none());

        // Fusing over a theta join is a structural error.
        let theta = Restriction {
            condition: one_sided.condition.clone(),
            input: Box::new(RelExpr::join(
                RelExpr::Relation(catalog.relation("S").unwrap().clone()),
                RelExpr::Relation(catalog.relation("R").unwrap().clone()),
                JoinCondition::Theta(eq(
                    col(&catalog, "S", "sid"),
                    CondArg::Column(col(&catalog, "R", "sid")),
                )),
            )),
        };
        assert!(matches!(
            fuse_restriction_cross(&theta),
            Err(RewriteError::Inapplicable(_))
        ));
    }
}

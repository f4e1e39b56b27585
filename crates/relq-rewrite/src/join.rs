//! Join rules: commuting operands and re-associating operator chains

use crate::error::{RewriteError, RewriteResult};
use relq_core::{Join, JoinCondition, Operation, PairingOp, RelExpr, ShapeError};

/// Rule 5 applicability: cross and theta joins commute; the outer markers
/// do not.
pub fn join_commutes(join: &Join) -> bool {
    matches!(
        join.condition,
        JoinCondition::Cross | JoinCondition::Theta(_)
    )
}

/// Rule 5: swap the operands of a join
pub fn commute_join(join: &Join) -> RewriteResult<Join> {
    if !join_commutes(join) {
        return Err(RewriteError::Inapplicable(format!(
            "'{}' join operands cannot swap",
            join.condition.label()
        )));
    }
    Ok(Join {
        lhs: join.rhs.clone(),
        rhs: join.lhs.clone(),
        condition: join.condition.clone(),
    })
}

/// The operator kind a subtree presents for associativity purposes.
/// Theta joins, outer markers and set difference are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainKind {
    Cross,
    Union,
    Intersect,
}

fn chain_kind(tree: &RelExpr) -> Option<ChainKind> {
    match tree {
        RelExpr::Join(join) if join.condition.is_cross() => Some(ChainKind::Cross),
        RelExpr::Operation(operation) => match operation.pairing_op() {
            Some(PairingOp::Union) => Some(ChainKind::Union),
            Some(PairingOp::Intersect) => Some(ChainKind::Intersect),
            _ => None,
        },
        _ => None,
    }
}

/// Which way a chain can rotate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
    Both,
}

/// Rotation direction for rule 9
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// (a ∘ (b ∘ c)) becomes ((a ∘ b) ∘ c)
    Left,
    /// ((a ∘ b) ∘ c) becomes (a ∘ (b ∘ c))
    Right,
}

/// Rule 9 applicability: a chain rotates toward the side whose operand
/// carries the same operator kind. `None` when the node is not an
/// associable cross/union/intersect, or neither operand matches it.
pub fn chain_associativity(tree: &RelExpr) -> RewriteResult<Option<Associativity>> {
    let Some(kind) = chain_kind(tree) else {
        return Ok(None);
    };
    let (lhs, rhs) = chain_operands(tree)?;
    let left = chain_kind(rhs) == Some(kind);
    let right = chain_kind(lhs) == Some(kind);
    Ok(match (left, right) {
        (true, true) => Some(Associativity::Both),
        (true, false) => Some(Associativity::Left),
        (false, true) => Some(Associativity::Right),
        (false, false) => None,
    })
}

/// Rule 9: rotate a same-kind cross/union/intersect chain
pub fn associate_chain(tree: &RelExpr, direction: Direction) -> RewriteResult<RelExpr> {
    let Some(kind) = chain_kind(tree) else {
        return Err(RewriteError::Inapplicable(
            "not an associable cross/union/intersect chain".to_string(),
        ));
    };
    let (lhs, rhs) = chain_operands(tree)?;

    match direction {
        Direction::Left => {
            if chain_kind(rhs) != Some(kind) {
                return Err(RewriteError::Inapplicable(
                    "right operand carries a different operator".to_string(),
                ));
            }
            let (b, c) = chain_operands(rhs)?;
            let inner = rebuild(kind, lhs.clone(), b.clone());
            Ok(rebuild(kind, inner, c.clone()))
        }
        Direction::Right => {
            if chain_kind(lhs) != Some(kind) {
                return Err(RewriteError::Inapplicable(
                    "left operand carries a different operator".to_string(),
                ));
            }
            let (a, b) = chain_operands(lhs)?;
            let inner = rebuild(kind, b.clone(), rhs.clone());
            Ok(rebuild(kind, a.clone(), inner))
        }
    }
}

fn chain_operands(tree: &RelExpr) -> RewriteResult<(&RelExpr, &RelExpr)> {
    match tree {
        RelExpr::Join(join) => Ok((&join.lhs, &join.rhs)),
        RelExpr::Operation(operation) => operation.rel_operands().ok_or_else(|| {
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

fn rebuild(kind: ChainKind, lhs: RelExpr, rhs: RelExpr) -> RelExpr {
    match kind {
        ChainKind::Cross => RelExpr::cross(lhs, rhs),
        ChainKind::Union => RelExpr::Operation(Operation::pairing(PairingOp::Union, lhs, rhs)),
        ChainKind::Intersect => {
            RelExpr::Operation(Operation::pairing(PairingOp::Intersect, lhs, rhs))
        }
    }
}

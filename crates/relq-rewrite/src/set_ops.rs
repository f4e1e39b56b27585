//! Set-operation rules: commuting and pushing σ/π through ∪, ∩ and −

use crate::error::{RewriteError, RewriteResult};
use relq_core::{Operation, PairingOp, Projection, RelExpr, Restriction, ShapeError};

/// Rule 8 applicability: union and intersect commute; except does not
pub fn set_operation_commutes(operation: &Operation) -> bool {
    matches!(
        operation.pairing_op(),
        Some(PairingOp::Union) | Some(PairingOp::Intersect)
    ) && operation.rel_operands().is_some()
}

/// Rule 8: commute the operands of a union or intersection
pub fn commute_set_operation(operation: &Operation) -> RewriteResult<Operation> {
    let (op, lhs, rhs) = pairing_parts(operation)?;
    match op {
        PairingOp::Union | PairingOp::Intersect => {
            Ok(Operation::pairing(op, rhs.clone(), lhs.clone()))
        }
        PairingOp::Except => Err(RewriteError::Inapplicable(
            "set difference does not commute".to_string(),
        )),
    }
}

/// Rule 10: push a restriction through a set operation, applying an
/// independent copy of the condition to each side.
pub fn push_restriction_into_set_op(restriction: &Restriction) -> RewriteResult<Operation> {
    let (op, lhs, rhs) = pairing_input(&restriction.input)?;
    Ok(Operation::pairing(
        op,
        RelExpr::restriction(restriction.condition.clone(), lhs.clone()),
        RelExpr::restriction(restriction.condition.clone(), rhs.clone()),
    ))
}

/// Rule 11: push a projection through a union, duplicating the column list
/// onto both sides.
pub fn push_projection_into_union(projection: &Projection) -> RewriteResult<Operation> {
    let (op, lhs, rhs) = pairing_input(&projection.input)?;
    if op != PairingOp::Union {
        return Err(RewriteError::Inapplicable(
            "projection pushes only through union".to_string(),
        ));
    }
    Ok(Operation::pairing(
        PairingOp::Union,
        RelExpr::projection(projection.columns.clone(), lhs.clone()),
        RelExpr::projection(projection.columns.clone(), rhs.clone()),
    ))
}

/// Rule 13: push a restriction through a set difference. The left side
/// always receives it; `both` also applies an independent copy on the right.
pub fn push_restriction_into_difference(
    restriction: &Restriction,
    both: bool,
) -> RewriteResult<Operation> {
    let (op, lhs, rhs) = pairing_input(&restriction.input)?;
    if op != PairingOp::Except {
        return Err(RewriteError::Inapplicable(
            "input is not a set difference".to_string(),
        ));
    }
    let new_lhs = RelExpr::restriction(restriction.condition.clone(), lhs.clone());
    let new_rhs = if both {
        RelExpr::restriction(restriction.condition.clone(), rhs.clone())
    } else {
        rhs.clone()
    };
    Ok(Operation::pairing(PairingOp::Except, new_lhs, new_rhs))
}

/// Which intersection operand receives a pushed restriction. Comes from a
/// prior rule 6 classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Lhs,
    Rhs,
}

/// Rule 14: push a restriction into one side of an intersection
pub fn push_restriction_into_intersection(
    restriction: &Restriction,
    side: Side,
) -> RewriteResult<Operation> {
    let (op, lhs, rhs) = pairing_input(&restriction.input)?;
    if op != PairingOp::Intersect {
        return Err(RewriteError::Inapplicable(
            "input is not an intersection".to_string(),
        ));
    }
    let condition = restriction.condition.clone();
    let (new_lhs, new_rhs) = match side {
        Side::Lhs => (RelExpr::restriction(condition, lhs.clone()), rhs.clone()),
        Side::Rhs => (lhs.clone(), RelExpr::restriction(condition, rhs.clone())),
    };
    Ok(Operation::pairing(PairingOp::Intersect, new_lhs, new_rhs))
}

fn pairing_input(input: &RelExpr) -> RewriteResult<(PairingOp, &RelExpr, &RelExpr)> {
    let RelExpr::Operation(operation) = input else {
        return Err(ShapeError::UnexpectedNode {
            expected: "set operation",
            found: input.kind(),
        }
        .into());
    };
    pairing_parts(operation)
}

fn pairing_parts(operation: &Operation) -> RewriteResult<(PairingOp, &RelExpr, &RelExpr)> {
    let Some(op) = operation.pairing_op() else {
        return Err(ShapeError::UnexpectedNode {
            expected: "set operation",
            found: "arithmetic operation",
        }
        .into());
    };
    let Some((lhs, rhs)) = operation.rel_operands() else {
        return Err(ShapeError::UnexpectedNode {
            expected: "set operation over subtrees",
            found: "operation",
        }
        .into());
    };
    Ok((op, lhs, rhs))
}

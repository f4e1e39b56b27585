//! Conditionals and scalar/set operations

use crate::ir::column::{AggregateCall, Column};
use crate::ir::rel::RelExpr;
use serde::Serialize;
use std::fmt;

/// Comparison and logical operators a conditional can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThetaOp {
    Eq,
    Neq,
    Leq,
    Geq,
    Lt,
    Gt,
    And,
    Or,
    In,
}

impl fmt::Display for ThetaOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThetaOp::Eq => write!(f, "="),
            ThetaOp::Neq => write!(f, "<>"),
            ThetaOp::Leq => write!(f, "<="),
            ThetaOp::Geq => write!(f, ">="),
            ThetaOp::Lt => write!(f, "<"),
            ThetaOp::Gt => write!(f, ">"),
            ThetaOp::And => write!(f, "AND"),
            ThetaOp::Or => write!(f, "OR"),
            ThetaOp::In => write!(f, "IN"),
        }
    }
}

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArithOp {
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
    /// String concatenation (||)
    Concat,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "+"),
            ArithOp::Sub => write!(f, "-"),
            ArithOp::Mul => write!(f, "*"),
            ArithOp::Div => write!(f, "/"),
            ArithOp::Concat => write!(f, "||"),
        }
    }
}

/// Set-pairing operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingOp {
    Union,
    Intersect,
    Except,
}

impl fmt::Display for PairingOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingOp::Union => write!(f, "union"),
            PairingOp::Intersect => write!(f, "intersect"),
            PairingOp::Except => write!(f, "except"),
        }
    }
}

/// What an `Operation` node computes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationKind {
    /// Scalar arithmetic over operand leaves
    Arith(ArithOp),
    /// A set operation over two relational subtrees
    Pairing(PairingOp),
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Arith(op) => write!(f, "{op}"),
            OperationKind::Pairing(op) => write!(f, "{op}"),
        }
    }
}

/// Operand of an `Operation`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OperationArg {
    Column(Column),
    Literal(String),
    Operation(Box<Operation>),
    /// Relational operand of a set pairing
    Rel(Box<RelExpr>),
}

impl fmt::Display for OperationArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationArg::Column(column) => write!(f, "{column}"),
            OperationArg::Literal(text) => write!(f, "{text}"),
            OperationArg::Operation(op) => write!(f, "({op})"),
            OperationArg::Rel(_) => write!(f, "<relation>"),
        }
    }
}

/// Binary arithmetic or set-pairing node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub op: OperationKind,
    pub lhs: OperationArg,
    pub rhs: OperationArg,
}

impl Operation {
    /// A set pairing over two relational subtrees
    pub fn pairing(op: PairingOp, lhs: RelExpr, rhs: RelExpr) -> Self {
        Self {
            op: OperationKind::Pairing(op),
            lhs: OperationArg::Rel(Box::new(lhs)),
            rhs: OperationArg::Rel(Box::new(rhs)),
        }
    }

    /// The pairing operator, when this is a set operation
    pub fn pairing_op(&self) -> Option<PairingOp> {
        match self.op {
            OperationKind::Pairing(op) => Some(op),
            OperationKind::Arith(_) => None,
        }
    }

    /// Both relational operands, when this is a set operation over subtrees
    pub fn rel_operands(&self) -> Option<(&RelExpr, &RelExpr)> {
        match (&self.lhs, &self.rhs) {
            (OperationArg::Rel(lhs), OperationArg::Rel(rhs)) => Some((lhs, rhs)),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

/// Argument position of a conditional
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CondArg {
    Column(Column),
    Literal(String),
    Function(AggregateCall),
    Operation(Box<Operation>),
    Cond(Box<Conditional>),
}

impl fmt::Display for CondArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CondArg::Column(column) => write!(f, "{column}"),
            CondArg::Literal(text) => write!(f, "{text}"),
            CondArg::Function(call) => write!(f, "{call}"),
            CondArg::Operation(op) => write!(f, "({op})"),
            CondArg::Cond(cond) => write!(f, "({cond})"),
        }
    }
}

/// Right-hand side of a conditional. A list only ever appears under `IN`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CondRhs {
    Arg(Box<CondArg>),
    List(Vec<CondArg>),
}

/// A predicate over operands or nested conditionals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conditional {
    pub op: ThetaOp,
    pub lhs: Box<CondArg>,
    pub rhs: CondRhs,
}

impl Conditional {
    /// A simple binary comparison or logical connective
    pub fn comparison(op: ThetaOp, lhs: CondArg, rhs: CondArg) -> Self {
        Self {
            op,
            lhs: Box::new(lhs),
            rhs: CondRhs::Arg(Box::new(rhs)),
        }
    }

    /// An `IN` membership test over a literal list
    pub fn membership(lhs: CondArg, rhs: Vec<CondArg>) -> Self {
        Self {
            op: ThetaOp::In,
            lhs: Box::new(lhs),
            rhs: CondRhs::List(rhs),
        }
    }

    /// `lhs AND rhs` over two conditionals
    pub fn conjunction(lhs: Conditional, rhs: Conditional) -> Self {
        Self::comparison(
            ThetaOp::And,
            CondArg::Cond(Box::new(lhs)),
            CondArg::Cond(Box::new(rhs)),
        )
    }

    /// Both sides of a conjunction, when this is `AND` over two conditionals
    pub fn as_conjunction(&self) -> Option<(&Conditional, &Conditional)> {
        if self.op != ThetaOp::And {
            return None;
        }
        match (self.lhs.as_ref(), &self.rhs) {
            (CondArg::Cond(lhs), CondRhs::Arg(rhs)) => match rhs.as_ref() {
                CondArg::Cond(rhs) => Some((lhs, rhs)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rhs {
            CondRhs::Arg(rhs) => write!(f, "{} {} {}", self.lhs, self.op, rhs),
            CondRhs::List(items) => {
                write!(f, "{} IN (", self.lhs)?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(text: &str) -> CondArg {
        CondArg::Literal(text.to_string())
    }

    #[test]
    fn test_as_conjunction() {
        let eq = Conditional::comparison(ThetaOp::Eq, lit("a"), lit("b"));
        let gt = Conditional::comparison(ThetaOp::Gt, lit("c"), lit("5"));
        let both = Conditional::conjunction(eq.clone(), gt.clone());

        let (left, right) = both.as_conjunction().expect("conjunction expected");
        assert_eq!(left, &eq);
        assert_eq!(right, &gt);
        assert!(eq.as_conjunction().is_none());
    }

    #[test]
    fn test_display() {
        let cond = Conditional::comparison(ThetaOp::Leq, lit("a"), lit("10"));
        assert_eq!(cond.to_string(), "a <= 10");

        let membership = Conditional::membership(lit("x"), vec![lit("'S1'"), lit("'S2'")]);
        assert_eq!(membership.to_string(), "x IN ('S1', 'S2')");
    }
}

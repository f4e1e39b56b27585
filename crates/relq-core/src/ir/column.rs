//! Column references and aggregate calls

use crate::catalog;
use crate::catalog::RelationHandle;
use crate::ir::rel::RelExpr;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Aggregate function name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Avg,
    Count,
    Max,
    Min,
    Sum,
}

impl AggregateFunction {
    /// Lowercase function name
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Avg => "avg",
            AggregateFunction::Count => "count",
            AggregateFunction::Max => "max",
            AggregateFunction::Min => "min",
            AggregateFunction::Sum => "sum",
        }
    }

    /// Parse a function name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "avg" => Some(AggregateFunction::Avg),
            "count" => Some(AggregateFunction::Count),
            "max" => Some(AggregateFunction::Max),
            "min" => Some(AggregateFunction::Min),
            "sum" => Some(AggregateFunction::Sum),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Operand of an aggregate call: `*` (count only) or a column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AggregateArg {
    /// `count(*)`
    Star,
    /// A column operand
    Column(Box<Column>),
}

/// An aggregate function application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateCall {
    /// Which aggregate
    pub function: AggregateFunction,
    /// What it aggregates
    pub arg: AggregateArg,
    /// Subtree a `*` operand expands against during involvement analysis
    pub scope: Option<Box<RelExpr>>,
}

impl AggregateCall {
    /// New call with no `*` expansion scope attached
    pub fn new(function: AggregateFunction, arg: AggregateArg) -> Self {
        Self {
            function,
            arg,
            scope: None,
        }
    }

    /// Attach the subtree a `*` operand expands against
    pub fn with_scope(mut self, scope: RelExpr) -> Self {
        self.scope = Some(Box::new(scope));
        self
    }

    /// Derived output name: `fname_alias` when the operand carries an alias,
    /// the operand's base column name otherwise, `fname_*` for star.
    pub fn derived_name(&self) -> String {
        match &self.arg {
            AggregateArg::Star => format!("{}_*", self.function),
            AggregateArg::Column(column) => format!(
                "{}_{}",
                self.function,
                column.output_name().unwrap_or("column")
            ),
        }
    }
}

impl fmt::Display for AggregateCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            AggregateArg::Star => write!(f, "{}(*)", self.function),
            AggregateArg::Column(column) => write!(f, "{}({})", self.function, column),
        }
    }
}

/// What a column reference denotes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ColumnTarget {
    /// A base schema column
    Base(Arc<catalog::Column>),
    /// The output of an aggregate
    Aggregate(Box<AggregateCall>),
    /// An opaque literal
    Literal(String),
}

/// A column reference in the IR
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    /// Owning base relation; `None` for unqualified/derived targets
    pub relation: Option<RelationHandle>,
    /// What the reference denotes
    pub target: ColumnTarget,
    /// Output alias requested with `AS`
    pub alias: Option<String>,
}

impl Column {
    /// A reference to a base schema column of the given relation
    pub fn base(relation: RelationHandle, column: Arc<catalog::Column>) -> Self {
        Self {
            relation: Some(relation),
            target: ColumnTarget::Base(column),
            alias: None,
        }
    }

    /// A column carrying an aggregate result
    pub fn aggregate(call: AggregateCall) -> Self {
        Self {
            relation: None,
            target: ColumnTarget::Aggregate(Box::new(call)),
            alias: None,
        }
    }

    /// A column carrying an opaque literal
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            relation: None,
            target: ColumnTarget::Literal(text.into()),
            alias: None,
        }
    }

    /// The same column with an output alias
    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Owning relation and base column, when this references the schema
    pub fn base_parts(&self) -> Option<(&RelationHandle, &Arc<catalog::Column>)> {
        match (&self.relation, &self.target) {
            (Some(relation), ColumnTarget::Base(column)) => Some((relation, column)),
            _ => None,
        }
    }

    /// Name this column presents: the alias if one was requested, else the
    /// base column name. Aggregate and literal targets have no inherent name.
    pub fn output_name(&self) -> Option<&str> {
        if let Some(alias) = &self.alias {
            return Some(alias);
        }
        match &self.target {
            ColumnTarget::Base(column) => Some(column.name()),
            ColumnTarget::Aggregate(_) | ColumnTarget::Literal(_) => None,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            ColumnTarget::Base(column) => match &self.relation {
                Some(relation) => write!(f, "{}.{}", relation.name(), column.name()),
                None => write!(f, "{}", column.name()),
            },
            ColumnTarget::Aggregate(call) => write!(f, "{call}"),
            ColumnTarget::Literal(text) => write!(f, "{text}"),
        }
    }
}

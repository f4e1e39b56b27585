//! Per-statement name tables for relation and column resolution

use crate::error::TranslateError;
use indexmap::IndexMap;
use relq_core::catalog::{Catalog, RelationHandle};
use relq_core::{AggregateCall, Column, ResolutionError, SchemaError};

/// What a name in the statement resolved to
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolved {
    Column(Column),
    Function(AggregateCall),
    Literal(String),
}

/// A column alias waiting to be applied as a statement-wide Rename
#[derive(Debug, Clone)]
pub(crate) struct PendingRename {
    pub target: Resolved,
    pub output: String,
}

/// Registry of the relations and column aliases visible to one statement.
/// Built while the FROM clause translates, consulted by every later clause.
#[derive(Debug)]
pub(crate) struct Scope<'c> {
    catalog: &'c Catalog,
    relations: IndexMap<String, RelationHandle>,
    column_aliases: IndexMap<String, Vec<Resolved>>,
}

impl<'c> Scope<'c> {
    pub(crate) fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            relations: IndexMap::new(),
            column_aliases: IndexMap::new(),
        }
    }

    pub(crate) fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// Register a FROM relation under its own name. A relation appearing
    /// twice (self-join via aliases) reuses the handle already registered.
    pub(crate) fn register_relation(&mut self, name: &str) -> Result<RelationHandle, SchemaError> {
        if let Some(handle) = self.relations.get(name) {
            return Ok(handle.clone());
        }
        let handle = self.catalog.require(name)?.clone();
        self.relations.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    /// Register an alias for an already-registered relation
    pub(crate) fn register_alias(&mut self, alias: &str, handle: RelationHandle) {
        if self
            .relations
            .insert(alias.to_string(), handle)
            .is_some()
        {
            log::warn!("alias '{alias}' shadows an earlier relation registration");
        }
    }

    /// Record a column alias so later clauses can refer to it
    pub(crate) fn add_column_alias(&mut self, alias: &str, target: Resolved) {
        self.column_aliases
            .entry(alias.to_string())
            .or_default()
            .push(target);
    }

    /// Resolve a column reference, qualified or not.
    ///
    /// Qualified: the qualifier must be a registered relation or alias and
    /// the column must exist on its schema. Unqualified: column aliases are
    /// consulted first, then every registered relation's schema; anything
    /// other than exactly one match is an error.
    pub(crate) fn lookup(
        &self,
        column: &str,
        relation: Option<&str>,
    ) -> Result<Resolved, TranslateError> {
        if let Some(relation_name) = relation {
            let handle = self
                .relations
                .get(relation_name)
                .ok_or_else(|| SchemaError::UnknownRelation(relation_name.to_string()))?;
            let base = handle.column(column).ok_or_else(|| SchemaError::UnknownColumn {
                relation: handle.name().to_string(),
                column: column.to_string(),
            })?;
            return Ok(Resolved::Column(Column::base(handle.clone(), base.clone())));
        }

        if let Some(targets) = self.column_aliases.get(column) {
            if targets.len() > 1 {
                return Err(ResolutionError::AmbiguousColumn(column.to_string()).into());
            }
            return Ok(targets[0].clone());
        }

        // Search registered relations, deduplicated: a relation registered
        // under both its name and an alias counts once.
        let mut matches: Vec<Column> = Vec::new();
        for handle in self.relations.values() {
            let Some(base) = handle.column(column) else {
                continue;
            };
            let candidate = Column::base(handle.clone(), base.clone());
            if !matches.contains(&candidate) {
                matches.push(candidate);
            }
        }
        match matches.len() {
            0 => Err(ResolutionError::UnknownColumn(column.to_string()).into()),
            1 => Ok(Resolved::Column(matches.remove(0))),
            _ => Err(ResolutionError::AmbiguousColumn(column.to_string()).into()),
        }
    }
}

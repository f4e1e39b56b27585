//! Schema catalog — the static relation/column registry queries resolve against

use crate::error::SchemaError;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// A column declared in the catalog: a name and an uninterpreted type label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    name: String,
    type_label: String,
}

impl Column {
    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type label. Labels are opaque; nothing type-checks against them.
    pub fn type_label(&self) -> &str {
        &self.type_label
    }
}

/// A base relation: a name plus its ordered columns
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Relation {
    name: String,
    columns: IndexMap<String, Arc<Column>>,
}

impl Relation {
    /// Relation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Arc<Column>> {
        self.columns.get(name)
    }

    /// Whether the relation declares a column with this name
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Columns in declaration order
    pub fn columns(&self) -> impl Iterator<Item = &Arc<Column>> {
        self.columns.values()
    }
}

/// Shared handle to a catalog relation.
///
/// IR nodes hold these by reference; handle equality is schema identity
/// because relation names are unique within a catalog.
pub type RelationHandle = Arc<Relation>;

/// The full schema catalog. Immutable once constructed and safe to share
/// across concurrently running translations.
#[derive(Debug, Default, Serialize)]
pub struct Catalog {
    relations: IndexMap<String, RelationHandle>,
}

impl Catalog {
    /// Build a catalog from `(relation, [(column, type label)])` rows, the
    /// shape an external schema-definition parser produces.
    ///
    /// Duplicate relation or column names are rejected.
    pub fn from_definitions<'a, I>(definitions: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (&'a str, Vec<(&'a str, &'a str)>)>,
    {
        let mut relations = IndexMap::new();
        for (relation_name, columns) in definitions {
            let mut column_map = IndexMap::new();
            for (column_name, type_label) in columns {
                let column = Arc::new(Column {
                    name: column_name.to_string(),
                    type_label: type_label.to_string(),
                });
                if column_map.insert(column_name.to_string(), column).is_some() {
                    return Err(SchemaError::DuplicateColumn {
                        relation: relation_name.to_string(),
                        column: column_name.to_string(),
                    });
                }
            }
            let relation = Arc::new(Relation {
                name: relation_name.to_string(),
                columns: column_map,
            });
            if relations
                .insert(relation_name.to_string(), relation)
                .is_some()
            {
                return Err(SchemaError::DuplicateRelation(relation_name.to_string()));
            }
        }
        Ok(Self { relations })
    }

    /// Look up a relation by name
    pub fn relation(&self, name: &str) -> Option<&RelationHandle> {
        self.relations.get(name)
    }

    /// Look up a relation by name, or fail with `SchemaError::UnknownRelation`
    pub fn require(&self, name: &str) -> Result<&RelationHandle, SchemaError> {
        self.relations
            .get(name)
            .ok_or_else(|| SchemaError::UnknownRelation(name.to_string()))
    }

    /// Relations in declaration order
    pub fn relations(&self) -> impl Iterator<Item = &RelationHandle> {
        self.relations.values()
    }

    /// Number of relations
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Whether the catalog declares no relations
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sailors_catalog() -> Catalog {
        Catalog::from_definitions(vec![
            (
                "Sailors",
                vec![
                    ("sid", "integer"),
                    ("sname", "string"),
                    ("rating", "integer"),
                    ("age", "real"),
                ],
            ),
            (
                "Reserves",
                vec![("sid", "integer"), ("bid", "integer"), ("day", "date")],
            ),
        ])
        .expect("catalog should build")
    }

    #[test]
    fn test_lookup_relation_and_column() {
        let catalog = sailors_catalog();
        let sailors = catalog.relation("Sailors").expect("Sailors missing");
        assert_eq!(sailors.name(), "Sailors");
        assert_eq!(
            sailors.column("age").map(|c| c.type_label()),
            Some("real")
        );
        assert!(sailors.column("bid").is_none());
        assert!(catalog.relation("Boats").is_none());
    }

    #[test]
    fn test_require_unknown_relation() {
        let catalog = sailors_catalog();
        let err = catalog.require("Boats").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRelation(name) if name == "Boats"));
    }

    #[test]
    fn test_duplicate_relation_rejected() {
        let result = Catalog::from_definitions(vec![
            ("T", vec![("a", "integer")]),
            ("T", vec![("b", "integer")]),
        ]);
        assert!(matches!(result, Err(SchemaError::DuplicateRelation(_))));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result =
            Catalog::from_definitions(vec![("T", vec![("a", "integer"), ("a", "string")])]);
        assert!(matches!(result, Err(SchemaError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_handles_share_identity() {
        let catalog = sailors_catalog();
        let first = catalog.relation("Sailors").unwrap();
        let second = catalog.relation("Sailors").unwrap();
        assert!(Arc::ptr_eq(first, second));
    }
}

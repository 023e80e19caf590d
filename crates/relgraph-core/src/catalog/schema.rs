//! Schema registry - the immutable set of tables and relations.

use super::{Relation, Table};
use crate::error::SchemaError;
use std::collections::{HashMap, HashSet};

/// The relational schema the engine generates types from.
///
/// Tables are keyed by name. Relations are grouped by source table and keep
/// their declaration order, which decides field order on generated types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    tables: HashMap<String, Table>,
    relations: HashMap<String, Vec<Relation>>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the schema.
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Add a relation, appended to its source table's relation list.
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations
            .entry(relation.source.clone())
            .or_default()
            .push(relation);
        self
    }

    /// Look up a table by name.
    pub fn resolve_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Look up a table by name, failing with a schema error.
    pub fn table(&self, name: &str) -> Result<&Table, SchemaError> {
        self.resolve_table(name)
            .ok_or_else(|| SchemaError::TableNotFound(name.to_string()))
    }

    /// Outgoing relations of a table, in declaration order.
    pub fn relations_of(&self, name: &str) -> &[Relation] {
        self.relations.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up one relation of a table.
    pub fn relation(&self, table: &str, name: &str) -> Option<&Relation> {
        self.relations_of(table).iter().find(|r| r.name == name)
    }

    /// Table names in a stable (sorted) order.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Tables in a stable (sorted by name) order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.table_names()
            .into_iter()
            .filter_map(move |name| self.tables.get(name))
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check whether the schema has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Check structural soundness: every table has columns, every relation
    /// starts and ends at a known table, relation names are unique per table
    /// and do not shadow columns, and declared join columns exist.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for table in self.tables() {
            if table.columns.is_empty() {
                return Err(SchemaError::EmptyTable(table.name.clone()));
            }
        }

        let mut sources: Vec<&String> = self.relations.keys().collect();
        sources.sort_unstable();

        for source in sources {
            let table = self
                .resolve_table(source)
                .ok_or_else(|| SchemaError::UnknownRelationSource(source.clone()))?;

            let mut seen = HashSet::new();
            for relation in self.relations_of(source) {
                if !seen.insert(relation.name.as_str()) {
                    return Err(SchemaError::DuplicateRelation {
                        table: source.clone(),
                        relation: relation.name.clone(),
                    });
                }
                if table.has_column(&relation.name) {
                    return Err(SchemaError::RelationShadowsColumn {
                        table: source.clone(),
                        relation: relation.name.clone(),
                    });
                }

                let target = self.resolve_table(&relation.target).ok_or_else(|| {
                    SchemaError::DanglingRelation {
                        table: source.clone(),
                        relation: relation.name.clone(),
                        target: relation.target.clone(),
                    }
                })?;

                let unknown_join = |column: &String| SchemaError::UnknownJoinColumn {
                    table: source.clone(),
                    relation: relation.name.clone(),
                    column: column.clone(),
                };
                if let Some(from) = &relation.from_field {
                    if !table.has_column(from) {
                        return Err(unknown_join(from));
                    }
                }
                if let Some(to) = &relation.to_field {
                    if !target.has_column(to) {
                        return Err(unknown_join(to));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, ColumnKind};

    fn sample_schema() -> Schema {
        let users = Table::new("users")
            .with_column(Column::new("id", ColumnKind::int()).primary_key())
            .with_column(Column::new("name", ColumnKind::text()));
        let posts = Table::new("posts")
            .with_column(Column::new("id", ColumnKind::int()).primary_key())
            .with_column(Column::new("user_id", ColumnKind::int()))
            .with_column(Column::new("title", ColumnKind::text()));

        Schema::new()
            .with_table(users)
            .with_table(posts)
            .with_relation(Relation::many("posts", "users", "posts").on("id", "user_id"))
            .with_relation(Relation::one("author", "posts", "users").on("user_id", "id"))
    }

    #[test]
    fn test_registry_lookups() {
        let schema = sample_schema();

        assert!(schema.resolve_table("users").is_some());
        assert!(schema.resolve_table("nope").is_none());
        assert_eq!(
            schema.table("nope"),
            Err(SchemaError::TableNotFound("nope".into()))
        );
        assert_eq!(schema.relations_of("users").len(), 1);
        assert!(schema.relations_of("nope").is_empty());
        assert!(schema.relation("posts", "author").is_some());
        assert_eq!(schema.table_names(), vec!["posts", "users"]);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_empty_table_rejected() {
        let schema = sample_schema().with_table(Table::new("ghost"));
        assert_eq!(
            schema.validate(),
            Err(SchemaError::EmptyTable("ghost".into()))
        );
    }

    #[test]
    fn test_dangling_relation_rejected() {
        let schema = sample_schema().with_relation(Relation::one("owner", "posts", "accounts"));
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::DanglingRelation { ref target, .. }) if target == "accounts"
        ));
    }

    #[test]
    fn test_relation_checks() {
        let dup = sample_schema().with_relation(Relation::one("author", "posts", "users"));
        assert!(matches!(
            dup.validate(),
            Err(SchemaError::DuplicateRelation { .. })
        ));

        let shadow = sample_schema().with_relation(Relation::one("title", "posts", "users"));
        assert!(matches!(
            shadow.validate(),
            Err(SchemaError::RelationShadowsColumn { .. })
        ));

        let bad_join =
            sample_schema().with_relation(Relation::one("editor", "posts", "users").on("editor_id", "id"));
        assert!(matches!(
            bad_join.validate(),
            Err(SchemaError::UnknownJoinColumn { ref column, .. }) if column == "editor_id"
        ));

        let orphan = sample_schema().with_relation(Relation::one("x", "comments", "users"));
        assert_eq!(
            orphan.validate(),
            Err(SchemaError::UnknownRelationSource("comments".into()))
        );
    }
}

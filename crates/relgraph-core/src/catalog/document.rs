//! JSON schema documents.
//!
//! A document maps identifiers to either a table declaration or a relations
//! declaration for a table:
//!
//! ```json
//! {
//!   "users": { "kind": "table", "columns": [
//!     { "name": "id", "type": "serial", "primaryKey": true },
//!     { "name": "name", "type": "text" }
//!   ]},
//!   "usersRelations": { "kind": "relations", "table": "users", "relations": [
//!     { "name": "posts", "target": "posts", "cardinality": "many",
//!       "fields": "id", "references": "user_id" }
//!   ]}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::{Column, ColumnKind, DefaultValue, Relation, Schema, Table};
use crate::error::SchemaError;

/// A parsed schema document.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct SchemaDocument {
    entries: BTreeMap<String, SchemaEntry>,
}

/// One identifier of a schema document.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SchemaEntry {
    /// A table.
    Table(TableDecl),
    /// Relations owned by a table.
    Relations(RelationsDecl),
}

/// Table declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDecl {
    /// Table name; defaults to the identifier.
    #[serde(default)]
    pub name: Option<String>,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDecl>,
}

/// Column declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDecl {
    /// Column name.
    pub name: String,
    /// Storage kind, e.g. `bigint`, `varchar(64)`, `enum`, `text[]`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub generated: bool,
    #[serde(default)]
    pub auto_increment: bool,
    /// Literal default value.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// SQL default expression, e.g. `now()`.
    #[serde(default)]
    pub default_sql: Option<String>,
    /// Enum type name for `enum` columns; defaults to the column name.
    #[serde(default)]
    pub enum_name: Option<String>,
    /// Enum members for `enum` columns.
    #[serde(default)]
    pub values: Vec<String>,
}

/// Relations declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationsDecl {
    /// Owning table (identifier or table name).
    pub table: String,
    /// Relations in declaration order.
    pub relations: Vec<RelationDecl>,
}

/// One relation.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationDecl {
    /// Relation name.
    pub name: String,
    /// Target table (identifier or table name).
    pub target: String,
    /// `one` or `many`.
    pub cardinality: CardinalityDecl,
    /// Join column on the owning table.
    #[serde(default)]
    pub fields: Option<String>,
    /// Join column on the target table.
    #[serde(default)]
    pub references: Option<String>,
}

/// Declared cardinality.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardinalityDecl {
    One,
    Many,
}

impl SchemaDocument {
    /// Parse a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(text).map_err(|e| SchemaError::InvalidDocument(e.to_string()))
    }

    /// Read and parse a document from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::InvalidDocument(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Build the schema registry. The result is not validated yet.
    pub fn into_schema(self) -> Result<Schema, SchemaError> {
        // identifier -> table name
        let mut names: BTreeMap<&str, String> = BTreeMap::new();
        for (ident, entry) in &self.entries {
            if let SchemaEntry::Table(decl) = entry {
                let name = decl.name.clone().unwrap_or_else(|| ident.clone());
                names.insert(ident.as_str(), name);
            }
        }
        let resolve = |reference: &str| -> String {
            names
                .get(reference)
                .cloned()
                .unwrap_or_else(|| reference.to_string())
        };

        let mut schema = Schema::new();
        for (ident, entry) in &self.entries {
            match entry {
                SchemaEntry::Table(decl) => {
                    let columns = decl
                        .columns
                        .iter()
                        .map(ColumnDecl::to_column)
                        .collect::<Result<Vec<_>, _>>()?;
                    schema = schema.with_table(Table::new(resolve(ident)).with_columns(columns));
                }
                SchemaEntry::Relations(decl) => {
                    let source = resolve(&decl.table);
                    for rel in &decl.relations {
                        let mut relation = match rel.cardinality {
                            CardinalityDecl::One => {
                                Relation::one(&rel.name, source.clone(), resolve(&rel.target))
                            }
                            CardinalityDecl::Many => {
                                Relation::many(&rel.name, source.clone(), resolve(&rel.target))
                            }
                        };
                        relation.from_field = rel.fields.clone();
                        relation.to_field = rel.references.clone();
                        schema = schema.with_relation(relation);
                    }
                }
            }
        }

        Ok(schema)
    }
}

impl ColumnDecl {
    fn kind(&self) -> ColumnKind {
        let mut base = self.kind.trim();
        let mut dims = 0;
        while let Some(inner) = base.strip_suffix("[]") {
            base = inner.trim_end();
            dims += 1;
        }

        let mut kind = if base.eq_ignore_ascii_case("enum") {
            ColumnKind::Enum {
                name: self.enum_name.clone().unwrap_or_else(|| self.name.clone()),
                values: self.values.clone(),
            }
        } else {
            ColumnKind::parse(base)
        };
        for _ in 0..dims {
            kind = ColumnKind::Array(Box::new(kind));
        }
        kind
    }

    fn default_value(&self) -> Result<Option<DefaultValue>, SchemaError> {
        if self.auto_increment {
            return Ok(Some(DefaultValue::AutoIncrement));
        }
        if let Some(sql) = &self.default_sql {
            let lowered = sql.trim().to_ascii_lowercase();
            return Ok(Some(match lowered.as_str() {
                "now()" | "current_timestamp" | "current_timestamp()" => {
                    DefaultValue::CurrentTimestamp
                }
                _ => DefaultValue::Expression(sql.clone()),
            }));
        }
        let Some(value) = &self.default else {
            return Ok(None);
        };
        let default = match value {
            serde_json::Value::Null => DefaultValue::Null,
            serde_json::Value::Bool(b) => DefaultValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => DefaultValue::Int(i),
                None => DefaultValue::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => DefaultValue::String(s.clone()),
            other => {
                return Err(SchemaError::InvalidDocument(format!(
                    "column '{}': unsupported default {}",
                    self.name, other
                )))
            }
        };
        Ok(Some(default))
    }

    fn to_column(&self) -> Result<Column, SchemaError> {
        let mut column = Column::new(&self.name, self.kind());
        column.nullable = self.nullable && !self.primary_key;
        column.primary_key = self.primary_key;
        column.unique = self.unique;
        column.generated = self.generated;
        column.default = self.default_value()?;
        Ok(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BLOG: &str = r#"{
        "users": { "kind": "table", "columns": [
            { "name": "id", "type": "serial", "primaryKey": true, "autoIncrement": true },
            { "name": "name", "type": "text" },
            { "name": "role", "type": "enum", "enumName": "role", "values": ["admin", "user"], "default": "user" }
        ]},
        "postsTable": { "kind": "table", "name": "posts", "columns": [
            { "name": "id", "type": "integer", "primaryKey": true },
            { "name": "user_id", "type": "integer" },
            { "name": "tags", "type": "text[]", "nullable": true },
            { "name": "created_at", "type": "timestamptz", "defaultSql": "now()" }
        ]},
        "usersRelations": { "kind": "relations", "table": "users", "relations": [
            { "name": "posts", "target": "postsTable", "cardinality": "many", "fields": "id", "references": "user_id" }
        ]},
        "postsRelations": { "kind": "relations", "table": "posts", "relations": [
            { "name": "author", "target": "users", "cardinality": "one", "fields": "user_id", "references": "id" }
        ]}
    }"#;

    #[test]
    fn test_document_to_schema() {
        let schema = SchemaDocument::from_json(BLOG)
            .unwrap()
            .into_schema()
            .unwrap();
        schema.validate().unwrap();

        let users = schema.table("users").unwrap();
        let role = users.get_column("role").unwrap();
        assert_eq!(role.kind, ColumnKind::enumeration("role", &["admin", "user"]));
        assert_eq!(role.default, Some(DefaultValue::String("user".into())));
        assert_eq!(
            users.get_column("id").unwrap().default,
            Some(DefaultValue::AutoIncrement)
        );

        let posts = schema.table("posts").unwrap();
        assert_eq!(
            posts.get_column("tags").unwrap().kind,
            ColumnKind::array(ColumnKind::text())
        );
        assert_eq!(
            posts.get_column("created_at").unwrap().default,
            Some(DefaultValue::CurrentTimestamp)
        );

        let rel = schema.relation("users", "posts").unwrap();
        assert_eq!(rel.target, "posts");
        assert!(rel.is_many());
    }

    #[test]
    fn test_invalid_document() {
        let err = SchemaDocument::from_json(r#"{"x": {"kind": "view"}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDocument(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BLOG.as_bytes()).unwrap();

        let schema = SchemaDocument::load(file.path())
            .unwrap()
            .into_schema()
            .unwrap();
        assert_eq!(schema.len(), 2);
    }
}

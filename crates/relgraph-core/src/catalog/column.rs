//! Column definitions for tables.

use super::types::ColumnKind;

/// A column definition within a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Storage kind.
    pub kind: ColumnKind,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Whether the column carries a unique constraint.
    pub unique: bool,
    /// Default value if not provided on insert.
    pub default: Option<DefaultValue>,
    /// Whether the database computes the value (never written by clients).
    pub generated: bool,
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
    /// Current timestamp (evaluated at insert time).
    CurrentTimestamp,
    /// Auto-incrementing sequence.
    AutoIncrement,
    /// Database expression (evaluated at insert time).
    Expression(String),
}

impl Column {
    /// Create a new non-null column.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            primary_key: false,
            unique: false,
            default: None,
            generated: false,
        }
    }

    /// Create a nullable column.
    pub fn nullable(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            nullable: true,
            ..Self::new(name, kind)
        }
    }

    /// Mark as primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Mark as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark as database-generated.
    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// Check if this column has a default value.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Whether inserts must provide a value for this column.
    pub fn is_required_on_insert(&self) -> bool {
        !self.nullable && !self.has_default() && !self.generated
    }

    /// Whether clients may write this column at all.
    pub fn is_writable(&self) -> bool {
        !self.generated
    }

    /// Whether the column identifies a row (primary key or unique).
    pub fn is_identity(&self) -> bool {
        self.primary_key || self.unique
    }
}

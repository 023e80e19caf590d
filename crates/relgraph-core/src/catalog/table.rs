//! Table definitions.

use super::column::Column;

/// A table definition: a name and an ordered list of columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Table name (unique within schema).
    pub name: String,
    /// Column definitions, in declaration order.
    pub columns: Vec<Column>,
}

impl Table {
    /// Create a new table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column to the table.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Add multiple columns.
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Get a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// The column used as the minimal projection: the first primary key
    /// column, else the first unique column, else the first column.
    pub fn identity_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .or_else(|| self.columns.iter().find(|c| c.unique))
            .or_else(|| self.columns.first())
    }

    /// Columns clients may write.
    pub fn writable_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_writable())
    }

    /// Columns that identify a row, used for insert conflict detection.
    pub fn identity_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_identity())
    }
}

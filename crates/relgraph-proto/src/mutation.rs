//! Mutation IR types for write operations.

use crate::query::FilterExpr;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A field name and value pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Field name.
    pub field: String,
    /// Field value.
    pub value: Value,
}

impl FieldValue {
    /// Create a new field-value pair.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// What to do when an inserted row conflicts with an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictAction {
    /// Skip the conflicting row; it is omitted from the returned rows.
    #[default]
    DoNothing,
    /// Fail the statement.
    Error,
}

/// Insert one or more rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    /// Target table.
    pub table: String,
    /// Rows to insert. Each row lists only the provided fields.
    pub rows: Vec<Vec<FieldValue>>,
    /// Columns to return for each inserted row; `None` requests no rows back.
    pub returning: Option<Vec<String>>,
    /// Conflict handling.
    pub on_conflict: ConflictAction,
}

/// Update rows matching a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    /// Target table.
    pub table: String,
    /// Fields to set. Never empty when produced by the engine.
    pub set: Vec<FieldValue>,
    /// Rows to affect; `None` affects every row.
    pub filter: Option<FilterExpr>,
    /// Columns to return for each updated row.
    pub returning: Option<Vec<String>>,
}

/// Delete rows matching a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    /// Target table.
    pub table: String,
    /// Rows to delete; `None` deletes every row.
    pub filter: Option<FilterExpr>,
    /// Columns to return for each deleted row.
    pub returning: Option<Vec<String>>,
}

/// Any write statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Insert rows.
    Insert(InsertStatement),
    /// Update rows.
    Update(UpdateStatement),
    /// Delete rows.
    Delete(DeleteStatement),
}

impl Mutation {
    /// Table the mutation writes to.
    pub fn table(&self) -> &str {
        match self {
            Mutation::Insert(s) => &s.table,
            Mutation::Update(s) => &s.table,
            Mutation::Delete(s) => &s.table,
        }
    }

    /// Whether the mutation asks for rows back.
    pub fn is_returning(&self) -> bool {
        match self {
            Mutation::Insert(s) => s.returning.is_some(),
            Mutation::Update(s) => s.returning.is_some(),
            Mutation::Delete(s) => s.returning.is_some(),
        }
    }
}

impl From<InsertStatement> for Mutation {
    fn from(s: InsertStatement) -> Self {
        Mutation::Insert(s)
    }
}

impl From<UpdateStatement> for Mutation {
    fn from(s: UpdateStatement) -> Self {
        Mutation::Update(s)
    }
}

impl From<DeleteStatement> for Mutation {
    fn from(s: DeleteStatement) -> Self {
        Mutation::Delete(s)
    }
}

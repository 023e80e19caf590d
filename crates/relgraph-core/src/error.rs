//! Core error types.
//!
//! Errors are split by when they can happen: [`SchemaError`] while the type
//! set is generated, [`ArgumentError`] while a request is validated and
//! compiled, [`ExecutionError`] when the executor rejects a compiled query.

use thiserror::Error;

/// Malformed or incomplete schema. Fatal at generation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A referenced table does not exist.
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// A table declares no columns.
    #[error("table '{0}' has no columns")]
    EmptyTable(String),

    /// A relation points at a table missing from the schema.
    #[error("relation '{relation}' on table '{table}' targets unknown table '{target}'")]
    DanglingRelation {
        table: String,
        relation: String,
        target: String,
    },

    /// Relations were declared for a table missing from the schema.
    #[error("relations declared for unknown table '{0}'")]
    UnknownRelationSource(String),

    /// A relation's join column does not exist.
    #[error("relation '{relation}' on table '{table}' joins on unknown column '{column}'")]
    UnknownJoinColumn {
        table: String,
        relation: String,
        column: String,
    },

    /// A relation name is declared twice on the same table.
    #[error("relation '{relation}' is declared more than once on table '{table}'")]
    DuplicateRelation { table: String, relation: String },

    /// A relation has the same name as a column of its source table.
    #[error("relation '{relation}' on table '{table}' collides with a column of the same name")]
    RelationShadowsColumn { table: String, relation: String },

    /// A column uses a storage kind the mapper cannot represent.
    #[error("column '{column}' of table '{table}' has unsupported storage kind '{kind}'")]
    UnsupportedColumnKind {
        table: String,
        column: String,
        kind: String,
    },

    /// An enum column declares no members.
    #[error("enum column '{column}' of table '{table}' declares no values")]
    EmptyEnum { table: String, column: String },

    /// Two different definitions were generated under the same name.
    #[error("generated name '{name}' collides: {detail}")]
    NameCollision { name: String, detail: String },

    /// The schema document could not be read.
    #[error("invalid schema document: {0}")]
    InvalidDocument(String),
}

/// Invalid request arguments. The request is aborted before any query runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// A field name that the input type does not declare.
    #[error("{path}: unknown field '{field}'")]
    UnknownField { path: String, field: String },

    /// A value of the wrong shape or kind.
    #[error("{path}: expected {expected}, found {found}")]
    InvalidValue {
        path: String,
        expected: String,
        found: String,
    },

    /// A required argument is missing.
    #[error("{path}: missing required value")]
    Missing { path: String },

    /// Insert called with an empty list of values.
    #[error("{operation}: no values to insert")]
    EmptyInsert { operation: String },

    /// Update called without any field to set.
    #[error("{operation}: no fields to update")]
    EmptyUpdate { operation: String },

    /// The requested operation does not exist.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// The request document is malformed.
    #[error("{path}: {message}")]
    Invalid { path: String, message: String },
}

impl ArgumentError {
    /// Create an invalid-value error.
    pub fn invalid_value(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: &serde_json::Value,
    ) -> Self {
        ArgumentError::InvalidValue {
            path: path.into(),
            expected: expected.into(),
            found: describe_json(found).to_string(),
        }
    }

    /// Create an unknown-field error.
    pub fn unknown_field(path: impl Into<String>, field: impl Into<String>) -> Self {
        ArgumentError::UnknownField {
            path: path.into(),
            field: field.into(),
        }
    }

    /// Create a free-form error.
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        ArgumentError::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Short description of a JSON value's kind, for error messages.
pub fn describe_json(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}

/// The executor rejected or failed a compiled query.
///
/// The original message is preserved verbatim; these errors are never
/// retried.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExecutionError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ExecutionError {
    /// Create an execution error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, keeping its message.
    pub fn wrap<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// The original message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Any engine error.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Argument error.
    #[error("argument error: {0}")]
    Argument(#[from] ArgumentError),

    /// Execution error.
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),
}

impl Error {
    /// Machine-readable error code used at the response boundary.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Schema(_) => "SCHEMA_ERROR",
            Error::Argument(_) => "ARGUMENT_ERROR",
            Error::Execution(_) => "EXECUTION_ERROR",
        }
    }
}

//! Engine configuration.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::SchemaError;

/// Default depth limit for nested relation types. `None` is unlimited.
pub const DEFAULT_RELATIONS_DEPTH_LIMIT: Option<usize> = None;

/// What mutations return to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationResponse {
    /// The affected rows, as `<Table>Item` objects.
    #[default]
    Returning,
    /// A `MutationSuccess { isSuccess }` flag, for storage that cannot
    /// report the contents of affected rows.
    Success,
}

/// Handling of inserted rows that conflict with an existing primary key or
/// unique value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Drop the conflicting row from the insert and from the response.
    #[default]
    Skip,
    /// Fail the whole insert.
    Error,
}

/// SQL dialect presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Sqlite,
    MySql,
}

impl Dialect {
    /// Mutation response mode the dialect supports.
    pub fn mutation_response(&self) -> MutationResponse {
        match self {
            Dialect::Postgres | Dialect::Sqlite => MutationResponse::Returning,
            Dialect::MySql => MutationResponse::Success,
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            "mysql" => Ok(Dialect::MySql),
            other => Err(format!("unknown dialect '{}'", other)),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum relation hops in generated select types. `Some(0)` disables
    /// relation fields; `None` is bounded only by cycle detection.
    pub relations_depth_limit: Option<usize>,

    /// Response shape of mutations.
    pub mutation_response: MutationResponse,

    /// Insert conflict handling for tables without an override.
    pub conflict_policy: ConflictPolicy,

    /// Per-table insert conflict handling.
    pub table_conflict_policies: HashMap<String, ConflictPolicy>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            relations_depth_limit: DEFAULT_RELATIONS_DEPTH_LIMIT,
            mutation_response: MutationResponse::default(),
            conflict_policy: ConflictPolicy::default(),
            table_conflict_policies: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration for a dialect.
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self::default().with_mutation_response(dialect.mutation_response())
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(text)
            .map_err(|e| SchemaError::InvalidDocument(format!("engine config: {}", e)))
    }

    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::InvalidDocument(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Set the relation depth limit.
    pub fn with_relations_depth_limit(mut self, limit: Option<usize>) -> Self {
        self.relations_depth_limit = limit;
        self
    }

    /// Set the mutation response mode.
    pub fn with_mutation_response(mut self, mode: MutationResponse) -> Self {
        self.mutation_response = mode;
        self
    }

    /// Set the default conflict policy.
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Override the conflict policy for one table.
    pub fn with_table_conflict_policy(
        mut self,
        table: impl Into<String>,
        policy: ConflictPolicy,
    ) -> Self {
        self.table_conflict_policies.insert(table.into(), policy);
        self
    }

    /// Conflict policy in effect for a table.
    pub fn conflict_policy_for(&self, table: &str) -> ConflictPolicy {
        self.table_conflict_policies
            .get(table)
            .copied()
            .unwrap_or(self.conflict_policy)
    }
}

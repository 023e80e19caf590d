//! The engine facade.
//!
//! An [`Engine`] is built once per schema load. It owns the generated types
//! and operations and is immutable afterwards, so one engine can serve any
//! number of concurrent requests behind an `Arc`.

use serde_json::{Map, Value as Json};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::catalog::Schema;
use crate::config::EngineConfig;
use crate::error::{ArgumentError, Error, ExecutionError, SchemaError};
use crate::executor::Executor;
use crate::operations::{
    compile_operation, CompiledOperation, Operation, OperationArgs, Request, ResponsePlan,
};
use crate::remap::{remap_optional, remap_rows, remap_success};
use crate::selection::Selection;
use crate::types::{generate, GeneratedSchema};

/// Schema-driven query engine.
#[derive(Debug, Clone)]
pub struct Engine {
    schema: Arc<Schema>,
    config: Arc<EngineConfig>,
    generated: Arc<GeneratedSchema>,
}

impl Engine {
    /// Generate types and operations for a schema.
    pub fn new(schema: Schema, config: EngineConfig) -> Result<Self, SchemaError> {
        let generated = generate(&schema, &config)?;
        info!(
            tables = schema.len(),
            operations = generated.operations().len(),
            "engine ready"
        );
        Ok(Self {
            schema: Arc::new(schema),
            config: Arc::new(config),
            generated: Arc::new(generated),
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn generated(&self) -> &GeneratedSchema {
        &self.generated
    }

    /// Look up an operation by name.
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.generated.operation(name)
    }

    /// The generated schema as GraphQL SDL.
    pub fn sdl(&self) -> String {
        self.generated.sdl()
    }

    /// Compile an operation without running it.
    pub fn compile(
        &self,
        operation: &str,
        args: &Map<String, Json>,
        selection: &Selection,
    ) -> Result<CompiledOperation, ArgumentError> {
        let operation = self
            .generated
            .operation(operation)
            .ok_or_else(|| ArgumentError::UnknownOperation(operation.to_string()))?;
        let args = OperationArgs::parse(operation, args)?;
        compile_operation(&self.generated, &self.config, operation, args, selection)
    }

    /// Compile and run an operation, returning the response value.
    ///
    /// The executor is called exactly once, and only after compilation
    /// succeeded.
    #[instrument(level = "debug", skip(self, executor, args, selection))]
    pub async fn execute<E>(
        &self,
        executor: &E,
        operation: &str,
        args: &Map<String, Json>,
        selection: &Selection,
    ) -> Result<Json, Error>
    where
        E: Executor + ?Sized,
    {
        let compiled = self.compile(operation, args, selection)?;
        debug!(operation = %compiled.name, table = %compiled.table, "executing");
        Ok(self.run(executor, compiled).await?)
    }

    /// Run an already compiled operation.
    pub async fn run<E>(&self, executor: &E, compiled: CompiledOperation) -> Result<Json, ExecutionError>
    where
        E: Executor + ?Sized,
    {
        let CompiledOperation {
            name,
            request,
            response,
            ..
        } = compiled;

        match request {
            Request::Select(query) => {
                debug!(operation = %name, table = %query.table, depth = query.depth(), "select compiled");
                let rows = executor.select(query).await?;
                debug!(operation = %name, rows = rows.len(), "select returned");
                match &response {
                    ResponsePlan::List(plan) => remap_rows(&self.generated, &plan.output, &rows),
                    ResponsePlan::Single(plan) => {
                        remap_optional(&self.generated, &plan.output, rows.first())
                    }
                    ResponsePlan::Success(output) => Ok(remap_success(output, true)),
                }
            }
            Request::Mutate(mutation) => {
                let result = executor.mutate(mutation).await?;
                debug!(operation = %name, affected = result.affected, "mutation applied");
                match &response {
                    ResponsePlan::Success(output) => Ok(remap_success(output, true)),
                    ResponsePlan::List(plan) | ResponsePlan::Single(plan) => {
                        let rows = result.rows.ok_or_else(|| {
                            ExecutionError::new(format!(
                                "executor returned no rows for '{}'",
                                name
                            ))
                        })?;
                        if matches!(response, ResponsePlan::Single(_)) {
                            remap_optional(&self.generated, &plan.output, rows.first())
                        } else {
                            remap_rows(&self.generated, &plan.output, &rows)
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, ColumnKind, Table};
    use crate::memory::MemoryExecutor;
    use serde_json::json;

    fn engine() -> Engine {
        let schema = Schema::new().with_table(
            Table::new("tags")
                .with_column(Column::new("id", ColumnKind::int()).primary_key())
                .with_column(Column::new("label", ColumnKind::text())),
        );
        Engine::new(schema, EngineConfig::new()).unwrap()
    }

    fn args(value: Json) -> Map<String, Json> {
        match value {
            Json::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn test_unknown_operation() {
        let err = engine()
            .compile("nope", &Map::new(), &Selection::of(&["id"]))
            .unwrap_err();
        assert_eq!(err, ArgumentError::UnknownOperation("nope".into()));
    }

    #[tokio::test]
    async fn test_insert_then_select_single() {
        let engine = engine();
        let executor = MemoryExecutor::new(engine.schema().clone());

        let inserted = engine
            .execute(
                &executor,
                "insertIntoTagsSingle",
                &args(json!({"values": {"id": 1, "label": "rust"}})),
                &Selection::of(&["id", "label"]),
            )
            .await
            .unwrap();
        assert_eq!(inserted, json!({"id": 1, "label": "rust"}));

        let found = engine
            .execute(
                &executor,
                "tagsSingle",
                &args(json!({"where": {"label": {"eq": "go"}}})),
                &Selection::of(&["id"]),
            )
            .await
            .unwrap();
        assert_eq!(found, Json::Null);
    }
}

//! The executor seam.
//!
//! The engine never talks to storage itself. It compiles every operation into
//! one [`SelectQuery`] (with nested relation includes) or one mutation
//! statement and hands it to an [`Executor`]. Implementations own
//! connections, transactions, timeouts and cancellation; the engine neither
//! retries nor batches.

use async_trait::async_trait;
use relgraph_proto::{
    DeleteStatement, InsertStatement, Mutation, MutationResult, Row, SelectQuery, UpdateStatement,
};
use std::sync::Arc;

use crate::error::ExecutionError;

/// Runs compiled queries and mutations.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a select. Each returned row carries the projected columns and one
    /// nested result per requested relation include.
    async fn select(&self, query: SelectQuery) -> Result<Vec<Row>, ExecutionError>;

    /// Insert rows. Rows skipped because of a conflict are left out of the
    /// returned rows.
    async fn insert(&self, statement: InsertStatement) -> Result<MutationResult, ExecutionError>;

    /// Update the rows matching the statement's filter.
    async fn update(&self, statement: UpdateStatement) -> Result<MutationResult, ExecutionError>;

    /// Delete the rows matching the statement's filter.
    async fn delete(&self, statement: DeleteStatement) -> Result<MutationResult, ExecutionError>;

    /// Dispatch any mutation statement.
    async fn mutate(&self, mutation: Mutation) -> Result<MutationResult, ExecutionError> {
        match mutation {
            Mutation::Insert(statement) => self.insert(statement).await,
            Mutation::Update(statement) => self.update(statement).await,
            Mutation::Delete(statement) => self.delete(statement).await,
        }
    }
}

#[async_trait]
impl<E: Executor + ?Sized> Executor for Arc<E> {
    async fn select(&self, query: SelectQuery) -> Result<Vec<Row>, ExecutionError> {
        (**self).select(query).await
    }

    async fn insert(&self, statement: InsertStatement) -> Result<MutationResult, ExecutionError> {
        (**self).insert(statement).await
    }

    async fn update(&self, statement: UpdateStatement) -> Result<MutationResult, ExecutionError> {
        (**self).update(statement).await
    }

    async fn delete(&self, statement: DeleteStatement) -> Result<MutationResult, ExecutionError> {
        (**self).delete(statement).await
    }
}

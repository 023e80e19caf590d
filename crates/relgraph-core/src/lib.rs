//! relgraph Core - Schema-driven GraphQL type generation and query compilation.
//!
//! This crate turns a relational schema (tables, columns, enums, relations)
//! into a GraphQL type system with filter, order and mutation inputs, and
//! compiles incoming operations into executor-neutral queries from
//! `relgraph-proto`. Storage is never touched directly: an [`Executor`] runs
//! what the engine compiles.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod filter;
pub mod memory;
pub mod operations;
pub mod order;
pub mod remap;
pub mod request;
pub mod scalar;
pub mod selection;
pub mod types;

pub use catalog::{
    Cardinality, Column, ColumnKind, DefaultValue, Relation, Schema, SchemaDocument, Table,
};
pub use config::{ConflictPolicy, Dialect, EngineConfig, MutationResponse};
pub use engine::Engine;
pub use error::{ArgumentError, Error, ExecutionError, SchemaError};
pub use executor::Executor;
pub use memory::MemoryExecutor;
pub use operations::{
    CompiledOperation, Operation, OperationArgs, OperationKind, Request, ResponsePlan,
};
pub use request::{parse_document, DocumentKind, DocumentRequest, ParsedDocument};
pub use selection::{SelectedField, Selection};
pub use types::{generate, GeneratedSchema, TypeRef, TypeRegistry};

/// Re-export protocol types.
pub use relgraph_proto as proto;

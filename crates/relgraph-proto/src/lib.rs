//! relgraph executor protocol types.
//!
//! This crate defines the intermediate representation the engine hands to a
//! query executor, and the rows the executor hands back.
//!
//! # Modules
//!
//! - [`value`] - Runtime value types for predicates, payloads and results
//! - [`query`] - Select queries with predicates, ordering and nested relations
//! - [`mutation`] - Insert, update and delete statements
//! - [`result`] - Result rows and mutation results
//!
//! All types derive `serde::Serialize` and `serde::Deserialize`, so executors
//! living in another process can receive them as JSON.

pub mod mutation;
pub mod query;
pub mod result;
pub mod value;

// Re-export commonly used types at crate root
pub use mutation::{
    ConflictAction, DeleteStatement, FieldValue, InsertStatement, Mutation, UpdateStatement,
};
pub use query::{FilterExpr, OrderDirection, OrderSpec, RelationInclude, SelectQuery};
pub use result::{MutationResult, Nested, Row};
pub use value::Value;

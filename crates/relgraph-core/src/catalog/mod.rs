//! Relational schema catalog.
//!
//! The catalog holds the tables, columns and relations types are generated
//! from. A [`Schema`] is built once and never mutated afterwards.

mod column;
mod document;
mod relation;
mod schema;
mod table;
mod types;

pub use column::{Column, DefaultValue};
pub use document::{
    CardinalityDecl, ColumnDecl, RelationDecl, RelationsDecl, SchemaDocument, SchemaEntry, TableDecl,
};
pub use relation::{Cardinality, Relation};
pub use schema::Schema;
pub use table::Table;
pub use types::ColumnKind;

//! Result types returned by the executor.

use crate::mutation::FieldValue;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A single result row.
///
/// Column values are kept in projection order. Relation sub-results are keyed
/// by relation name; a relation the executor did not load at all is simply
/// absent from `relations`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    /// Column values.
    pub fields: Vec<FieldValue>,
    /// Nested relation results.
    pub relations: Vec<(String, Nested)>,
}

/// Nested result for one relation of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Nested {
    /// Singular relation: the related row, or `None` when nothing matched.
    Single(Option<Box<Row>>),
    /// Plural relation: the related rows.
    List(Vec<Row>),
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column value.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push(FieldValue::new(field, value));
        self
    }

    /// Attach a relation sub-result.
    pub fn with_relation(mut self, name: impl Into<String>, nested: Nested) -> Self {
        self.relations.push((name.into(), nested));
        self
    }

    /// Get a column value by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|fv| fv.field == field)
            .map(|fv| &fv.value)
    }

    /// Get a relation sub-result by name.
    pub fn relation(&self, name: &str) -> Option<&Nested> {
        self.relations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, nested)| nested)
    }
}

impl Nested {
    /// A singular relation with a matching row.
    pub fn one(row: Row) -> Self {
        Nested::Single(Some(Box::new(row)))
    }

    /// A singular relation without a matching row.
    pub fn none() -> Self {
        Nested::Single(None)
    }

    /// Number of rows carried.
    pub fn len(&self) -> usize {
        match self {
            Nested::Single(row) => usize::from(row.is_some()),
            Nested::List(rows) => rows.len(),
        }
    }

    /// Check whether no rows are carried.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a mutation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MutationResult {
    /// Number of affected rows.
    pub affected: u64,
    /// Returned rows, when the statement asked for them.
    pub rows: Option<Vec<Row>>,
}

impl MutationResult {
    /// Create a result reporting only the affected count.
    pub fn affected(count: u64) -> Self {
        Self {
            affected: count,
            rows: None,
        }
    }

    /// Create a result carrying the returned rows.
    pub fn returning(rows: Vec<Row>) -> Self {
        Self {
            affected: rows.len() as u64,
            rows: Some(rows),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_accessors() {
        let row = Row::new()
            .with("id", 1i64)
            .with("name", "Alice")
            .with_relation("posts", Nested::List(vec![Row::new().with("id", 10i64)]));

        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.relation("posts").map(Nested::len), Some(1));
        assert!(row.relation("author").is_none());
    }

    #[test]
    fn test_nested_len() {
        assert!(Nested::none().is_empty());
        assert_eq!(Nested::one(Row::new()).len(), 1);
        assert!(Nested::List(vec![]).is_empty());
    }

    #[test]
    fn test_mutation_result() {
        let result = MutationResult::returning(vec![Row::new(), Row::new()]);
        assert_eq!(result.affected, 2);
        assert_eq!(MutationResult::affected(3).rows, None);
    }
}

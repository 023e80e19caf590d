//! Relation definitions between tables.

/// Cardinality of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// At most one related row.
    One,
    /// Any number of related rows.
    Many,
}

impl Cardinality {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::One => "one",
            Cardinality::Many => "many",
        }
    }
}

/// A named, directed relation from a source table to a target table.
///
/// The join condition is resolved by the executor. `from_field`/`to_field`
/// describe it for executors that need it spelled out (the in-memory
/// executor does); the type generator never looks at them.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Relation name (unique per source table).
    pub name: String,
    /// Source table name.
    pub source: String,
    /// Target table name.
    pub target: String,
    /// Relation cardinality.
    pub cardinality: Cardinality,
    /// Join column on the source table.
    pub from_field: Option<String>,
    /// Join column on the target table.
    pub to_field: Option<String>,
}

impl Relation {
    /// Create a singular relation.
    pub fn one(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            cardinality: Cardinality::One,
            from_field: None,
            to_field: None,
        }
    }

    /// Create a plural relation.
    pub fn many(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            cardinality: Cardinality::Many,
            ..Self::one(name, source, target)
        }
    }

    /// Set the join columns.
    pub fn on(mut self, from_field: impl Into<String>, to_field: impl Into<String>) -> Self {
        self.from_field = Some(from_field.into());
        self.to_field = Some(to_field.into());
        self
    }

    /// Check if this relation yields a list.
    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }

    /// Join columns, when both are declared.
    pub fn join_fields(&self) -> Option<(&str, &str)> {
        match (&self.from_field, &self.to_field) {
            (Some(from), Some(to)) => Some((from.as_str(), to.as_str())),
            _ => None,
        }
    }
}

//! Query IR handed to the executor.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A select against one table, optionally loading nested relations.
///
/// Relation includes nest recursively: each include carries the full
/// query for the related table, so a single `SelectQuery` describes the
/// whole composed query the executor runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    /// Table to read from.
    pub table: String,
    /// Columns to project. Never empty when produced by the engine.
    pub columns: Vec<String>,
    /// Optional predicate.
    pub filter: Option<FilterExpr>,
    /// Ordering, applied in sequence.
    pub order_by: Vec<OrderSpec>,
    /// Rows to skip.
    pub offset: Option<u64>,
    /// Maximum rows to return.
    pub limit: Option<u64>,
    /// Relations to load alongside each row.
    pub with: Vec<RelationInclude>,
}

impl SelectQuery {
    /// Create a new query for a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec![],
            filter: None,
            order_by: vec![],
            offset: None,
            limit: None,
            with: vec![],
        }
    }

    /// Set the projected columns.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Add a projected column.
    pub fn select(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Set the predicate.
    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Add ordering.
    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order_by.push(order);
        self
    }

    /// Set the offset.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add a relation include.
    pub fn include(mut self, include: RelationInclude) -> Self {
        self.with.push(include);
        self
    }

    /// Find the include for a relation name.
    pub fn relation(&self, name: &str) -> Option<&RelationInclude> {
        self.with.iter().find(|i| i.relation == name)
    }

    /// Depth of the deepest include chain (0 when no relations are loaded).
    pub fn depth(&self) -> usize {
        self.with
            .iter()
            .map(|i| i.query.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

/// A relation loaded alongside the parent rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationInclude {
    /// Relation name on the parent table.
    pub relation: String,
    /// Query against the related table.
    pub query: SelectQuery,
}

impl RelationInclude {
    /// Create a new include.
    pub fn new(relation: impl Into<String>, query: SelectQuery) -> Self {
        Self {
            relation: relation.into(),
            query,
        }
    }
}

/// Predicate tree for filtering rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterExpr {
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field not equals value.
    Ne { field: String, value: Value },
    /// Field less than value.
    Lt { field: String, value: Value },
    /// Field less than or equal to value.
    Le { field: String, value: Value },
    /// Field greater than value.
    Gt { field: String, value: Value },
    /// Field greater than or equal to value.
    Ge { field: String, value: Value },
    /// Field is in a set of values.
    In { field: String, values: Vec<Value> },
    /// Field is not in a set of values.
    NotIn { field: String, values: Vec<Value> },
    /// Field is null.
    IsNull { field: String },
    /// Field is not null.
    IsNotNull { field: String },
    /// Field matches a LIKE pattern.
    Like { field: String, pattern: String },
    /// Field does not match a LIKE pattern.
    NotLike { field: String, pattern: String },
    /// Field matches a LIKE pattern, ignoring case.
    ILike { field: String, pattern: String },
    /// Field does not match a LIKE pattern, ignoring case.
    NotILike { field: String, pattern: String },
    /// All conditions must be true.
    And(Vec<FilterExpr>),
    /// At least one condition must be true.
    Or(Vec<FilterExpr>),
    /// The condition must be false.
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a not-equal filter.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than filter.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than filter.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an IN filter.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        FilterExpr::In {
            field: field.into(),
            values,
        }
    }

    /// Create an IS NULL filter.
    pub fn is_null(field: impl Into<String>) -> Self {
        FilterExpr::IsNull {
            field: field.into(),
        }
    }

    /// Create a LIKE filter.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        FilterExpr::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Negate an expression.
    pub fn not(expr: FilterExpr) -> Self {
        FilterExpr::Not(Box::new(expr))
    }

    /// Conjunction of the given expressions.
    ///
    /// Returns `None` for an empty list and the expression itself for a
    /// single element, so callers never build degenerate `And([])` nodes.
    pub fn all(mut exprs: Vec<FilterExpr>) -> Option<Self> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(FilterExpr::And(exprs)),
        }
    }

    /// Disjunction of the given expressions, collapsed like [`FilterExpr::all`].
    pub fn any(mut exprs: Vec<FilterExpr>) -> Option<Self> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(FilterExpr::Or(exprs)),
        }
    }
}

/// Order specification for sorting results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderSpec {
    /// Create an ascending order spec.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Create a descending order spec.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// Lowercase name as used in argument values.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_query() {
        let query = SelectQuery::new("users")
            .with_columns(vec!["id".into(), "name".into()])
            .with_filter(FilterExpr::eq("active", true))
            .with_order(OrderSpec::asc("name"))
            .with_limit(10);

        assert_eq!(query.table, "users");
        assert_eq!(query.columns.len(), 2);
        assert!(query.filter.is_some());
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.depth(), 0);
    }

    #[test]
    fn test_nested_includes() {
        let comments = SelectQuery::new("comments").select("id");
        let posts = SelectQuery::new("posts")
            .select("id")
            .include(RelationInclude::new("comments", comments));
        let query = SelectQuery::new("users")
            .select("id")
            .include(RelationInclude::new("posts", posts));

        assert_eq!(query.depth(), 2);
        assert!(query.relation("posts").is_some());
        assert!(query.relation("comments").is_none());
    }

    #[test]
    fn test_filter_collapsing() {
        assert_eq!(FilterExpr::all(vec![]), None);
        assert_eq!(
            FilterExpr::all(vec![FilterExpr::is_null("a")]),
            Some(FilterExpr::is_null("a"))
        );
        let both = FilterExpr::any(vec![FilterExpr::is_null("a"), FilterExpr::is_null("b")]);
        assert!(matches!(both, Some(FilterExpr::Or(ref v)) if v.len() == 2));
    }

    #[test]
    fn test_query_serialization_roundtrip() {
        let query = SelectQuery::new("posts")
            .with_columns(vec!["id".into(), "title".into()])
            .with_filter(FilterExpr::not(FilterExpr::like("title", "%draft%")))
            .with_order(OrderSpec::desc("id"))
            .with_offset(5);

        let json = serde_json::to_string(&query).unwrap();
        let decoded: SelectQuery = serde_json::from_str(&json).unwrap();
        assert_eq!(query, decoded);
    }
}

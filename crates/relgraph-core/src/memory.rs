//! In-memory executor.
//!
//! A reference [`Executor`] over plain vectors of rows. It evaluates the full
//! predicate tree, sorts with multi-key ordering, pages, and loads nested
//! relations through their declared join columns, applying the include's own
//! filter, ordering and paging per parent row. Used by tests and by the CLI.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use relgraph_proto::{
    ConflictAction, DeleteStatement, FieldValue, FilterExpr, InsertStatement, MutationResult,
    Nested, OrderDirection, OrderSpec, Row, SelectQuery, UpdateStatement, Value,
};
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::catalog::{Cardinality, DefaultValue, Schema, Table};
use crate::error::{ArgumentError, Error, ExecutionError};
use crate::executor::Executor;
use crate::scalar::map_table;

/// A stored row holds every column of its table, in declaration order.
type StoredRow = Vec<FieldValue>;

/// Executor keeping all tables in memory.
pub struct MemoryExecutor {
    schema: Arc<Schema>,
    tables: RwLock<HashMap<String, Vec<StoredRow>>>,
}

impl MemoryExecutor {
    /// Create an empty store for a schema.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Load fixture rows into a table. Defaults apply to missing columns.
    pub fn with_rows(self, table: &str, rows: Vec<Row>) -> Result<Self, ExecutionError> {
        self.insert_rows(InsertStatement {
            table: table.to_string(),
            rows: rows.into_iter().map(|row| row.fields).collect(),
            returning: None,
            on_conflict: ConflictAction::Error,
        })?;
        Ok(self)
    }

    /// Load a JSON fixture of the form `{"<table>": [{"<column>": value}]}`.
    ///
    /// Values use the same wire form as operation arguments. Returns the
    /// number of rows loaded.
    pub fn load_json(&self, fixture: &Json) -> Result<u64, Error> {
        let tables = fixture
            .as_object()
            .ok_or_else(|| ArgumentError::invalid_value("fixture", "object of tables", fixture))?;

        let mut loaded = 0;
        for (name, rows) in tables {
            let table = self.schema.table(name)?;
            let columns = map_table(table)?;
            let path = format!("fixture.{}", name);
            let rows = rows
                .as_array()
                .ok_or_else(|| ArgumentError::invalid_value(&path, "list of rows", rows))?;

            let mut statement = InsertStatement {
                table: name.clone(),
                rows: Vec::with_capacity(rows.len()),
                returning: None,
                on_conflict: ConflictAction::Error,
            };
            for (i, row) in rows.iter().enumerate() {
                let row_path = format!("{}.{}", path, i);
                let object = row
                    .as_object()
                    .ok_or_else(|| ArgumentError::invalid_value(&row_path, "row object", row))?;
                let mut values = Vec::with_capacity(object.len());
                for (column, value) in object {
                    let mapping = columns
                        .iter()
                        .find(|m| &m.column == column)
                        .ok_or_else(|| ArgumentError::unknown_field(&row_path, column.as_str()))?;
                    let value = mapping.deserialize(value, &format!("{}.{}", row_path, column))?;
                    values.push(FieldValue::new(column, value));
                }
                statement.rows.push(values);
            }
            loaded += self.insert_rows(statement)?.affected;
        }
        Ok(loaded)
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .get(table)
            .map(|rows| {
                rows.iter()
                    .map(|fields| Row {
                        fields: fields.clone(),
                        relations: Vec::new(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn run_select(
        &self,
        tables: &HashMap<String, Vec<StoredRow>>,
        query: &SelectQuery,
        candidates: Vec<&StoredRow>,
    ) -> Result<Vec<Row>, ExecutionError> {
        let table = self.schema.table(&query.table).map_err(ExecutionError::wrap)?;
        check_columns(table, query.columns.iter())?;

        let mut rows: Vec<&StoredRow> = match &query.filter {
            Some(filter) => candidates
                .into_iter()
                .filter(|row| FilterEvaluator::evaluate(filter, row))
                .collect(),
            None => candidates,
        };
        sort_rows(&mut rows, &query.order_by);

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        let mut result = Vec::new();
        for stored in rows.into_iter().skip(offset).take(limit) {
            let mut row = project(stored, &query.columns);

            for include in &query.with {
                let relation = self
                    .schema
                    .relation(&query.table, &include.relation)
                    .ok_or_else(|| {
                        ExecutionError::new(format!(
                            "table '{}' has no relation '{}'",
                            query.table, include.relation
                        ))
                    })?;
                let (from, to) = relation.join_fields().ok_or_else(|| {
                    ExecutionError::new(format!(
                        "relation '{}' of table '{}' declares no join columns",
                        relation.name, relation.source
                    ))
                })?;

                let children: Vec<&StoredRow> = match field(stored, from) {
                    None | Some(Value::Null) => Vec::new(),
                    Some(key) => tables
                        .get(&relation.target)
                        .map(|rows| {
                            rows.iter()
                                .filter(|r| matches!(field(r, to), Some(v) if values_equal(v, key)))
                                .collect()
                        })
                        .unwrap_or_default(),
                };

                let nested = self.run_select(tables, &include.query, children)?;
                let nested = match relation.cardinality {
                    Cardinality::One => Nested::Single(nested.into_iter().next().map(Box::new)),
                    Cardinality::Many => Nested::List(nested),
                };
                row.relations.push((include.relation.clone(), nested));
            }

            result.push(row);
        }
        Ok(result)
    }

    fn insert_rows(&self, statement: InsertStatement) -> Result<MutationResult, ExecutionError> {
        let table = self
            .schema
            .table(&statement.table)
            .map_err(ExecutionError::wrap)?;
        let mut tables = self.tables.write();
        let stored = tables.entry(table.name.clone()).or_default();

        let mut pending: Vec<StoredRow> = Vec::with_capacity(statement.rows.len());
        let mut skipped = 0usize;
        for values in statement.rows {
            let row = complete_row(table, values, stored, &pending)?;
            if let Some(column) = conflicting_column(table, &row, stored.iter().chain(&pending)) {
                match statement.on_conflict {
                    ConflictAction::DoNothing => {
                        warn!(table = %table.name, column = %column, "skipping conflicting insert");
                        skipped += 1;
                        continue;
                    }
                    ConflictAction::Error => {
                        return Err(ExecutionError::new(format!(
                            "duplicate key value in column '{}' of table '{}'",
                            column, table.name
                        )))
                    }
                }
            }
            pending.push(row);
        }

        let result = returning(statement.returning.as_deref(), pending.iter());
        debug!(table = %table.name, inserted = pending.len(), skipped, "insert");
        stored.extend(pending);
        Ok(result)
    }

    fn update_rows(&self, statement: UpdateStatement) -> Result<MutationResult, ExecutionError> {
        let table = self
            .schema
            .table(&statement.table)
            .map_err(ExecutionError::wrap)?;
        check_columns(table, statement.set.iter().map(|fv| &fv.field))?;

        let mut tables = self.tables.write();
        let stored = tables.entry(table.name.clone()).or_default();

        let matched: Vec<usize> = stored
            .iter()
            .enumerate()
            .filter(|(_, row)| matches_filter(statement.filter.as_ref(), row))
            .map(|(i, _)| i)
            .collect();

        let mut updated = stored.clone();
        for &i in &matched {
            for assignment in &statement.set {
                if let Some(slot) = updated[i].iter_mut().find(|fv| fv.field == assignment.field) {
                    slot.value = assignment.value.clone();
                }
            }
            check_not_null(table, &updated[i])?;
        }
        for &i in &matched {
            let others = updated
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, row)| row);
            if let Some(column) = conflicting_column(table, &updated[i], others) {
                return Err(ExecutionError::new(format!(
                    "duplicate key value in column '{}' of table '{}'",
                    column, table.name
                )));
            }
        }

        let result = returning(
            statement.returning.as_deref(),
            matched.iter().map(|&i| &updated[i]),
        );
        debug!(table = %table.name, updated = matched.len(), "update");
        *stored = updated;
        Ok(result)
    }

    fn delete_rows(&self, statement: DeleteStatement) -> Result<MutationResult, ExecutionError> {
        let table = self
            .schema
            .table(&statement.table)
            .map_err(ExecutionError::wrap)?;
        let mut tables = self.tables.write();
        let stored = tables.entry(table.name.clone()).or_default();

        let (removed, kept): (Vec<StoredRow>, Vec<StoredRow>) = std::mem::take(stored)
            .into_iter()
            .partition(|row| matches_filter(statement.filter.as_ref(), row));
        *stored = kept;

        debug!(table = %table.name, deleted = removed.len(), "delete");
        Ok(returning(statement.returning.as_deref(), removed.iter()))
    }
}

#[async_trait]
impl Executor for MemoryExecutor {
    async fn select(&self, query: SelectQuery) -> Result<Vec<Row>, ExecutionError> {
        let tables = self.tables.read();
        let candidates = tables
            .get(&query.table)
            .map(|rows| rows.iter().collect())
            .unwrap_or_default();
        self.run_select(&tables, &query, candidates)
    }

    async fn insert(&self, statement: InsertStatement) -> Result<MutationResult, ExecutionError> {
        self.insert_rows(statement)
    }

    async fn update(&self, statement: UpdateStatement) -> Result<MutationResult, ExecutionError> {
        self.update_rows(statement)
    }

    async fn delete(&self, statement: DeleteStatement) -> Result<MutationResult, ExecutionError> {
        self.delete_rows(statement)
    }
}

fn field<'a>(row: &'a [FieldValue], name: &str) -> Option<&'a Value> {
    row.iter().find(|fv| fv.field == name).map(|fv| &fv.value)
}

fn project(row: &[FieldValue], columns: &[String]) -> Row {
    let mut projected = Row::new();
    for column in columns {
        let value = field(row, column).cloned().unwrap_or(Value::Null);
        projected.fields.push(FieldValue::new(column, value));
    }
    projected
}

fn returning<'a>(
    columns: Option<&[String]>,
    rows: impl Iterator<Item = &'a StoredRow>,
) -> MutationResult {
    match columns {
        Some(columns) => MutationResult::returning(rows.map(|row| project(row, columns)).collect()),
        None => MutationResult::affected(rows.count() as u64),
    }
}

fn matches_filter(filter: Option<&FilterExpr>, row: &[FieldValue]) -> bool {
    filter.map_or(true, |f| FilterEvaluator::evaluate(f, row))
}

fn check_columns<'a>(
    table: &Table,
    columns: impl Iterator<Item = &'a String>,
) -> Result<(), ExecutionError> {
    for column in columns {
        if !table.has_column(column) {
            return Err(ExecutionError::new(format!(
                "column '{}' does not exist on table '{}'",
                column, table.name
            )));
        }
    }
    Ok(())
}

fn check_not_null(table: &Table, row: &[FieldValue]) -> Result<(), ExecutionError> {
    for column in &table.columns {
        if !column.nullable && !column.generated && matches!(field(row, &column.name), None | Some(Value::Null)) {
            return Err(ExecutionError::new(format!(
                "null value in column '{}' of table '{}' violates not-null constraint",
                column.name, table.name
            )));
        }
    }
    Ok(())
}

/// Build a full stored row from the provided values and column defaults.
fn complete_row(
    table: &Table,
    values: Vec<FieldValue>,
    stored: &[StoredRow],
    pending: &[StoredRow],
) -> Result<StoredRow, ExecutionError> {
    check_columns(table, values.iter().map(|fv| &fv.field))?;

    let mut row = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        let provided = values
            .iter()
            .find(|fv| fv.field == column.name)
            .map(|fv| fv.value.clone());
        let value = match (provided, &column.default) {
            (Some(value), _) => value,
            (None, None) => Value::Null,
            (None, Some(default)) => match default {
                DefaultValue::Null => Value::Null,
                DefaultValue::Bool(b) => Value::Bool(*b),
                DefaultValue::Int(i) => Value::Int(*i),
                DefaultValue::Float(f) => Value::Float(*f),
                DefaultValue::String(s) => Value::String(s.clone()),
                DefaultValue::CurrentTimestamp => Value::Timestamp(Utc::now()),
                DefaultValue::AutoIncrement => {
                    let max = stored
                        .iter()
                        .chain(pending)
                        .filter_map(|row| field(row, &column.name).and_then(Value::as_i64))
                        .max()
                        .unwrap_or(0);
                    Value::Int(max + 1)
                }
                DefaultValue::Expression(expr) => {
                    return Err(ExecutionError::new(format!(
                        "cannot evaluate default expression '{}' of column '{}'",
                        expr, column.name
                    )))
                }
            },
        };
        row.push(FieldValue::new(&column.name, value));
    }

    check_not_null(table, &row)?;
    Ok(row)
}

/// First identity constraint the row violates against `existing`. The
/// primary key is checked as one composite key, unique columns one by one.
fn conflicting_column<'a>(
    table: &Table,
    row: &[FieldValue],
    existing: impl Iterator<Item = &'a StoredRow> + Clone,
) -> Option<String> {
    let key: Vec<&str> = table
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.as_str())
        .collect();

    let same = |other: &StoredRow, column: &str| match (field(row, column), field(other, column)) {
        (Some(a), Some(b)) if !a.is_null() => values_equal(a, b),
        _ => false,
    };

    if !key.is_empty() && existing.clone().any(|other| key.iter().all(|c| same(other, c))) {
        return Some(key.join(", "));
    }
    table
        .columns
        .iter()
        .filter(|c| c.unique && !c.primary_key)
        .find(|c| existing.clone().any(|other| same(other, &c.name)))
        .map(|c| c.name.clone())
}

/// Sort rows in place by the order specs, stable for equal keys.
fn sort_rows(rows: &mut [&StoredRow], order_by: &[OrderSpec]) {
    if order_by.is_empty() {
        return;
    }

    rows.sort_by(|a, b| {
        for spec in order_by {
            let cmp = compare_for_sort(field(a, &spec.field), field(b, &spec.field));
            let cmp = match spec.direction {
                OrderDirection::Asc => cmp,
                OrderDirection::Desc => cmp.reverse(),
            };
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    });
}

/// Sort comparison; NULLs sort first.
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Json(a), Value::Json(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => compare_values(a, b) == Some(Ordering::Equal),
    }
}

/// Compare two values, returning their ordering if comparable. NULL is not
/// comparable with anything.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::UInt(a), Value::UInt(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::UInt(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
        (Value::UInt(a), Value::Int(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
        (Value::Float(_), _) | (_, Value::Float(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Evaluates predicate trees against stored rows.
///
/// Comparisons against NULL are false, as in SQL. `LIKE` folds ASCII case
/// the way SQLite does; `ILIKE` folds all of Unicode.
struct FilterEvaluator;

impl FilterEvaluator {
    fn evaluate(filter: &FilterExpr, row: &[FieldValue]) -> bool {
        match filter {
            FilterExpr::Eq { field: f, value } => Self::compare_field(row, f, |v| values_equal(v, value)),
            FilterExpr::Ne { field: f, value } => Self::compare_field(row, f, |v| !values_equal(v, value)),
            FilterExpr::Lt { field: f, value } => {
                Self::compare_field(row, f, |v| compare_values(v, value).is_some_and(Ordering::is_lt))
            }
            FilterExpr::Le { field: f, value } => {
                Self::compare_field(row, f, |v| compare_values(v, value).is_some_and(Ordering::is_le))
            }
            FilterExpr::Gt { field: f, value } => {
                Self::compare_field(row, f, |v| compare_values(v, value).is_some_and(Ordering::is_gt))
            }
            FilterExpr::Ge { field: f, value } => {
                Self::compare_field(row, f, |v| compare_values(v, value).is_some_and(Ordering::is_ge))
            }
            FilterExpr::In { field: f, values } => {
                Self::compare_field(row, f, |v| values.iter().any(|x| values_equal(v, x)))
            }
            FilterExpr::NotIn { field: f, values } => {
                Self::compare_field(row, f, |v| !values.iter().any(|x| values_equal(v, x)))
            }
            FilterExpr::IsNull { field: f } => matches!(field(row, f), None | Some(Value::Null)),
            FilterExpr::IsNotNull { field: f } => !matches!(field(row, f), None | Some(Value::Null)),
            FilterExpr::Like { field: f, pattern } => Self::match_text(row, f, |s| {
                like_match(&s.to_ascii_lowercase(), &pattern.to_ascii_lowercase())
            }),
            FilterExpr::NotLike { field: f, pattern } => Self::match_text(row, f, |s| {
                !like_match(&s.to_ascii_lowercase(), &pattern.to_ascii_lowercase())
            }),
            FilterExpr::ILike { field: f, pattern } => Self::match_text(row, f, |s| {
                like_match(&s.to_lowercase(), &pattern.to_lowercase())
            }),
            FilterExpr::NotILike { field: f, pattern } => Self::match_text(row, f, |s| {
                !like_match(&s.to_lowercase(), &pattern.to_lowercase())
            }),
            FilterExpr::And(filters) => filters.iter().all(|f| Self::evaluate(f, row)),
            FilterExpr::Or(filters) => filters.iter().any(|f| Self::evaluate(f, row)),
            FilterExpr::Not(inner) => !Self::evaluate(inner, row),
        }
    }

    /// Apply a predicate to a non-null field value.
    fn compare_field<F>(row: &[FieldValue], name: &str, predicate: F) -> bool
    where
        F: FnOnce(&Value) -> bool,
    {
        match field(row, name) {
            None | Some(Value::Null) => false,
            Some(value) => predicate(value),
        }
    }

    fn match_text<F>(row: &[FieldValue], name: &str, predicate: F) -> bool
    where
        F: FnOnce(&str) -> bool,
    {
        match field(row, name) {
            Some(Value::String(s)) => predicate(s),
            _ => false,
        }
    }
}

/// Match a string against a SQL LIKE pattern.
///
/// Supports:
/// - `%` matches zero or more characters
/// - `_` matches exactly one character
/// - `\%` and `\_` match a literal `%` or `_`
pub fn like_match(value: &str, pattern: &str) -> bool {
    let mut chars = value.chars().peekable();
    let mut pattern_chars = pattern.chars().peekable();
    like_match_recursive(&mut chars, &mut pattern_chars)
}

fn like_match_recursive(
    chars: &mut std::iter::Peekable<std::str::Chars>,
    pattern: &mut std::iter::Peekable<std::str::Chars>,
) -> bool {
    loop {
        match (pattern.peek().copied(), chars.peek().copied()) {
            (None, None) => return true,
            (None, Some(_)) => return false,
            (Some('%'), _) => {
                pattern.next();
                if pattern.peek().is_none() {
                    return true;
                }
                // Try matching % with 0, 1, 2, ... characters
                loop {
                    let mut pattern_clone = pattern.clone();
                    let mut chars_clone = chars.clone();
                    if like_match_recursive(&mut chars_clone, &mut pattern_clone) {
                        return true;
                    }
                    if chars.next().is_none() {
                        return false;
                    }
                }
            }
            (Some('_'), Some(_)) => {
                pattern.next();
                chars.next();
            }
            (Some('_'), None) => return false,
            (Some('\\'), _) => {
                pattern.next();
                match (pattern.peek().copied(), chars.peek().copied()) {
                    (Some(p), Some(c)) if p == c => {
                        pattern.next();
                        chars.next();
                    }
                    _ => return false,
                }
            }
            (Some(p), Some(c)) => {
                if p != c {
                    return false;
                }
                pattern.next();
                chars.next();
            }
            (Some(_), None) => return false,
        }
    }
}

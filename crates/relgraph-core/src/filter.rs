//! Filter grammar and compiler.
//!
//! Every table gets a `<Table>Filters` input with one entry per column and
//! the `AND`, `OR` and `NOT` combinators. Each column entry is a
//! `<Table><Column>Filters` input offering the comparison operators for the
//! column's kind, plus a column-level `OR` list of operator-only objects.
//!
//! Compilation turns a `where` argument into a [`FilterExpr`] tree:
//!
//! - keys of one object are ANDed together
//! - `AND: [a, b]` is the conjunction of `a` and `b`
//! - `OR: [a, b]` is the disjunction of `a` and `b`
//! - `NOT: [a, b]` negates the conjunction of `a` and `b`
//! - an empty object compiles to no predicate at all

use heck::ToUpperCamelCase;
use relgraph_proto::{FilterExpr, Value};
use serde_json::{Map, Value as Json};

use crate::error::ArgumentError;
use crate::scalar::ColumnMapping;
use crate::types::{InputObjectType, InputValueDef, TypeRef};

/// Comparison operators offered for every column.
pub const COMPARISON_OPERATORS: [&str; 6] = ["eq", "ne", "lt", "lte", "gt", "gte"];

/// Pattern operators offered for text columns.
pub const PATTERN_OPERATORS: [&str; 4] = ["like", "notLike", "ilike", "notIlike"];

/// Name of the table-level filter input.
pub fn filters_type_name(prefix: &str) -> String {
    format!("{}Filters", prefix)
}

fn column_filters_type_name(prefix: &str, column: &str) -> String {
    format!("{}{}Filters", prefix, column.to_upper_camel_case())
}

/// Filter input types of one table, the table-level input last.
pub fn filter_types(prefix: &str, columns: &[ColumnMapping]) -> Vec<InputObjectType> {
    let mut types = Vec::with_capacity(columns.len() * 2 + 1);
    let mut table_fields = Vec::with_capacity(columns.len() + 3);

    for column in columns {
        let name = column_filters_type_name(prefix, &column.column);
        let or_name = format!("{}Or", name);

        let operators = operator_fields(column);
        types.push(InputObjectType::new(or_name.clone(), operators.clone()));

        let mut fields = operators;
        fields.push(InputValueDef::new(
            "OR",
            TypeRef::list(TypeRef::named(or_name).non_null()),
        ));
        types.push(InputObjectType::new(name.clone(), fields));

        table_fields.push(InputValueDef::new(&column.column, TypeRef::named(name)));
    }

    let nested = TypeRef::list(TypeRef::named(filters_type_name(prefix)).non_null());
    for combinator in ["AND", "OR", "NOT"] {
        table_fields.push(InputValueDef::new(combinator, nested.clone()));
    }
    types.push(InputObjectType::new(filters_type_name(prefix), table_fields));
    types
}

fn operator_fields(column: &ColumnMapping) -> Vec<InputValueDef> {
    let value = column.kind().type_ref();
    let mut fields: Vec<InputValueDef> = COMPARISON_OPERATORS
        .iter()
        .map(|op| InputValueDef::new(*op, value.clone()))
        .collect();
    if column.is_text() {
        fields.extend(
            PATTERN_OPERATORS
                .iter()
                .map(|op| InputValueDef::new(*op, TypeRef::named("String"))),
        );
    }
    let list = TypeRef::list(value.non_null());
    fields.push(InputValueDef::new("inArray", list.clone()));
    fields.push(InputValueDef::new("notInArray", list));
    fields.push(InputValueDef::new("isNull", TypeRef::named("Boolean")));
    fields.push(InputValueDef::new("isNotNull", TypeRef::named("Boolean")));
    fields
}

/// Compile a `where` argument against the columns of a table.
///
/// `path` names the argument in error messages, e.g. `where` or
/// `posts.where`. Returns `None` when the filter matches every row.
pub fn compile_filter(
    columns: &[ColumnMapping],
    value: &Json,
    path: &str,
) -> Result<Option<FilterExpr>, ArgumentError> {
    match value {
        Json::Null => Ok(None),
        Json::Object(object) => compile_object(columns, object, path),
        other => Err(ArgumentError::invalid_value(path, "filter object", other)),
    }
}

fn compile_object(
    columns: &[ColumnMapping],
    object: &Map<String, Json>,
    path: &str,
) -> Result<Option<FilterExpr>, ArgumentError> {
    let mut parts = Vec::new();

    for (key, value) in object {
        let key_path = format!("{}.{}", path, key);
        match key.as_str() {
            "AND" => {
                for (i, item) in list(value, &key_path)?.iter().enumerate() {
                    if let Some(expr) = compile_filter(columns, item, &format!("{}.{}", key_path, i))? {
                        parts.push(expr);
                    }
                }
            }
            "OR" => {
                let branches = compile_branches(list(value, &key_path)?, &key_path, |item, p| {
                    compile_filter(columns, item, p)
                })?;
                parts.extend(branches);
            }
            "NOT" => {
                let mut negated = Vec::new();
                for (i, item) in list(value, &key_path)?.iter().enumerate() {
                    if let Some(expr) = compile_filter(columns, item, &format!("{}.{}", key_path, i))? {
                        negated.push(expr);
                    }
                }
                let inner = FilterExpr::all(negated).ok_or_else(|| {
                    ArgumentError::invalid(&key_path, "NOT needs at least one condition")
                })?;
                parts.push(FilterExpr::not(inner));
            }
            name => {
                let column = columns
                    .iter()
                    .find(|c| c.column == name)
                    .ok_or_else(|| ArgumentError::unknown_field(path, name))?;
                if let Some(expr) = compile_column(column, value, &key_path, true)? {
                    parts.push(expr);
                }
            }
        }
    }

    Ok(FilterExpr::all(parts))
}

/// Compile the branches of an `OR` list. A branch matching every row makes
/// the whole disjunction trivially true, which compiles to no predicate.
fn compile_branches<F>(
    items: &[Json],
    path: &str,
    mut compile: F,
) -> Result<Option<FilterExpr>, ArgumentError>
where
    F: FnMut(&Json, &str) -> Result<Option<FilterExpr>, ArgumentError>,
{
    let mut branches = Vec::with_capacity(items.len());
    let mut unconditional = false;
    for (i, item) in items.iter().enumerate() {
        match compile(item, &format!("{}.{}", path, i))? {
            Some(expr) => branches.push(expr),
            None => unconditional = true,
        }
    }
    if unconditional {
        return Ok(None);
    }
    Ok(FilterExpr::any(branches))
}

fn list<'a>(value: &'a Json, path: &str) -> Result<&'a [Json], ArgumentError> {
    match value {
        Json::Null => Ok(&[]),
        Json::Array(items) => Ok(items),
        other => Err(ArgumentError::invalid_value(path, "list of filter objects", other)),
    }
}

fn compile_column(
    column: &ColumnMapping,
    value: &Json,
    path: &str,
    allow_or: bool,
) -> Result<Option<FilterExpr>, ArgumentError> {
    let object = match value {
        Json::Null => return Ok(None),
        Json::Object(object) => object,
        other => return Err(ArgumentError::invalid_value(path, "operator object", other)),
    };

    let field = column.column.clone();
    let mut parts = Vec::with_capacity(object.len());

    for (op, operand) in object {
        let op_path = format!("{}.{}", path, op);

        if op == "OR" && allow_or {
            let items = match operand {
                Json::Null => &[][..],
                Json::Array(items) => items.as_slice(),
                other => {
                    return Err(ArgumentError::invalid_value(
                        &op_path,
                        "list of operator objects",
                        other,
                    ))
                }
            };
            let branches = compile_branches(items, &op_path, |item, p| {
                compile_column(column, item, p, false)
            })?;
            parts.extend(branches);
            continue;
        }

        let expr = match op.as_str() {
            "isNull" | "isNotNull" => {
                let enabled = match operand {
                    Json::Null => false,
                    Json::Bool(b) => *b,
                    other => return Err(ArgumentError::invalid_value(&op_path, "Boolean", other)),
                };
                match (enabled, op.as_str()) {
                    (false, _) => None,
                    (true, "isNull") => Some(FilterExpr::IsNull { field: field.clone() }),
                    (true, _) => Some(FilterExpr::IsNotNull { field: field.clone() }),
                }
            }
            "inArray" | "notInArray" => {
                let items = operand
                    .as_array()
                    .ok_or_else(|| ArgumentError::invalid_value(&op_path, "list", operand))?;
                let values = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| column.deserialize_non_null(item, &format!("{}.{}", op_path, i)))
                    .collect::<Result<Vec<Value>, _>>()?;
                Some(if op == "inArray" {
                    FilterExpr::In { field: field.clone(), values }
                } else {
                    FilterExpr::NotIn { field: field.clone(), values }
                })
            }
            "like" | "notLike" | "ilike" | "notIlike" if column.is_text() => {
                let pattern = operand
                    .as_str()
                    .ok_or_else(|| ArgumentError::invalid_value(&op_path, "String", operand))?
                    .to_string();
                let field = field.clone();
                Some(match op.as_str() {
                    "like" => FilterExpr::Like { field, pattern },
                    "notLike" => FilterExpr::NotLike { field, pattern },
                    "ilike" => FilterExpr::ILike { field, pattern },
                    _ => FilterExpr::NotILike { field, pattern },
                })
            }
            "eq" | "ne" | "lt" | "lte" | "gt" | "gte" => {
                if operand.is_null() {
                    return Err(ArgumentError::invalid(
                        &op_path,
                        "null is not a comparable value, use isNull instead",
                    ));
                }
                let value = column.deserialize_non_null(operand, &op_path)?;
                let field = field.clone();
                Some(match op.as_str() {
                    "eq" => FilterExpr::Eq { field, value },
                    "ne" => FilterExpr::Ne { field, value },
                    "lt" => FilterExpr::Lt { field, value },
                    "lte" => FilterExpr::Le { field, value },
                    "gt" => FilterExpr::Gt { field, value },
                    _ => FilterExpr::Ge { field, value },
                })
            }
            other => return Err(ArgumentError::unknown_field(path, other)),
        };
        parts.extend(expr);
    }

    Ok(FilterExpr::all(parts))
}

//! Result remapping.
//!
//! Rows come back from the executor flat, with relation sub-results attached
//! by relation name. Remapping walks the [`ObjectOutput`] tree built during
//! pruning and produces response JSON:
//!
//! - column values go through the column's primitive mapping
//! - an absent `one` relation becomes `null`
//! - an absent `many` relation becomes `[]`
//! - keys follow selection order and use aliases

use relgraph_proto::{Nested, Row};
use serde_json::{Map, Value as Json};

use crate::catalog::Cardinality;
use crate::error::ExecutionError;
use crate::selection::{ObjectOutput, OutputField};
use crate::types::GeneratedSchema;

/// Remap a list of rows.
pub fn remap_rows(
    generated: &GeneratedSchema,
    output: &ObjectOutput,
    rows: &[Row],
) -> Result<Json, ExecutionError> {
    rows.iter()
        .map(|row| remap_row(generated, output, row))
        .collect::<Result<Vec<_>, _>>()
        .map(Json::Array)
}

/// Remap a row that may be absent.
pub fn remap_optional(
    generated: &GeneratedSchema,
    output: &ObjectOutput,
    row: Option<&Row>,
) -> Result<Json, ExecutionError> {
    match row {
        Some(row) => remap_row(generated, output, row),
        None => Ok(Json::Null),
    }
}

/// Remap one row.
pub fn remap_row(
    generated: &GeneratedSchema,
    output: &ObjectOutput,
    row: &Row,
) -> Result<Json, ExecutionError> {
    let table = output.table.as_deref().unwrap_or_default();
    let types = generated.table(table);
    let mut object = Map::with_capacity(output.fields.len());

    for field in &output.fields {
        match field {
            OutputField::Typename { key } => {
                object.insert(key.clone(), Json::String(output.type_name.clone()));
            }
            OutputField::Column { key, column } => {
                let mapping = types.and_then(|t| t.column(column)).ok_or_else(|| {
                    ExecutionError::new(format!("table '{}' has no column '{}'", table, column))
                })?;
                let value = row.get(column).ok_or_else(|| {
                    ExecutionError::new(format!(
                        "row of table '{}' is missing column '{}'",
                        table, column
                    ))
                })?;
                object.insert(key.clone(), mapping.serialize(value)?);
            }
            OutputField::Relation {
                key,
                relation,
                cardinality,
                object: nested_output,
            } => {
                let nested = row.relation(relation);
                let value = match cardinality {
                    Cardinality::One => {
                        let first = match nested {
                            None | Some(Nested::Single(None)) => None,
                            Some(Nested::Single(Some(row))) => Some(row.as_ref()),
                            Some(Nested::List(rows)) => rows.first(),
                        };
                        remap_optional(generated, nested_output, first)?
                    }
                    Cardinality::Many => match nested {
                        None | Some(Nested::Single(None)) => Json::Array(Vec::new()),
                        Some(Nested::Single(Some(row))) => {
                            Json::Array(vec![remap_row(generated, nested_output, row)?])
                        }
                        Some(Nested::List(rows)) => remap_rows(generated, nested_output, rows)?,
                    },
                };
                object.insert(key.clone(), value);
            }
        }
    }

    Ok(Json::Object(object))
}

/// Fill the success-flag output.
pub fn remap_success(output: &ObjectOutput, success: bool) -> Json {
    let object = output
        .fields
        .iter()
        .map(|field| match field {
            OutputField::Typename { key } => (key.clone(), Json::String(output.type_name.clone())),
            OutputField::Column { key, .. } | OutputField::Relation { key, .. } => {
                (key.clone(), Json::Bool(success))
            }
        })
        .collect();
    Json::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, ColumnKind, Relation, Schema, Table};
    use crate::config::EngineConfig;
    use crate::selection::{prune, prune_success, SelectedField, Selection};
    use crate::types::generate;
    use relgraph_proto::Value;
    use serde_json::json;

    fn generated() -> GeneratedSchema {
        let users = Table::new("users")
            .with_column(Column::new("id", ColumnKind::bigint()).primary_key())
            .with_column(Column::nullable("avatar", ColumnKind::Binary));
        let posts = Table::new("posts")
            .with_column(Column::new("id", ColumnKind::int()).primary_key())
            .with_column(Column::new("user_id", ColumnKind::bigint()));
        let schema = Schema::new()
            .with_table(users)
            .with_table(posts)
            .with_relation(Relation::many("posts", "users", "posts").on("id", "user_id"))
            .with_relation(Relation::one("author", "posts", "users").on("user_id", "id"));
        generate(&schema, &EngineConfig::new()).unwrap()
    }

    fn users_output(generated: &GeneratedSchema, selection: Selection) -> ObjectOutput {
        let shape = generated.table("users").unwrap().select;
        prune(generated, shape, &selection, "users").unwrap().output
    }

    #[test]
    fn test_scalars_use_primitive_mapping() {
        let generated = generated();
        let output = users_output(
            &generated,
            Selection::new()
                .field(SelectedField::new("id").alias("key"))
                .field(SelectedField::new("avatar"))
                .field(SelectedField::new("__typename")),
        );
        let row = Row::new()
            .with("id", Value::Int(9_007_199_254_740_993))
            .with("avatar", Value::Bytes(vec![0xff]));

        let json = remap_row(&generated, &output, &row).unwrap();
        assert_eq!(
            json,
            json!({"key": "9007199254740993", "avatar": "/w==", "__typename": "UsersSelectItem"})
        );
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["key", "avatar", "__typename"]);
    }

    #[test]
    fn test_absent_relations() {
        let generated = generated();
        let output = users_output(
            &generated,
            Selection::of(&["id"]).field(
                SelectedField::new("posts").select(
                    Selection::of(&["id"])
                        .field(SelectedField::new("author").select(Selection::of(&["id"]))),
                ),
            ),
        );

        let row = Row::new().with("id", 1i64);
        assert_eq!(
            remap_row(&generated, &output, &row).unwrap(),
            json!({"id": "1", "posts": []})
        );

        let post = Row::new().with("id", 7).with_relation("author", Nested::none());
        let row = Row::new()
            .with("id", 1i64)
            .with_relation("posts", Nested::List(vec![post]));
        assert_eq!(
            remap_row(&generated, &output, &row).unwrap(),
            json!({"id": "1", "posts": [{"id": 7, "author": null}]})
        );
    }

    #[test]
    fn test_cardinality_coercion() {
        let generated = generated();
        let output = users_output(
            &generated,
            Selection::of(&["id"]).field(SelectedField::new("posts").select(Selection::of(&["id"]))),
        );
        let row = Row::new()
            .with("id", 1i64)
            .with_relation("posts", Nested::one(Row::new().with("id", 3)));
        assert_eq!(
            remap_row(&generated, &output, &row).unwrap(),
            json!({"id": "1", "posts": [{"id": 3}]})
        );
    }

    #[test]
    fn test_missing_column_is_execution_error() {
        let generated = generated();
        let output = users_output(&generated, Selection::of(&["id", "avatar"]));
        let err = remap_row(&generated, &output, &Row::new().with("id", 1i64)).unwrap_err();
        assert!(err.message().contains("missing column 'avatar'"));
    }

    #[test]
    fn test_success_output() {
        let output = prune_success(&Selection::of(&["isSuccess", "__typename"]), "m").unwrap();
        assert_eq!(
            remap_success(&output, true),
            json!({"isSuccess": true, "__typename": "MutationSuccess"})
        );
    }
}

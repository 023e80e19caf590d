//! Order-by grammar and compiler.

use relgraph_proto::{OrderDirection, OrderSpec};
use serde_json::Value as Json;

use crate::error::ArgumentError;
use crate::scalar::ColumnMapping;
use crate::types::{EnumType, InputObjectType, InputValueDef, TypeRef, ORDER_DIRECTION_TYPE};

/// Name of the order-by input of a table.
pub fn order_by_type_name(prefix: &str) -> String {
    format!("{}OrderBy", prefix)
}

/// The shared `OrderDirection` enum.
pub fn order_direction_type() -> EnumType {
    EnumType::new(
        ORDER_DIRECTION_TYPE,
        vec![
            OrderDirection::Asc.as_str().to_string(),
            OrderDirection::Desc.as_str().to_string(),
        ],
    )
}

/// `<Table>OrderBy`: one optional direction per column, in column order.
pub fn order_by_type(prefix: &str, columns: &[ColumnMapping]) -> InputObjectType {
    InputObjectType::new(
        order_by_type_name(prefix),
        columns
            .iter()
            .map(|c| InputValueDef::new(&c.column, TypeRef::named(ORDER_DIRECTION_TYPE)))
            .collect(),
    )
}

/// Compile an `orderBy` argument.
///
/// Entries are emitted in column declaration order, whatever the key order
/// of the argument object.
pub fn compile_order(
    columns: &[ColumnMapping],
    value: &Json,
    path: &str,
) -> Result<Vec<OrderSpec>, ArgumentError> {
    let object = match value {
        Json::Null => return Ok(Vec::new()),
        Json::Object(object) => object,
        other => return Err(ArgumentError::invalid_value(path, "order-by object", other)),
    };

    if let Some(unknown) = object
        .keys()
        .find(|key| !columns.iter().any(|c| &c.column == *key))
    {
        return Err(ArgumentError::unknown_field(path, unknown.as_str()));
    }

    let mut specs = Vec::with_capacity(object.len());
    for column in columns {
        let direction = match object.get(&column.column) {
            None | Some(Json::Null) => continue,
            Some(Json::String(s)) if s == "asc" => OrderDirection::Asc,
            Some(Json::String(s)) if s == "desc" => OrderDirection::Desc,
            Some(other) => {
                return Err(ArgumentError::invalid_value(
                    format!("{}.{}", path, column.column),
                    ORDER_DIRECTION_TYPE,
                    other,
                ))
            }
        };
        specs.push(OrderSpec {
            field: column.column.clone(),
            direction,
        });
    }
    Ok(specs)
}

//! Primitive type mapping.
//!
//! Every column is mapped once, at generation time, to a [`ColumnMapping`]
//! which knows the GraphQL representation of the column and how to convert
//! values in both directions:
//!
//! | storage kind                       | GraphQL    | wire form                   |
//! |------------------------------------|------------|-----------------------------|
//! | int8/16/32, uint8/16               | `Int`      | number                      |
//! | uint32, real, double               | `Float`    | number                      |
//! | int64, uint64, numeric             | `String`   | decimal text                |
//! | text, varchar, uuid                | `String`   | text                        |
//! | date / time / timestamp            | `String`   | ISO-8601, timestamps in UTC |
//! | bytea                              | `String`   | padded standard base64      |
//! | json                               | `JSON`     | any JSON value              |
//! | enum                               | `<Name>Enum` | member name               |
//! | arrays                             | list       | list of the element form    |

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use heck::ToUpperCamelCase;
use relgraph_proto::Value;
use serde_json::Value as Json;
use std::collections::HashSet;

use crate::catalog::{Column, ColumnKind, Table};
use crate::error::{ArgumentError, ExecutionError, SchemaError};
use crate::types::{EnumType, TypeRef};

/// Name of the custom scalar carrying arbitrary JSON.
pub const JSON_SCALAR: &str = "JSON";

/// Largest integer a client-side double represents exactly.
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// GraphQL representation of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Float,
    String,
    Boolean,
    Json,
    /// Enum type, by generated type name.
    Enum(String),
    List(Box<ScalarKind>),
}

impl ScalarKind {
    /// Type reference for the kind, without outer nullability.
    /// List elements are always non-null.
    pub fn type_ref(&self) -> TypeRef {
        match self {
            ScalarKind::Int => TypeRef::named("Int"),
            ScalarKind::Float => TypeRef::named("Float"),
            ScalarKind::String => TypeRef::named("String"),
            ScalarKind::Boolean => TypeRef::named("Boolean"),
            ScalarKind::Json => TypeRef::named(JSON_SCALAR),
            ScalarKind::Enum(name) => TypeRef::named(name.clone()),
            ScalarKind::List(inner) => TypeRef::list(inner.type_ref().non_null()),
        }
    }
}

/// An enum member: the GraphQL name and the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EnumMember {
    name: String,
    value: String,
}

/// Conversion rule for one storage kind.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Codec {
    Int { bits: u8, unsigned: bool },
    Float,
    Decimal,
    Boolean,
    Text { length: Option<u32> },
    Uuid,
    Date,
    Time,
    Timestamp,
    Binary,
    Json,
    Enum {
        type_name: String,
        members: Vec<EnumMember>,
    },
    Array(Box<Codec>),
}

/// Mapping of one column to its GraphQL representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Column name.
    pub column: String,
    /// Whether the column accepts null.
    pub nullable: bool,
    codec: Codec,
}

/// Map a column of a table. Unsupported storage kinds fail with an error
/// naming both the table and the column.
pub fn map_column(table: &Table, column: &Column) -> Result<ColumnMapping, SchemaError> {
    let codec = codec_for(table, column, &column.kind)?;
    Ok(ColumnMapping {
        column: column.name.clone(),
        nullable: column.nullable,
        codec,
    })
}

/// Map every column of a table, in declaration order.
pub fn map_table(table: &Table) -> Result<Vec<ColumnMapping>, SchemaError> {
    table
        .columns
        .iter()
        .map(|column| map_column(table, column))
        .collect()
}

fn codec_for(table: &Table, column: &Column, kind: &ColumnKind) -> Result<Codec, SchemaError> {
    let codec = match kind {
        ColumnKind::Integer { bits, unsigned } => Codec::Int {
            bits: *bits,
            unsigned: *unsigned,
        },
        ColumnKind::Float32 | ColumnKind::Float64 => Codec::Float,
        ColumnKind::Decimal { .. } => Codec::Decimal,
        ColumnKind::Boolean => Codec::Boolean,
        ColumnKind::Text { length } => Codec::Text { length: *length },
        ColumnKind::Uuid => Codec::Uuid,
        ColumnKind::Date => Codec::Date,
        ColumnKind::Time => Codec::Time,
        ColumnKind::Timestamp { .. } => Codec::Timestamp,
        ColumnKind::Binary => Codec::Binary,
        ColumnKind::Json => Codec::Json,
        ColumnKind::Enum { name, values } => {
            if values.is_empty() {
                return Err(SchemaError::EmptyEnum {
                    table: table.name.clone(),
                    column: column.name.clone(),
                });
            }
            let type_name = enum_type_name(name);
            let mut seen = HashSet::new();
            let mut members = Vec::with_capacity(values.len());
            for value in values {
                let name = enum_member_name(value);
                if !seen.insert(name.clone()) {
                    return Err(SchemaError::NameCollision {
                        name: format!("{}.{}", type_name, name),
                        detail: format!(
                            "enum of column '{}' on table '{}' has members that map to the same name",
                            column.name, table.name
                        ),
                    });
                }
                members.push(EnumMember {
                    name,
                    value: value.clone(),
                });
            }
            Codec::Enum { type_name, members }
        }
        ColumnKind::Array(inner) => Codec::Array(Box::new(codec_for(table, column, inner)?)),
        ColumnKind::Custom(kind) => {
            return Err(SchemaError::UnsupportedColumnKind {
                table: table.name.clone(),
                column: column.name.clone(),
                kind: kind.clone(),
            })
        }
    };
    Ok(codec)
}

/// Type name of a storage enum, e.g. `user_role` -> `UserRoleEnum`.
pub fn enum_type_name(name: &str) -> String {
    format!("{}Enum", name.to_upper_camel_case())
}

fn enum_member_name(value: &str) -> String {
    let mut name: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty()
        || name.starts_with(|c: char| c.is_ascii_digit())
        || matches!(name.as_str(), "true" | "false" | "null")
    {
        name.insert(0, '_');
    }
    name
}

impl ColumnMapping {
    /// GraphQL kind of the column.
    pub fn kind(&self) -> ScalarKind {
        self.codec.kind()
    }

    /// Type of the column in output objects, non-null unless nullable.
    pub fn output_type(&self) -> TypeRef {
        let ty = self.kind().type_ref();
        if self.nullable {
            ty
        } else {
            ty.non_null()
        }
    }

    /// Whether the LIKE family of filter operators applies.
    pub fn is_text(&self) -> bool {
        matches!(self.codec, Codec::Text { .. })
    }

    /// Enum type this column needs registered, if any.
    pub fn enum_type(&self) -> Option<EnumType> {
        let mut codec = &self.codec;
        while let Codec::Array(inner) = codec {
            codec = inner;
        }
        match codec {
            Codec::Enum { type_name, members } => Some(EnumType::new(
                type_name.clone(),
                members.iter().map(|m| m.name.clone()).collect(),
            )),
            _ => None,
        }
    }

    /// Convert an executor value to response JSON.
    pub fn serialize(&self, value: &Value) -> Result<Json, ExecutionError> {
        self.codec.serialize(value).ok_or_else(|| {
            ExecutionError::new(format!(
                "column '{}': cannot represent {} value as {}",
                self.column,
                value.type_name(),
                self.codec.describe()
            ))
        })
    }

    /// Convert an argument value into an executor value. `null` is accepted
    /// only for nullable columns.
    pub fn deserialize(&self, value: &Json, path: &str) -> Result<Value, ArgumentError> {
        if value.is_null() {
            if self.nullable {
                return Ok(Value::Null);
            }
            return Err(ArgumentError::invalid_value(
                path,
                format!("non-null {}", self.codec.describe()),
                value,
            ));
        }
        self.codec.deserialize(value, path)
    }

    /// Convert an argument value that must not be null, whatever the
    /// column's nullability (filter operands, list elements).
    pub fn deserialize_non_null(&self, value: &Json, path: &str) -> Result<Value, ArgumentError> {
        self.codec.deserialize(value, path)
    }
}

impl Codec {
    fn kind(&self) -> ScalarKind {
        match self {
            Codec::Int { bits, unsigned } => match (bits, unsigned) {
                (b, false) if *b <= 32 => ScalarKind::Int,
                (b, true) if *b <= 16 => ScalarKind::Int,
                (32, true) => ScalarKind::Float,
                _ => ScalarKind::String,
            },
            Codec::Float => ScalarKind::Float,
            Codec::Boolean => ScalarKind::Boolean,
            Codec::Json => ScalarKind::Json,
            Codec::Enum { type_name, .. } => ScalarKind::Enum(type_name.clone()),
            Codec::Array(inner) => ScalarKind::List(Box::new(inner.kind())),
            Codec::Decimal
            | Codec::Text { .. }
            | Codec::Uuid
            | Codec::Date
            | Codec::Time
            | Codec::Timestamp
            | Codec::Binary => ScalarKind::String,
        }
    }

    /// Human readable form used in error messages.
    fn describe(&self) -> String {
        match self {
            Codec::Int { bits, unsigned } => match self.kind() {
                ScalarKind::String => format!("String (int{} as text)", bits),
                ScalarKind::Float if *unsigned => "Float (uint32)".to_string(),
                _ => "Int".to_string(),
            },
            Codec::Float => "Float".to_string(),
            Codec::Decimal => "String (decimal)".to_string(),
            Codec::Boolean => "Boolean".to_string(),
            Codec::Text { length: Some(n) } => format!("String (at most {} characters)", n),
            Codec::Text { length: None } => "String".to_string(),
            Codec::Uuid => "String (uuid)".to_string(),
            Codec::Date => "String (YYYY-MM-DD)".to_string(),
            Codec::Time => "String (HH:MM:SS)".to_string(),
            Codec::Timestamp => "String (ISO-8601 timestamp)".to_string(),
            Codec::Binary => "String (base64)".to_string(),
            Codec::Json => JSON_SCALAR.to_string(),
            Codec::Enum { type_name, .. } => type_name.clone(),
            Codec::Array(inner) => format!("[{}]", inner.describe()),
        }
    }

    fn serialize(&self, value: &Value) -> Option<Json> {
        if value.is_null() {
            return Some(Json::Null);
        }
        let json = match (self, value) {
            (Codec::Int { .. }, Value::Int(_) | Value::UInt(_)) => match self.kind() {
                ScalarKind::String => Json::String(match value {
                    Value::UInt(u) => u.to_string(),
                    _ => value.as_i64()?.to_string(),
                }),
                _ => match value {
                    Value::UInt(u) => Json::from(*u),
                    _ => Json::from(value.as_i64()?),
                },
            },
            (Codec::Float, Value::Float(f)) => Json::from(serde_json::Number::from_f64(*f)?),
            (Codec::Float, Value::Int(i)) => Json::from(*i),
            (Codec::Float, Value::UInt(u)) => Json::from(*u),
            (Codec::Decimal, Value::String(s)) => Json::String(s.clone()),
            (Codec::Decimal, Value::Int(i)) => Json::String(i.to_string()),
            (Codec::Decimal, Value::UInt(u)) => Json::String(u.to_string()),
            (Codec::Decimal, Value::Float(f)) => Json::String(f.to_string()),
            (Codec::Boolean, Value::Bool(b)) => Json::Bool(*b),
            (Codec::Text { .. } | Codec::Uuid, Value::String(s)) => Json::String(s.clone()),
            (Codec::Date, Value::Date(d)) => Json::String(d.format("%Y-%m-%d").to_string()),
            (Codec::Date, Value::Timestamp(ts)) => {
                Json::String(ts.date_naive().format("%Y-%m-%d").to_string())
            }
            (Codec::Time, Value::Time(t)) => Json::String(t.format("%H:%M:%S%.f").to_string()),
            (Codec::Timestamp, Value::Timestamp(ts)) => Json::String(format_timestamp(ts)),
            (Codec::Timestamp, Value::String(s)) => Json::String(
                parse_timestamp(s)
                    .map(|ts| format_timestamp(&ts))
                    .unwrap_or_else(|| s.clone()),
            ),
            (Codec::Date | Codec::Time, Value::String(s)) => Json::String(s.clone()),
            (Codec::Binary, Value::Bytes(b)) => Json::String(STANDARD.encode(b)),
            (Codec::Json, Value::Json(v)) => v.clone(),
            (Codec::Json, Value::String(s)) => {
                serde_json::from_str(s).unwrap_or_else(|_| Json::String(s.clone()))
            }
            (Codec::Json, Value::Bool(b)) => Json::Bool(*b),
            (Codec::Json, Value::Int(i)) => Json::from(*i),
            (Codec::Json, Value::Float(f)) => Json::from(serde_json::Number::from_f64(*f)?),
            (Codec::Enum { members, .. }, Value::String(s)) => Json::String(
                members
                    .iter()
                    .find(|m| &m.value == s)
                    .map(|m| m.name.clone())?,
            ),
            (Codec::Array(inner), Value::Array(items)) => Json::Array(
                items
                    .iter()
                    .map(|item| inner.serialize(item))
                    .collect::<Option<Vec<_>>>()?,
            ),
            _ => return None,
        };
        Some(json)
    }

    fn deserialize(&self, value: &Json, path: &str) -> Result<Value, ArgumentError> {
        let invalid = || ArgumentError::invalid_value(path, self.describe(), value);

        match self {
            Codec::Int { bits, unsigned } => match self.kind() {
                ScalarKind::String => {
                    let text = match value {
                        Json::String(s) => s.trim().to_string(),
                        Json::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
                        _ => return Err(invalid()),
                    };
                    if *unsigned {
                        text.parse::<u64>().map(Value::UInt).map_err(|_| invalid())
                    } else {
                        text.parse::<i64>().map(Value::Int).map_err(|_| invalid())
                    }
                }
                _ => {
                    let (min, max) = int_range(*bits, *unsigned);
                    let n = match value {
                        Json::Number(n) => n
                            .as_i64()
                            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
                        _ => None,
                    }
                    .ok_or_else(invalid)?;
                    if n < min || n > max {
                        return Err(ArgumentError::invalid(
                            path,
                            format!("{} is out of range for int{}", n, bits),
                        ));
                    }
                    Ok(Value::Int(n))
                }
            },
            Codec::Float => value.as_f64().map(Value::Float).ok_or_else(invalid),
            Codec::Decimal => match value {
                Json::String(s) if is_decimal(s.trim()) => Ok(Value::String(s.trim().to_string())),
                Json::Number(n) => Ok(Value::String(n.to_string())),
                _ => Err(invalid()),
            },
            Codec::Boolean => value.as_bool().map(Value::Bool).ok_or_else(invalid),
            Codec::Text { length } => {
                let s = value.as_str().ok_or_else(invalid)?;
                if let Some(max) = length {
                    if s.chars().count() > *max as usize {
                        return Err(ArgumentError::invalid(
                            path,
                            format!("value is longer than {} characters", max),
                        ));
                    }
                }
                Ok(Value::String(s.to_string()))
            }
            Codec::Uuid => {
                let s = value.as_str().ok_or_else(invalid)?;
                uuid::Uuid::parse_str(s)
                    .map(|id| Value::String(id.to_string()))
                    .map_err(|_| invalid())
            }
            Codec::Date => {
                let s = value.as_str().ok_or_else(invalid)?;
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(Value::Date)
                    .map_err(|_| invalid())
            }
            Codec::Time => {
                let s = value.as_str().ok_or_else(invalid)?;
                NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                    .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                    .map(Value::Time)
                    .map_err(|_| invalid())
            }
            Codec::Timestamp => match value {
                Json::String(s) => parse_timestamp(s).map(Value::Timestamp).ok_or_else(invalid),
                Json::Number(n) => n
                    .as_i64()
                    .and_then(DateTime::<Utc>::from_timestamp_millis)
                    .map(Value::Timestamp)
                    .ok_or_else(invalid),
                _ => Err(invalid()),
            },
            Codec::Binary => {
                let s = value.as_str().ok_or_else(invalid)?;
                STANDARD.decode(s).map(Value::Bytes).map_err(|_| invalid())
            }
            Codec::Json => Ok(Value::Json(value.clone())),
            Codec::Enum { members, .. } => {
                let s = value.as_str().ok_or_else(invalid)?;
                members
                    .iter()
                    .find(|m| m.name == s || m.value == s)
                    .map(|m| Value::String(m.value.clone()))
                    .ok_or_else(invalid)
            }
            Codec::Array(inner) => {
                let items = value.as_array().ok_or_else(invalid)?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| inner.deserialize(item, &format!("{}.{}", path, i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
        }
    }
}

fn int_range(bits: u8, unsigned: bool) -> (i64, i64) {
    match (bits, unsigned) {
        (b, true) if b < 64 => (0, (1i64 << b) - 1),
        (b, false) if b < 64 => (-(1i64 << (b - 1)), (1i64 << (b - 1)) - 1),
        _ => (-MAX_SAFE_INTEGER, MAX_SAFE_INTEGER),
    }
}

fn is_decimal(s: &str) -> bool {
    let digits = s.strip_prefix(&['-', '+'][..]).unwrap_or(s);
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    !(int.is_empty() && frac.is_empty())
        && int.chars().all(|c| c.is_ascii_digit())
        && frac.chars().all(|c| c.is_ascii_digit())
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 timestamp. Offsets are converted to UTC; timestamps
/// without an offset are taken to be UTC already.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn mapping(kind: ColumnKind) -> ColumnMapping {
        let table = Table::new("t").with_column(Column::new("c", kind));
        map_column(&table, &table.columns[0]).unwrap()
    }

    #[test]
    fn test_integer_widths() {
        assert_eq!(mapping(ColumnKind::int()).kind(), ScalarKind::Int);
        assert_eq!(
            mapping(ColumnKind::Integer { bits: 16, unsigned: true }).kind(),
            ScalarKind::Int
        );
        assert_eq!(
            mapping(ColumnKind::Integer { bits: 32, unsigned: true }).kind(),
            ScalarKind::Float
        );
        assert_eq!(mapping(ColumnKind::bigint()).kind(), ScalarKind::String);
    }

    #[test]
    fn test_bigint_keeps_precision() {
        let m = mapping(ColumnKind::bigint());
        let big = 9_007_199_254_740_993i64;
        assert_eq!(m.serialize(&Value::Int(big)).unwrap(), json!("9007199254740993"));
        assert_eq!(
            m.deserialize(&json!("9007199254740993"), "values.c").unwrap(),
            Value::Int(big)
        );

        let unsigned = mapping(ColumnKind::Integer { bits: 64, unsigned: true });
        assert_eq!(
            unsigned.serialize(&Value::UInt(u64::MAX)).unwrap(),
            json!(u64::MAX.to_string())
        );
    }

    #[test]
    fn test_int_range_checked() {
        let m = mapping(ColumnKind::Integer { bits: 8, unsigned: false });
        assert_eq!(m.deserialize(&json!(-128), "x").unwrap(), Value::Int(-128));
        assert!(matches!(
            m.deserialize(&json!(128), "x"),
            Err(ArgumentError::Invalid { .. })
        ));
        assert!(matches!(
            m.deserialize(&json!("1"), "x"),
            Err(ArgumentError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_timestamps_normalized_to_utc() {
        let m = mapping(ColumnKind::Timestamp { with_timezone: true });
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 1, 4, 5).unwrap();

        let parsed = m.deserialize(&json!("2024-01-02T03:04:05+02:00"), "x").unwrap();
        assert_eq!(parsed, Value::Timestamp(expected));

        let naive = m.deserialize(&json!("2024-01-02 01:04:05"), "x").unwrap();
        assert_eq!(naive, Value::Timestamp(expected));

        assert_eq!(
            m.serialize(&Value::Timestamp(expected)).unwrap(),
            json!("2024-01-02T01:04:05.000Z")
        );
    }

    #[test]
    fn test_binary_as_base64() {
        let m = mapping(ColumnKind::Binary);
        assert_eq!(
            m.serialize(&Value::Bytes(b"hello".to_vec())).unwrap(),
            json!("aGVsbG8=")
        );
        assert_eq!(
            m.deserialize(&json!("aGVsbG8="), "x").unwrap(),
            Value::Bytes(b"hello".to_vec())
        );
        assert!(m.deserialize(&json!("not base64!"), "x").is_err());
    }

    #[test]
    fn test_enum_mapping() {
        let m = mapping(ColumnKind::enumeration("user_role", &["admin", "read-only"]));
        assert_eq!(m.kind(), ScalarKind::Enum("UserRoleEnum".into()));

        let ty = m.enum_type().unwrap();
        assert_eq!(ty.values, vec!["admin", "read_only"]);

        assert_eq!(
            m.deserialize(&json!("read_only"), "x").unwrap(),
            Value::String("read-only".into())
        );
        assert_eq!(
            m.serialize(&Value::String("read-only".into())).unwrap(),
            json!("read_only")
        );
        assert!(m.deserialize(&json!("owner"), "x").is_err());
    }

    #[test]
    fn test_arrays_map_elements() {
        let m = mapping(ColumnKind::array(ColumnKind::int()));
        assert_eq!(m.output_type().to_string(), "[Int!]!");
        assert_eq!(
            m.deserialize(&json!([1, 2]), "x").unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
        let err = m.deserialize(&json!([1, "two"]), "values.c").unwrap_err();
        assert!(err.to_string().starts_with("values.c.1:"));
    }

    #[test]
    fn test_null_handling() {
        let required = mapping(ColumnKind::text());
        assert!(required.deserialize(&Json::Null, "x").is_err());

        let table = Table::new("t").with_column(Column::nullable("c", ColumnKind::text()));
        let optional = map_column(&table, &table.columns[0]).unwrap();
        assert_eq!(optional.deserialize(&Json::Null, "x").unwrap(), Value::Null);
        assert!(optional.deserialize_non_null(&Json::Null, "x").is_err());
        assert_eq!(optional.serialize(&Value::Null).unwrap(), Json::Null);
    }

    #[test]
    fn test_unsupported_kind_names_column() {
        let table = Table::new("shapes").with_column(Column::new("area", ColumnKind::parse("geometry")));
        let err = map_column(&table, &table.columns[0]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnsupportedColumnKind {
                table: "shapes".into(),
                column: "area".into(),
                kind: "geometry".into(),
            }
        );

        let table = Table::new("t").with_column(Column::new("e", ColumnKind::enumeration("e", &[])));
        assert!(matches!(
            map_column(&table, &table.columns[0]),
            Err(SchemaError::EmptyEnum { .. })
        ));
    }

    #[test]
    fn test_serialize_mismatch_is_execution_error() {
        let m = mapping(ColumnKind::Boolean);
        let err = m.serialize(&Value::String("yes".into())).unwrap_err();
        assert!(err.message().contains("column 'c'"));
    }

    #[test]
    fn test_decimal_and_uuid() {
        let m = mapping(ColumnKind::Decimal { precision: Some(10), scale: Some(2) });
        assert_eq!(m.deserialize(&json!("12.50"), "x").unwrap(), Value::String("12.50".into()));
        assert!(m.deserialize(&json!("12,50"), "x").is_err());

        let m = mapping(ColumnKind::Uuid);
        assert_eq!(
            m.deserialize(&json!("67E55044-10B1-426F-9247-BB680E5FE0C8"), "x").unwrap(),
            Value::String("67e55044-10b1-426f-9247-bb680e5fe0c8".into())
        );
        assert!(m.deserialize(&json!("nope"), "x").is_err());
    }
}

//! Column storage kinds.

use std::fmt;

/// Storage kind of a column, as declared by the relational schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    /// Integer of the given width in bits (8, 16, 32 or 64).
    Integer {
        /// Width in bits.
        bits: u8,
        /// Whether the column is unsigned.
        unsigned: bool,
    },
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// Fixed-precision decimal.
    Decimal {
        /// Total number of digits.
        precision: Option<u8>,
        /// Number of digits after decimal point.
        scale: Option<u8>,
    },
    /// Boolean value.
    Boolean,
    /// Character data with an optional maximum length.
    Text {
        /// Maximum length in characters.
        length: Option<u32>,
    },
    /// UUID stored in textual form.
    Uuid,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Timestamp.
    Timestamp {
        /// Whether the column stores an offset.
        with_timezone: bool,
    },
    /// Binary data.
    Binary,
    /// JSON document.
    Json,
    /// Enumerated text column.
    Enum {
        /// Name of the enum type.
        name: String,
        /// Allowed members, in declaration order.
        values: Vec<String>,
    },
    /// Array of another kind.
    Array(Box<ColumnKind>),
    /// A storage kind this engine does not understand.
    Custom(String),
}

impl ColumnKind {
    /// 32-bit signed integer.
    pub fn int() -> Self {
        ColumnKind::Integer {
            bits: 32,
            unsigned: false,
        }
    }

    /// 64-bit signed integer.
    pub fn bigint() -> Self {
        ColumnKind::Integer {
            bits: 64,
            unsigned: false,
        }
    }

    /// Unbounded text.
    pub fn text() -> Self {
        ColumnKind::Text { length: None }
    }

    /// Timestamp without time zone.
    pub fn timestamp() -> Self {
        ColumnKind::Timestamp {
            with_timezone: false,
        }
    }

    /// Enum with the given members.
    pub fn enumeration(name: impl Into<String>, values: &[&str]) -> Self {
        ColumnKind::Enum {
            name: name.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Array of the given kind.
    pub fn array(inner: ColumnKind) -> Self {
        ColumnKind::Array(Box::new(inner))
    }

    /// Parse a SQL-style storage name such as `bigint`, `varchar(255)` or
    /// `text[]`.
    ///
    /// Unknown names are kept as [`ColumnKind::Custom`] so that the type
    /// mapper can report them together with the table and column.
    pub fn parse(declared: &str) -> Self {
        let normalized = declared.trim().to_ascii_lowercase();

        if let Some(inner) = normalized.strip_suffix("[]") {
            return ColumnKind::Array(Box::new(Self::parse(inner)));
        }

        let (base, params) = match normalized.split_once('(') {
            Some((base, rest)) => (base.trim(), rest.trim_end_matches(')').trim()),
            None => (normalized.as_str(), ""),
        };
        let numbers: Vec<u32> = params
            .split(',')
            .filter_map(|p| p.trim().parse().ok())
            .collect();

        match base {
            "tinyint" | "int1" => ColumnKind::Integer {
                bits: 8,
                unsigned: false,
            },
            "smallint" | "int2" | "smallserial" | "serial2" => ColumnKind::Integer {
                bits: 16,
                unsigned: false,
            },
            "int" | "integer" | "int4" | "serial" | "serial4" | "mediumint" => ColumnKind::int(),
            "bigint" | "int8" | "bigserial" | "serial8" => ColumnKind::bigint(),
            "tinyint unsigned" => ColumnKind::Integer {
                bits: 8,
                unsigned: true,
            },
            "smallint unsigned" => ColumnKind::Integer {
                bits: 16,
                unsigned: true,
            },
            "int unsigned" | "integer unsigned" => ColumnKind::Integer {
                bits: 32,
                unsigned: true,
            },
            "bigint unsigned" => ColumnKind::Integer {
                bits: 64,
                unsigned: true,
            },
            "real" | "float4" | "float" => ColumnKind::Float32,
            "double" | "double precision" | "float8" => ColumnKind::Float64,
            "numeric" | "decimal" => ColumnKind::Decimal {
                precision: numbers.first().and_then(|p| u8::try_from(*p).ok()),
                scale: numbers.get(1).and_then(|s| u8::try_from(*s).ok()),
            },
            "boolean" | "bool" => ColumnKind::Boolean,
            "text" | "varchar" | "character varying" | "char" | "character" | "string" => {
                ColumnKind::Text {
                    length: numbers.first().copied(),
                }
            }
            "uuid" => ColumnKind::Uuid,
            "date" => ColumnKind::Date,
            "time" => ColumnKind::Time,
            "timestamp" | "datetime" => ColumnKind::timestamp(),
            "timestamptz" | "timestamp with time zone" => ColumnKind::Timestamp {
                with_timezone: true,
            },
            "bytea" | "blob" | "binary" | "varbinary" => ColumnKind::Binary,
            "json" | "jsonb" => ColumnKind::Json,
            _ => ColumnKind::Custom(declared.trim().to_string()),
        }
    }

    /// Check if this kind is matched by the LIKE operator family.
    pub fn is_text(&self) -> bool {
        matches!(self, ColumnKind::Text { .. })
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Integer { bits, unsigned } => {
                write!(f, "int{}", bits)?;
                if *unsigned {
                    write!(f, " unsigned")?;
                }
                Ok(())
            }
            ColumnKind::Float32 => write!(f, "real"),
            ColumnKind::Float64 => write!(f, "double precision"),
            ColumnKind::Decimal { .. } => write!(f, "numeric"),
            ColumnKind::Boolean => write!(f, "boolean"),
            ColumnKind::Text { .. } => write!(f, "text"),
            ColumnKind::Uuid => write!(f, "uuid"),
            ColumnKind::Date => write!(f, "date"),
            ColumnKind::Time => write!(f, "time"),
            ColumnKind::Timestamp { with_timezone } => {
                write!(f, "{}", if *with_timezone { "timestamptz" } else { "timestamp" })
            }
            ColumnKind::Binary => write!(f, "bytea"),
            ColumnKind::Json => write!(f, "json"),
            ColumnKind::Enum { name, .. } => write!(f, "enum {}", name),
            ColumnKind::Array(inner) => write!(f, "{}[]", inner),
            ColumnKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integers() {
        assert_eq!(ColumnKind::parse("integer"), ColumnKind::int());
        assert_eq!(ColumnKind::parse("BIGSERIAL"), ColumnKind::bigint());
        assert_eq!(
            ColumnKind::parse("int unsigned"),
            ColumnKind::Integer {
                bits: 32,
                unsigned: true
            }
        );
    }

    #[test]
    fn test_parse_parameterized() {
        assert_eq!(
            ColumnKind::parse("varchar(255)"),
            ColumnKind::Text { length: Some(255) }
        );
        assert_eq!(
            ColumnKind::parse("numeric(10, 2)"),
            ColumnKind::Decimal {
                precision: Some(10),
                scale: Some(2)
            }
        );
    }

    #[test]
    fn test_parse_arrays_and_unknown() {
        assert_eq!(
            ColumnKind::parse("text[]"),
            ColumnKind::array(ColumnKind::text())
        );
        assert_eq!(
            ColumnKind::parse("geometry(point)"),
            ColumnKind::Custom("geometry(point)".into())
        );
    }

    #[test]
    fn test_parse_decimal_bounds() {
        // out-of-range precision is dropped rather than wrapped
        assert_eq!(
            ColumnKind::parse("numeric(300,4)"),
            ColumnKind::Decimal {
                precision: None,
                scale: Some(4)
            }
        );
    }

    #[test]
    fn test_kind_checks() {
        assert!(ColumnKind::text().is_text());
        assert!(!ColumnKind::Uuid.is_text());
        assert_eq!(ColumnKind::array(ColumnKind::int()).to_string(), "int32[]");
    }
}

//! Output formatters for document responses.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use serde_json::Value as Json;

/// Output format for responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed response object
    Json,
    /// One ASCII table per root field
    Table,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

/// Render a `{data, errors}` response.
pub fn format_response(format: OutputFormat, response: &Json) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(response).unwrap_or_else(|_| response.to_string())
        }
        OutputFormat::Table => format_as_tables(response),
    }
}

fn format_as_tables(response: &Json) -> String {
    let mut sections = Vec::new();

    if let Some(Json::Object(data)) = response.get("data") {
        for (key, value) in data {
            sections.push(format!("{}\n{}", key, format_field(value)));
        }
    }

    if let Some(Json::Array(errors)) = response.get("errors") {
        for error in errors {
            let message = error
                .get("message")
                .and_then(Json::as_str)
                .unwrap_or("unknown error");
            match error.get("path").and_then(Json::as_array) {
                Some(path) if !path.is_empty() => {
                    let path: Vec<String> = path.iter().map(format_cell).collect();
                    sections.push(format!("Error at {}: {}", path.join("."), message));
                }
                _ => sections.push(format!("Error: {}", message)),
            }
        }
    }

    if sections.is_empty() {
        "No results".to_string()
    } else {
        sections.join("\n\n")
    }
}

/// Format one root field value.
fn format_field(value: &Json) -> String {
    match value {
        Json::Null => "No results".to_string(),
        Json::Array(items) => format_rows(items),
        Json::Object(_) => format_rows(std::slice::from_ref(value)),
        other => format_cell(other),
    }
}

/// Format a list of objects as a table. Headers come from the first row;
/// every item of a response list has the same shape.
fn format_rows(items: &[Json]) -> String {
    let headers: Vec<String> = match items.first() {
        Some(Json::Object(first)) => first.keys().cloned().collect(),
        Some(_) => vec!["value".to_string()],
        None => return "0 row(s)".to_string(),
    };

    let mut table = Table::new();
    table.set_header(headers.iter().map(Cell::new).collect::<Vec<_>>());

    for item in items {
        let cells: Vec<Cell> = match item {
            Json::Object(fields) => headers
                .iter()
                .map(|h| Cell::new(fields.get(h).map(format_cell).unwrap_or_default()))
                .collect(),
            other => vec![Cell::new(format_cell(other))],
        };
        table.add_row(cells);
    }

    format!("{}\n{} row(s)", table, items.len())
}

/// Format a value as a table cell. Nested relation data stays compact JSON.
fn format_cell(value: &Json) -> String {
    match value {
        Json::Null => "NULL".to_string(),
        Json::String(s) => s.clone(),
        Json::Bool(b) => b.to_string(),
        Json::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(&Json::Null), "NULL");
        assert_eq!(format_cell(&json!("Ann")), "Ann");
        assert_eq!(format_cell(&json!(3)), "3");
        assert_eq!(format_cell(&json!({"id": 1})), r#"{"id":1}"#);
    }

    #[test]
    fn test_table_format_lists_rows() {
        let response = json!({"data": {"users": [{"id": 1, "name": "Ann"}, {"id": 2, "name": "Bob"}]}});
        let output = format_response(OutputFormat::Table, &response);
        assert!(output.starts_with("users\n"));
        assert!(output.contains("Ann"));
        assert!(output.contains("Bob"));
        assert!(output.ends_with("2 row(s)"));
    }

    #[test]
    fn test_table_format_null_and_errors() {
        let response = json!({
            "data": {"usersSingle": null, "posts": null},
            "errors": [{"message": "boom", "path": ["posts"]}]
        });
        let output = format_response(OutputFormat::Table, &response);
        assert!(output.contains("usersSingle\nNo results"));
        assert!(output.contains("Error at posts: boom"));
    }

    #[test]
    fn test_table_format_empty_list() {
        let response = json!({"data": {"users": []}});
        assert_eq!(
            format_response(OutputFormat::Table, &response),
            "users\n0 row(s)"
        );
    }

    #[test]
    fn test_json_format_is_pretty() {
        let response = json!({"data": {"users": []}});
        let output = format_response(OutputFormat::Json, &response);
        assert!(output.contains('\n'));
        assert_eq!(serde_json::from_str::<Json>(&output).unwrap(), response);
    }
}

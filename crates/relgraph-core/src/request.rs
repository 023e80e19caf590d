//! GraphQL documents.
//!
//! Parses an executable document, resolves variables, flattens fragments and
//! `@skip` / `@include`, then runs each root field as one engine operation.
//! Root fields run one after another, in document order.

use async_graphql_parser::types::{
    Directive, DocumentOperations, ExecutableDocument, Field, OperationDefinition, OperationType,
    Selection as GqlSelection, SelectionSet,
};
use async_graphql_parser::{parse_query, Positioned};
use async_graphql_value::{ConstValue, Name, Value as GqlValue};
use serde::Deserialize;
use serde_json::{json, Map, Value as Json};
use tracing::{debug, instrument, warn};

use crate::engine::Engine;
use crate::error::{ArgumentError, Error};
use crate::executor::Executor;
use crate::selection::{SelectedField, Selection, TYPENAME_FIELD};

/// A GraphQL request body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    pub query: String,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Map<String, Json>,
}

impl DocumentRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Json>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// Root type a document operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Query,
    Mutation,
}

impl DocumentKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            DocumentKind::Query => "Query",
            DocumentKind::Mutation => "Mutation",
        }
    }
}

/// A parsed operation with variables and fragments resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub kind: DocumentKind,
    /// Root fields, each naming an engine operation.
    pub fields: Vec<SelectedField>,
}

/// Parse a request into root fields.
pub fn parse_document(request: &DocumentRequest) -> Result<ParsedDocument, ArgumentError> {
    let document = parse_query(&request.query)
        .map_err(|e| ArgumentError::invalid("document", e.to_string()))?;
    let operation = select_operation(&document, request.operation_name.as_deref())?;

    let kind = match operation.ty {
        OperationType::Query => DocumentKind::Query,
        OperationType::Mutation => DocumentKind::Mutation,
        OperationType::Subscription => {
            return Err(ArgumentError::invalid(
                "document",
                "subscriptions are not supported",
            ))
        }
    };

    let resolver = Resolver {
        document: &document,
        declared: operation
            .variable_definitions
            .iter()
            .map(|definition| definition.node.name.node.to_string())
            .collect(),
        variables: resolve_variables(operation, &request.variables)?,
    };
    let selection = resolver.selection(&operation.selection_set.node, "", &mut Vec::new())?;
    Ok(ParsedDocument {
        kind,
        fields: selection.fields,
    })
}

fn select_operation<'a>(
    document: &'a ExecutableDocument,
    name: Option<&str>,
) -> Result<&'a OperationDefinition, ArgumentError> {
    match &document.operations {
        DocumentOperations::Single(operation) => Ok(&operation.node),
        DocumentOperations::Multiple(operations) => match name {
            Some(name) => operations
                .get(name)
                .map(|op| &op.node)
                .ok_or_else(|| {
                    ArgumentError::invalid("operationName", format!("no operation named '{}'", name))
                }),
            None if operations.len() == 1 => operations
                .values()
                .next()
                .map(|op| &op.node)
                .ok_or_else(|| ArgumentError::invalid("document", "no operation")),
            None => Err(ArgumentError::Missing {
                path: "operationName".to_string(),
            }),
        },
    }
}

/// Declared variables with their provided or default values. A nullable
/// variable that is neither provided nor defaulted is left out, and so is
/// every input field it feeds. Undeclared variables in the request are
/// ignored.
fn resolve_variables(
    operation: &OperationDefinition,
    provided: &Map<String, Json>,
) -> Result<Map<String, Json>, ArgumentError> {
    let mut resolved = Map::new();
    for definition in &operation.variable_definitions {
        let definition = &definition.node;
        let name = definition.name.node.as_str();
        let path = format!("${}", name);

        let nullable = definition.var_type.node.nullable;

        let value = match provided.get(name) {
            Some(Json::Null) if !nullable => return Err(ArgumentError::Missing { path }),
            Some(value) => value.clone(),
            None => match &definition.default_value {
                Some(default) => default
                    .node
                    .clone()
                    .into_json()
                    .map_err(|e| ArgumentError::invalid(&path, e.to_string()))?,
                None if !nullable => return Err(ArgumentError::Missing { path }),
                None => continue,
            },
        };
        resolved.insert(name.to_string(), value);
    }
    Ok(resolved)
}

struct Resolver<'a> {
    document: &'a ExecutableDocument,
    declared: Vec<String>,
    variables: Map<String, Json>,
}

impl Resolver<'_> {
    fn selection(
        &self,
        set: &SelectionSet,
        path: &str,
        visiting: &mut Vec<String>,
    ) -> Result<Selection, ArgumentError> {
        let mut selection = Selection::new();
        self.collect(set, path, visiting, &mut selection)?;
        Ok(selection)
    }

    fn collect(
        &self,
        set: &SelectionSet,
        path: &str,
        visiting: &mut Vec<String>,
        out: &mut Selection,
    ) -> Result<(), ArgumentError> {
        for item in &set.items {
            match &item.node {
                GqlSelection::Field(field) => {
                    let field = &field.node;
                    if self.included(&field.directives, path)? {
                        out.fields.push(self.field(field, path, visiting)?);
                    }
                }
                GqlSelection::FragmentSpread(spread) => {
                    let spread = &spread.node;
                    if !self.included(&spread.directives, path)? {
                        continue;
                    }
                    let name = spread.fragment_name.node.as_str();
                    let fragment = self
                        .document
                        .fragments
                        .get(&spread.fragment_name.node)
                        .ok_or_else(|| {
                            ArgumentError::invalid(path, format!("unknown fragment '{}'", name))
                        })?;
                    if visiting.iter().any(|v| v == name) {
                        return Err(ArgumentError::invalid(
                            path,
                            format!("fragment '{}' spreads itself", name),
                        ));
                    }
                    visiting.push(name.to_string());
                    self.collect(&fragment.node.selection_set.node, path, visiting, out)?;
                    visiting.pop();
                }
                GqlSelection::InlineFragment(fragment) => {
                    let fragment = &fragment.node;
                    if self.included(&fragment.directives, path)? {
                        self.collect(&fragment.selection_set.node, path, visiting, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn field(
        &self,
        field: &Field,
        path: &str,
        visiting: &mut Vec<String>,
    ) -> Result<SelectedField, ArgumentError> {
        let key = field.alias.as_ref().unwrap_or(&field.name).node.as_str();
        let field_path = join(path, key);

        let mut selected = SelectedField::new(field.name.node.as_str());
        if let Some(alias) = &field.alias {
            selected = selected.alias(alias.node.as_str());
        }
        for (name, value) in &field.arguments {
            let Some(value) = self.without_absent(&value.node) else {
                continue;
            };
            let value = self.value(&value, &join(&field_path, name.node.as_str()))?;
            selected = selected.argument(name.node.as_str(), value);
        }
        selected.selection = self.selection(&field.selection_set.node, &field_path, visiting)?;
        Ok(selected)
    }

    fn value(&self, value: &GqlValue, path: &str) -> Result<Json, ArgumentError> {
        value
            .clone()
            .into_const_with(|name| self.variable(&name, path))?
            .into_json()
            .map_err(|e| ArgumentError::invalid(path, e.to_string()))
    }

    /// Drop input fields fed by absent variables. `None` when the value itself
    /// is an absent variable; absent list items become null.
    fn without_absent(&self, value: &GqlValue) -> Option<GqlValue> {
        match value {
            GqlValue::Variable(name) if self.is_absent(name) => None,
            GqlValue::List(items) => Some(GqlValue::List(
                items
                    .iter()
                    .map(|item| self.without_absent(item).unwrap_or(GqlValue::Null))
                    .collect(),
            )),
            GqlValue::Object(fields) => Some(GqlValue::Object(
                fields
                    .iter()
                    .filter_map(|(name, field)| {
                        self.without_absent(field).map(|field| (name.clone(), field))
                    })
                    .collect(),
            )),
            other => Some(other.clone()),
        }
    }

    fn is_absent(&self, name: &Name) -> bool {
        !self.variables.contains_key(name.as_str())
            && self.declared.iter().any(|declared| declared == name.as_str())
    }

    fn variable(&self, name: &Name, path: &str) -> Result<ConstValue, ArgumentError> {
        let value = self.variables.get(name.as_str()).ok_or_else(|| {
            ArgumentError::invalid(path, format!("variable '${}' is not declared", name))
        })?;
        ConstValue::from_json(value.clone()).map_err(|e| ArgumentError::invalid(path, e.to_string()))
    }

    fn included(
        &self,
        directives: &[Positioned<Directive>],
        path: &str,
    ) -> Result<bool, ArgumentError> {
        for directive in directives {
            let directive = &directive.node;
            let name = directive.name.node.as_str();
            if name != "skip" && name != "include" {
                return Err(ArgumentError::invalid(
                    path,
                    format!("unsupported directive '@{}'", name),
                ));
            }

            let condition_path = format!("{}@{}.if", path, name);
            let condition = directive
                .arguments
                .iter()
                .find(|(arg, _)| arg.node.as_str() == "if")
                .map(|(_, value)| value)
                .ok_or_else(|| ArgumentError::Missing {
                    path: condition_path.clone(),
                })?;
            let condition = self
                .without_absent(&condition.node)
                .ok_or_else(|| ArgumentError::Missing {
                    path: condition_path.clone(),
                })?;
            let condition = self.value(&condition, &condition_path)?;
            let condition = condition
                .as_bool()
                .ok_or_else(|| ArgumentError::invalid_value(&condition_path, "Boolean", &condition))?;
            if (name == "skip") == condition {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

/// Response error entry.
fn error_entry(err: &Error, key: Option<&str>) -> Json {
    let mut entry = json!({
        "message": err.to_string(),
        "extensions": {"code": err.code()},
    });
    if let (Some(key), Json::Object(object)) = (key, &mut entry) {
        object.insert("path".to_string(), json!([key]));
    }
    entry
}

fn response(data: Json, errors: Vec<Json>) -> Json {
    let mut body = Map::new();
    body.insert("data".to_string(), data);
    if !errors.is_empty() {
        body.insert("errors".to_string(), Json::Array(errors));
    }
    Json::Object(body)
}

impl Engine {
    /// Run a GraphQL document and build a `{data, errors}` response body.
    ///
    /// A document that fails to parse yields `data: null`. A failing root
    /// field yields `null` under its key and one error entry; the other
    /// root fields still run.
    #[instrument(level = "debug", skip_all, fields(operation_name = ?request.operation_name))]
    pub async fn execute_document<E>(&self, executor: &E, request: &DocumentRequest) -> Json
    where
        E: Executor + ?Sized,
    {
        let document = match parse_document(request) {
            Ok(document) => document,
            Err(err) => {
                let err = Error::from(err);
                warn!(error = %err, "rejected document");
                return response(Json::Null, vec![error_entry(&err, None)]);
            }
        };
        debug!(kind = ?document.kind, fields = document.fields.len(), "parsed document");

        let mut data = Map::new();
        let mut errors = Vec::new();
        for field in &document.fields {
            let key = field.response_key().to_string();
            if field.name == TYPENAME_FIELD {
                data.insert(key, Json::String(document.kind.type_name().to_string()));
                continue;
            }

            match self.execute_root(executor, document.kind, field).await {
                Ok(value) => {
                    data.insert(key, value);
                }
                Err(err) => {
                    warn!(field = %key, code = err.code(), error = %err, "root field failed");
                    errors.push(error_entry(&err, Some(&key)));
                    data.insert(key, Json::Null);
                }
            }
        }
        response(Json::Object(data), errors)
    }

    async fn execute_root<E>(
        &self,
        executor: &E,
        kind: DocumentKind,
        field: &SelectedField,
    ) -> Result<Json, Error>
    where
        E: Executor + ?Sized,
    {
        let operation = self
            .operation(&field.name)
            .ok_or_else(|| ArgumentError::UnknownOperation(field.name.clone()))?;
        let is_mutation = kind == DocumentKind::Mutation;
        if operation.kind.is_mutation() != is_mutation {
            return Err(ArgumentError::invalid(
                field.response_key(),
                format!(
                    "'{}' is not a field of {}",
                    field.name,
                    kind.type_name()
                ),
            )
            .into());
        }
        self.execute(executor, &field.name, &field.arguments, &field.selection)
            .await
    }
}

//! Root operations: their fields, argument parsing and compilation.
//!
//! Every table gets six operations. Compiling an operation turns its
//! arguments and field selection into exactly one executor request plus the
//! plan for remapping the executor's answer.

use heck::ToLowerCamelCase;
use relgraph_proto::{
    ConflictAction, DeleteStatement, FieldValue, InsertStatement, Mutation, RelationInclude,
    SelectQuery, UpdateStatement,
};
use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::catalog::Cardinality;
use crate::config::{ConflictPolicy, EngineConfig, MutationResponse};
use crate::error::ArgumentError;
use crate::filter::compile_filter;
use crate::order::compile_order;
use crate::selection::{
    prune, prune_item, prune_success, ObjectOutput, RelationPlan, Selection, SelectionPlan,
};
use crate::types::{
    type_prefix, FieldDef, GeneratedSchema, InputObjectType, TableTypes, TypeRef,
    MUTATION_SUCCESS_TYPE,
};

/// The six per-table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    SelectMany,
    SelectOne,
    InsertMany,
    InsertOne,
    Update,
    Delete,
}

impl OperationKind {
    /// All kinds, in generation order.
    pub const ALL: [OperationKind; 6] = [
        OperationKind::SelectMany,
        OperationKind::SelectOne,
        OperationKind::InsertMany,
        OperationKind::InsertOne,
        OperationKind::Update,
        OperationKind::Delete,
    ];

    pub fn is_mutation(&self) -> bool {
        !matches!(self, OperationKind::SelectMany | OperationKind::SelectOne)
    }

    /// Name of the root field for a table, e.g. `insertIntoUsersSingle`.
    pub fn operation_name(&self, table: &str) -> String {
        let prefix = type_prefix(table);
        match self {
            OperationKind::SelectMany => table.to_lower_camel_case(),
            OperationKind::SelectOne => format!("{}Single", table.to_lower_camel_case()),
            OperationKind::InsertMany => format!("insertInto{}", prefix),
            OperationKind::InsertOne => format!("insertInto{}Single", prefix),
            OperationKind::Update => format!("update{}", prefix),
            OperationKind::Delete => format!("deleteFrom{}", prefix),
        }
    }

    /// Argument names the root field accepts.
    pub fn arguments(&self) -> &'static [&'static str] {
        match self {
            OperationKind::SelectMany => &["offset", "limit", "orderBy", "where"],
            OperationKind::SelectOne => &["offset", "orderBy", "where"],
            OperationKind::InsertMany | OperationKind::InsertOne => &["values"],
            OperationKind::Update => &["set", "where"],
            OperationKind::Delete => &["where"],
        }
    }
}

/// A generated root operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub kind: OperationKind,
    pub table: String,
}

/// The operations generated for one table.
pub fn table_operations(table: &str) -> Vec<Operation> {
    OperationKind::ALL
        .iter()
        .map(|&kind| Operation {
            name: kind.operation_name(table),
            kind,
            table: table.to_string(),
        })
        .collect()
}

/// Root field definition of an operation.
pub fn root_field(
    operation: &Operation,
    types: &TableTypes,
    select_type: &str,
    response: MutationResponse,
) -> FieldDef {
    let int = || TypeRef::named("Int");
    let filters = || TypeRef::named(types.filters.clone());
    let order_by = || TypeRef::named(types.order_by.clone());
    let item_list = || TypeRef::list(TypeRef::named(types.item.clone()).non_null()).non_null();
    let success = || TypeRef::named(MUTATION_SUCCESS_TYPE).non_null();
    let mutation_output = |returning: TypeRef| match response {
        MutationResponse::Returning => returning,
        MutationResponse::Success => success(),
    };

    match operation.kind {
        OperationKind::SelectMany => FieldDef::new(
            &operation.name,
            TypeRef::list(TypeRef::named(select_type).non_null()).non_null(),
        )
        .with_arg("offset", int())
        .with_arg("limit", int())
        .with_arg("orderBy", order_by())
        .with_arg("where", filters()),
        OperationKind::SelectOne => FieldDef::new(&operation.name, TypeRef::named(select_type))
            .with_arg("offset", int())
            .with_arg("orderBy", order_by())
            .with_arg("where", filters()),
        OperationKind::InsertMany => FieldDef::new(&operation.name, mutation_output(item_list()))
            .with_arg(
                "values",
                TypeRef::list(TypeRef::named(types.insert_input.clone()).non_null()).non_null(),
            ),
        OperationKind::InsertOne => FieldDef::new(
            &operation.name,
            mutation_output(TypeRef::named(types.item.clone())),
        )
        .with_arg("values", TypeRef::named(types.insert_input.clone()).non_null()),
        OperationKind::Update => FieldDef::new(&operation.name, mutation_output(item_list()))
            .with_arg("set", TypeRef::named(types.update_input.clone()).non_null())
            .with_arg("where", filters()),
        OperationKind::Delete => {
            FieldDef::new(&operation.name, mutation_output(item_list())).with_arg("where", filters())
        }
    }
}

/// Paging, ordering and filtering arguments of a select.
///
/// `order_by` and `filter` stay raw until they are compiled against the
/// table's columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectArgs {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub order_by: Json,
    pub filter: Json,
}

/// Parsed arguments of a root operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationArgs {
    SelectMany(SelectArgs),
    SelectOne(SelectArgs),
    InsertMany { values: Vec<Map<String, Json>> },
    InsertOne { values: Map<String, Json> },
    Update { set: Map<String, Json>, filter: Json },
    Delete { filter: Json },
}

impl OperationArgs {
    /// Parse the raw arguments of an operation.
    ///
    /// `null` arguments count as absent. A single object passed as `values`
    /// of a multi-row insert is read as a one-element list.
    pub fn parse(operation: &Operation, args: &Map<String, Json>) -> Result<Self, ArgumentError> {
        let name = operation.name.as_str();
        check_arguments(args, operation.kind.arguments(), name)?;

        let parsed = match operation.kind {
            OperationKind::SelectMany => OperationArgs::SelectMany(select_args(args, name)?),
            OperationKind::SelectOne => OperationArgs::SelectOne(select_args(args, name)?),
            OperationKind::InsertMany => {
                let values = match present(args, "values") {
                    None => return Err(missing(name, "values")),
                    Some(Json::Array(items)) => items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| object(item, &format!("{}.values.{}", name, i)))
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(item) => vec![object(item, &format!("{}.values", name))?],
                };
                if values.is_empty() {
                    return Err(ArgumentError::EmptyInsert {
                        operation: name.to_string(),
                    });
                }
                OperationArgs::InsertMany { values }
            }
            OperationKind::InsertOne => {
                let values = present(args, "values").ok_or_else(|| missing(name, "values"))?;
                OperationArgs::InsertOne {
                    values: object(values, &format!("{}.values", name))?,
                }
            }
            OperationKind::Update => {
                let set = present(args, "set").ok_or_else(|| missing(name, "set"))?;
                let set = object(set, &format!("{}.set", name))?;
                if set.is_empty() {
                    return Err(ArgumentError::EmptyUpdate {
                        operation: name.to_string(),
                    });
                }
                OperationArgs::Update {
                    set,
                    filter: raw(args, "where"),
                }
            }
            OperationKind::Delete => OperationArgs::Delete {
                filter: raw(args, "where"),
            },
        };
        Ok(parsed)
    }
}

/// The executor request of a compiled operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Select(SelectQuery),
    Mutate(Mutation),
}

/// How the executor's answer becomes the response value.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePlan {
    /// A list of objects.
    List(SelectionPlan),
    /// The first object, or `null`.
    Single(SelectionPlan),
    /// The success-flag object.
    Success(ObjectOutput),
}

/// An operation ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOperation {
    pub name: String,
    pub kind: OperationKind,
    pub table: String,
    pub request: Request,
    pub response: ResponsePlan,
}

/// Compile an operation with its arguments and selection.
///
/// Nothing here talks to the executor: every argument error surfaces
/// before a query exists.
pub fn compile_operation(
    generated: &GeneratedSchema,
    config: &EngineConfig,
    operation: &Operation,
    args: OperationArgs,
    selection: &Selection,
) -> Result<CompiledOperation, ArgumentError> {
    let name = operation.name.as_str();
    let types = generated.table(&operation.table).ok_or_else(|| {
        ArgumentError::invalid(
            name,
            format!("no types generated for table '{}'", operation.table),
        )
    })?;

    let (request, response) = match args {
        OperationArgs::SelectMany(args) => {
            let plan = prune(generated, types.select, selection, name)?;
            let query = select_query(generated, types, &plan, &args, "")?;
            (Request::Select(query), ResponsePlan::List(plan))
        }
        OperationArgs::SelectOne(args) => {
            let plan = prune(generated, types.select, selection, name)?;
            let args = SelectArgs {
                limit: Some(1),
                ..args
            };
            let query = select_query(generated, types, &plan, &args, "")?;
            (Request::Select(query), ResponsePlan::Single(plan))
        }
        args => {
            let (returning, response) =
                mutation_response(generated, config, operation, selection)?;
            let mutation = match args {
                OperationArgs::InsertMany { values } => {
                    insert_statement(generated, config, types, &values, returning)?
                }
                OperationArgs::InsertOne { values } => insert_statement(
                    generated,
                    config,
                    types,
                    std::slice::from_ref(&values),
                    returning,
                )?,
                OperationArgs::Update { set, filter } => {
                    let input = input_type(generated, &types.update_input, name)?;
                    let set = input_row(types, input, &set, "set", false)?;
                    Mutation::Update(UpdateStatement {
                        table: types.table.clone(),
                        set,
                        filter: compile_filter(&types.columns, &filter, "where")?,
                        returning,
                    })
                }
                OperationArgs::Delete { filter } => Mutation::Delete(DeleteStatement {
                    table: types.table.clone(),
                    filter: compile_filter(&types.columns, &filter, "where")?,
                    returning,
                }),
                OperationArgs::SelectMany(_) | OperationArgs::SelectOne(_) => {
                    return Err(ArgumentError::invalid(name, "not a mutation"))
                }
            };
            (Request::Mutate(mutation), response)
        }
    };

    debug!(operation = %name, table = %operation.table, "compiled operation");
    Ok(CompiledOperation {
        name: operation.name.clone(),
        kind: operation.kind,
        table: operation.table.clone(),
        request,
        response,
    })
}

fn mutation_response(
    generated: &GeneratedSchema,
    config: &EngineConfig,
    operation: &Operation,
    selection: &Selection,
) -> Result<(Option<Vec<String>>, ResponsePlan), ArgumentError> {
    match config.mutation_response {
        MutationResponse::Success => {
            let output = prune_success(selection, &operation.name)?;
            Ok((None, ResponsePlan::Success(output)))
        }
        MutationResponse::Returning => {
            let plan = prune_item(generated, &operation.table, selection, &operation.name)?;
            let returning = Some(plan.columns.clone());
            let response = if operation.kind == OperationKind::InsertOne {
                ResponsePlan::Single(plan)
            } else {
                ResponsePlan::List(plan)
            };
            Ok((returning, response))
        }
    }
}

fn insert_statement(
    generated: &GeneratedSchema,
    config: &EngineConfig,
    types: &TableTypes,
    values: &[Map<String, Json>],
    returning: Option<Vec<String>>,
) -> Result<Mutation, ArgumentError> {
    let input = input_type(generated, &types.insert_input, "values")?;
    let rows = values
        .iter()
        .enumerate()
        .map(|(i, object)| {
            let path = if values.len() == 1 {
                "values".to_string()
            } else {
                format!("values.{}", i)
            };
            input_row(types, input, object, &path, true)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let on_conflict = match config.conflict_policy_for(&types.table) {
        ConflictPolicy::Skip => ConflictAction::DoNothing,
        ConflictPolicy::Error => ConflictAction::Error,
    };
    Ok(Mutation::Insert(InsertStatement {
        table: types.table.clone(),
        rows,
        returning,
        on_conflict,
    }))
}

/// Check an input object against a generated input type and convert its
/// values, in input-field order.
fn input_row(
    types: &TableTypes,
    input: &InputObjectType,
    object: &Map<String, Json>,
    path: &str,
    insert: bool,
) -> Result<Vec<FieldValue>, ArgumentError> {
    if let Some(unknown) = object.keys().find(|key| input.field(key).is_none()) {
        return Err(ArgumentError::unknown_field(path, unknown.as_str()));
    }

    let mut row = Vec::with_capacity(object.len());
    for field in &input.fields {
        let field_path = format!("{}.{}", path, field.name);
        let Some(value) = object.get(&field.name) else {
            if insert && field.ty.is_non_null() {
                return Err(ArgumentError::Missing { path: field_path });
            }
            continue;
        };
        let mapping = types
            .column(&field.name)
            .ok_or_else(|| ArgumentError::unknown_field(path, field.name.as_str()))?;
        row.push(FieldValue::new(&field.name, mapping.deserialize(value, &field_path)?));
    }
    Ok(row)
}

fn input_type<'a>(
    generated: &'a GeneratedSchema,
    name: &str,
    path: &str,
) -> Result<&'a InputObjectType, ArgumentError> {
    generated
        .registry()
        .input_object(name)
        .ok_or_else(|| ArgumentError::invalid(path, format!("input type '{}' is not generated", name)))
}

/// Build the select query for a pruned plan, recursing into relation
/// includes with their own arguments.
fn select_query(
    generated: &GeneratedSchema,
    types: &TableTypes,
    plan: &SelectionPlan,
    args: &SelectArgs,
    path: &str,
) -> Result<SelectQuery, ArgumentError> {
    let mut query = SelectQuery::new(&types.table).with_columns(plan.columns.clone());
    query.filter = compile_filter(&types.columns, &args.filter, &join(path, "where"))?;
    query.order_by = compile_order(&types.columns, &args.order_by, &join(path, "orderBy"))?;
    query.offset = args.offset;
    query.limit = args.limit;

    for relation in &plan.relations {
        let relation_path = join(path, &relation.name);
        let target = generated.table(&relation.target).ok_or_else(|| {
            ArgumentError::invalid(
                &relation_path,
                format!("no types generated for table '{}'", relation.target),
            )
        })?;
        let relation_args = relation_args(relation, &relation_path)?;
        let nested = select_query(generated, target, &relation.plan, &relation_args, &relation_path)?;
        query = query.include(RelationInclude::new(&relation.name, nested));
    }
    Ok(query)
}

fn relation_args(relation: &RelationPlan, path: &str) -> Result<SelectArgs, ArgumentError> {
    let allowed: &[&str] = match relation.cardinality {
        Cardinality::One => &["where", "orderBy"],
        Cardinality::Many => &["where", "orderBy", "offset", "limit"],
    };
    check_arguments(&relation.arguments, allowed, path)?;
    select_args(&relation.arguments, path)
}

fn select_args(args: &Map<String, Json>, path: &str) -> Result<SelectArgs, ArgumentError> {
    Ok(SelectArgs {
        offset: count(args, "offset", path)?,
        limit: count(args, "limit", path)?,
        order_by: raw(args, "orderBy"),
        filter: raw(args, "where"),
    })
}

fn check_arguments(
    args: &Map<String, Json>,
    allowed: &[&str],
    path: &str,
) -> Result<(), ArgumentError> {
    match args.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(unknown) => Err(ArgumentError::unknown_field(path, unknown.as_str())),
        None => Ok(()),
    }
}

fn present<'a>(args: &'a Map<String, Json>, name: &str) -> Option<&'a Json> {
    args.get(name).filter(|v| !v.is_null())
}

fn raw(args: &Map<String, Json>, name: &str) -> Json {
    present(args, name).cloned().unwrap_or(Json::Null)
}

fn count(args: &Map<String, Json>, name: &str, path: &str) -> Result<Option<u64>, ArgumentError> {
    match present(args, name) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| ArgumentError::invalid_value(join(path, name), "non-negative Int", value)),
    }
}

fn object(value: &Json, path: &str) -> Result<Map<String, Json>, ArgumentError> {
    match value {
        Json::Object(object) => Ok(object.clone()),
        other => Err(ArgumentError::invalid_value(path, "input object", other)),
    }
}

fn missing(operation: &str, argument: &str) -> ArgumentError {
    ArgumentError::Missing {
        path: format!("{}.{}", operation, argument),
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

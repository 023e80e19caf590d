//! Field selections and projection pruning.
//!
//! A [`Selection`] is the field tree a client asked for. Pruning checks it
//! against a generated output type and yields a [`SelectionPlan`]: the exact
//! columns and relation includes the executor has to load, and the output
//! tree the remapper fills from the returned rows.

use serde_json::{Map, Value as Json};

use crate::catalog::Cardinality;
use crate::error::ArgumentError;
use crate::types::{GeneratedSchema, SelectShape, ShapeId, TableTypes, MUTATION_SUCCESS_TYPE};

/// Introspection field answered from the output type name.
pub const TYPENAME_FIELD: &str = "__typename";

/// Field of the success-flag mutation output.
pub const SUCCESS_FIELD: &str = "isSuccess";

/// A requested field tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub fields: Vec<SelectedField>,
}

/// One requested field.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedField {
    pub name: String,
    pub alias: Option<String>,
    pub arguments: Map<String, Json>,
    pub selection: Selection,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection of plain fields without arguments.
    pub fn of(names: &[&str]) -> Self {
        Self {
            fields: names.iter().map(|n| SelectedField::new(*n)).collect(),
        }
    }

    pub fn field(mut self, field: SelectedField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl SelectedField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: Map::new(),
            selection: Selection::default(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn argument(mut self, name: impl Into<String>, value: Json) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    pub fn select(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Key of the field in the response object.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Output tree of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectOutput {
    pub type_name: String,
    /// Table the object is read from; `None` for the success-flag output.
    pub table: Option<String>,
    pub fields: Vec<OutputField>,
}

/// One entry of an output object, in selection order.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputField {
    Column {
        key: String,
        column: String,
    },
    Typename {
        key: String,
    },
    Relation {
        key: String,
        relation: String,
        cardinality: Cardinality,
        object: ObjectOutput,
    },
}

/// Columns and relations to load for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPlan {
    /// Projected columns, never empty.
    pub columns: Vec<String>,
    pub relations: Vec<RelationPlan>,
    pub output: ObjectOutput,
}

/// A relation to load, with the raw arguments of its field.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationPlan {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
    pub arguments: Map<String, Json>,
    pub plan: SelectionPlan,
}

impl SelectionPlan {
    fn new(type_name: &str, table: &str) -> Self {
        Self {
            columns: Vec::new(),
            relations: Vec::new(),
            output: ObjectOutput {
                type_name: type_name.to_string(),
                table: Some(table.to_string()),
                fields: Vec::new(),
            },
        }
    }

    fn add_column(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
    }

    /// The executor takes one include per relation, so a relation selected
    /// twice is merged, which requires identical arguments.
    fn add_relation(&mut self, relation: RelationPlan, path: &str) -> Result<(), ArgumentError> {
        match self.relations.iter_mut().find(|r| r.name == relation.name) {
            Some(existing) => {
                if existing.arguments != relation.arguments {
                    return Err(ArgumentError::invalid(
                        path,
                        format!(
                            "relation '{}' is selected more than once with different arguments",
                            relation.name
                        ),
                    ));
                }
                existing.plan.merge(relation.plan, path)
            }
            None => {
                self.relations.push(relation);
                Ok(())
            }
        }
    }

    fn merge(&mut self, other: SelectionPlan, path: &str) -> Result<(), ArgumentError> {
        for column in &other.columns {
            self.add_column(column);
        }
        for relation in other.relations {
            self.add_relation(relation, path)?;
        }
        Ok(())
    }
}

/// Prune a selection against a select type.
pub fn prune(
    generated: &GeneratedSchema,
    shape: ShapeId,
    selection: &Selection,
    path: &str,
) -> Result<SelectionPlan, ArgumentError> {
    let shape = generated.shape(shape);
    let types = table_types(generated, &shape.table, path)?;
    prune_object(generated, types, &shape.type_name, Some(shape), selection, path)
}

/// Prune a selection against the scalar-only `<Table>Item` mutation output.
pub fn prune_item(
    generated: &GeneratedSchema,
    table: &str,
    selection: &Selection,
    path: &str,
) -> Result<SelectionPlan, ArgumentError> {
    let types = table_types(generated, table, path)?;
    prune_object(generated, types, &types.item, None, selection, path)
}

/// Check a selection against `MutationSuccess`.
pub fn prune_success(selection: &Selection, path: &str) -> Result<ObjectOutput, ArgumentError> {
    let mut fields = Vec::with_capacity(selection.fields.len());
    for field in &selection.fields {
        let key = field.response_key().to_string();
        leaf(field, &format!("{}.{}", path, key))?;
        fields.push(match field.name.as_str() {
            TYPENAME_FIELD => OutputField::Typename { key },
            SUCCESS_FIELD => OutputField::Column {
                key,
                column: SUCCESS_FIELD.to_string(),
            },
            other => return Err(ArgumentError::unknown_field(path, other)),
        });
    }
    Ok(ObjectOutput {
        type_name: MUTATION_SUCCESS_TYPE.to_string(),
        table: None,
        fields,
    })
}

fn table_types<'a>(
    generated: &'a GeneratedSchema,
    table: &str,
    path: &str,
) -> Result<&'a TableTypes, ArgumentError> {
    generated
        .table(table)
        .ok_or_else(|| ArgumentError::invalid(path, format!("no types generated for table '{}'", table)))
}

fn prune_object(
    generated: &GeneratedSchema,
    types: &TableTypes,
    type_name: &str,
    shape: Option<&SelectShape>,
    selection: &Selection,
    path: &str,
) -> Result<SelectionPlan, ArgumentError> {
    let mut plan = SelectionPlan::new(type_name, &types.table);

    for field in &selection.fields {
        let key = field.response_key().to_string();
        let field_path = format!("{}.{}", path, key);

        if field.name == TYPENAME_FIELD {
            leaf(field, &field_path)?;
            plan.output.fields.push(OutputField::Typename { key });
            continue;
        }

        if types.column(&field.name).is_some() {
            leaf(field, &field_path)?;
            plan.add_column(&field.name);
            plan.output.fields.push(OutputField::Column {
                key,
                column: field.name.clone(),
            });
            continue;
        }

        let relation = shape
            .and_then(|s| s.relation(&field.name))
            .ok_or_else(|| ArgumentError::unknown_field(path, field.name.as_str()))?;
        if field.selection.is_empty() {
            return Err(ArgumentError::invalid(
                &field_path,
                "relation fields need a sub-selection",
            ));
        }

        let sub = prune(generated, relation.shape, &field.selection, &field_path)?;
        plan.output.fields.push(OutputField::Relation {
            key,
            relation: relation.name.clone(),
            cardinality: relation.cardinality,
            object: sub.output.clone(),
        });
        plan.add_relation(
            RelationPlan {
                name: relation.name.clone(),
                target: relation.target.clone(),
                cardinality: relation.cardinality,
                arguments: field.arguments.clone(),
                plan: sub,
            },
            &field_path,
        )?;
    }

    // The executor always gets an explicit projection.
    if plan.columns.is_empty() {
        plan.columns.push(types.identity.clone());
    }
    Ok(plan)
}

fn leaf(field: &SelectedField, path: &str) -> Result<(), ArgumentError> {
    if !field.arguments.is_empty() {
        return Err(ArgumentError::invalid(path, "field takes no arguments"));
    }
    if !field.selection.is_empty() {
        return Err(ArgumentError::invalid(path, "field takes no sub-selection"));
    }
    Ok(())
}

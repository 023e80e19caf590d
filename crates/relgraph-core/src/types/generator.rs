//! Relation-aware type generation.
//!
//! Generation runs once per schema load, in three passes:
//!
//! 1. per table: column mappings, enum types, filter / order-by inputs,
//!    insert / update inputs and the scalar-only `<Table>Item` output
//! 2. per table: the select output type, descending into relations while the
//!    depth limit allows
//! 3. the `Query` and `Mutation` roots, with six operations per table
//!
//! Select types form a graph that may contain cycles. Shapes live in an
//! arena and are memoized by `(table, remaining depth)`; a shape's slot and
//! name are reserved before its relations are visited, so a cycle resolves
//! to a reference to the type under construction.

use heck::ToUpperCamelCase;
use std::collections::HashMap;
use tracing::{debug, info};

use super::{
    print_sdl, FieldDef, InputObjectType, InputValueDef, ObjectType, ScalarType, TypeRef,
    TypeRegistry,
};
use crate::catalog::{Cardinality, Schema, Table};
use crate::config::{EngineConfig, MutationResponse};
use crate::error::SchemaError;
use crate::filter::{filter_types, filters_type_name};
use crate::operations::{root_field, table_operations, Operation};
use crate::order::{order_by_type, order_by_type_name, order_direction_type};
use crate::scalar::{map_table, ColumnMapping, ScalarKind, JSON_SCALAR};

/// Name of the shared sort direction enum.
pub const ORDER_DIRECTION_TYPE: &str = "OrderDirection";

/// Name of the mutation output in success-flag mode.
pub const MUTATION_SUCCESS_TYPE: &str = "MutationSuccess";

const QUERY_TYPE: &str = "Query";
const MUTATION_TYPE: &str = "Mutation";

/// Prefix of every type generated for a table, e.g. `user_posts` -> `UserPosts`.
pub fn type_prefix(table: &str) -> String {
    table.to_upper_camel_case()
}

/// Index of a select shape in the generated arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId(usize);

/// A generated select output type.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectShape {
    pub type_name: String,
    pub table: String,
    /// Relation fields present on this type. Empty when the depth limit is
    /// reached.
    pub relations: Vec<RelationShape>,
}

impl SelectShape {
    pub fn relation(&self, name: &str) -> Option<&RelationShape> {
        self.relations.iter().find(|r| r.name == name)
    }
}

/// A relation field of a select type.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationShape {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
    pub shape: ShapeId,
}

/// Names and mappings generated for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableTypes {
    pub table: String,
    /// Column mappings in declaration order.
    pub columns: Vec<ColumnMapping>,
    /// Identity column, projected when a selection asks for no columns.
    pub identity: String,
    /// Top-level select type.
    pub select: ShapeId,
    pub item: String,
    pub insert_input: String,
    pub update_input: String,
    pub filters: String,
    pub order_by: String,
}

impl TableTypes {
    pub fn column(&self, name: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// Every type and operation generated from a schema.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct GeneratedSchema {
    registry: TypeRegistry,
    tables: HashMap<String, TableTypes>,
    shapes: Vec<SelectShape>,
    operations: Vec<Operation>,
    operation_index: HashMap<String, usize>,
}

impl GeneratedSchema {
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn table(&self, name: &str) -> Option<&TableTypes> {
        self.tables.get(name)
    }

    pub fn shape(&self, id: ShapeId) -> &SelectShape {
        &self.shapes[id.0]
    }

    /// Look up a generated operation by name.
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operation_index.get(name).map(|&i| &self.operations[i])
    }

    /// Operations in generation order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// The generated schema as GraphQL SDL.
    pub fn sdl(&self) -> String {
        print_sdl(&self.registry)
    }
}

/// Generate all types and operations for a schema.
pub fn generate(schema: &Schema, config: &EngineConfig) -> Result<GeneratedSchema, SchemaError> {
    schema.validate()?;

    let mut generator = Generator {
        schema,
        limit: config.relations_depth_limit,
        registry: TypeRegistry::new(),
        columns: HashMap::new(),
        shapes: Vec::new(),
        memo: HashMap::new(),
    };
    generator.registry.register(order_direction_type())?;

    for table in schema.tables() {
        generator.table_inputs(table)?;
    }

    let mut tables = HashMap::with_capacity(schema.len());
    for table in schema.tables() {
        let select = generator.select_shape(&table.name, generator.limit)?;
        let prefix = type_prefix(&table.name);
        let identity = table
            .identity_column()
            .map(|c| c.name.clone())
            .ok_or_else(|| SchemaError::EmptyTable(table.name.clone()))?;
        let columns = generator.columns.get(&table.name).cloned().unwrap_or_default();
        tables.insert(
            table.name.clone(),
            TableTypes {
                table: table.name.clone(),
                columns,
                identity,
                select,
                item: format!("{}Item", prefix),
                insert_input: format!("{}InsertInput", prefix),
                update_input: format!("{}UpdateInput", prefix),
                filters: filters_type_name(&prefix),
                order_by: order_by_type_name(&prefix),
            },
        );
    }

    let Generator {
        mut registry,
        shapes,
        ..
    } = generator;

    if config.mutation_response == MutationResponse::Success {
        registry.register(ObjectType::new(
            MUTATION_SUCCESS_TYPE,
            vec![FieldDef::new("isSuccess", TypeRef::named("Boolean").non_null())],
        ))?;
    }

    let mut operations = Vec::new();
    let mut operation_index: HashMap<String, usize> = HashMap::new();
    let mut query_fields = Vec::new();
    let mut mutation_fields = Vec::new();

    for name in schema.table_names() {
        let Some(types) = tables.get(name) else {
            continue;
        };
        let select_type = &shapes[types.select.0].type_name;
        for operation in table_operations(name) {
            if let Some(&existing) = operation_index.get(&operation.name) {
                let other: &Operation = &operations[existing];
                return Err(SchemaError::NameCollision {
                    name: operation.name.clone(),
                    detail: format!(
                        "operation generated for both table '{}' and table '{}'",
                        other.table, operation.table
                    ),
                });
            }
            let field = root_field(&operation, types, select_type, config.mutation_response);
            if operation.kind.is_mutation() {
                mutation_fields.push(field);
            } else {
                query_fields.push(field);
            }
            operation_index.insert(operation.name.clone(), operations.len());
            operations.push(operation);
        }
    }

    if !query_fields.is_empty() {
        registry.register(ObjectType::new(QUERY_TYPE, query_fields))?;
    }
    if !mutation_fields.is_empty() {
        registry.register(ObjectType::new(MUTATION_TYPE, mutation_fields))?;
    }

    info!(
        tables = schema.len(),
        types = registry.len(),
        select_shapes = shapes.len(),
        operations = operations.len(),
        depth_limit = ?config.relations_depth_limit,
        "generated schema types"
    );

    Ok(GeneratedSchema {
        registry,
        tables,
        shapes,
        operations,
        operation_index,
    })
}

struct Generator<'a> {
    schema: &'a Schema,
    limit: Option<usize>,
    registry: TypeRegistry,
    columns: HashMap<String, Vec<ColumnMapping>>,
    shapes: Vec<SelectShape>,
    memo: HashMap<(String, Option<usize>), ShapeId>,
}

impl Generator<'_> {
    /// Pass 1: everything of a table that does not involve relations.
    fn table_inputs(&mut self, table: &Table) -> Result<(), SchemaError> {
        let prefix = type_prefix(&table.name);
        let columns = map_table(table)?;

        for mapping in &columns {
            if let Some(enum_type) = mapping.enum_type() {
                self.registry.register(enum_type)?;
            }
            if uses_json(&mapping.kind()) {
                self.registry.register(ScalarType::new(JSON_SCALAR))?;
            }
        }

        for input in filter_types(&prefix, &columns) {
            self.registry.register(input)?;
        }
        self.registry.register(order_by_type(&prefix, &columns))?;

        let mut insert_fields = Vec::new();
        let mut update_fields = Vec::new();
        for (column, mapping) in table.columns.iter().zip(&columns) {
            if !column.is_writable() {
                continue;
            }
            let ty = mapping.kind().type_ref();
            update_fields.push(InputValueDef::new(&column.name, ty.clone()));
            insert_fields.push(InputValueDef::new(
                &column.name,
                if column.is_required_on_insert() {
                    ty.non_null()
                } else {
                    ty
                },
            ));
        }
        self.registry.register(InputObjectType::new(
            format!("{}InsertInput", prefix),
            insert_fields,
        ))?;
        self.registry.register(InputObjectType::new(
            format!("{}UpdateInput", prefix),
            update_fields,
        ))?;

        self.registry.register(ObjectType::new(
            format!("{}Item", prefix),
            columns
                .iter()
                .map(|m| FieldDef::new(&m.column, m.output_type()))
                .collect(),
        ))?;

        debug!(table = %table.name, columns = columns.len(), "generated table inputs");
        self.columns.insert(table.name.clone(), columns);
        Ok(())
    }

    /// Pass 2: the select type of `table` with `remaining` relation hops left.
    fn select_shape(&mut self, table: &str, remaining: Option<usize>) -> Result<ShapeId, SchemaError> {
        let key = (table.to_string(), remaining);
        if let Some(&id) = self.memo.get(&key) {
            return Ok(id);
        }

        let prefix = type_prefix(table);
        let type_name = match (remaining, self.limit) {
            (Some(r), Some(limit)) if r < limit => format!("{}Level{}SelectItem", prefix, r),
            _ => format!("{}SelectItem", prefix),
        };

        let id = ShapeId(self.shapes.len());
        self.shapes.push(SelectShape {
            type_name: type_name.clone(),
            table: table.to_string(),
            relations: Vec::new(),
        });
        self.memo.insert(key, id);

        let mut fields: Vec<FieldDef> = self
            .columns
            .get(table)
            .map(|columns| {
                columns
                    .iter()
                    .map(|m| FieldDef::new(&m.column, m.output_type()))
                    .collect()
            })
            .unwrap_or_default();

        let child_remaining = match remaining {
            None => Some(None),
            Some(0) => None,
            Some(r) => Some(Some(r - 1)),
        };

        let mut relations = Vec::new();
        if let Some(child_remaining) = child_remaining {
            let schema = self.schema;
            for relation in schema.relations_of(table) {
                let child = self.select_shape(&relation.target, child_remaining)?;
                let target_prefix = type_prefix(&relation.target);
                let object = TypeRef::named(self.shapes[child.0].type_name.clone());

                let mut field = match relation.cardinality {
                    Cardinality::Many => {
                        FieldDef::new(&relation.name, TypeRef::list(object.non_null()).non_null())
                    }
                    Cardinality::One => FieldDef::new(&relation.name, object),
                }
                .with_arg("where", TypeRef::named(filters_type_name(&target_prefix)))
                .with_arg("orderBy", TypeRef::named(order_by_type_name(&target_prefix)));
                if relation.is_many() {
                    field = field
                        .with_arg("offset", TypeRef::named("Int"))
                        .with_arg("limit", TypeRef::named("Int"));
                }
                fields.push(field);

                relations.push(RelationShape {
                    name: relation.name.clone(),
                    target: relation.target.clone(),
                    cardinality: relation.cardinality,
                    shape: child,
                });
            }
        }

        self.shapes[id.0].relations = relations;
        self.registry.register(ObjectType::new(type_name, fields))?;
        Ok(id)
    }
}

fn uses_json(kind: &ScalarKind) -> bool {
    match kind {
        ScalarKind::Json => true,
        ScalarKind::List(inner) => uses_json(inner),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, ColumnKind, DefaultValue, Relation};

    fn blog() -> Schema {
        let users = Table::new("users")
            .with_column(
                Column::new("id", ColumnKind::int())
                    .primary_key()
                    .with_default(DefaultValue::AutoIncrement),
            )
            .with_column(Column::new("name", ColumnKind::text()))
            .with_column(Column::nullable("profile", ColumnKind::Json));
        let posts = Table::new("posts")
            .with_column(Column::new("id", ColumnKind::int()).primary_key())
            .with_column(Column::new("user_id", ColumnKind::int()))
            .with_column(Column::new("title", ColumnKind::text()))
            .with_column(Column::new("slug", ColumnKind::text()).generated());

        Schema::new()
            .with_table(users)
            .with_table(posts)
            .with_relation(Relation::many("posts", "users", "posts").on("id", "user_id"))
            .with_relation(Relation::one("author", "posts", "users").on("user_id", "id"))
    }

    fn object<'a>(generated: &'a GeneratedSchema, name: &str) -> &'a ObjectType {
        generated
            .registry()
            .object(name)
            .unwrap_or_else(|| panic!("missing type {}", name))
    }

    #[test]
    fn test_unlimited_depth_reuses_types() {
        let generated = generate(&blog(), &EngineConfig::new()).unwrap();

        let users = object(&generated, "UsersSelectItem");
        assert_eq!(
            users.field("posts").unwrap().ty.to_string(),
            "[PostsSelectItem!]!"
        );
        let posts = object(&generated, "PostsSelectItem");
        assert_eq!(posts.field("author").unwrap().ty.to_string(), "UsersSelectItem");

        // the cycle users -> posts -> users resolves to the same two types
        let shape = generated.shape(generated.table("users").unwrap().select);
        let posts_shape = generated.shape(shape.relation("posts").unwrap().shape);
        assert_eq!(
            posts_shape.relation("author").unwrap().shape,
            generated.table("users").unwrap().select
        );
        assert!(!generated.registry().contains("UsersLevel0SelectItem"));
    }

    #[test]
    fn test_depth_limit() {
        let config = EngineConfig::new().with_relations_depth_limit(Some(1));
        let generated = generate(&blog(), &config).unwrap();

        let users = object(&generated, "UsersSelectItem");
        assert_eq!(
            users.field("posts").unwrap().ty.to_string(),
            "[PostsLevel0SelectItem!]!"
        );
        let nested = object(&generated, "PostsLevel0SelectItem");
        assert!(nested.field("author").is_none());
        assert!(nested.field("title").is_some());

        let config = EngineConfig::new().with_relations_depth_limit(Some(0));
        let generated = generate(&blog(), &config).unwrap();
        assert!(object(&generated, "UsersSelectItem").field("posts").is_none());
    }

    #[test]
    fn test_relation_arguments() {
        let generated = generate(&blog(), &EngineConfig::new()).unwrap();
        let posts = object(&generated, "UsersSelectItem").field("posts").unwrap();
        let args: Vec<&str> = posts.args.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(args, vec!["where", "orderBy", "offset", "limit"]);
        assert_eq!(posts.arg("where").unwrap().ty.to_string(), "PostsFilters");

        let author = object(&generated, "PostsSelectItem").field("author").unwrap();
        assert!(author.arg("limit").is_none());
        assert_eq!(author.arg("orderBy").unwrap().ty.to_string(), "UsersOrderBy");
    }

    #[test]
    fn test_mutation_inputs() {
        let generated = generate(&blog(), &EngineConfig::new()).unwrap();
        let registry = generated.registry();

        let insert = registry.input_object("UsersInsertInput").unwrap();
        assert_eq!(insert.field("id").unwrap().ty.to_string(), "Int");
        assert_eq!(insert.field("name").unwrap().ty.to_string(), "String!");
        assert_eq!(insert.field("profile").unwrap().ty.to_string(), "JSON");

        let posts_insert = registry.input_object("PostsInsertInput").unwrap();
        assert!(posts_insert.field("slug").is_none());
        let posts_update = registry.input_object("PostsUpdateInput").unwrap();
        assert!(posts_update.field("slug").is_none());
        assert_eq!(posts_update.field("title").unwrap().ty.to_string(), "String");

        let item = object(&generated, "PostsItem");
        assert!(item.field("author").is_none());
        assert_eq!(item.field("slug").unwrap().ty.to_string(), "String!");
        assert!(registry.get("JSON").is_some());
        assert!(registry.get(MUTATION_SUCCESS_TYPE).is_none());
    }

    #[test]
    fn test_operations() {
        let config = EngineConfig::new().with_mutation_response(MutationResponse::Success);
        let generated = generate(&blog(), &config).unwrap();

        let names: Vec<&str> = generated
            .operations()
            .iter()
            .filter(|op| op.table == "users")
            .map(|op| op.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "users",
                "usersSingle",
                "insertIntoUsers",
                "insertIntoUsersSingle",
                "updateUsers",
                "deleteFromUsers",
            ]
        );

        let mutation = object(&generated, "Mutation");
        assert_eq!(
            mutation.field("updateUsers").unwrap().ty.to_string(),
            "MutationSuccess!"
        );
        let query = object(&generated, "Query");
        assert_eq!(
            query.field("postsSingle").unwrap().ty.to_string(),
            "PostsSelectItem"
        );
    }

    #[test]
    fn test_operation_name_collision() {
        let schema = Schema::new()
            .with_table(Table::new("user_posts").with_column(Column::new("id", ColumnKind::int())))
            .with_table(Table::new("userPosts").with_column(Column::new("id", ColumnKind::int())));
        let err = generate(&schema, &EngineConfig::new()).unwrap_err();
        assert!(matches!(err, SchemaError::NameCollision { .. }));
    }

    #[test]
    fn test_schema_errors_fail_generation() {
        let schema = blog().with_relation(Relation::one("editor", "posts", "editors"));
        assert!(matches!(
            generate(&schema, &EngineConfig::new()),
            Err(SchemaError::DanglingRelation { .. })
        ));

        let schema = blog().with_table(
            Table::new("shapes").with_column(Column::new("area", ColumnKind::parse("geometry"))),
        );
        assert!(matches!(
            generate(&schema, &EngineConfig::new()),
            Err(SchemaError::UnsupportedColumnKind { .. })
        ));
    }

    #[test]
    fn test_sdl_contains_roots() {
        let generated = generate(&blog(), &EngineConfig::new()).unwrap();
        let sdl = generated.sdl();
        assert!(sdl.contains("type Query {"));
        assert!(sdl.contains(
            "  users(offset: Int, limit: Int, orderBy: UsersOrderBy, where: UsersFilters): [UsersSelectItem!]!"
        ));
        assert!(sdl.contains("  insertIntoPostsSingle(values: PostsInsertInput!): PostsItem"));
        assert!(sdl.starts_with("enum OrderDirection {"));
    }
}

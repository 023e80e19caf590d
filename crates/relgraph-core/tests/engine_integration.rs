//! Integration tests for the engine over the in-memory executor.

use async_trait::async_trait;
use parking_lot::Mutex;
use relgraph_core::proto::{
    DeleteStatement, InsertStatement, MutationResult, Row, SelectQuery, UpdateStatement,
};
use relgraph_core::{
    ArgumentError, DocumentRequest, Engine, EngineConfig, Error, ExecutionError, Executor,
    MemoryExecutor, MutationResponse, SchemaDocument, SelectedField, Selection,
};
use serde_json::{json, Map, Value as Json};
use std::sync::atomic::{AtomicUsize, Ordering};

const BLOG: &str = r#"{
    "users": {"kind": "table", "columns": [
        {"name": "id", "type": "int", "primaryKey": true, "autoIncrement": true},
        {"name": "name", "type": "text"}
    ]},
    "posts": {"kind": "table", "columns": [
        {"name": "id", "type": "int", "primaryKey": true},
        {"name": "userId", "type": "int"},
        {"name": "title", "type": "text"}
    ]},
    "usersRelations": {"kind": "relations", "table": "users", "relations": [
        {"name": "posts", "target": "posts", "cardinality": "many",
         "fields": "id", "references": "userId"}
    ]},
    "postsRelations": {"kind": "relations", "table": "posts", "relations": [
        {"name": "author", "target": "users", "cardinality": "one",
         "fields": "userId", "references": "id"}
    ]}
}"#;

/// Executor wrapper counting calls and recording select queries.
struct RecordingExecutor {
    inner: MemoryExecutor,
    calls: AtomicUsize,
    selects: Mutex<Vec<SelectQuery>>,
}

impl RecordingExecutor {
    fn new(inner: MemoryExecutor) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            selects: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_select(&self) -> Option<SelectQuery> {
        self.selects.lock().last().cloned()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn select(&self, query: SelectQuery) -> Result<Vec<Row>, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.selects.lock().push(query.clone());
        self.inner.select(query).await
    }

    async fn insert(&self, statement: InsertStatement) -> Result<MutationResult, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(statement).await
    }

    async fn update(&self, statement: UpdateStatement) -> Result<MutationResult, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.update(statement).await
    }

    async fn delete(&self, statement: DeleteStatement) -> Result<MutationResult, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(statement).await
    }
}

struct TestContext {
    engine: Engine,
    executor: RecordingExecutor,
}

impl TestContext {
    fn new(config: EngineConfig, fixture: Json) -> Self {
        let schema = SchemaDocument::from_json(BLOG)
            .unwrap()
            .into_schema()
            .unwrap();
        let engine = Engine::new(schema, config).unwrap();
        let memory = MemoryExecutor::new(engine.schema().clone());
        memory.load_json(&fixture).unwrap();
        Self {
            engine,
            executor: RecordingExecutor::new(memory),
        }
    }

    fn blog() -> Self {
        Self::new(
            EngineConfig::new(),
            json!({
                "users": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}],
                "posts": [
                    {"id": 1, "userId": 1, "title": "Intro"},
                    {"id": 2, "userId": 1, "title": "Other"},
                    {"id": 3, "userId": 99, "title": "Orphan"}
                ]
            }),
        )
    }

    async fn run(&self, operation: &str, args: Json, selection: Selection) -> Result<Json, Error> {
        self.engine
            .execute(&self.executor, operation, &to_map(args), &selection)
            .await
    }

    async fn document(&self, query: &str) -> Json {
        self.engine
            .execute_document(&self.executor, &DocumentRequest::new(query))
            .await
    }
}

fn to_map(value: Json) -> Map<String, Json> {
    match value {
        Json::Object(map) => map,
        _ => Map::new(),
    }
}

fn ids(value: &Json) -> Vec<i64> {
    value
        .as_array()
        .map(|rows| rows.iter().filter_map(|r| r["id"].as_i64()).collect())
        .unwrap_or_default()
}

// ============== Tests ==============

#[tokio::test]
async fn test_nested_relation_filter_document() {
    let ctx = TestContext::new(
        EngineConfig::new(),
        json!({
            "users": [{"id": 1, "name": "A"}],
            "posts": [
                {"id": 1, "userId": 1, "title": "Intro"},
                {"id": 2, "userId": 1, "title": "Other"}
            ]
        }),
    );

    let response = ctx
        .document(r#"{ users { id name posts(where: {title: {like: "%intro%"}}) { id title } } }"#)
        .await;

    assert_eq!(
        response,
        json!({"data": {"users": [{"id": 1, "name": "A", "posts": [{"id": 1, "title": "Intro"}]}]}})
    );
    assert_eq!(ctx.executor.calls(), 1);
}

#[tokio::test]
async fn test_eq_and_ne_partition_rows() {
    let ctx = TestContext::blog();
    let selection = Selection::of(&["id"]);

    let eq = ctx
        .run("posts", json!({"where": {"userId": {"eq": 1}}}), selection.clone())
        .await
        .unwrap();
    let ne = ctx
        .run("posts", json!({"where": {"userId": {"ne": 1}}}), selection.clone())
        .await
        .unwrap();

    assert_eq!(ids(&eq), vec![1, 2]);
    assert_eq!(ids(&ne), vec![3]);
}

#[tokio::test]
async fn test_boolean_combinators() {
    let ctx = TestContext::blog();
    let selection = Selection::of(&["id"]);

    let not = ctx
        .run(
            "posts",
            json!({"where": {"NOT": [{"title": {"eq": "Intro"}}]}, "orderBy": {"id": "asc"}}),
            selection.clone(),
        )
        .await
        .unwrap();
    assert_eq!(ids(&not), vec![2, 3]);

    let or = ctx
        .run(
            "posts",
            json!({
                "where": {"OR": [{"id": {"eq": 1}}, {"title": {"eq": "Orphan"}}]},
                "orderBy": {"id": "desc"}
            }),
            selection.clone(),
        )
        .await
        .unwrap();
    assert_eq!(ids(&or), vec![3, 1]);

    let and = ctx
        .run(
            "posts",
            json!({"where": {"AND": [{"userId": {"eq": 1}}, {"id": {"gt": 1}}]}}),
            selection.clone(),
        )
        .await
        .unwrap();
    assert_eq!(ids(&and), vec![2]);

    let column_or = ctx
        .run(
            "posts",
            json!({"where": {"id": {"OR": [{"eq": 1}, {"eq": 3}]}}}),
            selection,
        )
        .await
        .unwrap();
    assert_eq!(ids(&column_or), vec![1, 3]);
}

#[tokio::test]
async fn test_order_tie_break_and_paging() {
    let ctx = TestContext::blog();

    let rows = ctx
        .run(
            "posts",
            json!({"orderBy": {"title": "desc", "userId": "asc"}}),
            Selection::of(&["id"]),
        )
        .await
        .unwrap();
    // userId is declared before title, so it is the primary key of the sort
    assert_eq!(ids(&rows), vec![2, 1, 3]);

    let page = ctx
        .run(
            "users",
            json!({"orderBy": {"id": "desc"}, "offset": 1, "limit": 1}),
            Selection::of(&["id"]),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![1]);
}

#[tokio::test]
async fn test_absent_relations() {
    let ctx = TestContext::blog();

    let users = ctx
        .run(
            "users",
            json!({"where": {"id": {"eq": 2}}}),
            Selection::of(&["id"]).field(SelectedField::new("posts").select(Selection::of(&["id"]))),
        )
        .await
        .unwrap();
    assert_eq!(users, json!([{"id": 2, "posts": []}]));

    let orphan = ctx
        .run(
            "postsSingle",
            json!({"where": {"id": {"eq": 3}}}),
            Selection::of(&["title"]).field(SelectedField::new("author").select(Selection::of(&["name"]))),
        )
        .await
        .unwrap();
    assert_eq!(orphan, json!({"title": "Orphan", "author": null}));
}

#[tokio::test]
async fn test_depth_limit() {
    let ctx = TestContext::new(
        EngineConfig::new().with_relations_depth_limit(Some(1)),
        json!({"users": [{"id": 1, "name": "A"}], "posts": [{"id": 1, "userId": 1, "title": "T"}]}),
    );

    let one_level = ctx
        .document("{ users { name posts { title } } }")
        .await;
    assert_eq!(
        one_level,
        json!({"data": {"users": [{"name": "A", "posts": [{"title": "T"}]}]}})
    );

    // the nested type keeps its columns and loses only its relations
    let nested = ctx
        .engine
        .generated()
        .registry()
        .object("PostsLevel0SelectItem")
        .unwrap();
    assert!(nested.field("title").is_some());
    assert!(nested.field("userId").is_some());
    assert!(nested.field("author").is_none());
    let sdl = ctx.engine.sdl();
    assert!(sdl.contains("type PostsLevel0SelectItem {\n  id: Int!\n  userId: Int!\n  title: String!\n}"));

    let err = ctx
        .run(
            "users",
            json!({}),
            Selection::new().field(
                SelectedField::new("posts").select(
                    Selection::new()
                        .field(SelectedField::new("author").select(Selection::of(&["id"]))),
                ),
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Argument(ArgumentError::UnknownField { ref field, .. }) if field == "author"
    ));
    assert_eq!(ctx.executor.calls(), 1);
}

#[tokio::test]
async fn test_projection_is_pruned() {
    let ctx = TestContext::blog();

    ctx.run("users", json!({}), Selection::of(&["id"]))
        .await
        .unwrap();
    let query = ctx.executor.last_select().unwrap();
    assert_eq!(query.columns, vec!["id"]);
    assert!(query.with.is_empty());

    ctx.run("users", json!({}), Selection::of(&["__typename"]))
        .await
        .unwrap();
    let query = ctx.executor.last_select().unwrap();
    assert_eq!(query.columns, vec!["id"]);
}

#[tokio::test]
async fn test_argument_errors_never_reach_executor() {
    let ctx = TestContext::blog();

    let err = ctx
        .run("updateUsers", json!({"set": {}}), Selection::of(&["id"]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ARGUMENT_ERROR");

    let err = ctx
        .run("insertIntoUsers", json!({"values": []}), Selection::of(&["id"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Argument(ArgumentError::EmptyInsert { .. })));

    let err = ctx
        .run("users", json!({"where": {"id": {"eq": "one"}}}), Selection::of(&["id"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Argument(ArgumentError::InvalidValue { .. })));

    assert_eq!(ctx.executor.calls(), 0);
}

#[tokio::test]
async fn test_mutations_return_rows() {
    let ctx = TestContext::blog();

    let inserted = ctx
        .run(
            "insertIntoUsers",
            json!({"values": [{"name": "C"}, {"id": 1, "name": "dup"}]}),
            Selection::of(&["id", "name"]),
        )
        .await
        .unwrap();
    // the conflicting row is skipped by default
    assert_eq!(inserted, json!([{"id": 3, "name": "C"}]));

    let updated = ctx
        .run(
            "updateUsers",
            json!({"set": {"name": "Z"}, "where": {"id": {"gte": 2}}}),
            Selection::of(&["id", "name"]),
        )
        .await
        .unwrap();
    assert_eq!(updated, json!([{"id": 2, "name": "Z"}, {"id": 3, "name": "Z"}]));

    let deleted = ctx
        .run(
            "deleteFromPosts",
            json!({"where": {"title": {"inArray": ["Intro", "Orphan"]}}}),
            Selection::of(&["id"]),
        )
        .await
        .unwrap();
    assert_eq!(deleted, json!([{"id": 1}, {"id": 3}]));
}

#[tokio::test]
async fn test_success_mode_document() {
    let ctx = TestContext::new(
        EngineConfig::new().with_mutation_response(MutationResponse::Success),
        json!({"users": [], "posts": []}),
    );

    let response = ctx
        .document(r#"mutation { insertIntoUsersSingle(values: {name: "A"}) { isSuccess } }"#)
        .await;
    assert_eq!(
        response,
        json!({"data": {"insertIntoUsersSingle": {"isSuccess": true}}})
    );

    let users = ctx
        .document("{ users { id name } }")
        .await;
    assert_eq!(users, json!({"data": {"users": [{"id": 1, "name": "A"}]}}));
}

#[tokio::test]
async fn test_document_errors_are_reported_per_field() {
    let ctx = TestContext::blog();

    let response = ctx
        .document("{ first: usersSingle(where: {id: {eq: 1}}) { name } bad: users { nope } }")
        .await;
    assert_eq!(response["data"]["first"], json!({"name": "A"}));
    assert_eq!(response["data"]["bad"], Json::Null);
    assert_eq!(response["errors"][0]["path"], json!(["bad"]));
    assert_eq!(response["errors"][0]["extensions"]["code"], "ARGUMENT_ERROR");

    let response = ctx
        .document(r#"{ insertIntoUsersSingle(values: {name: "X"}) { id } }"#)
        .await;
    assert_eq!(response["data"]["insertIntoUsersSingle"], Json::Null);
    assert!(response["errors"][0]["message"]
        .as_str()
        .unwrap()
        .contains("not a field of Query"));

    let response = ctx.document("{ users { id }").await;
    assert_eq!(response["data"], Json::Null);
}

#[tokio::test]
async fn test_bigint_round_trip() {
    let schema = SchemaDocument::from_json(
        r#"{"events": {"kind": "table", "columns": [
            {"name": "id", "type": "bigint", "primaryKey": true},
            {"name": "at", "type": "timestamptz", "nullable": true}
        ]}}"#,
    )
    .unwrap()
    .into_schema()
    .unwrap();
    let engine = Engine::new(schema, EngineConfig::new()).unwrap();
    let executor = MemoryExecutor::new(engine.schema().clone());

    let inserted = engine
        .execute(
            &executor,
            "insertIntoEventsSingle",
            &to_map(json!({"values": {"id": "9007199254740993", "at": "2024-05-01T12:00:00+02:00"}})),
            &Selection::of(&["id", "at"]),
        )
        .await
        .unwrap();
    assert_eq!(
        inserted,
        json!({"id": "9007199254740993", "at": "2024-05-01T10:00:00.000Z"})
    );

    let found = engine
        .execute(
            &executor,
            "events",
            &to_map(json!({"where": {"id": {"eq": "9007199254740993"}}})),
            &Selection::of(&["id"]),
        )
        .await
        .unwrap();
    assert_eq!(found, json!([{"id": "9007199254740993"}]));
}

const ORG: &str = r#"{
    "users": {"kind": "table", "columns": [
        {"name": "id", "type": "int", "primaryKey": true},
        {"name": "managerId", "type": "int", "nullable": true}
    ]},
    "usersRelations": {"kind": "relations", "table": "users", "relations": [
        {"name": "manager", "target": "users", "cardinality": "one",
         "fields": "managerId", "references": "id"},
        {"name": "reports", "target": "users", "cardinality": "many",
         "fields": "id", "references": "managerId"}
    ]}
}"#;

#[tokio::test]
async fn test_self_referencing_relations() {
    let query = "{ users(orderBy: {id: asc}) { id manager { id manager { id } } reports { id reports { id } } } }";
    let expected = json!({"data": {"users": [
        {"id": 1, "manager": null, "reports": [{"id": 2, "reports": []}]},
        {"id": 2, "manager": {"id": 1, "manager": null}, "reports": []}
    ]}});

    for limit in [None, Some(2)] {
        let schema = SchemaDocument::from_json(ORG).unwrap().into_schema().unwrap();
        let engine = Engine::new(
            schema,
            EngineConfig::new().with_relations_depth_limit(limit),
        )
        .unwrap();
        let executor = MemoryExecutor::new(engine.schema().clone());
        executor
            .load_json(&json!({"users": [
                {"id": 1, "managerId": null},
                {"id": 2, "managerId": 1}
            ]}))
            .unwrap();

        let response = engine
            .execute_document(&executor, &DocumentRequest::new(query))
            .await;
        assert_eq!(response, expected, "depth limit {:?}", limit);

        let registry = engine.generated().registry();
        match limit {
            None => {
                let users = registry.object("UsersSelectItem").unwrap();
                assert_eq!(users.field("manager").unwrap().ty.to_string(), "UsersSelectItem");
                assert_eq!(
                    users.field("reports").unwrap().ty.to_string(),
                    "[UsersSelectItem!]!"
                );
                assert!(!registry.contains("UsersLevel0SelectItem"));
            }
            Some(_) => {
                let users = registry.object("UsersSelectItem").unwrap();
                assert_eq!(
                    users.field("manager").unwrap().ty.to_string(),
                    "UsersLevel1SelectItem"
                );
                let level0 = registry.object("UsersLevel0SelectItem").unwrap();
                assert!(level0.field("managerId").is_some());
                assert!(level0.field("manager").is_none());

                let err = engine
                    .execute(
                        &executor,
                        "users",
                        &Map::new(),
                        &Selection::new().field(SelectedField::new("manager").select(
                            Selection::new().field(SelectedField::new("manager").select(
                                Selection::new().field(
                                    SelectedField::new("manager").select(Selection::of(&["id"])),
                                ),
                            )),
                        )),
                    )
                    .await
                    .unwrap_err();
                assert!(matches!(
                    err,
                    Error::Argument(ArgumentError::UnknownField { ref field, .. }) if field == "manager"
                ));
            }
        }
    }
}

#[tokio::test]
async fn test_table_without_updatable_columns() {
    let schema = SchemaDocument::from_json(
        r#"{"audit": {"kind": "table", "columns": [
            {"name": "id", "type": "int", "primaryKey": true, "generated": true}
        ]}}"#,
    )
    .unwrap()
    .into_schema()
    .unwrap();
    let engine = Engine::new(schema, EngineConfig::new()).unwrap();
    let executor = RecordingExecutor::new(MemoryExecutor::new(engine.schema().clone()));

    let input = engine
        .generated()
        .registry()
        .input_object("AuditUpdateInput")
        .unwrap();
    assert!(input.fields.is_empty());
    assert!(engine.sdl().contains("input AuditUpdateInput\n"));

    let err = engine
        .execute(&executor, "updateAudit", &to_map(json!({"set": {}})), &Selection::of(&["id"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Argument(ArgumentError::EmptyUpdate { .. })));

    let err = engine
        .execute(
            &executor,
            "updateAudit",
            &to_map(json!({"set": {"id": 1}})),
            &Selection::of(&["id"]),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Argument(ArgumentError::UnknownField { ref field, .. }) if field == "id"
    ));
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn test_omitted_variable_leaves_filter_out() {
    let ctx = TestContext::blog();

    let response = ctx
        .document("query($id: Int) { users(where: {id: {eq: $id}}) { id } }")
        .await;
    assert!(response.get("errors").is_none());
    assert_eq!(ids(&response["data"]["users"]), vec![1, 2]);

    let response = ctx
        .engine
        .execute_document(
            &ctx.executor,
            &DocumentRequest::new("query($id: Int) { users(where: {id: {eq: $id}}) { id } }")
                .with_variables(to_map(json!({"id": 2}))),
        )
        .await;
    assert_eq!(ids(&response["data"]["users"]), vec![2]);
}

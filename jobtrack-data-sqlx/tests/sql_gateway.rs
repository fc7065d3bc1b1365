use chrono::{TimeZone, Utc};
use jobtrack_data::{
    timestamp, with_tenant, DataError, Filter, Gateway, Mapper, Operator, PageOptions, Record, Table,
};
use jobtrack_data_sqlx::SqlGateway;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::task::JoinSet;

async fn pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    for ddl in [
        "CREATE TABLE item (id TEXT PRIMARY KEY, created_at TEXT, updated_at TEXT, name TEXT, rank INTEGER, tags TEXT)",
        "CREATE TABLE parent (id INTEGER PRIMARY KEY, name TEXT)",
        "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL, v TEXT)",
        "CREATE TABLE shared (id TEXT NOT NULL, tenant TEXT NOT NULL, name TEXT, PRIMARY KEY (id, tenant))",
    ] {
        sqlx::query(ddl).execute(&pool).await.unwrap();
    }
    pool
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn items(pool: &SqlitePool) -> SqlGateway {
    SqlGateway::new(
        pool.clone(),
        Table::new("item", &["id", "created_at", "updated_at", "name", "rank", "tags"]),
    )
    .with_mapper(Mapper::json_columns(&["tags"]))
}

fn parents(pool: &SqlitePool) -> SqlGateway {
    let children = SqlGateway::new(pool.clone(), Table::new("child", &["id", "parent_id", "v"]));
    SqlGateway::new(pool.clone(), Table::new("parent", &["id", "name"])).one_to_many("children", "parent_id", children)
}

const T0: &str = "2024-01-01T00:00:00.000000Z";

async fn seed_items(gateway: &SqlGateway) {
    for (id, rank) in [("a", 3), ("b", 1), ("c", 2)] {
        gateway
            .add(record(json!({"id": id, "created_at": T0, "updated_at": T0, "name": id, "rank": rank})))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_add_drops_unknown_fields_and_round_trips() {
    let pool = pool().await;
    let gateway = items(&pool);
    let added = gateway
        .add(record(json!({"id": "a", "name": "first", "rank": 1, "tags": ["x", "y"], "bogus": true})))
        .await
        .unwrap();
    assert!(!added.contains_key("bogus"));
    assert_eq!(added["tags"], json!(["x", "y"]));
    assert_eq!(gateway.get(&json!("a")).await.unwrap(), Some(added));
    assert_eq!(gateway.get(&json!("zz")).await.unwrap(), None);
}

#[tokio::test]
async fn test_add_duplicate_id_already_exists() {
    let pool = pool().await;
    let gateway = items(&pool);
    gateway.add(record(json!({"id": "a"}))).await.unwrap();
    match gateway.add(record(json!({"id": "a"}))).await {
        Err(DataError::AlreadyExists { value, .. }) => assert_eq!(value, "a"),
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

#[tokio::test]
async fn test_add_without_id_generates_one() {
    let pool = pool().await;
    let gateway = parents(&pool);
    let first = gateway.add(record(json!({"id": null, "name": "p"}))).await.unwrap();
    let second = gateway.add(record(json!({"name": "q"}))).await.unwrap();
    assert_eq!(first["id"], json!(1));
    assert_eq!(second["id"], json!(2));
    assert_eq!(first["children"], json!([]));
}

#[tokio::test]
async fn test_conditional_update() {
    let pool = pool().await;
    let gateway = items(&pool);
    seed_items(&gateway).await;
    let since = timestamp::parse(T0).unwrap();
    let later = timestamp::format(&Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());

    let updated = gateway
        .update(record(json!({"id": "a", "name": "renamed", "updated_at": later})), Some(since))
        .await
        .unwrap();
    assert_eq!(updated["name"], json!("renamed"));
    assert_eq!(updated["rank"], json!(3));

    let stale = gateway
        .update(record(json!({"id": "a", "name": "lost"})), Some(since))
        .await
        .unwrap_err();
    assert!(stale.is_conflict());
    assert_eq!(gateway.get(&json!("a")).await.unwrap().unwrap()["name"], json!("renamed"));

    let missing = gateway.update(record(json!({"id": "zz", "name": "x"})), Some(since)).await.unwrap_err();
    assert!(missing.is_does_not_exist());
    let missing = gateway.update(record(json!({"id": "zz", "name": "x"})), None).await.unwrap_err();
    assert!(missing.is_does_not_exist());
}

#[tokio::test]
async fn test_filter_order_and_pagination() {
    let pool = pool().await;
    let gateway = items(&pool);
    seed_items(&gateway).await;

    let params = PageOptions::new(2, 0).order_by("rank", true);
    let page = gateway.filter(&[], Some(&params)).await.unwrap();
    let names: Vec<_> = page.iter().map(|r| r["name"].clone()).collect();
    assert_eq!(names, vec![json!("b"), json!("c")]);

    let params = PageOptions::new(2, 2).order_by("rank", true);
    assert_eq!(gateway.filter(&[], Some(&params)).await.unwrap().len(), 1);

    let high = [Filter::compare("rank", Operator::Gt, 1)];
    assert_eq!(gateway.count(&high).await.unwrap(), 2);
    assert!(gateway.exists(&[Filter::eq("name", "c")]).await.unwrap());
    assert!(!gateway.exists(&[Filter::new("name", vec![])]).await.unwrap());
}

#[tokio::test]
async fn test_unknown_filter_column_matches_nothing() {
    let pool = pool().await;
    let gateway = items(&pool);
    seed_items(&gateway).await;
    let found = gateway.filter(&[Filter::eq("salary", 10)], None).await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_unknown_order_by_is_unsupported() {
    let pool = pool().await;
    let gateway = items(&pool);
    let params = PageOptions::default().order_by("salary", true);
    assert!(matches!(
        gateway.filter(&[], Some(&params)).await,
        Err(DataError::Unsupported(_))
    ));
}

#[tokio::test]
async fn test_upsert_inserts_then_overwrites() {
    let pool = pool().await;
    let gateway = items(&pool);
    gateway.upsert(record(json!({"id": "a", "name": "one"}))).await.unwrap();
    let second = gateway.upsert(record(json!({"id": "a", "name": "two"}))).await.unwrap();
    assert_eq!(second["name"], json!("two"));
    assert_eq!(gateway.count(&[]).await.unwrap(), 1);
}

#[tokio::test]
async fn test_remove_reports_presence() {
    let pool = pool().await;
    let gateway = items(&pool);
    seed_items(&gateway).await;
    assert!(gateway.remove(&json!("a")).await.unwrap());
    assert!(!gateway.remove(&json!("a")).await.unwrap());
    assert_eq!(gateway.count(&[]).await.unwrap(), 2);
}

#[tokio::test]
async fn test_update_transactional() {
    let pool = pool().await;
    let gateway = items(&pool);
    seed_items(&gateway).await;
    let updated = gateway
        .update_transactional(&json!("b"), |mut current| {
            let rank = current["rank"].as_i64().unwrap_or(0);
            current.insert("rank".into(), json!(rank + 10));
            Ok(current)
        })
        .await
        .unwrap();
    assert_eq!(updated["rank"], json!(11));

    let missing = gateway.update_transactional(&json!("zz"), Ok).await.unwrap_err();
    assert!(missing.is_does_not_exist());
}

#[tokio::test]
async fn test_reconcile_replaces_one_child() {
    let pool = pool().await;
    let gateway = parents(&pool);
    gateway
        .add(record(json!({
            "id": 1,
            "name": "P",
            "children": [{"id": 1, "v": "a"}, {"id": 2, "v": "b"}]
        })))
        .await
        .unwrap();

    let saved = gateway
        .update(
            record(json!({"id": 1, "children": [{"id": 1, "v": "a"}, {"id": 3, "v": "c"}]})),
            None,
        )
        .await
        .unwrap();
    assert_eq!(
        saved["children"],
        json!([{"id": 1, "parent_id": 1, "v": "a"}, {"id": 3, "parent_id": 1, "v": "c"}])
    );

    let fetched = gateway.get(&json!(1)).await.unwrap().unwrap();
    let ids: Vec<_> = fetched["children"].as_array().unwrap().iter().map(|c| c["id"].clone()).collect();
    assert_eq!(ids, vec![json!(1), json!(3)]);

    let (orphans,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM child WHERE id = 2")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn test_reconcile_update_and_addition() {
    let pool = pool().await;
    let gateway = parents(&pool);
    gateway
        .add(record(json!({"id": 1, "name": "P", "children": [{"id": 1, "v": "a"}]})))
        .await
        .unwrap();
    let saved = gateway
        .update(
            record(json!({"id": 1, "children": [{"id": 1, "v": "z"}, {"v": "new"}]})),
            None,
        )
        .await
        .unwrap();
    let children = saved["children"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["v"], json!("z"));
    assert_eq!(children[1]["v"], json!("new"));
}

#[tokio::test]
async fn test_parent_without_relation_field_keeps_children() {
    let pool = pool().await;
    let gateway = parents(&pool);
    gateway
        .add(record(json!({"id": 1, "name": "P", "children": [{"id": 1, "v": "a"}]})))
        .await
        .unwrap();
    let saved = gateway.update(record(json!({"id": 1, "name": "Q"})), None).await.unwrap();
    assert_eq!(saved["name"], json!("Q"));
    assert_eq!(saved["children"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_parent_removes_children() {
    let pool = pool().await;
    let gateway = parents(&pool);
    gateway
        .add(record(json!({"id": 1, "name": "P", "children": [{"id": 1, "v": "a"}, {"id": 2, "v": "b"}]})))
        .await
        .unwrap();
    assert!(gateway.remove(&json!(1)).await.unwrap());
    let (left,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM child").fetch_one(&pool).await.unwrap();
    assert_eq!(left, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_removes_on_shared_file() {
    let dir = tempfile::tempdir().unwrap();
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("jobs.db"))
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await.unwrap();
    for ddl in [
        "CREATE TABLE parent (id INTEGER PRIMARY KEY, name TEXT)",
        "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL, v TEXT)",
    ] {
        sqlx::query(ddl).execute(&pool).await.unwrap();
    }
    let gateway = parents(&pool);
    for i in 1..=40 {
        gateway
            .add(record(json!({"id": i, "name": "P", "children": [{"id": i, "v": "c"}]})))
            .await
            .unwrap();
    }

    let mut removals = JoinSet::new();
    for i in 1..=40 {
        let gateway = gateway.clone();
        removals.spawn(async move { gateway.remove(&json!(i)).await });
    }
    while let Some(outcome) = removals.join_next().await {
        assert!(outcome.unwrap().unwrap());
    }

    assert_eq!(gateway.count(&[]).await.unwrap(), 0);
    let (left,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM child").fetch_one(&pool).await.unwrap();
    assert_eq!(left, 0);
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let pool = pool().await;
    let gateway = SqlGateway::new(pool.clone(), Table::new("shared", &["id", "name"]).multitenant());

    assert!(matches!(gateway.count(&[]).await, Err(DataError::MissingTenant(_))));

    with_tenant("acme", async {
        gateway.add(record(json!({"id": "a", "name": "acme's"}))).await.unwrap();
    })
    .await;
    with_tenant("globex", async {
        gateway.add(record(json!({"id": "a", "name": "globex's"}))).await.unwrap();
        assert_eq!(gateway.count(&[]).await.unwrap(), 1);
        let found = gateway.get(&json!("a")).await.unwrap().unwrap();
        assert_eq!(found["name"], json!("globex's"));
        assert!(!found.contains_key("tenant"));
    })
    .await;
}

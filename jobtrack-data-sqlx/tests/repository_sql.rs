use garde::Validate;
use jobtrack_data::{
    Entity, EntityMeta, Filter, Gateway, Manage, PageOptions, Record, Repository, RetryPolicy, Table, UpdateMode,
};
use jobtrack_data_sqlx::SqlGateway;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
struct Task {
    #[serde(flatten)]
    #[garde(skip)]
    meta: EntityMeta,
    #[garde(length(min = 1))]
    title: String,
    #[garde(skip)]
    done: Option<i64>,
}

impl Entity for Task {
    const NAME: &'static str = "task";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

async fn gateway() -> SqlGateway {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::query("CREATE TABLE task (id TEXT PRIMARY KEY, created_at TEXT NOT NULL, updated_at TEXT NOT NULL, title TEXT NOT NULL, done INTEGER)")
        .execute(&pool)
        .await
        .unwrap();
    SqlGateway::new(pool, Table::new("task", &["id", "created_at", "updated_at", "title", "done"]))
}

#[tokio::test]
async fn test_entities_round_trip_through_sql() {
    let repo: Repository<Task, SqlGateway> = Repository::new(gateway().await);
    let task = repo.add_record(record(json!({"title": "write tests"}))).await.unwrap();
    assert_eq!(repo.get(task.id()).await.unwrap(), task);
}

#[tokio::test]
async fn test_stale_optimistic_write_is_rejected() {
    let repo: Repository<Task, SqlGateway> = Repository::new(gateway().await);
    let early = repo.add_record(record(json!({"title": "a"}))).await.unwrap();
    let winner = repo
        .update(early.id(), record(json!({"title": "winner"})), UpdateMode::Optimistic)
        .await
        .unwrap();
    assert!(winner.updated_at() > early.updated_at());

    let stale = early.update(record(json!({"title": "loser"}))).unwrap();
    let err = repo
        .gateway()
        .update(stale.to_record().unwrap(), Some(early.updated_at()))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(repo.get(early.id()).await.unwrap().title, "winner");
}

#[tokio::test]
async fn test_pessimistic_update_through_sql() {
    let repo: Repository<Task, SqlGateway> = Repository::new(gateway().await);
    let task = repo.add_record(record(json!({"title": "a"}))).await.unwrap();
    let done = repo
        .update(task.id(), record(json!({"done": 1})), UpdateMode::Pessimistic)
        .await
        .unwrap();
    assert_eq!(done.done, Some(1));
    assert_eq!(done.title, "a");
}

#[tokio::test]
async fn test_page_total_uses_count_when_needed() {
    let manage: Manage<Task, SqlGateway> = Manage::new(gateway().await).with_retry(RetryPolicy::immediate(3));
    for title in ["a", "b", "c", "d", "e"] {
        manage.create(record(json!({"title": title}))).await.unwrap();
    }
    let page = manage.list(Some(&PageOptions::new(2, 2))).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 5);

    let page = manage.filter(&[Filter::eq("title", "c")], Some(&PageOptions::new(10, 0))).await.unwrap();
    assert_eq!(page.total, 1);
}

#![allow(dead_code)]

use jobtrack::Managers;
use jobtrack_core::config::DatabaseSettings;
use jobtrack_data::{Record, RetryPolicy};
use jobtrack_data_sqlx::SqlGateway;
use serde_json::Value;
use sqlx::SqlitePool;

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// A migrated in-memory database on a single connection.
pub async fn pool() -> SqlitePool {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        multitenant: false,
    };
    jobtrack::store::connect(&settings).await.unwrap()
}

pub fn memory() -> Managers<jobtrack_data::MemoryGateway> {
    Managers::in_memory(RetryPolicy::immediate(3))
}

pub async fn sql() -> Managers<SqlGateway> {
    Managers::sql(&pool().await, false, RetryPolicy::immediate(3))
}

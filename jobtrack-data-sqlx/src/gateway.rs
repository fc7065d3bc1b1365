use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jobtrack_data::gateway::require_id;
use jobtrack_data::query::ChildDiff;
use jobtrack_data::{DataError, Dialect, Filter, Gateway, Mapper, PageOptions, Record, SqlBuilder, Statement, Table};
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use crate::error::SqlxErrorExt;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

const DIALECT: Dialect = Dialect::Sqlite;

/// A child collection exposed as a virtual field of its parent.
///
/// Child rows reference the parent through `foreign_key`. Relations are one
/// level deep: the child gateway's own relations are not followed.
#[derive(Debug, Clone)]
pub struct OneToMany {
    pub field: String,
    pub foreign_key: String,
    pub child: SqlGateway,
}

/// A [`Gateway`] over one table of an SQLite pool.
///
/// Every write runs in its own transaction; reads use a single pooled
/// connection. Conditional updates that touch no row are disambiguated with an
/// existence probe into `Conflict` or `DoesNotExist`.
///
/// # Example
///
/// ```ignore
/// let jobs = SqlGateway::new(pool.clone(), Table::new("job", JOB_COLUMNS));
/// let repo = Repository::<Job, _>::new(jobs);
/// ```
#[derive(Debug, Clone)]
pub struct SqlGateway {
    pool: SqlitePool,
    table: Arc<Table>,
    mapper: Mapper,
    relations: Vec<OneToMany>,
}

impl SqlGateway {
    pub fn new(pool: SqlitePool, table: Table) -> Self {
        Self {
            pool,
            table: Arc::new(table),
            mapper: Mapper::identity(),
            relations: Vec::new(),
        }
    }

    pub fn with_mapper(mut self, mapper: Mapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Expose the rows of `child` whose `foreign_key` is this record's id as `field`.
    pub fn one_to_many(mut self, field: impl Into<String>, foreign_key: impl Into<String>, child: SqlGateway) -> Self {
        self.relations.push(OneToMany {
            field: field.into(),
            foreign_key: foreign_key.into(),
            child,
        });
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    fn builder(&self) -> Result<SqlBuilder<'_>, DataError> {
        SqlBuilder::scoped(&self.table, DIALECT)
    }

    async fn fetch_rows(&self, conn: &mut SqliteConnection, stmt: &Statement) -> Result<Vec<Record>, DataError> {
        tracing::debug!(table = %self.table.name, sql = %stmt.sql, "query");
        let rows = prepare(stmt)
            .fetch_all(&mut *conn)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        rows.iter()
            .map(|row| decode_row(row).and_then(|record| self.mapper.to_internal(record)))
            .collect()
    }

    async fn fetch_first(&self, conn: &mut SqliteConnection, stmt: &Statement) -> Result<Option<Record>, DataError> {
        Ok(self.fetch_rows(conn, stmt).await?.into_iter().next())
    }

    async fn fetch_integer(&self, conn: &mut SqliteConnection, stmt: &Statement, column: &str) -> Result<i64, DataError> {
        tracing::debug!(table = %self.table.name, sql = %stmt.sql, "query");
        let row = prepare(stmt)
            .fetch_one(&mut *conn)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        row.try_get::<i64, _>(column).map_err(SqlxErrorExt::into_data_error)
    }

    async fn exists_in(&self, conn: &mut SqliteConnection, filters: &[Filter]) -> Result<bool, DataError> {
        let stmt = self.builder()?.exists(filters);
        Ok(self.fetch_integer(conn, &stmt, "present").await? != 0)
    }

    async fn insert_row_in(&self, conn: &mut SqliteConnection, item: Record) -> Result<Record, DataError> {
        let explicit_id = match item.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        let stmt = self.builder()?.insert(&self.mapper.to_external(item)?);
        match self.fetch_first(conn, &stmt).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(DataError::Unsupported(format!("insert into {} returned no row", self.table.name))),
            Err(DataError::AlreadyExists { value, .. }) => Err(DataError::already_exists(explicit_id.unwrap_or(value))),
            Err(err) => Err(err),
        }
    }

    /// Conditional update of one row. Zero rows touched means the row is gone,
    /// or, when guarded by `if_unmodified_since` and the row still exists, that
    /// it was modified concurrently.
    async fn update_row_in(
        &self,
        conn: &mut SqliteConnection,
        item: Record,
        if_unmodified_since: Option<DateTime<Utc>>,
    ) -> Result<Record, DataError> {
        let id = require_id(&item)?;
        let stmt = self
            .builder()?
            .update(&self.mapper.to_external(item)?, if_unmodified_since)?;
        if let Some(record) = self.fetch_first(conn, &stmt).await? {
            return Ok(record);
        }
        if if_unmodified_since.is_some() && self.exists_in(conn, &[Filter::for_id(id.clone())]).await? {
            tracing::debug!(table = %self.table.name, id = %id, "stale update rejected");
            return Err(DataError::conflict());
        }
        Err(DataError::does_not_exist(&self.table.name, Some(id)))
    }

    async fn delete_row_in(&self, conn: &mut SqliteConnection, id: &Value) -> Result<bool, DataError> {
        let stmt = self.builder()?.delete(id);
        Ok(!self.fetch_rows(conn, &stmt).await?.is_empty())
    }

    async fn delete_rows_in(&self, conn: &mut SqliteConnection, ids: &[Value]) -> Result<(), DataError> {
        if ids.is_empty() {
            return Ok(());
        }
        let stmt = self.builder()?.delete_many(ids);
        self.execute_in(conn, &stmt).await
    }

    async fn execute_in(&self, conn: &mut SqliteConnection, stmt: &Statement) -> Result<(), DataError> {
        tracing::debug!(table = %self.table.name, sql = %stmt.sql, "query");
        prepare(stmt)
            .execute(&mut *conn)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }

    /// Populate every relation field of `parents` with one query per relation.
    async fn fetch_related_in(&self, conn: &mut SqliteConnection, parents: &mut [Record]) -> Result<(), DataError> {
        if parents.is_empty() {
            return Ok(());
        }
        let ids: Vec<Value> = parents.iter().filter_map(|p| p.get("id").cloned()).collect();
        for relation in &self.relations {
            let stmt = relation
                .child
                .builder()?
                .select(&[Filter::new(relation.foreign_key.clone(), ids.clone())], None, false)?;
            let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
            for child in relation.child.fetch_rows(conn, &stmt).await? {
                let key = child.get(&relation.foreign_key).map(Value::to_string).unwrap_or_default();
                grouped.entry(key).or_default().push(Value::Object(child));
            }
            for parent in parents.iter_mut() {
                let key = parent.get("id").map(Value::to_string).unwrap_or_default();
                let children = grouped.remove(&key).unwrap_or_default();
                parent.insert(relation.field.clone(), Value::Array(children));
            }
        }
        Ok(())
    }

    /// Make the stored children of `parent_id` match `children` exactly.
    ///
    /// Inserts run before deletes so a replaced child is never briefly missing
    /// from a concurrent reader that sees the insert.
    async fn reconcile_in(
        &self,
        conn: &mut SqliteConnection,
        relation: &OneToMany,
        parent_id: &Value,
        children: Vec<Record>,
    ) -> Result<(), DataError> {
        let child = &relation.child;
        let fk = relation.foreign_key.as_str();
        let stmt = child
            .builder()?
            .select(&[Filter::eq(fk, parent_id.clone())], None, false)?;
        let existing = child.fetch_rows(conn, &stmt).await?;
        let wanted: Vec<Record> = children
            .into_iter()
            .map(|mut c| {
                c.insert(fk.to_string(), parent_id.clone());
                c
            })
            .collect();

        let diff = ChildDiff::compute(&existing, &wanted);
        if diff.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            table = %child.table.name,
            inserts = diff.inserts.len(),
            updates = diff.updates.len(),
            deletes = diff.deletes.len(),
            "reconciling children"
        );
        for item in diff.inserts {
            child.insert_row_in(conn, item).await?;
        }
        for item in diff.updates {
            child.update_row_in(conn, item, None).await?;
        }
        child.delete_rows_in(conn, &diff.deletes).await
    }

    /// Split relation fields out of `item`; `None` where a field is absent.
    fn take_children(&self, item: &mut Record) -> Result<Vec<Option<Vec<Record>>>, DataError> {
        self.relations
            .iter()
            .map(|relation| match item.remove(&relation.field) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::Array(values)) => values
                    .into_iter()
                    .map(|value| match value {
                        Value::Object(child) => Ok(child),
                        other => Err(DataError::Validation(jobtrack_data::ValidationError::new(
                            relation.field.clone(),
                            format!("expected a record, got {other}"),
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Some),
                Some(other) => Err(DataError::Validation(jobtrack_data::ValidationError::new(
                    relation.field.clone(),
                    format!("expected a list, got {other}"),
                ))),
            })
            .collect()
    }

    async fn write_children_in(
        &self,
        conn: &mut SqliteConnection,
        parent: &mut Record,
        children: Vec<Option<Vec<Record>>>,
    ) -> Result<(), DataError> {
        let id = require_id(parent)?;
        for (relation, children) in self.relations.iter().zip(children) {
            if let Some(children) = children {
                self.reconcile_in(conn, relation, &id, children).await?;
            }
        }
        self.fetch_related_in(conn, std::slice::from_mut(parent)).await
    }
}

impl Gateway for SqlGateway {
    fn add(&self, item: Record) -> impl Future<Output = Result<Record, DataError>> + Send {
        async move {
            let mut item = item;
            let children = self.take_children(&mut item)?;
            let mut tx = self.pool.begin().await.map_err(SqlxErrorExt::into_data_error)?;
            let mut stored = self.insert_row_in(&mut tx, item).await?;
            self.write_children_in(&mut tx, &mut stored, children).await?;
            tx.commit().await.map_err(SqlxErrorExt::into_data_error)?;
            Ok(stored)
        }
    }

    fn update(
        &self,
        item: Record,
        if_unmodified_since: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Record, DataError>> + Send {
        async move {
            let mut item = item;
            let children = self.take_children(&mut item)?;
            let mut tx = self.pool.begin().await.map_err(SqlxErrorExt::into_data_error)?;
            let mut stored = self.update_row_in(&mut tx, item, if_unmodified_since).await?;
            self.write_children_in(&mut tx, &mut stored, children).await?;
            tx.commit().await.map_err(SqlxErrorExt::into_data_error)?;
            Ok(stored)
        }
    }

    fn remove(&self, id: &Value) -> impl Future<Output = Result<bool, DataError>> + Send {
        async move {
            let mut tx = self.pool.begin().await.map_err(SqlxErrorExt::into_data_error)?;
            // Writes only: a read first would hold a shared lock that SQLite cannot upgrade.
            for relation in &self.relations {
                let stmt = relation
                    .child
                    .builder()?
                    .delete_where(&[Filter::eq(relation.foreign_key.clone(), id.clone())]);
                relation.child.execute_in(&mut tx, &stmt).await?;
            }
            let removed = self.delete_row_in(&mut tx, id).await?;
            tx.commit().await.map_err(SqlxErrorExt::into_data_error)?;
            Ok(removed)
        }
    }

    fn filter(
        &self,
        filters: &[Filter],
        params: Option<&PageOptions>,
    ) -> impl Future<Output = Result<Vec<Record>, DataError>> + Send {
        async move {
            let stmt = self.builder()?.select(filters, params, false)?;
            let mut conn = self.pool.acquire().await.map_err(SqlxErrorExt::into_data_error)?;
            let mut found = self.fetch_rows(&mut conn, &stmt).await?;
            self.fetch_related_in(&mut conn, &mut found).await?;
            Ok(found)
        }
    }

    fn count(&self, filters: &[Filter]) -> impl Future<Output = Result<u64, DataError>> + Send {
        async move {
            let stmt = self.builder()?.count(filters);
            let mut conn = self.pool.acquire().await.map_err(SqlxErrorExt::into_data_error)?;
            Ok(self.fetch_integer(&mut conn, &stmt, "count").await?.max(0) as u64)
        }
    }

    fn exists(&self, filters: &[Filter]) -> impl Future<Output = Result<bool, DataError>> + Send {
        async move {
            let mut conn = self.pool.acquire().await.map_err(SqlxErrorExt::into_data_error)?;
            self.exists_in(&mut conn, filters).await
        }
    }

    /// Native insert-or-overwrite; records without an id are plain inserts.
    fn upsert(&self, item: Record) -> impl Future<Output = Result<Record, DataError>> + Send {
        async move {
            if matches!(item.get("id"), None | Some(Value::Null)) {
                return self.add(item).await;
            }
            let mut item = item;
            let children = self.take_children(&mut item)?;
            let stmt = self.builder()?.upsert(&self.mapper.to_external(item)?);
            let mut tx = self.pool.begin().await.map_err(SqlxErrorExt::into_data_error)?;
            let mut stored = self
                .fetch_first(&mut tx, &stmt)
                .await?
                .ok_or_else(|| DataError::Unsupported(format!("upsert into {} returned no row", self.table.name)))?;
            self.write_children_in(&mut tx, &mut stored, children).await?;
            tx.commit().await.map_err(SqlxErrorExt::into_data_error)?;
            Ok(stored)
        }
    }

    /// Takes the SQLite write lock with a no-op update before reading, so the
    /// read-apply-write cycle cannot interleave with another writer.
    fn update_transactional<F>(
        &self,
        id: &Value,
        apply: F,
    ) -> impl Future<Output = Result<Record, DataError>> + Send
    where
        F: FnOnce(Record) -> Result<Record, DataError> + Send,
    {
        async move {
            let builder = self.builder()?;
            let mut tx = self.pool.begin().await.map_err(SqlxErrorExt::into_data_error)?;
            if !DIALECT.supports_for_update() {
                let lock = builder.lock_row(id);
                tracing::debug!(table = %self.table.name, sql = %lock.sql, "query");
                let locked = prepare(&lock)
                    .execute(&mut *tx)
                    .await
                    .map_err(SqlxErrorExt::into_data_error)?;
                if locked.rows_affected() == 0 {
                    return Err(DataError::does_not_exist(&self.table.name, Some(id)));
                }
            }
            let stmt = builder.get(id, true)?;
            let mut current = self
                .fetch_first(&mut tx, &stmt)
                .await?
                .ok_or_else(|| DataError::does_not_exist(&self.table.name, Some(id)))?;
            self.fetch_related_in(&mut tx, std::slice::from_mut(&mut current)).await?;

            let mut next = apply(current)?;
            next.insert("id".to_string(), id.clone());
            let children = self.take_children(&mut next)?;
            let mut stored = self.update_row_in(&mut tx, next, None).await?;
            self.write_children_in(&mut tx, &mut stored, children).await?;
            tx.commit().await.map_err(SqlxErrorExt::into_data_error)?;
            Ok(stored)
        }
    }
}

fn prepare(stmt: &Statement) -> SqliteQuery<'_> {
    stmt.params
        .iter()
        .fold(sqlx::query(&stmt.sql), |query, value| bind_value(query, value))
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(flag) => query.bind(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => query.bind(integer),
            None => query.bind(number.as_f64()),
        },
        Value::String(text) => query.bind(text.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Decode by the storage class of each value: INTEGER, REAL, TEXT, BLOB or NULL.
fn decode_row(row: &SqliteRow) -> Result<Record, DataError> {
    let mut record = Record::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index).map_err(SqlxErrorExt::into_data_error)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let storage = raw.type_info().name().to_string();
            match storage.as_str() {
                "INTEGER" => Value::from(row.try_get::<i64, _>(index).map_err(SqlxErrorExt::into_data_error)?),
                "REAL" => Value::from(row.try_get::<f64, _>(index).map_err(SqlxErrorExt::into_data_error)?),
                "BLOB" => {
                    let bytes = row.try_get::<Vec<u8>, _>(index).map_err(SqlxErrorExt::into_data_error)?;
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => Value::String(row.try_get::<String, _>(index).map_err(SqlxErrorExt::into_data_error)?),
            }
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

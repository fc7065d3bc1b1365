use std::cmp::Ordering;
use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::DataError;
use crate::filter::{compare_values, Filter};
use crate::gateway::{require_id, Gateway};
use crate::mapper::Mapper;
use crate::page::PageOptions;
use crate::{timestamp, Record};

#[derive(Default)]
struct Rows {
    next_seq: u64,
    // Keyed by the JSON text of the id; the sequence number keeps insertion order.
    by_id: HashMap<String, (u64, Record)>,
}

impl Rows {
    fn insert(&mut self, key: String, record: Record) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_id.insert(key, (seq, record));
    }

    fn next_integer_id(&self) -> i64 {
        self.by_id
            .values()
            .filter_map(|(_, record)| record.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// A [`Gateway`] over an in-process map.
///
/// Records are deep-copied in and out, so callers never share state with the
/// store. Records added without an id get `max(integer ids) + 1`.
///
/// # Example
///
/// ```ignore
/// let gateway = MemoryGateway::new("job");
/// let repo = Repository::<Job, _>::new(gateway);
/// ```
pub struct MemoryGateway {
    name: String,
    rows: RwLock<Rows>,
    mapper: Mapper,
}

impl MemoryGateway {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: RwLock::new(Rows::default()),
            mapper: Mapper::identity(),
        }
    }

    pub fn with_mapper(mut self, mapper: Mapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn not_found(&self, id: &Value) -> DataError {
        DataError::does_not_exist(&self.name, Some(id))
    }
}

fn key_of(id: &Value) -> String {
    id.to_string()
}

fn stored_updated_at(record: &Record) -> Option<DateTime<Utc>> {
    record
        .get("updated_at")
        .and_then(Value::as_str)
        .and_then(|raw| timestamp::parse(raw).ok())
}

/// Stable sort on one key; absent or null keys go after present ones, and the
/// whole order flips when descending.
fn sort_records(records: &mut [Record], params: &PageOptions) {
    let field = params.order_by.as_str();
    records.sort_by(|a, b| {
        let a = a.get(field).filter(|v| !v.is_null());
        let b = b.get(field).filter(|v| !v.is_null());
        match (a, b) {
            (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    if !params.ascending {
        records.reverse();
    }
}

fn past_cursor(record: &Record, params: &PageOptions, cursor: &Value) -> bool {
    let Some(value) = record.get(&params.order_by) else {
        return false;
    };
    let wanted = if params.ascending {
        Ordering::Greater
    } else {
        Ordering::Less
    };
    compare_values(value, cursor) == Some(wanted)
}

impl Gateway for MemoryGateway {
    fn add(&self, item: Record) -> impl Future<Output = Result<Record, DataError>> + Send {
        async move {
            let mut item = self.mapper.to_external(item)?;
            let mut rows = self.rows.write().await;
            let id = match item.get("id") {
                None | Some(Value::Null) => {
                    let id = Value::from(rows.next_integer_id());
                    item.insert("id".to_string(), id.clone());
                    id
                }
                Some(id) => id.clone(),
            };
            let key = key_of(&id);
            if rows.by_id.contains_key(&key) {
                return Err(DataError::already_exists(id));
            }
            rows.insert(key, item.clone());
            tracing::debug!(gateway = %self.name, id = %id, "record added");
            self.mapper.to_internal(item)
        }
    }

    fn update(
        &self,
        item: Record,
        if_unmodified_since: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Record, DataError>> + Send {
        async move {
            let item = self.mapper.to_external(item)?;
            let id = require_id(&item)?;
            let mut rows = self.rows.write().await;
            let (_, stored) = rows
                .by_id
                .get_mut(&key_of(&id))
                .ok_or_else(|| self.not_found(&id))?;
            if let Some(since) = if_unmodified_since {
                if stored_updated_at(stored) != Some(since) {
                    tracing::debug!(gateway = %self.name, id = %id, "stale update rejected");
                    return Err(DataError::conflict());
                }
            }
            stored.extend(item);
            let merged = stored.clone();
            drop(rows);
            self.mapper.to_internal(merged)
        }
    }

    fn remove(&self, id: &Value) -> impl Future<Output = Result<bool, DataError>> + Send {
        async move {
            let removed = self.rows.write().await.by_id.remove(&key_of(id)).is_some();
            Ok(removed)
        }
    }

    fn filter(
        &self,
        filters: &[Filter],
        params: Option<&PageOptions>,
    ) -> impl Future<Output = Result<Vec<Record>, DataError>> + Send {
        async move {
            let mut snapshot: Vec<(u64, Record)> = {
                let rows = self.rows.read().await;
                rows.by_id.values().cloned().collect()
            };
            snapshot.sort_by_key(|(seq, _)| *seq);

            let mut found = Vec::new();
            for (_, record) in snapshot {
                let record = self.mapper.to_internal(record)?;
                if filters.iter().all(|f| f.matches(&record)) {
                    found.push(record);
                }
            }

            let Some(params) = params else {
                return Ok(found);
            };
            sort_records(&mut found, params);
            if let Some(cursor) = &params.cursor {
                found.retain(|record| past_cursor(record, params, cursor));
            }
            Ok(found
                .into_iter()
                .skip(params.offset as usize)
                .take(params.limit as usize)
                .collect())
        }
    }

    fn update_transactional<F>(
        &self,
        id: &Value,
        apply: F,
    ) -> impl Future<Output = Result<Record, DataError>> + Send
    where
        F: FnOnce(Record) -> Result<Record, DataError> + Send,
    {
        async move {
            let mut rows = self.rows.write().await;
            let key = key_of(id);
            let (_, stored) = rows.by_id.get_mut(&key).ok_or_else(|| self.not_found(id))?;
            let current = self.mapper.to_internal(stored.clone())?;
            let mut next = self.mapper.to_external(apply(current)?)?;
            next.insert("id".to_string(), id.clone());
            *stored = next.clone();
            drop(rows);
            self.mapper.to_internal(next)
        }
    }
}

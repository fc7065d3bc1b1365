use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::DataError;
use crate::filter::Filter;
use crate::page::PageOptions;
use crate::Record;

/// Backend adapter operating on raw records.
///
/// Implementors provide `add`, `update`, `remove` and `filter`; the remaining
/// operations are derived from those unless the backend can do better.
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.
pub trait Gateway: Send + Sync {
    /// Insert a new record and return it as stored.
    ///
    /// A record without an id gets one from the backend. An explicit id that
    /// is already taken fails with [`DataError::AlreadyExists`].
    fn add(&self, item: Record) -> impl Future<Output = Result<Record, DataError>> + Send;

    /// Merge `item` into the stored record with the same id.
    ///
    /// With `if_unmodified_since`, the stored `updated_at` must be exactly that
    /// instant or the call fails with [`DataError::Conflict`].
    fn update(
        &self,
        item: Record,
        if_unmodified_since: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Record, DataError>> + Send;

    /// Delete by id, returning whether a record was there.
    fn remove(&self, id: &Value) -> impl Future<Output = Result<bool, DataError>> + Send;

    /// Records matching every filter, ordered and limited by `params`.
    fn filter(
        &self,
        filters: &[Filter],
        params: Option<&PageOptions>,
    ) -> impl Future<Output = Result<Vec<Record>, DataError>> + Send;

    fn get(&self, id: &Value) -> impl Future<Output = Result<Option<Record>, DataError>> + Send {
        async move {
            let filters = [Filter::for_id(id.clone())];
            let mut found = self.filter(&filters, None).await?;
            Ok(if found.is_empty() {
                None
            } else {
                Some(found.swap_remove(0))
            })
        }
    }

    fn count(&self, filters: &[Filter]) -> impl Future<Output = Result<u64, DataError>> + Send {
        async move { Ok(self.filter(filters, None).await?.len() as u64) }
    }

    fn exists(&self, filters: &[Filter]) -> impl Future<Output = Result<bool, DataError>> + Send {
        async move {
            let params = PageOptions::new(1, 0);
            Ok(!self.filter(filters, Some(&params)).await?.is_empty())
        }
    }

    /// Update the record, or add it when there is nothing to update.
    ///
    /// Two concurrent upserts of the same new id can both reach `add`; the
    /// loser fails with `AlreadyExists`.
    fn upsert(&self, item: Record) -> impl Future<Output = Result<Record, DataError>> + Send {
        async move {
            if matches!(item.get("id"), None | Some(Value::Null)) {
                return self.add(item).await;
            }
            match self.update(item.clone(), None).await {
                Err(err) if err.is_does_not_exist() => self.add(item).await,
                other => other,
            }
        }
    }

    /// Read, transform and write back one record under an exclusive lock.
    fn update_transactional<F>(
        &self,
        id: &Value,
        apply: F,
    ) -> impl Future<Output = Result<Record, DataError>> + Send
    where
        F: FnOnce(Record) -> Result<Record, DataError> + Send,
    {
        let _ = apply;
        async move {
            Err(DataError::NotImplemented(format!(
                "update_transactional({id}) is not supported by this gateway"
            )))
        }
    }
}

impl<G: Gateway> Gateway for Arc<G> {
    fn add(&self, item: Record) -> impl Future<Output = Result<Record, DataError>> + Send {
        (**self).add(item)
    }

    fn update(
        &self,
        item: Record,
        if_unmodified_since: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Record, DataError>> + Send {
        (**self).update(item, if_unmodified_since)
    }

    fn remove(&self, id: &Value) -> impl Future<Output = Result<bool, DataError>> + Send {
        (**self).remove(id)
    }

    fn filter(
        &self,
        filters: &[Filter],
        params: Option<&PageOptions>,
    ) -> impl Future<Output = Result<Vec<Record>, DataError>> + Send {
        (**self).filter(filters, params)
    }

    fn get(&self, id: &Value) -> impl Future<Output = Result<Option<Record>, DataError>> + Send {
        (**self).get(id)
    }

    fn count(&self, filters: &[Filter]) -> impl Future<Output = Result<u64, DataError>> + Send {
        (**self).count(filters)
    }

    fn exists(&self, filters: &[Filter]) -> impl Future<Output = Result<bool, DataError>> + Send {
        (**self).exists(filters)
    }

    fn upsert(&self, item: Record) -> impl Future<Output = Result<Record, DataError>> + Send {
        (**self).upsert(item)
    }

    fn update_transactional<F>(
        &self,
        id: &Value,
        apply: F,
    ) -> impl Future<Output = Result<Record, DataError>> + Send
    where
        F: FnOnce(Record) -> Result<Record, DataError> + Send,
    {
        (**self).update_transactional(id, apply)
    }
}

/// The `id` of a record, required for updates.
pub fn require_id(item: &Record) -> Result<Value, DataError> {
    match item.get("id") {
        Some(id) if !id.is_null() => Ok(id.clone()),
        _ => Err(crate::error::ValidationError::new("id", "an id is required to update a record").into()),
    }
}

//! Object storage as a read-mostly [`Gateway`].
//!
//! Objects are listed, fetched and deleted through a [`BucketProvider`]; each
//! object surfaces as a record `{id, last_modified, etag, size}`. Writes go
//! through [`ObjectStoreGateway::upload`] rather than `add`/`update`.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;

use crate::error::DataError;
use crate::filter::Filter;
use crate::gateway::Gateway;
use crate::page::PageOptions;
use crate::tenant::require_tenant;
use crate::{timestamp, Record};

/// Largest page a bucket listing returns.
pub const MAX_PAGE_SIZE: u64 = 1000;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub etag: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub prefix: Option<String>,
    pub start_after: Option<String>,
    pub max_keys: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignMethod {
    Get,
    Put,
}

impl PresignMethod {
    fn as_str(self) -> &'static str {
        match self {
            PresignMethod::Get => "GET",
            PresignMethod::Put => "PUT",
        }
    }
}

/// Pluggable bucket backend.
///
/// Listings are returned in ascending key order, at most `max_keys` at a time.
pub trait BucketProvider: Send + Sync + 'static {
    fn bucket(&self) -> &str;
    fn head<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<ObjectSummary>, DataError>>;
    fn list(&self, request: ListRequest) -> BoxFuture<'_, Result<Vec<ObjectSummary>, DataError>>;
    fn put<'a>(&'a self, key: &'a str, body: Bytes) -> BoxFuture<'a, Result<ObjectSummary, DataError>>;
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Bytes>, DataError>>;
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), DataError>>;
    fn delete_many(&self, keys: Vec<String>) -> BoxFuture<'_, Result<(), DataError>>;
    fn presign(&self, method: PresignMethod, key: &str, expires_in: Duration) -> Result<String, DataError>;
}

/// In-process bucket backed by `DashMap`, for tests and local runs.
#[derive(Clone, Default)]
pub struct MemoryBucket {
    name: String,
    objects: Arc<DashMap<String, (Bytes, DateTime<Utc>)>>,
    list_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
}

impl MemoryBucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Number of `list` calls served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }

    /// Number of `delete`/`delete_many` calls served so far.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn summary(key: &str, body: &Bytes, last_modified: DateTime<Utc>) -> ObjectSummary {
        let mut hasher = DefaultHasher::new();
        body.hash(&mut hasher);
        ObjectSummary {
            key: key.to_string(),
            last_modified,
            etag: format!("\"{:016x}\"", hasher.finish()),
            size: body.len() as u64,
        }
    }
}

impl BucketProvider for MemoryBucket {
    fn bucket(&self) -> &str {
        &self.name
    }

    fn head<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<ObjectSummary>, DataError>> {
        Box::pin(async move {
            Ok(self
                .objects
                .get(key)
                .map(|entry| Self::summary(key, &entry.value().0, entry.value().1)))
        })
    }

    fn list(&self, request: ListRequest) -> BoxFuture<'_, Result<Vec<ObjectSummary>, DataError>> {
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::Relaxed);
            let mut found: Vec<ObjectSummary> = self
                .objects
                .iter()
                .filter(|entry| match &request.prefix {
                    Some(prefix) => entry.key().starts_with(prefix.as_str()),
                    None => true,
                })
                .filter(|entry| match &request.start_after {
                    Some(after) => entry.key().as_str() > after.as_str(),
                    None => true,
                })
                .map(|entry| Self::summary(entry.key(), &entry.value().0, entry.value().1))
                .collect();
            found.sort_by(|a, b| a.key.cmp(&b.key));
            found.truncate(request.max_keys);
            Ok(found)
        })
    }

    fn put<'a>(&'a self, key: &'a str, body: Bytes) -> BoxFuture<'a, Result<ObjectSummary, DataError>> {
        Box::pin(async move {
            let now = timestamp::now();
            let summary = Self::summary(key, &body, now);
            self.objects.insert(key.to_string(), (body, now));
            Ok(summary)
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Bytes>, DataError>> {
        Box::pin(async move { Ok(self.objects.get(key).map(|entry| entry.value().0.clone())) })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), DataError>> {
        Box::pin(async move {
            self.delete_calls.fetch_add(1, Ordering::Relaxed);
            self.objects.remove(key);
            Ok(())
        })
    }

    fn delete_many(&self, keys: Vec<String>) -> BoxFuture<'_, Result<(), DataError>> {
        Box::pin(async move {
            self.delete_calls.fetch_add(1, Ordering::Relaxed);
            for key in keys {
                self.objects.remove(&key);
            }
            Ok(())
        })
    }

    fn presign(&self, method: PresignMethod, key: &str, expires_in: Duration) -> Result<String, DataError> {
        Ok(format!(
            "memory://{}/{key}?method={}&expires={}",
            self.name,
            method.as_str(),
            expires_in.as_secs()
        ))
    }
}

/// A [`Gateway`] listing the objects of one bucket.
///
/// Supported queries are deliberately narrow: at most one `prefix` filter,
/// ordering by `id` only, no offsets (use a cursor), pages of up to
/// [`MAX_PAGE_SIZE`]. In multi-tenant mode every key lives under
/// `tenant-<tenant>/`.
pub struct ObjectStoreGateway<P> {
    provider: P,
    multitenant: bool,
    presign_expiry: Duration,
}

impl<P: BucketProvider> ObjectStoreGateway<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            multitenant: false,
            presign_expiry: Duration::from_secs(3600),
        }
    }

    pub fn multitenant(mut self) -> Self {
        self.multitenant = true;
        self
    }

    pub fn presign_expiry(mut self, expiry: Duration) -> Self {
        self.presign_expiry = expiry;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Default listing parameters: full pages ordered by id.
    pub fn default_params() -> PageOptions {
        PageOptions::new(MAX_PAGE_SIZE, 0).order_by("id", true)
    }

    fn key_prefix(&self) -> Result<String, DataError> {
        if self.multitenant {
            Ok(format!("tenant-{}/", require_tenant(self.provider.bucket())?))
        } else {
            Ok(String::new())
        }
    }

    fn key_for(&self, id: &Value) -> Result<String, DataError> {
        let id = match id {
            Value::String(id) => id.clone(),
            other => other.to_string(),
        };
        Ok(format!("{}{id}", self.key_prefix()?))
    }

    fn to_record(&self, prefix: &str, summary: ObjectSummary) -> Record {
        let id = summary
            .key
            .strip_prefix(prefix)
            .unwrap_or(&summary.key)
            .to_string();
        let mut record = Record::new();
        record.insert("id".to_string(), Value::String(id));
        record.insert(
            "last_modified".to_string(),
            Value::String(timestamp::format(&summary.last_modified)),
        );
        record.insert("etag".to_string(), Value::String(summary.etag));
        record.insert("size".to_string(), Value::from(summary.size));
        record
    }

    fn list_request(&self, filters: &[Filter], params: &PageOptions) -> Result<ListRequest, DataError> {
        if params.offset != 0 {
            return Err(DataError::Unsupported(
                "object listings cannot skip an offset, use a cursor".into(),
            ));
        }
        if params.order_by != "id" || !params.ascending {
            return Err(DataError::Unsupported(format!(
                "object listings are ordered by ascending id, not '{}'",
                params.order_by
            )));
        }
        let key_prefix = self.key_prefix()?;
        let prefix = match filters {
            [] => None,
            [Filter::In { field, values }] if field == "prefix" => match values.as_slice() {
                [Value::String(prefix)] => Some(prefix.clone()),
                _ => {
                    return Err(DataError::Unsupported(
                        "the prefix filter takes exactly one string".into(),
                    ))
                }
            },
            _ => {
                return Err(DataError::Unsupported(
                    "object listings only support a single 'prefix' filter".into(),
                ))
            }
        };
        let prefix = match (prefix, key_prefix.is_empty()) {
            (None, true) => None,
            (prefix, _) => Some(format!("{key_prefix}{}", prefix.unwrap_or_default())),
        };
        let start_after = match &params.cursor {
            Some(cursor) => Some(self.key_for(cursor)?),
            None => None,
        };
        Ok(ListRequest {
            prefix,
            start_after,
            max_keys: params.limit.min(MAX_PAGE_SIZE) as usize,
        })
    }

    /// Delete several objects in one call.
    pub async fn remove_multiple(&self, ids: &[Value]) -> Result<(), DataError> {
        if ids.is_empty() {
            return Ok(());
        }
        let keys = ids.iter().map(|id| self.key_for(id)).collect::<Result<Vec<_>, _>>()?;
        self.provider.delete_many(keys).await
    }

    /// Delete every object matching `filters`, one listing page at a time.
    /// Returns how many objects were deleted.
    pub async fn remove_filtered(&self, filters: &[Filter]) -> Result<u64, DataError> {
        let params = Self::default_params();
        let mut removed = 0;
        loop {
            let page = self.filter(filters, Some(&params)).await?;
            let ids: Vec<Value> = page.iter().filter_map(|r| r.get("id").cloned()).collect();
            removed += ids.len() as u64;
            self.remove_multiple(&ids).await?;
            if (page.len() as u64) < MAX_PAGE_SIZE {
                break;
            }
        }
        tracing::debug!(bucket = self.provider.bucket(), removed, "removed objects by filter");
        Ok(removed)
    }

    pub fn create_download_url(&self, id: &Value) -> Result<String, DataError> {
        let key = self.key_for(id)?;
        self.provider.presign(PresignMethod::Get, &key, self.presign_expiry)
    }

    pub fn create_upload_url(&self, id: &Value) -> Result<String, DataError> {
        let key = self.key_for(id)?;
        self.provider.presign(PresignMethod::Put, &key, self.presign_expiry)
    }

    pub async fn upload(&self, id: &Value, body: Bytes) -> Result<Record, DataError> {
        let key = self.key_for(id)?;
        let summary = self.provider.put(&key, body).await?;
        Ok(self.to_record(&self.key_prefix()?, summary))
    }

    pub async fn download(&self, id: &Value) -> Result<Option<Bytes>, DataError> {
        let key = self.key_for(id)?;
        self.provider.get(&key).await
    }

    pub async fn upload_file(&self, id: &Value, path: impl AsRef<Path>) -> Result<Record, DataError> {
        let body = tokio::fs::read(path).await?;
        self.upload(id, Bytes::from(body)).await
    }

    /// Write an object to `path`, which must not exist yet.
    pub async fn download_file(&self, id: &Value, path: impl AsRef<Path>) -> Result<(), DataError> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await? {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            )
            .into());
        }
        let body = self
            .download(id)
            .await?
            .ok_or_else(|| DataError::does_not_exist(self.provider.bucket(), Some(id)))?;
        tokio::fs::write(path, &body).await?;
        Ok(())
    }
}

impl<P: BucketProvider> Gateway for ObjectStoreGateway<P> {
    fn add(&self, _item: Record) -> impl Future<Output = Result<Record, DataError>> + Send {
        async move { Err(DataError::NotImplemented("object store add, use upload".into())) }
    }

    fn update(
        &self,
        _item: Record,
        _if_unmodified_since: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Record, DataError>> + Send {
        async move { Err(DataError::NotImplemented("object store update, use upload".into())) }
    }

    /// Always `true`: buckets do not report whether the key was there.
    fn remove(&self, id: &Value) -> impl Future<Output = Result<bool, DataError>> + Send {
        async move {
            let key = self.key_for(id)?;
            self.provider.delete(&key).await?;
            Ok(true)
        }
    }

    fn filter(
        &self,
        filters: &[Filter],
        params: Option<&PageOptions>,
    ) -> impl Future<Output = Result<Vec<Record>, DataError>> + Send {
        async move {
            let defaults = Self::default_params();
            let request = self.list_request(filters, params.unwrap_or(&defaults))?;
            let key_prefix = self.key_prefix()?;
            let objects = self.provider.list(request).await?;
            Ok(objects
                .into_iter()
                .map(|summary| self.to_record(&key_prefix, summary))
                .collect())
        }
    }

    fn get(&self, id: &Value) -> impl Future<Output = Result<Option<Record>, DataError>> + Send {
        async move {
            let key = self.key_for(id)?;
            let key_prefix = self.key_prefix()?;
            Ok(self
                .provider
                .head(&key)
                .await?
                .map(|summary| self.to_record(&key_prefix, summary)))
        }
    }

    fn count(&self, filters: &[Filter]) -> impl Future<Output = Result<u64, DataError>> + Send {
        async move {
            let mut params = Self::default_params();
            let mut total = 0;
            loop {
                let page = self.filter(filters, Some(&params)).await?;
                total += page.len() as u64;
                match page.last().and_then(|r| r.get("id")) {
                    Some(last) if page.len() as u64 == MAX_PAGE_SIZE => params.cursor = Some(last.clone()),
                    _ => break,
                }
            }
            Ok(total)
        }
    }

    fn exists(&self, filters: &[Filter]) -> impl Future<Output = Result<bool, DataError>> + Send {
        async move {
            let params = Self::default_params().limit(1);
            Ok(!self.filter(filters, Some(&params)).await?.is_empty())
        }
    }
}

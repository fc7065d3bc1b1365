use std::marker::PhantomData;

use serde_json::Value;
use uuid::Uuid;

use crate::entity::Entity;
use crate::error::DataError;
use crate::filter::Filter;
use crate::gateway::Gateway;
use crate::page::{Page, PageOptions};
use crate::Record;

/// How [`Repository::update`] guards against concurrent writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Read, apply, then write only if `updated_at` is unchanged.
    #[default]
    Optimistic,
    /// Read, apply and write inside the gateway's exclusive lock.
    Pessimistic,
}

/// Typed access to the records of one gateway.
///
/// Records are validated into `E` on the way out and serialised on the way in.
///
/// # Example
///
/// ```ignore
/// let jobs = Repository::<Job, _>::new(MemoryGateway::new("job"));
/// let job = jobs.add_record(fields).await?;
/// let page = jobs.filter(&[Filter::eq("company", "Acme")], Some(&PageOptions::new(2, 0))).await?;
/// ```
pub struct Repository<E, G> {
    gateway: G,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity, G: Gateway> Repository<E, G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            _marker: PhantomData,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    fn key(id: Uuid) -> Value {
        Value::String(id.to_string())
    }

    fn hydrate(records: Vec<Record>) -> Result<Vec<E>, DataError> {
        records.into_iter().map(E::from_record).collect()
    }

    pub async fn get(&self, id: Uuid) -> Result<E, DataError> {
        match self.gateway.get(&Self::key(id)).await? {
            Some(record) => E::from_record(record),
            None => Err(DataError::does_not_exist(E::NAME, Some(id))),
        }
    }

    pub async fn add(&self, entity: &E) -> Result<E, DataError> {
        let stored = self.gateway.add(entity.to_record()?).await?;
        E::from_record(stored)
    }

    /// Build the entity from raw fields, then add it.
    pub async fn add_record(&self, fields: Record) -> Result<E, DataError> {
        let entity = E::create(fields)?;
        self.add(&entity).await
    }

    /// Apply `values` to the stored entity.
    ///
    /// Empty `values` is a plain read. In optimistic mode a concurrent write
    /// between the read and the write fails with [`DataError::Conflict`] and
    /// nothing is applied.
    pub async fn update(&self, id: Uuid, values: Record, mode: UpdateMode) -> Result<E, DataError> {
        if values.is_empty() {
            return self.get(id).await;
        }
        match mode {
            UpdateMode::Optimistic => {
                let current = self.get(id).await?;
                let since = current.updated_at();
                let next = current.update(values)?;
                let stored = self.gateway.update(next.to_record()?, Some(since)).await?;
                E::from_record(stored)
            }
            UpdateMode::Pessimistic => {
                let stored = self
                    .gateway
                    .update_transactional(&Self::key(id), move |record| {
                        E::from_record(record)?.update(values)?.to_record()
                    })
                    .await?;
                E::from_record(stored)
            }
        }
    }

    /// One page of matches and the total match count.
    ///
    /// The count query is skipped when a first page comes back short, since
    /// it already holds every match.
    pub async fn filter(&self, filters: &[Filter], params: Option<&PageOptions>) -> Result<Page<E>, DataError> {
        let records = self.gateway.filter(filters, params).await?;
        let fetched = records.len() as u64;
        let total = match params {
            Some(p) if p.offset == 0 && p.cursor.is_none() && fetched < p.limit => fetched,
            Some(_) => self.gateway.count(filters).await?,
            None => fetched,
        };
        Ok(Page::new(Self::hydrate(records)?, total, params))
    }

    pub async fn all(&self, params: Option<&PageOptions>) -> Result<Page<E>, DataError> {
        self.filter(&[], params).await
    }

    pub async fn by(
        &self,
        key: &str,
        value: impl Into<Value>,
        params: Option<&PageOptions>,
    ) -> Result<Page<E>, DataError> {
        self.filter(&[Filter::eq(key, value)], params).await
    }

    pub async fn remove(&self, id: Uuid) -> Result<bool, DataError> {
        self.gateway.remove(&Self::key(id)).await
    }

    pub async fn count(&self, filters: &[Filter]) -> Result<u64, DataError> {
        self.gateway.count(filters).await
    }

    pub async fn exists(&self, filters: &[Filter]) -> Result<bool, DataError> {
        self.gateway.exists(filters).await
    }

    pub async fn upsert(&self, entity: &E) -> Result<E, DataError> {
        let stored = self.gateway.upsert(entity.to_record()?).await?;
        E::from_record(stored)
    }
}

impl<E, G: Clone> Clone for Repository<E, G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            _marker: PhantomData,
        }
    }
}

use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use uuid::Uuid;

use crate::entity::Entity;
use crate::error::DataError;
use crate::filter::Filter;
use crate::gateway::Gateway;
use crate::page::{Page, PageOptions};
use crate::repository::{Repository, UpdateMode};
use crate::Record;

/// Bounded retry of conflicting optimistic updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
    /// Upper bound of the random pause added to `delay`.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::ZERO,
            max_jitter: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` attempts with no pause between them.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    fn backoff(&self) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.delay + Duration::from_millis(jitter)
    }
}

/// Use-case facing access to one entity type.
///
/// Delegates to a [`Repository`] and retries updates that lose an
/// optimistic race, which assumes updates converge when re-applied.
pub struct Manage<E, G> {
    repository: Repository<E, G>,
    retry: RetryPolicy,
}

impl<E: Entity, G: Gateway> Manage<E, G> {
    pub fn new(gateway: G) -> Self {
        Self::from_repository(Repository::new(gateway))
    }

    pub fn from_repository(repository: Repository<E, G>) -> Self {
        Self {
            repository,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn repository(&self) -> &Repository<E, G> {
        &self.repository
    }

    pub async fn create(&self, fields: Record) -> Result<E, DataError> {
        self.repository.add_record(fields).await
    }

    /// Store an entity that is already built.
    pub async fn add(&self, entity: &E) -> Result<E, DataError> {
        self.repository.add(entity).await
    }

    pub async fn retrieve(&self, id: Uuid) -> Result<E, DataError> {
        self.repository.get(id).await
    }

    /// Optimistic update, retried on conflict.
    pub async fn update(&self, id: Uuid, values: Record) -> Result<E, DataError> {
        self.update_with(id, values, true).await
    }

    /// Optimistic update; with `retry_on_conflict` false a single conflict is
    /// returned to the caller.
    pub async fn update_with(&self, id: Uuid, values: Record, retry_on_conflict: bool) -> Result<E, DataError> {
        if !retry_on_conflict {
            return self.repository.update(id, values, UpdateMode::Optimistic).await;
        }
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.repository.update(id, values.clone(), UpdateMode::Optimistic).await {
                Err(err) if err.is_conflict() && attempt < max_attempts => {
                    let pause = self.retry.backoff();
                    tracing::debug!(
                        entity = E::NAME,
                        %id,
                        attempt,
                        pause_ms = pause.as_millis() as u64,
                        "update conflicted, retrying"
                    );
                    tokio::time::sleep(pause).await;
                    attempt += 1;
                }
                Err(err) if err.is_conflict() => {
                    tracing::warn!(entity = E::NAME, %id, attempts = attempt, "update still conflicting, giving up");
                    return Err(err);
                }
                other => return other,
            }
        }
    }

    pub async fn destroy(&self, id: Uuid) -> Result<bool, DataError> {
        self.repository.remove(id).await
    }

    pub async fn list(&self, params: Option<&PageOptions>) -> Result<Page<E>, DataError> {
        self.repository.all(params).await
    }

    pub async fn by(
        &self,
        key: &str,
        value: impl Into<Value>,
        params: Option<&PageOptions>,
    ) -> Result<Page<E>, DataError> {
        self.repository.by(key, value, params).await
    }

    pub async fn filter(&self, filters: &[Filter], params: Option<&PageOptions>) -> Result<Page<E>, DataError> {
        self.repository.filter(filters, params).await
    }

    pub async fn count(&self, filters: &[Filter]) -> Result<u64, DataError> {
        self.repository.count(filters).await
    }

    pub async fn exists(&self, filters: &[Filter]) -> Result<bool, DataError> {
        self.repository.exists(filters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert!(policy.backoff() <= Duration::from_millis(200));
    }

    #[test]
    fn immediate_has_no_pause() {
        assert_eq!(RetryPolicy::immediate(3).backoff(), Duration::ZERO);
    }
}

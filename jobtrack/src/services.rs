use jobtrack_data::{Gateway, Manage, MemoryGateway, RetryPolicy};
use jobtrack_data_sqlx::SqlGateway;
use sqlx::SqlitePool;

use crate::domain::{Job, ResumeMainInfo, ResumeTemplate, User};
use crate::store;

/// One manager per entity, all over the same kind of gateway.
pub struct Managers<G> {
    pub users: Manage<User, G>,
    pub jobs: Manage<Job, G>,
    pub resumes: Manage<ResumeMainInfo, G>,
    pub templates: Manage<ResumeTemplate, G>,
}

impl<G: Gateway> Managers<G> {
    pub fn new(users: G, jobs: G, resumes: G, templates: G, retry: RetryPolicy) -> Self {
        Self {
            users: Manage::new(users).with_retry(retry),
            jobs: Manage::new(jobs).with_retry(retry),
            resumes: Manage::new(resumes).with_retry(retry),
            templates: Manage::new(templates).with_retry(retry),
        }
    }
}

impl Managers<MemoryGateway> {
    /// Process-local store. Résumé experiences are kept inline.
    pub fn in_memory(retry: RetryPolicy) -> Self {
        Self::new(
            MemoryGateway::new(store::USER_TABLE),
            MemoryGateway::new(store::JOB_TABLE),
            MemoryGateway::new(store::RESUME_TABLE),
            MemoryGateway::new(store::TEMPLATE_TABLE),
            retry,
        )
    }
}

impl Managers<SqlGateway> {
    /// Store over a migrated pool, see [`store::connect`].
    pub fn sql(pool: &SqlitePool, multitenant: bool, retry: RetryPolicy) -> Self {
        Self::new(
            store::user_gateway(pool, multitenant),
            store::job_gateway(pool, multitenant),
            store::resume_gateway(pool, multitenant),
            store::template_gateway(pool, multitenant),
            retry,
        )
    }
}

use jobtrack_data::{Gateway, Manage, Page, Record};
use uuid::Uuid;

use crate::domain::Job;
use crate::requests::{
    build_add_job_request, build_delete_job_request, build_list_jobs_request, build_update_job_request,
};
use crate::response::{Failure, Response};

pub async fn add_job<G: Gateway>(jobs: &Manage<Job, G>, data: Record) -> Response<Job> {
    try_add_job(jobs, data).await.into()
}

async fn try_add_job<G: Gateway>(jobs: &Manage<Job, G>, data: Record) -> Result<Job, Failure> {
    let request = build_add_job_request(data)?;
    let job = jobs.create(request.data).await?;
    tracing::info!(id = %job.meta.id, company = %job.company, "job added");
    Ok(job)
}

/// One page of jobs matching `filters`.
pub async fn list_jobs<G: Gateway>(
    jobs: &Manage<Job, G>,
    filters: Option<&Record>,
    params: Option<&Record>,
) -> Response<Page<Job>> {
    try_list_jobs(jobs, filters, params).await.into()
}

async fn try_list_jobs<G: Gateway>(
    jobs: &Manage<Job, G>,
    filters: Option<&Record>,
    params: Option<&Record>,
) -> Result<Page<Job>, Failure> {
    let request = build_list_jobs_request(filters, params)?;
    Ok(jobs.filter(&request.filters, request.params.as_ref()).await?)
}

/// Apply the given fields to the job named by `data["id"]`.
pub async fn update_job<G: Gateway>(jobs: &Manage<Job, G>, data: Record) -> Response<Job> {
    try_update_job(jobs, data).await.into()
}

async fn try_update_job<G: Gateway>(jobs: &Manage<Job, G>, data: Record) -> Result<Job, Failure> {
    let request = build_update_job_request(data)?;
    let job = jobs.update(request.id, request.values).await?;
    tracing::info!(id = %job.meta.id, "job updated");
    Ok(job)
}

pub async fn delete_job<G: Gateway>(jobs: &Manage<Job, G>, id: &str) -> Response<Uuid> {
    try_delete_job(jobs, id).await.into()
}

async fn try_delete_job<G: Gateway>(jobs: &Manage<Job, G>, id: &str) -> Result<Uuid, Failure> {
    let id = build_delete_job_request(id)?;
    if !jobs.destroy(id).await? {
        return Err(Failure::resource(format!("Job with id {id} does not exist")));
    }
    tracing::info!(%id, "job deleted");
    Ok(id)
}

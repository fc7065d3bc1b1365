use jobtrack_data::{Filter, PageOptions, Record};
use uuid::Uuid;

use super::filters::JOB_FILTERS;
use super::{build_create, build_id, build_update, CreateRequest, InvalidRequest, UpdateRequest};

const ADD_JOB_REQUIRED: &[&str] = &["user_id", "title", "company", "country", "city"];

#[derive(Debug, Clone, PartialEq)]
pub struct ListJobsRequest {
    pub filters: Vec<Filter>,
    pub params: Option<PageOptions>,
}

pub fn build_add_job_request(data: Record) -> Result<CreateRequest, InvalidRequest> {
    build_create(data, ADD_JOB_REQUIRED)
}

pub fn build_update_job_request(data: Record) -> Result<UpdateRequest, InvalidRequest> {
    build_update(data, &[])
}

pub fn build_delete_job_request(id: &str) -> Result<Uuid, InvalidRequest> {
    build_id(id)
}

/// Filters per [`JOB_FILTERS`]; problems with both mappings are reported together.
pub fn build_list_jobs_request(
    filters: Option<&Record>,
    params: Option<&Record>,
) -> Result<ListJobsRequest, InvalidRequest> {
    let mut invalid = InvalidRequest::new();
    let filters = match filters.map(|f| JOB_FILTERS.parse(f)).transpose() {
        Ok(filters) => filters.unwrap_or_default(),
        Err(err) => {
            invalid.errors.extend(err.errors);
            Vec::new()
        }
    };
    let params = match params.map(|p| JOB_FILTERS.page_options(p)).transpose() {
        Ok(params) => params,
        Err(err) => {
            invalid.errors.extend(err.errors);
            None
        }
    };
    invalid.or_ok(ListJobsRequest { filters, params })
}

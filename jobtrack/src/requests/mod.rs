//! Validation of raw use-case input.
//!
//! Every `build_*` factory returns either a typed request or an
//! [`InvalidRequest`] listing each problem as a `{parameter, message}` pair.
//! Factories check the shape of the input only; field types and domain
//! constraints are checked when the entity is built.

mod filters;
mod job;
mod resume;
mod template;
mod user;

use std::fmt;

use jobtrack_data::Record;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

pub use filters::{parse_page_options, FilterSpec, JOB_FILTERS};
pub use job::{
    build_add_job_request, build_delete_job_request, build_list_jobs_request, build_update_job_request, ListJobsRequest,
};
pub use resume::{build_add_resume_main_info_request, build_update_resume_main_info_request};
pub use template::{
    build_add_resume_template_request, build_render_resume_request, build_update_resume_template_request,
    RenderResumeRequest,
};
pub use user::{build_add_user_request, build_delete_user_request};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterError {
    pub parameter: String,
    pub message: String,
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.parameter, self.message)
    }
}

/// Input rejected before reaching the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidRequest {
    pub errors: Vec<ParameterError>,
}

impl InvalidRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, parameter: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ParameterError {
            parameter: parameter.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// `Err(self)` when any error was recorded, `Ok(value)` otherwise.
    pub fn or_ok<T>(self, value: T) -> Result<T, InvalidRequest> {
        if self.has_errors() {
            Err(self)
        } else {
            Ok(value)
        }
    }
}

impl fmt::Display for InvalidRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "invalid request: {}", errors.join("; "))
    }
}

impl std::error::Error for InvalidRequest {}

/// Fields for a new entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub data: Record,
}

/// Changes to the entity with `id`. `values` never contains `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub id: Uuid,
    pub values: Record,
}

fn require_fields(data: &Record, required: &[&str], invalid: &mut InvalidRequest) {
    for field in required {
        match data.get(*field) {
            None | Some(Value::Null) => invalid.add_error(*field, format!("'{field}' is required.")),
            _ => {}
        }
    }
}

fn parse_uuid(parameter: &str, value: &Value, invalid: &mut InvalidRequest) -> Option<Uuid> {
    let parsed = value.as_str().and_then(|raw| Uuid::parse_str(raw.trim()).ok());
    if parsed.is_none() {
        invalid.add_error(parameter, format!("'{parameter}' must be a UUID."));
    }
    parsed
}

/// A bare id given as text.
fn build_id(id: &str) -> Result<Uuid, InvalidRequest> {
    let mut invalid = InvalidRequest::new();
    match parse_uuid("id", &Value::from(id), &mut invalid) {
        Some(id) => Ok(id),
        None => Err(invalid),
    }
}

fn build_create(data: Record, required: &[&str]) -> Result<CreateRequest, InvalidRequest> {
    let mut invalid = InvalidRequest::new();
    if data.is_empty() {
        invalid.add_error("data", "Must not be empty.");
    }
    require_fields(&data, required, &mut invalid);
    invalid.or_ok(CreateRequest { data })
}

/// Split `id` out of `data`; the rest of `required` must be present too.
fn build_update(mut data: Record, required: &[&str]) -> Result<UpdateRequest, InvalidRequest> {
    let mut invalid = InvalidRequest::new();
    require_fields(&data, required, &mut invalid);
    let id = match data.remove("id") {
        Some(value) if !value.is_null() => parse_uuid("id", &value, &mut invalid),
        _ => {
            invalid.add_error("id", "'id' is required.");
            None
        }
    };
    match id {
        Some(id) if !invalid.has_errors() => Ok(UpdateRequest { id, values: data }),
        _ => Err(invalid),
    }
}

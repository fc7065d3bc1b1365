use jobtrack_data::Record;
use serde_json::Value;
use uuid::Uuid;

use super::{build_create, build_update, parse_uuid, CreateRequest, InvalidRequest, UpdateRequest};

/// Which résumé to fill and which template to fill it into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderResumeRequest {
    pub resume_id: Uuid,
    pub template_id: Uuid,
}

pub fn build_add_resume_template_request(data: Record) -> Result<CreateRequest, InvalidRequest> {
    build_create(data, &["resume_template"])
}

pub fn build_update_resume_template_request(data: Record) -> Result<UpdateRequest, InvalidRequest> {
    build_update(data, &["resume_template"])
}

pub fn build_render_resume_request(resume_id: &str, template_id: &str) -> Result<RenderResumeRequest, InvalidRequest> {
    let mut invalid = InvalidRequest::new();
    let resume_id = parse_uuid("resume_id", &Value::from(resume_id), &mut invalid);
    let template_id = parse_uuid("template_id", &Value::from(template_id), &mut invalid);
    match (resume_id, template_id) {
        (Some(resume_id), Some(template_id)) => Ok(RenderResumeRequest { resume_id, template_id }),
        _ => Err(invalid),
    }
}

use jobtrack_data::{DataError, Entity, Gateway, Manage, Record};

use super::revision;
use crate::domain::ResumeTemplate;
use crate::requests::{build_add_resume_template_request, build_update_resume_template_request};
use crate::response::{Failure, Response};

pub async fn add_resume_template<G: Gateway>(
    templates: &Manage<ResumeTemplate, G>,
    data: Record,
) -> Response<ResumeTemplate> {
    try_add(templates, data).await.into()
}

async fn try_add<G: Gateway>(templates: &Manage<ResumeTemplate, G>, data: Record) -> Result<ResumeTemplate, Failure> {
    let request = build_add_resume_template_request(data)?;
    let template = templates.create(request.data).await?;
    tracing::info!(id = %template.id(), "template added");
    Ok(template)
}

/// Store an edited template as a new one whose `parent_id` is the edited
/// template and whose `version` is one past it. The edited template is left
/// untouched.
pub async fn update_resume_template<G: Gateway>(
    templates: &Manage<ResumeTemplate, G>,
    data: Record,
) -> Response<ResumeTemplate> {
    try_update(templates, data).await.into()
}

async fn try_update<G: Gateway>(
    templates: &Manage<ResumeTemplate, G>,
    data: Record,
) -> Result<ResumeTemplate, Failure> {
    let request = build_update_resume_template_request(data)?;
    let current = templates.retrieve(request.id).await?;
    let mut next = ResumeTemplate::create(revision(current.to_record()?, request.values)).map_err(DataError::from)?;
    next.versioned.version = current.version() + 1;
    let template = templates.add(&next).await?;
    tracing::info!(id = %template.id(), parent_id = %request.id, "template revised");
    Ok(template)
}

use jobtrack_data::{Entity, Gateway, Manage, Record};
use serde_json::Value;

use crate::domain::{ResumeMainInfo, ResumeTemplate};
use crate::render::TemplateRenderer;
use crate::requests::build_render_resume_request;
use crate::response::{Failure, Response};

/// Fill a stored template with a stored résumé.
///
/// The résumé's fields are the template context, experiences included.
pub async fn render_resume<G: Gateway, R: TemplateRenderer>(
    resumes: &Manage<ResumeMainInfo, G>,
    templates: &Manage<ResumeTemplate, G>,
    renderer: &R,
    resume_id: &str,
    template_id: &str,
) -> Response<String> {
    try_render(resumes, templates, renderer, resume_id, template_id).await.into()
}

async fn try_render<G: Gateway, R: TemplateRenderer>(
    resumes: &Manage<ResumeMainInfo, G>,
    templates: &Manage<ResumeTemplate, G>,
    renderer: &R,
    resume_id: &str,
    template_id: &str,
) -> Result<String, Failure> {
    let request = build_render_resume_request(resume_id, template_id)?;
    let resume = resumes.retrieve(request.resume_id).await?;
    let template = templates.retrieve(request.template_id).await?;
    let context: Record = resume.to_record()?;
    let rendered = renderer.render(&template.resume_template, &Value::Object(context))?;
    tracing::info!(
        resume_id = %request.resume_id,
        template_id = %request.template_id,
        bytes = rendered.len(),
        "resume rendered"
    );
    Ok(rendered)
}

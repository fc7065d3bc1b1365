use jobtrack_data::{Entity, Gateway, Manage, Record};
use serde_json::Value;

use super::revision;
use crate::domain::ResumeMainInfo;
use crate::requests::{build_add_resume_main_info_request, build_update_resume_main_info_request};
use crate::response::{Failure, Response};

pub async fn add_resume_main_info<G: Gateway>(
    resumes: &Manage<ResumeMainInfo, G>,
    data: Record,
) -> Response<ResumeMainInfo> {
    try_add(resumes, data).await.into()
}

async fn try_add<G: Gateway>(resumes: &Manage<ResumeMainInfo, G>, data: Record) -> Result<ResumeMainInfo, Failure> {
    let request = build_add_resume_main_info_request(data)?;
    let resume = resumes.create(request.data).await?;
    tracing::info!(id = %resume.id(), experiences = resume.experiences.len(), "resume added");
    Ok(resume)
}

/// Store an edited résumé as a new one whose `parent_id` is the edited
/// résumé. Experiences are copied into the new résumé.
pub async fn update_resume_main_info<G: Gateway>(
    resumes: &Manage<ResumeMainInfo, G>,
    data: Record,
) -> Response<ResumeMainInfo> {
    try_update(resumes, data).await.into()
}

async fn try_update<G: Gateway>(
    resumes: &Manage<ResumeMainInfo, G>,
    data: Record,
) -> Result<ResumeMainInfo, Failure> {
    let request = build_update_resume_main_info_request(data)?;
    let current = resumes.retrieve(request.id).await?;
    let mut fields = revision(current.to_record()?, request.values);
    if let Some(Value::Array(experiences)) = fields.get_mut("experiences") {
        for experience in experiences.iter_mut().filter_map(Value::as_object_mut) {
            detach(experience);
        }
    }
    let resume = resumes.create(fields).await?;
    tracing::info!(id = %resume.id(), parent_id = %request.id, "resume revised");
    Ok(resume)
}

/// Drop what ties an experience to its previous résumé.
fn detach(experience: &mut Record) {
    for key in ["id", "resume_id", "created_at", "updated_at"] {
        experience.remove(key);
    }
}

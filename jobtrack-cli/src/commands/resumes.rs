use std::path::{Path, PathBuf};

use clap::Args;
use jobtrack::{use_cases, Managers, TemplateRenderer};
use jobtrack_data::{Entity, Gateway, Record};
use serde_json::Value;

use super::input::{insert_opt, read_record, read_text, split_list};
use super::{report, CliResult};

#[derive(Debug, Clone, Args)]
pub struct AddResumeArgs {
    pub applicant_name: String,
    /// Comma-separated skills
    pub skills: String,
    #[arg(long)]
    pub user_id: String,
    #[arg(long)]
    pub resume_name: Option<String>,
    #[arg(long)]
    pub summary: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    /// JSON object with further fields, e.g. `experiences`
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl AddResumeArgs {
    pub fn into_record(self) -> Result<Record, Box<dyn std::error::Error>> {
        let mut data = match &self.file {
            Some(path) => read_record(path)?,
            None => Record::new(),
        };
        data.insert("user_id".into(), self.user_id.into());
        data.insert("applicant_name".into(), self.applicant_name.into());
        data.insert("skills".into(), Value::Array(split_list(&self.skills)));
        insert_opt(&mut data, "resume_name", self.resume_name);
        insert_opt(&mut data, "summary", self.summary);
        insert_opt(&mut data, "email", self.email);
        insert_opt(&mut data, "phone", self.phone);
        Ok(data)
    }
}

#[derive(Debug, Clone, Args)]
pub struct UpdateResumeArgs {
    pub id: String,
    #[arg(long)]
    pub resume_name: Option<String>,
    #[arg(long)]
    pub summary: Option<String>,
    /// Comma-separated skills replacing the current ones
    #[arg(long)]
    pub skills: Option<String>,
    /// JSON object with further fields to change
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl UpdateResumeArgs {
    pub fn into_record(self) -> Result<Record, Box<dyn std::error::Error>> {
        let mut data = match &self.file {
            Some(path) => read_record(path)?,
            None => Record::new(),
        };
        data.insert("id".into(), self.id.into());
        insert_opt(&mut data, "resume_name", self.resume_name);
        insert_opt(&mut data, "summary", self.summary);
        insert_opt(&mut data, "skills", self.skills.map(|s| Value::Array(split_list(&s))));
        Ok(data)
    }
}

pub async fn add<G: Gateway>(managers: &Managers<G>, args: AddResumeArgs) -> CliResult {
    let response = use_cases::add_resume_main_info(&managers.resumes, args.into_record()?).await;
    report(response, |resume| format!("Resume added (id = {})", resume.id()))?;
    Ok(())
}

pub async fn update<G: Gateway>(managers: &Managers<G>, args: UpdateResumeArgs) -> CliResult {
    let response = use_cases::update_resume_main_info(&managers.resumes, args.into_record()?).await;
    report(response, |resume| {
        format!("Resume revised (id = {}, parent = {})", resume.id(), display_parent(resume.parent_id))
    })?;
    Ok(())
}

fn display_parent(parent: Option<impl ToString>) -> String {
    parent.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
}

fn template_record(path: &Path) -> Result<Record, Box<dyn std::error::Error>> {
    let mut data = Record::new();
    data.insert("resume_template".into(), read_text(Some(path))?.into());
    Ok(data)
}

pub async fn add_template<G: Gateway>(managers: &Managers<G>, path: &Path) -> CliResult {
    let response = use_cases::add_resume_template(&managers.templates, template_record(path)?).await;
    report(response, |template| format!("Template added (id = {})", template.id()))?;
    Ok(())
}

pub async fn update_template<G: Gateway>(managers: &Managers<G>, id: &str, path: &Path) -> CliResult {
    let mut data = template_record(path)?;
    data.insert("id".into(), id.into());
    let response = use_cases::update_resume_template(&managers.templates, data).await;
    report(response, |template| {
        format!(
            "Template revised (id = {}, parent = {})",
            template.id(),
            display_parent(template.parent_id)
        )
    })?;
    Ok(())
}

/// Render to `output`, or to stdout when there is none.
pub async fn render<G: Gateway, R: TemplateRenderer>(
    managers: &Managers<G>,
    renderer: &R,
    resume_id: &str,
    template_id: &str,
    output: Option<&Path>,
) -> CliResult {
    let rendered = use_cases::render_resume(&managers.resumes, &managers.templates, renderer, resume_id, template_id)
        .await
        .into_result()?;
    match output {
        Some(path) => {
            std::fs::write(path, &rendered)?;
            eprintln!("Rendered {} bytes to {}", rendered.len(), path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

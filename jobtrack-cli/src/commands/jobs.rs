use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use jobtrack::use_cases;
use jobtrack::{Job, Managers};
use jobtrack_data::{Gateway, Record};
use serde_json::Value;

use super::input::{insert_opt, parse_pairs, read_text};
use super::{report, CliResult};

#[derive(Debug, Clone, Args)]
pub struct AddJobArgs {
    /// Job title
    pub title: String,
    /// Hiring company
    pub company: String,
    /// Owner of the application
    #[arg(long)]
    pub user_id: String,
    #[arg(long, default_value = "ADDED")]
    pub status: String,
    /// Country variant name, e.g. UnitedStates
    #[arg(long)]
    pub country: String,
    #[arg(long, default_value = "Remote")]
    pub city: String,
    /// REMOTE, HYBRID or ONSITE
    #[arg(long)]
    pub work_setting_type: Option<String>,
    /// FULLTIME, TEMPORARY or CONTRACT
    #[arg(long, default_value = "FULLTIME")]
    pub employment_type: String,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub external_id: Option<String>,
    /// Where the job is listed
    #[arg(long)]
    pub platform: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
    /// File holding the description; read from stdin when missing
    #[arg(long)]
    pub description_file: Option<PathBuf>,
}

impl AddJobArgs {
    pub fn into_record(self, description: String) -> Record {
        let mut data = Record::new();
        data.insert("user_id".into(), self.user_id.into());
        data.insert("title".into(), self.title.into());
        data.insert("company".into(), self.company.into());
        data.insert("description".into(), description.trim().into());
        data.insert("status".into(), self.status.to_uppercase().into());
        data.insert("country".into(), self.country.into());
        data.insert("city".into(), self.city.into());
        data.insert("employment_type".into(), self.employment_type.to_uppercase().into());
        insert_opt(&mut data, "work_setting_type", self.work_setting_type.map(|w| w.to_uppercase()));
        insert_opt(&mut data, "notes", self.notes);
        insert_opt(&mut data, "external_id", self.external_id);
        insert_opt(&mut data, "platform", self.platform);
        insert_opt(&mut data, "url", self.url);
        data
    }
}

#[derive(Debug, Clone, Args)]
pub struct UpdateJobArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
}

impl UpdateJobArgs {
    pub fn into_record(self) -> Record {
        let mut data = Record::new();
        data.insert("id".into(), self.id.into());
        insert_opt(&mut data, "title", self.title);
        insert_opt(&mut data, "company", self.company);
        insert_opt(&mut data, "status", self.status.map(|s| s.to_uppercase()));
        insert_opt(&mut data, "country", self.country);
        insert_opt(&mut data, "city", self.city);
        insert_opt(&mut data, "description", self.description);
        insert_opt(&mut data, "notes", self.notes);
        insert_opt(&mut data, "url", self.url);
        data
    }
}

#[derive(Debug, Clone, Args)]
pub struct ListJobsArgs {
    /// Status to include; repeat for several
    #[arg(long, short)]
    pub status: Vec<String>,
    #[arg(long, short)]
    pub company: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    /// Added after this date (YYYY-MM-DD)
    #[arg(long)]
    pub added_after: Option<String>,
    /// Added before this date (YYYY-MM-DD)
    #[arg(long)]
    pub added_before: Option<String>,
    /// Extra filters as key=value, e.g. updated_at__ge=2024-01-01
    #[arg(long = "filter", short = 'f')]
    pub filters: Vec<String>,
    #[arg(long, default_value_t = 10)]
    pub page_size: u64,
    #[arg(long, default_value = "created_at")]
    pub order_by: String,
    #[arg(long)]
    pub descending: bool,
}

impl ListJobsArgs {
    pub fn filters(&self) -> Result<Record, Box<dyn std::error::Error>> {
        let mut filters = parse_pairs(&self.filters)?;
        if !self.status.is_empty() {
            let statuses = self.status.iter().map(|s| Value::from(s.as_str())).collect();
            filters.insert("status".into(), Value::Array(statuses));
        }
        insert_opt(&mut filters, "company", self.company.clone());
        insert_opt(&mut filters, "country", self.country.clone());
        insert_opt(&mut filters, "city", self.city.clone());
        insert_opt(&mut filters, "created_at__gt", self.added_after.clone());
        insert_opt(&mut filters, "created_at__lt", self.added_before.clone());
        Ok(filters)
    }

    fn params(&self, offset: u64) -> Record {
        let mut params = Record::new();
        params.insert("limit".into(), self.page_size.into());
        params.insert("offset".into(), offset.into());
        params.insert("order_by".into(), self.order_by.clone().into());
        params.insert("ascending".into(), (!self.descending).into());
        params
    }
}

/// One line per job in listings.
pub fn job_line(job: &Job) -> String {
    format!(
        "{}: {} at {} ({}, {})",
        job.meta.id,
        job.title.bold(),
        job.company.cyan(),
        job.status,
        job.city
    )
}

pub async fn add<G: Gateway>(managers: &Managers<G>, args: AddJobArgs) -> CliResult {
    if args.description_file.is_none() {
        eprintln!("Enter the job description, then Ctrl+D:");
    }
    let description = read_text(args.description_file.as_deref())?;
    let response = use_cases::add_job(&managers.jobs, args.into_record(description)).await;
    report(response, |job| {
        format!("Job '{}' at '{}' added (id = {})", job.title, job.company, job.meta.id)
    })?;
    Ok(())
}

pub async fn update<G: Gateway>(managers: &Managers<G>, args: UpdateJobArgs) -> CliResult {
    let response = use_cases::update_job(&managers.jobs, args.into_record()).await;
    report(response, |job| format!("Job '{}' updated", job.meta.id))?;
    Ok(())
}

pub async fn delete<G: Gateway>(managers: &Managers<G>, id: &str) -> CliResult {
    let response = use_cases::delete_job(&managers.jobs, id).await;
    report(response, |id| format!("Job '{id}' deleted"))?;
    Ok(())
}

/// Print every matching job, one page at a time. Returns how many were shown.
pub async fn list<G: Gateway>(managers: &Managers<G>, args: &ListJobsArgs) -> Result<u64, Box<dyn std::error::Error>> {
    if args.page_size == 0 {
        return Err("--page-size must be positive".into());
    }
    let filters = args.filters()?;
    let mut shown = 0;
    loop {
        let params = args.params(shown);
        let page = use_cases::list_jobs(&managers.jobs, Some(&filters), Some(&params))
            .await
            .into_result()
            .map_err(|failure| {
                for error in &failure.errors {
                    eprintln!("  {} {}: {}", "-".red(), error.parameter.yellow(), error.message);
                }
                failure.to_string()
            })?;
        if page.items.is_empty() {
            break;
        }
        for job in &page.items {
            println!("{}", job_line(job));
        }
        shown += page.items.len() as u64;
        println!("{}", format!("Retrieved {shown}/{} jobs.", page.total).dimmed());
        if shown >= page.total {
            break;
        }
    }
    Ok(shown)
}

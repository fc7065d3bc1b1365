use garde::Validate;
use jobtrack_data::{Entity, EntityMeta};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Country;

named_enum!(
    /// Where an application stands.
    #[allow(clippy::upper_case_acronyms)]
    JobStatus, "job status" {
        ADDED,
        APPLIED,
        INTERVIEWING,
        OFFERED,
        REJECTED,
        ARCHIVED,
    }
);

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::ADDED
    }
}

named_enum!(
    #[allow(clippy::upper_case_acronyms)]
    EmploymentType, "employment type" {
        FULLTIME,
        TEMPORARY,
        CONTRACT,
    }
);

named_enum!(
    #[allow(clippy::upper_case_acronyms)]
    WorkSettingType, "work setting type" {
        REMOTE,
        HYBRID,
        ONSITE,
    }
);

fn default_employment_type() -> Option<EmploymentType> {
    Some(EmploymentType::FULLTIME)
}

/// A job the user is tracking an application for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Job {
    #[serde(flatten)]
    #[garde(skip)]
    pub meta: EntityMeta,
    #[garde(skip)]
    pub user_id: Uuid,
    #[garde(length(min = 1, max = 300))]
    pub title: String,
    #[garde(length(min = 1, max = 300))]
    pub company: String,
    #[serde(default)]
    #[garde(skip)]
    pub description: String,
    #[garde(skip)]
    pub country: Country,
    #[garde(length(min = 1))]
    pub city: String,
    #[serde(default)]
    #[garde(skip)]
    pub work_setting_type: Option<WorkSettingType>,
    #[serde(default)]
    #[garde(skip)]
    pub status: JobStatus,
    #[serde(default = "default_employment_type")]
    #[garde(skip)]
    pub employment_type: Option<EmploymentType>,
    #[serde(default)]
    #[garde(skip)]
    pub notes: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub external_id: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub platform: Option<String>,
    #[serde(default)]
    #[garde(url)]
    pub url: Option<String>,
}

impl Entity for Job {
    const NAME: &'static str = "job";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}

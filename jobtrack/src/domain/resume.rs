use chrono::NaiveDate;
use garde::Validate;
use jobtrack_data::{Entity, EntityMeta, Record, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One position on a résumé, owned by a [`ResumeMainInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Experience {
    #[serde(flatten)]
    #[garde(skip)]
    pub meta: EntityMeta,
    #[serde(default)]
    #[garde(skip)]
    pub resume_id: Option<Uuid>,
    #[garde(length(min = 1))]
    pub job_title: String,
    #[garde(length(min = 1))]
    pub company_name: String,
    #[garde(skip)]
    pub start_date: NaiveDate,
    #[serde(default)]
    #[garde(skip)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    #[garde(skip)]
    pub location: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub company_description: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub bullet_points: Vec<String>,
}

impl Entity for Experience {
    const NAME: &'static str = "experience";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}

/// Header of a résumé: contact details, skills and the experience list.
///
/// A revision is stored as a new record whose `parent_id` points at the
/// previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ResumeMainInfo {
    #[serde(flatten)]
    #[garde(skip)]
    pub meta: EntityMeta,
    #[garde(skip)]
    pub user_id: Uuid,
    #[garde(length(min = 1, max = 200))]
    pub applicant_name: String,
    #[serde(default)]
    #[garde(inner(length(min = 1)))]
    pub skills: Vec<String>,
    #[serde(default)]
    #[garde(skip)]
    pub summary: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub location: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub phone: Option<String>,
    #[serde(default)]
    #[garde(email)]
    pub email: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub linkedin: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    #[garde(skip)]
    pub resume_name: Option<String>,
    #[serde(default)]
    #[garde(dive)]
    pub experiences: Vec<Experience>,
}

impl Entity for ResumeMainInfo {
    const NAME: &'static str = "resume_main_info";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    /// Builds every experience as an entity of its own owned by this résumé.
    fn normalize(record: &mut Record) -> Result<(), ValidationError> {
        let Some(id) = record.get("id").cloned() else {
            return Ok(());
        };
        let items = match record.remove("experiences") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ValidationError::new(
                    "experiences",
                    format!("expected a list, got {other}"),
                ))
            }
        };
        let mut experiences = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let Value::Object(mut fields) = item else {
                return Err(ValidationError::new(format!("experiences[{index}]"), "expected a record"));
            };
            fields.insert("resume_id".to_string(), id.clone());
            let experience = Experience::create(fields).map_err(|err| {
                ValidationError::new(format!("experiences[{index}].{}", err.field), err.message)
            })?;
            let value = serde_json::to_value(&experience).map_err(|err| ValidationError::from_serde(&err))?;
            experiences.push(value);
        }
        record.insert("experiences".to_string(), Value::Array(experiences));
        Ok(())
    }
}

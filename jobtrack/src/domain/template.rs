use garde::Validate;
use jobtrack_data::{Entity, EntityMeta, VersionedMeta};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// LaTeX source of a résumé layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ResumeTemplate {
    #[serde(flatten)]
    #[garde(skip)]
    pub versioned: VersionedMeta,
    #[garde(length(min = 1))]
    pub resume_template: String,
    /// The template this one was derived from.
    #[serde(default)]
    #[garde(skip)]
    pub parent_id: Option<Uuid>,
}

impl ResumeTemplate {
    pub fn version(&self) -> u64 {
        self.versioned.version
    }
}

impl Entity for ResumeTemplate {
    const NAME: &'static str = "resume_template";
    const VERSIONED: bool = true;

    fn meta(&self) -> &EntityMeta {
        &self.versioned.meta
    }
}

#[cfg(test)]
mod tests {
    use jobtrack_data::Record;
    use serde_json::{json, Value};

    use super::*;

    fn fields(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn version_starts_at_one_and_grows() {
        let template = ResumeTemplate::create(fields(json!({"resume_template": "var{ name }endvar"}))).unwrap();
        assert_eq!(template.version(), 1);
        let next = template.update(fields(json!({"resume_template": "\\section{var{ name }endvar}"}))).unwrap();
        assert_eq!(next.version(), 2);
    }

    #[test]
    fn version_cannot_be_supplied() {
        let err = ResumeTemplate::create(fields(json!({"resume_template": "x", "version": 4}))).unwrap_err();
        assert_eq!(err.field, "version");
    }
}

use jobtrack_data::Record;
use serde_json::Value;

use super::{build_create, build_update, CreateRequest, InvalidRequest, UpdateRequest};

pub fn build_add_resume_main_info_request(data: Record) -> Result<CreateRequest, InvalidRequest> {
    let request = build_create(data, &["user_id", "applicant_name", "skills"])?;
    if !matches!(request.data.get("skills"), Some(Value::Array(_))) {
        let mut invalid = InvalidRequest::new();
        invalid.add_error("skills", "'skills' must be a list.");
        return Err(invalid);
    }
    Ok(request)
}

/// A revision request: `values` are applied on top of the stored résumé.
pub fn build_update_resume_main_info_request(data: Record) -> Result<UpdateRequest, InvalidRequest> {
    build_update(data, &[])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn skills_must_be_a_list() {
        let Value::Object(data) = json!({"user_id": "u", "applicant_name": "Alice", "skills": "rust"}) else {
            unreachable!()
        };
        let err = build_add_resume_main_info_request(data).unwrap_err();
        assert_eq!(err.errors[0].parameter, "skills");
    }
}

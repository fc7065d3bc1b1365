use std::fmt;

use jobtrack_data::DataError;
use serde::Serialize;

use crate::render::RenderError;
use crate::requests::{InvalidRequest, ParameterError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// The input was rejected.
    ParametersError,
    /// A referenced record does not exist.
    ResourceError,
    SystemError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::ParametersError => "PARAMETERS_ERROR",
            FailureKind::ResourceError => "RESOURCE_ERROR",
            FailureKind::SystemError => "SYSTEM_ERROR",
        })
    }
}

/// Why a use case did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// Per-parameter details of a rejected request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ParameterError>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ResourceError, message)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {}

impl From<InvalidRequest> for Failure {
    fn from(invalid: InvalidRequest) -> Self {
        Self {
            kind: FailureKind::ParametersError,
            message: "invalid request".to_string(),
            errors: invalid.errors,
        }
    }
}

impl From<DataError> for Failure {
    fn from(err: DataError) -> Self {
        let kind = match &err {
            DataError::Validation(_) | DataError::AlreadyExists { .. } => FailureKind::ParametersError,
            DataError::DoesNotExist { .. } => FailureKind::ResourceError,
            _ => FailureKind::SystemError,
        };
        if kind == FailureKind::SystemError {
            tracing::error!(error = %err, "use case failed");
        }
        let errors = match &err {
            DataError::Validation(validation) => vec![ParameterError {
                parameter: validation.field.clone(),
                message: validation.message.clone(),
            }],
            _ => Vec::new(),
        };
        Self {
            kind,
            message: err.to_string(),
            errors,
        }
    }
}

impl From<RenderError> for Failure {
    fn from(err: RenderError) -> Self {
        Self::new(FailureKind::ParametersError, err.to_string())
    }
}

/// Outcome of a use case. Failures never escape as errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Response<T> {
    Success(T),
    Failure(Failure),
}

impl<T> Response<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Response::Success(value) => Some(value),
            Response::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Response::Success(_) => None,
            Response::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Response::Success(value) => Ok(value),
            Response::Failure(failure) => Err(failure),
        }
    }
}

impl<T> From<Result<T, Failure>> for Response<T> {
    fn from(result: Result<T, Failure>) -> Self {
        match result {
            Ok(value) => Response::Success(value),
            Err(failure) => Response::Failure(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use jobtrack_data::ValidationError;

    use super::*;

    #[test]
    fn data_errors_map_to_kinds() {
        let cases = [
            (DataError::does_not_exist("job", Some("1")), FailureKind::ResourceError),
            (DataError::already_exists("1"), FailureKind::ParametersError),
            (ValidationError::new("title", "too short").into(), FailureKind::ParametersError),
            (DataError::conflict(), FailureKind::SystemError),
            (DataError::NotImplemented("update".into()), FailureKind::SystemError),
        ];
        for (err, kind) in cases {
            assert_eq!(Failure::from(err).kind, kind);
        }
    }

    #[test]
    fn validation_keeps_the_parameter() {
        let failure = Failure::from(DataError::from(ValidationError::new("title", "too short")));
        assert_eq!(failure.errors[0].parameter, "title");
    }

    #[test]
    fn serialises_tagged() {
        let response: Response<u32> = Response::Failure(Failure::resource("gone"));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "failure");
        assert_eq!(json["value"]["kind"], "RESOURCE_ERROR");
    }
}

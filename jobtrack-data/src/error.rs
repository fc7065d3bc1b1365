use std::fmt;

/// A single field-level validation failure raised while building an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Convert a serde decoding failure into a validation error.
    ///
    /// serde reports missing fields as ``missing field `name` ``; the field
    /// name is recovered from that message when present.
    pub fn from_serde(err: &serde_json::Error) -> Self {
        let message = err.to_string();
        let field = message
            .strip_prefix("missing field `")
            .and_then(|rest| rest.split('`').next())
            .unwrap_or("record")
            .to_string();
        Self { field, message }
    }

    /// Keep the first error of a garde report.
    pub fn from_report(report: &garde::Report) -> Self {
        match report.iter().next() {
            Some((path, error)) => {
                let field = path.to_string();
                Self {
                    field: if field.is_empty() { "value".to_string() } else { field },
                    message: error.message().to_string(),
                }
            }
            None => Self::new("value", "validation failed"),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    /// The requested record is absent.
    DoesNotExist { entity: String, id: Option<String> },
    /// An insert collided with an existing key.
    AlreadyExists { key: String, value: String },
    /// The stored record changed since it was read (optimistic lock mismatch).
    Conflict(Option<String>),
    Validation(ValidationError),
    /// The backend does not provide this operation.
    NotImplemented(String),
    /// The backend cannot express the requested filter or pagination.
    Unsupported(String),
    /// A multi-tenant gateway was used outside of a tenant scope.
    MissingTenant(String),
    Serialization(serde_json::Error),
    Io(std::io::Error),
    Database(Box<dyn std::error::Error + Send + Sync>),
}

impl DataError {
    pub fn does_not_exist(entity: impl Into<String>, id: Option<impl ToString>) -> Self {
        DataError::DoesNotExist {
            entity: entity.into(),
            id: id.map(|id| id.to_string()),
        }
    }

    pub fn already_exists(value: impl ToString) -> Self {
        DataError::AlreadyExists {
            key: "id".to_string(),
            value: value.to_string(),
        }
    }

    pub fn conflict() -> Self {
        DataError::Conflict(None)
    }

    /// Construct a `Database` variant from any error type.
    ///
    /// Used by backend crates (e.g. `jobtrack-data-sqlx`) to wrap
    /// driver-specific errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DataError::Conflict(_))
    }

    pub fn is_does_not_exist(&self) -> bool {
        matches!(self, DataError::DoesNotExist { .. })
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::DoesNotExist { entity, id: Some(id) } => {
                write!(f, "does not exist: {entity} with id={id}")
            }
            DataError::DoesNotExist { entity, id: None } => write!(f, "does not exist: {entity}"),
            DataError::AlreadyExists { key, value } => {
                write!(f, "record with {key}={value} already exists")
            }
            DataError::Conflict(Some(msg)) => write!(f, "conflict: {msg}"),
            DataError::Conflict(None) => write!(f, "conflict: record was modified concurrently"),
            DataError::Validation(err) => write!(f, "{err}"),
            DataError::NotImplemented(msg) => write!(f, "not implemented: {msg}"),
            DataError::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            DataError::MissingTenant(msg) => write!(f, "missing tenant: {msg}"),
            DataError::Serialization(err) => write!(f, "serialization error: {err}"),
            DataError::Io(err) => write!(f, "io error: {err}"),
            DataError::Database(err) => write!(f, "database error: {err}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Validation(err) => Some(err),
            DataError::Serialization(err) => Some(err),
            DataError::Io(err) => Some(err),
            DataError::Database(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<ValidationError> for DataError {
    fn from(err: ValidationError) -> Self {
        DataError::Validation(err)
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Serialization(err)
    }
}

impl From<std::io::Error> for DataError {
    fn from(err: std::io::Error) -> Self {
        DataError::Io(err)
    }
}

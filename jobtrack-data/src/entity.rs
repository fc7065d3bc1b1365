use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{DataError, ValidationError};
use crate::{timestamp, Record};

/// Identity and lifecycle fields shared by every entity.
///
/// Embed it with `#[serde(flatten)]` so the fields sit at the top level of the
/// entity's record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub id: Uuid,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// [`EntityMeta`] plus an update counter, for entities with `VERSIONED = true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedMeta {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub version: u64,
}

/// An identity-bearing, validated record.
///
/// Entities are immutable values: [`Entity::update`] returns a new instance.
/// Field types are checked by serde when an entity is built from a record;
/// domain constraints come from the `garde::Validate` derive.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
/// pub struct User {
///     #[serde(flatten)]
///     #[garde(skip)]
///     pub meta: EntityMeta,
///     #[garde(length(min = 1))]
///     pub name: String,
/// }
///
/// impl Entity for User {
///     const NAME: &'static str = "user";
///     fn meta(&self) -> &EntityMeta { &self.meta }
/// }
/// ```
pub trait Entity:
    Serialize + DeserializeOwned + garde::Validate<Context = ()> + Clone + Send + Sync + Unpin + 'static
{
    /// Name used in error messages.
    const NAME: &'static str;

    /// Whether the entity carries a `version` counter.
    const VERSIONED: bool = false;

    fn meta(&self) -> &EntityMeta;

    fn id(&self) -> Uuid {
        self.meta().id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.meta().updated_at
    }

    /// Adjust the merged record before it is validated, on both create and
    /// update. `id` and the timestamps are already filled in.
    fn normalize(_record: &mut Record) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Build a new entity, filling `id`, `created_at`, `updated_at` (and
    /// `version` for versioned entities) when they are not given.
    fn create(mut fields: Record) -> Result<Self, ValidationError> {
        if Self::VERSIONED {
            if fields.contains_key("version") {
                return Err(ValidationError::new("version", "version is managed by the entity"));
            }
            fields.insert("version".to_string(), Value::from(1u64));
        }
        if matches!(fields.get("id"), None | Some(Value::Null)) {
            fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        let created_at = match fields.get("created_at") {
            Some(value) if !value.is_null() => value.clone(),
            _ => Value::String(timestamp::format(&timestamp::now())),
        };
        fields.insert("created_at".to_string(), created_at.clone());
        if matches!(fields.get("updated_at"), None | Some(Value::Null)) {
            fields.insert("updated_at".to_string(), created_at);
        }
        Self::normalize(&mut fields)?;
        build(fields)
    }

    /// Return a copy with `values` applied.
    ///
    /// `id`, `created_at` and `version` cannot be changed. `updated_at` moves
    /// forward unless it is given explicitly, and `version` grows by one.
    fn update(&self, values: Record) -> Result<Self, ValidationError> {
        let meta = self.meta();
        if let Some(id) = values.get("id") {
            if id.as_str() != Some(meta.id.to_string().as_str()) {
                return Err(ValidationError::new("id", "cannot change the id of an entity"));
            }
        }
        if values.contains_key("created_at") {
            return Err(ValidationError::new("created_at", "cannot change the created_at timestamp"));
        }
        if Self::VERSIONED && values.contains_key("version") {
            return Err(ValidationError::new("version", "version is managed by the entity"));
        }

        let mut record = match serde_json::to_value(self) {
            Ok(Value::Object(record)) => record,
            Ok(_) => return Err(ValidationError::new("record", "entity is not a record")),
            Err(err) => return Err(ValidationError::from_serde(&err)),
        };
        let bump_timestamp = !values.contains_key("updated_at");
        record.extend(values);
        if bump_timestamp {
            let updated_at = timestamp::after(meta.updated_at);
            record.insert("updated_at".to_string(), Value::String(timestamp::format(&updated_at)));
        }
        if Self::VERSIONED {
            let version = record.get("version").and_then(Value::as_u64).unwrap_or(1);
            record.insert("version".to_string(), Value::from(version + 1));
        }
        Self::normalize(&mut record)?;
        build(record)
    }

    /// Serialise into a raw record.
    fn to_record(&self) -> Result<Record, DataError> {
        match serde_json::to_value(self)? {
            Value::Object(record) => Ok(record),
            other => Err(DataError::Unsupported(format!(
                "{} serialised to a non-record value: {other}",
                Self::NAME
            ))),
        }
    }

    /// Rehydrate from a raw record returned by a gateway.
    fn from_record(record: Record) -> Result<Self, DataError> {
        Ok(serde_json::from_value(Value::Object(record))?)
    }
}

fn build<E: Entity>(record: Record) -> Result<E, ValidationError> {
    let entity: E =
        serde_json::from_value(Value::Object(record)).map_err(|err| ValidationError::from_serde(&err))?;
    entity
        .validate()
        .map_err(|report| ValidationError::from_report(&report))?;
    Ok(entity)
}

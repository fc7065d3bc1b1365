use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::DataError;
use crate::Record;

type MapFn = Arc<dyn Fn(Record) -> Result<Record, DataError> + Send + Sync>;

/// Translation between the records a gateway exposes and the rows it stores.
///
/// `to_external` runs on every record before it is written, `to_internal` on
/// every record read back. Both default to identity.
#[derive(Clone)]
pub struct Mapper {
    to_internal: MapFn,
    to_external: MapFn,
}

impl Mapper {
    pub fn new<I, E>(to_internal: I, to_external: E) -> Self
    where
        I: Fn(Record) -> Result<Record, DataError> + Send + Sync + 'static,
        E: Fn(Record) -> Result<Record, DataError> + Send + Sync + 'static,
    {
        Self {
            to_internal: Arc::new(to_internal),
            to_external: Arc::new(to_external),
        }
    }

    pub fn identity() -> Self {
        Self::new(Ok, Ok)
    }

    /// Store the given list/object columns as JSON text.
    pub fn json_columns(columns: &[&str]) -> Self {
        let encode: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let decode = encode.clone();
        Self::new(
            move |mut record| {
                for column in &decode {
                    if let Some(Value::String(raw)) = record.get(column) {
                        let parsed = serde_json::from_str(raw)?;
                        record.insert(column.clone(), parsed);
                    }
                }
                Ok(record)
            },
            move |mut record| {
                for column in &encode {
                    if let Some(value @ (Value::Array(_) | Value::Object(_))) = record.get(column) {
                        let text = serde_json::to_string(value)?;
                        record.insert(column.clone(), Value::String(text));
                    }
                }
                Ok(record)
            },
        )
    }

    pub fn to_internal(&self, record: Record) -> Result<Record, DataError> {
        (self.to_internal)(record)
    }

    pub fn to_external(&self, record: Record) -> Result<Record, DataError> {
        (self.to_external)(record)
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_columns_round_trip() {
        let mapper = Mapper::json_columns(&["skills"]);
        let mut record = Record::new();
        record.insert("skills".into(), json!(["rust", "sql"]));
        record.insert("name".into(), json!("Alice"));

        let stored = mapper.to_external(record.clone()).unwrap();
        assert_eq!(stored["skills"], json!("[\"rust\",\"sql\"]"));
        assert_eq!(stored["name"], json!("Alice"));

        let read = mapper.to_internal(stored).unwrap();
        assert_eq!(read, record);
    }
}

use std::io::Read;
use std::path::Path;

use jobtrack_data::Record;
use serde_json::Value;

/// Contents of `path`, or all of stdin when there is no path.
pub fn read_text(path: Option<&Path>) -> Result<String, Box<dyn std::error::Error>> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()).into()),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

/// A JSON object read from `path`.
pub fn read_record(path: &Path) -> Result<Record, Box<dyn std::error::Error>> {
    let text = read_text(Some(path))?;
    match serde_json::from_str::<Value>(&text)? {
        Value::Object(record) => Ok(record),
        other => Err(format!("{} must hold a JSON object, found {other}", path.display()).into()),
    }
}

/// Build a record from `key=value` arguments.
///
/// Values are JSON when they parse as JSON and plain strings otherwise, so
/// `limit=5` is a number and `company=Acme` a string. A key given twice
/// collects its values into a list.
pub fn parse_pairs(pairs: &[String]) -> Result<Record, Box<dyn std::error::Error>> {
    let mut record = Record::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{pair}'"))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        let key = key.trim().to_string();
        match record.remove(&key) {
            Some(Value::Array(mut values)) => {
                values.push(value);
                record.insert(key, Value::Array(values));
            }
            Some(previous) => {
                record.insert(key, Value::Array(vec![previous, value]));
            }
            None => {
                record.insert(key, value);
            }
        }
    }
    Ok(record)
}

/// Insert `value` under `key` when it is present.
pub fn insert_opt(record: &mut Record, key: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        record.insert(key.to_string(), value.into());
    }
}

/// Split a comma-separated list, dropping empty items.
pub fn split_list(raw: &str) -> Vec<Value> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(Value::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn pairs_parse_json_or_text() {
        let record = parse_pairs(&["limit=5".into(), "company=Acme".into(), "ascending=false".into()]).unwrap();
        assert_eq!(Value::Object(record), json!({"limit": 5, "company": "Acme", "ascending": false}));
    }

    #[test]
    fn repeated_keys_collect() {
        let record = parse_pairs(&["status=APPLIED".into(), "status=OFFERED".into(), "status=ADDED".into()]).unwrap();
        assert_eq!(record["status"], json!(["APPLIED", "OFFERED", "ADDED"]));
    }

    #[test]
    fn pairs_need_an_equals_sign() {
        assert!(parse_pairs(&["limit".into()]).is_err());
    }

    #[test]
    fn lists_skip_blanks() {
        assert_eq!(split_list("rust, sql,, "), vec![json!("rust"), json!("sql")]);
    }
}

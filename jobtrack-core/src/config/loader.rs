use std::collections::HashMap;
use std::path::Path;

use super::value::{yaml_key, ConfigValue};
use super::ConfigError;

/// Read `path` into `values` when it exists; a missing file is not an error.
pub(crate) fn load_yaml_file(path: &Path, values: &mut HashMap<String, ConfigValue>) -> Result<(), ConfigError> {
    if !path.is_file() {
        tracing::trace!(path = %path.display(), "no config file");
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    load_yaml_str(&content, values).map_err(|err| match err {
        ConfigError::Load(msg) => ConfigError::Load(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(())
}

pub(crate) fn load_yaml_str(content: &str, values: &mut HashMap<String, ConfigValue>) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Flatten a YAML tree into dot separated keys.
///
/// Sequences are stored whole under their key and element-wise under
/// `key.0`, `key.1`, ...
pub(crate) fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, ConfigValue>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key = yaml_key(k);
                let full_key = if prefix.is_empty() { key } else { format!("{prefix}.{key}") };
                flatten_yaml(&full_key, v, out);
            }
        }
        serde_yaml::Value::Sequence(items) if !prefix.is_empty() => {
            out.insert(
                prefix.to_string(),
                ConfigValue::List(items.iter().map(ConfigValue::from_yaml).collect()),
            );
            for (i, item) in items.iter().enumerate() {
                flatten_yaml(&format!("{prefix}.{i}"), item, out);
            }
        }
        leaf if !prefix.is_empty() => {
            out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
        }
        _ => {}
    }
}

/// `jobtrack.database.max_connections` -> `JOBTRACK_DATABASE_MAX_CONNECTIONS`.
pub(crate) fn env_name(key: &str) -> String {
    key.to_ascii_uppercase().replace(['.', '-'], "_")
}

/// Overlay `JOBTRACK_*` environment variables onto `values`.
///
/// A variable replaces the known key whose [`env_name`] it equals, which
/// keeps underscores inside key segments intact. Other variables land under
/// the lowercased, dot separated form of their name.
pub(crate) fn overlay_env<I>(vars: I, known: &[&str], values: &mut HashMap<String, ConfigValue>)
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut by_env: HashMap<String, String> = known.iter().map(|key| (env_name(key), key.to_string())).collect();
    for key in values.keys() {
        by_env.insert(env_name(key), key.clone());
    }
    for (name, value) in vars {
        if !name.starts_with(super::ENV_PREFIX) {
            continue;
        }
        let key = by_env
            .get(&name)
            .cloned()
            .unwrap_or_else(|| name.to_ascii_lowercase().replace('_', "."));
        tracing::trace!(env = %name, key = %key, "config override from environment");
        values.insert(key, ConfigValue::String(value));
    }
}

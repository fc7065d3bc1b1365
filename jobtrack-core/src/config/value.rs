use std::collections::HashMap;

use super::ConfigError;

/// A configuration leaf as read from YAML or the environment.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<ConfigValue>),
    Map(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    pub(crate) fn from_yaml(value: &serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => ConfigValue::Null,
            serde_yaml::Value::Bool(b) => ConfigValue::Bool(*b),
            serde_yaml::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => ConfigValue::Integer(i),
                (None, Some(f)) => ConfigValue::Float(f),
                (None, None) => ConfigValue::String(n.to_string()),
            },
            serde_yaml::Value::String(s) => ConfigValue::String(s.clone()),
            serde_yaml::Value::Sequence(items) => {
                ConfigValue::List(items.iter().map(ConfigValue::from_yaml).collect())
            }
            serde_yaml::Value::Mapping(map) => ConfigValue::Map(
                map.iter()
                    .map(|(k, v)| (yaml_key(k), ConfigValue::from_yaml(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => ConfigValue::from_yaml(&tagged.value),
        }
    }
}

pub(crate) fn yaml_key(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}

impl ConfigValue {
    /// Scalar rendered as text; environment overrides only ever arrive this way.
    fn as_text(&self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s.trim().to_string()),
            ConfigValue::Integer(i) => Some(i.to_string()),
            ConfigValue::Float(f) => Some(f.to_string()),
            ConfigValue::Bool(b) => Some(b.to_string()),
            ConfigValue::Null | ConfigValue::List(_) | ConfigValue::Map(_) => None,
        }
    }

    fn parse_text<T: std::str::FromStr>(&self, key: &str, expected: &'static str) -> Result<T, ConfigError> {
        self.as_text()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| mismatch(key, expected))
    }
}

fn mismatch(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

/// Conversion from a [`ConfigValue`] into a concrete setting type.
///
/// Numeric and boolean impls also accept text, so `JOBTRACK_*` overrides
/// convert the same way as YAML values.
pub trait FromConfigValue: Sized {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError>;
}

impl FromConfigValue for String {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        if let ConfigValue::String(s) = value {
            return Ok(s.clone());
        }
        value.as_text().ok_or_else(|| mismatch(key, "string"))
    }
}

impl FromConfigValue for i64 {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        value.parse_text(key, "integer")
    }
}

impl FromConfigValue for f64 {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        value.parse_text(key, "float")
    }
}

impl FromConfigValue for bool {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        let text = value.as_text().map(|t| t.to_ascii_lowercase());
        match text.as_deref() {
            Some("true" | "yes" | "on" | "1") => Ok(true),
            Some("false" | "no" | "off" | "0") => Ok(false),
            _ => Err(mismatch(key, "bool")),
        }
    }
}

impl<T: FromConfigValue> FromConfigValue for Option<T> {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Null => Ok(None),
            other => T::from_config_value(other, key).map(Some),
        }
    }
}

impl<T: FromConfigValue> FromConfigValue for Vec<T> {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::from_config_value(item, &format!("{key}.{i}")))
                .collect(),
            // A comma separated environment override.
            ConfigValue::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| T::from_config_value(&ConfigValue::String(part.to_string()), key))
                .collect(),
            ConfigValue::Null => Ok(Vec::new()),
            other => Ok(vec![T::from_config_value(other, key)?]),
        }
    }
}

macro_rules! from_config_int {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromConfigValue for $ty {
                fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
                    let wide = i64::from_config_value(value, key)?;
                    <$ty>::try_from(wide).map_err(|_| mismatch(key, stringify!($ty)))
                }
            }
        )+
    };
}

from_config_int!(u16, u32, u64, usize, i32);

mod loader;
pub mod settings;
pub mod value;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

pub use settings::{DatabaseSettings, LogFormat, LogSettings, RetrySettings, Settings, StorageSettings};
pub use value::{ConfigValue, FromConfigValue};

/// Environment variables with this prefix override configuration keys.
pub const ENV_PREFIX: &str = "JOBTRACK_";

/// Environment variable selecting the active profile.
pub const PROFILE_ENV: &str = "JOBTRACK_PROFILE";

pub const DEFAULT_PROFILE: &str = "dev";

/// One failed constraint of the typed settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationDetail {
    pub key: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ConfigError {
    NotFound(String),
    TypeMismatch { key: String, expected: &'static str },
    /// Reading or parsing a config file failed.
    Load(String),
    Validation(Vec<ConfigValidationDetail>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "config key '{key}' is not a valid {expected}")
            }
            ConfigError::Load(msg) => write!(f, "failed to load config: {msg}"),
            ConfigError::Validation(details) => {
                write!(f, "invalid config:")?;
                for detail in details {
                    write!(f, "\n  - {}: {}", detail.key, detail.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Flattened key/value configuration.
///
/// Sources, lowest priority first:
/// 1. `jobtrack.yaml`
/// 2. `jobtrack-{profile}.yaml`
/// 3. `.env` then `.env.{profile}` (loaded into the process environment,
///    never replacing variables that are already set)
/// 4. `JOBTRACK_*` environment variables, e.g. `JOBTRACK_DATABASE_URL`
///    overrides `jobtrack.database.url`
///
/// The profile is `JOBTRACK_PROFILE` when set, else the requested one.
#[derive(Debug, Clone)]
pub struct JobtrackConfig {
    values: HashMap<String, ConfigValue>,
    profile: String,
}

impl JobtrackConfig {
    /// Load from the current working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), profile)
    }

    /// Load from the files in `dir`.
    pub fn load_from(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let profile = std::env::var(PROFILE_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| profile.to_string());

        let mut values = HashMap::new();
        loader::load_yaml_file(&dir.join("jobtrack.yaml"), &mut values)?;
        loader::load_yaml_file(&dir.join(format!("jobtrack-{profile}.yaml")), &mut values)?;

        for env_file in [dir.join(".env"), dir.join(format!(".env.{profile}"))] {
            if env_file.is_file() {
                dotenvy::from_path(&env_file)
                    .map_err(|e| ConfigError::Load(format!("{}: {e}", env_file.display())))?;
            }
        }

        loader::overlay_env(std::env::vars(), settings::KNOWN_KEYS, &mut values);

        tracing::debug!(profile = %profile, keys = values.len(), "configuration loaded");
        Ok(Self { values, profile })
    }

    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(Self {
            values,
            profile: profile.to_string(),
        })
    }

    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
            profile: "test".to_string(),
        }
    }

    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// # Errors
    ///
    /// [`ConfigError::NotFound`] for a missing key and
    /// [`ConfigError::TypeMismatch`] when the value does not convert.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// `None` for a missing key; a present but malformed value is still an error.
    pub fn get_optional<V: FromConfigValue>(&self, key: &str) -> Result<Option<V>, ConfigError> {
        match self.values.get(key) {
            Some(value) => V::from_config_value(value, key).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Build and validate the typed [`Settings`].
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Settings::from_config(self)
    }
}

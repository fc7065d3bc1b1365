use std::str::FromStr;
use std::time::Duration;

use garde::Validate;
use jobtrack_data::RetryPolicy;

use super::value::{ConfigValue, FromConfigValue};
use super::{ConfigError, ConfigValidationDetail, JobtrackConfig};

/// Every key read by [`Settings::from_config`].
pub const KNOWN_KEYS: &[&str] = &[
    "jobtrack.database.url",
    "jobtrack.database.max_connections",
    "jobtrack.database.multitenant",
    "jobtrack.log.filter",
    "jobtrack.log.format",
    "jobtrack.retry.max_attempts",
    "jobtrack.retry.delay_ms",
    "jobtrack.retry.max_jitter_ms",
    "jobtrack.storage.bucket",
    "jobtrack.storage.presign_expiry_secs",
];

#[derive(Debug, Clone, PartialEq, Eq, Default, Validate)]
pub struct Settings {
    #[garde(dive)]
    pub database: DatabaseSettings,
    #[garde(dive)]
    pub log: LogSettings,
    #[garde(dive)]
    pub retry: RetrySettings,
    #[garde(dive)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct DatabaseSettings {
    #[garde(length(min = 1))]
    pub url: String,
    #[garde(range(min = 1))]
    pub max_connections: u32,
    /// Scope every table by the ambient tenant.
    #[garde(skip)]
    pub multitenant: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://jobtrack.db?mode=rwc".to_string(),
            max_connections: 5,
            multitenant: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" | "plain" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl FromConfigValue for LogFormat {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        String::from_config_value(value, key)?
            .parse()
            .map_err(|_| ConfigError::TypeMismatch {
                key: key.to_string(),
                expected: "log format (pretty or json)",
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directives, used when `RUST_LOG` is unset.
    #[garde(length(min = 1))]
    pub filter: String,
    #[garde(skip)]
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct RetrySettings {
    #[garde(range(min = 1))]
    pub max_attempts: u32,
    #[garde(skip)]
    pub delay_ms: u64,
    #[garde(range(max = 60_000))]
    pub max_jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            delay_ms: policy.delay.as_millis() as u64,
            max_jitter_ms: policy.max_jitter.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.delay_ms),
            max_jitter: Duration::from_millis(self.max_jitter_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct StorageSettings {
    #[garde(length(min = 3, max = 63))]
    pub bucket: String,
    #[garde(range(min = 1, max = 604_800))]
    pub presign_expiry_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            bucket: "jobtrack".to_string(),
            presign_expiry_secs: 3600,
        }
    }
}

impl StorageSettings {
    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.presign_expiry_secs)
    }
}

impl Settings {
    /// Read every section under `jobtrack.*`, falling back to defaults for
    /// absent keys, then validate.
    pub fn from_config(config: &JobtrackConfig) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let settings = Settings {
            database: DatabaseSettings {
                url: config
                    .get_optional("jobtrack.database.url")?
                    .unwrap_or(defaults.database.url),
                max_connections: config
                    .get_optional("jobtrack.database.max_connections")?
                    .unwrap_or(defaults.database.max_connections),
                multitenant: config
                    .get_optional("jobtrack.database.multitenant")?
                    .unwrap_or(defaults.database.multitenant),
            },
            log: LogSettings {
                filter: config.get_optional("jobtrack.log.filter")?.unwrap_or(defaults.log.filter),
                format: config.get_optional("jobtrack.log.format")?.unwrap_or(defaults.log.format),
            },
            retry: RetrySettings {
                max_attempts: config
                    .get_optional("jobtrack.retry.max_attempts")?
                    .unwrap_or(defaults.retry.max_attempts),
                delay_ms: config
                    .get_optional("jobtrack.retry.delay_ms")?
                    .unwrap_or(defaults.retry.delay_ms),
                max_jitter_ms: config
                    .get_optional("jobtrack.retry.max_jitter_ms")?
                    .unwrap_or(defaults.retry.max_jitter_ms),
            },
            storage: StorageSettings {
                bucket: config
                    .get_optional("jobtrack.storage.bucket")?
                    .unwrap_or(defaults.storage.bucket),
                presign_expiry_secs: config
                    .get_optional("jobtrack.storage.presign_expiry_secs")?
                    .unwrap_or(defaults.storage.presign_expiry_secs),
            },
        };
        settings.validate().map_err(|report| {
            ConfigError::Validation(
                report
                    .iter()
                    .map(|(path, error)| ConfigValidationDetail {
                        key: format!("jobtrack.{path}"),
                        message: error.message().to_string(),
                    })
                    .collect(),
            )
        })?;
        Ok(settings)
    }
}

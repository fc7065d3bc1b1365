use std::fs;

use jobtrack_core::config::{ConfigError, ConfigValue, JobtrackConfig, LogFormat, PROFILE_ENV};
use serial_test::serial;
use tempfile::TempDir;

/// Sets environment variables for the duration of a test.
struct EnvGuard {
    keys: Vec<&'static str>,
}

impl EnvGuard {
    fn set(pairs: &[(&'static str, &str)]) -> Self {
        for (key, value) in pairs {
            std::env::set_var(key, value);
        }
        EnvGuard {
            keys: pairs.iter().map(|(k, _)| *k).collect(),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            std::env::remove_var(key);
        }
    }
}

const BASE: &str = r#"
jobtrack:
  database:
    url: "sqlite::memory:"
    max_connections: 2
  log:
    filter: "jobtrack=debug"
  retry:
    max_attempts: 3
  skills:
    - rust
    - sql
"#;

#[test]
fn test_empty_config() {
    let config = JobtrackConfig::empty();
    assert!(matches!(config.get::<String>("missing"), Err(ConfigError::NotFound(_))));
    assert_eq!(config.profile(), "test");
}

#[test]
fn test_set_and_get() {
    let mut config = JobtrackConfig::empty();
    config.set("jobtrack.storage.bucket", ConfigValue::String("resumes".into()));
    assert_eq!(config.get::<String>("jobtrack.storage.bucket").unwrap(), "resumes");
    assert!(config.contains_key("jobtrack.storage.bucket"));
    assert_eq!(config.get_or("jobtrack.retry.delay_ms", 25u64), 25);
}

#[test]
fn test_flatten_yaml() {
    let config = JobtrackConfig::from_yaml_str(BASE, "test").unwrap();
    assert_eq!(config.get::<String>("jobtrack.database.url").unwrap(), "sqlite::memory:");
    assert_eq!(config.get::<u32>("jobtrack.database.max_connections").unwrap(), 2);
    let skills: Vec<String> = config.get("jobtrack.skills").unwrap();
    assert_eq!(skills, vec!["rust", "sql"]);
    assert_eq!(config.get::<String>("jobtrack.skills.1").unwrap(), "sql");
}

#[test]
fn test_type_mismatch() {
    let config = JobtrackConfig::from_yaml_str("jobtrack:\n  retry:\n    max_attempts: many\n", "test").unwrap();
    assert!(matches!(
        config.settings(),
        Err(ConfigError::TypeMismatch { ref key, .. }) if key == "jobtrack.retry.max_attempts"
    ));
}

#[test]
fn test_settings_from_yaml() {
    let settings = JobtrackConfig::from_yaml_str(BASE, "test").unwrap().settings().unwrap();
    assert_eq!(settings.database.url, "sqlite::memory:");
    assert_eq!(settings.database.max_connections, 2);
    assert!(!settings.database.multitenant);
    assert_eq!(settings.log.filter, "jobtrack=debug");
    assert_eq!(settings.log.format, LogFormat::Pretty);
    assert_eq!(settings.retry.policy().max_attempts, 3);
    assert_eq!(settings.storage.presign_expiry_secs, 3600);
}

#[test]
fn test_settings_validation() {
    let yaml = "jobtrack:\n  database:\n    max_connections: 0\n  storage:\n    bucket: x\n";
    let err = JobtrackConfig::from_yaml_str(yaml, "test").unwrap().settings().unwrap_err();
    let ConfigError::Validation(details) = err else {
        panic!("expected validation errors, got {err}");
    };
    let keys: Vec<&str> = details.iter().map(|d| d.key.as_str()).collect();
    assert!(keys.contains(&"jobtrack.database.max_connections"));
    assert!(keys.contains(&"jobtrack.storage.bucket"));
}

#[test]
fn test_invalid_yaml_is_a_load_error() {
    assert!(matches!(
        JobtrackConfig::from_yaml_str("jobtrack: [unclosed", "test"),
        Err(ConfigError::Load(_))
    ));
}

#[test]
#[serial]
fn test_profile_file_overrides_base() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("jobtrack.yaml"), BASE).unwrap();
    fs::write(
        dir.path().join("jobtrack-prod.yaml"),
        "jobtrack:\n  log:\n    format: json\n  database:\n    max_connections: 20\n",
    )
    .unwrap();

    let config = JobtrackConfig::load_from(dir.path(), "prod").unwrap();
    assert_eq!(config.profile(), "prod");
    let settings = config.settings().unwrap();
    assert_eq!(settings.database.max_connections, 20);
    assert_eq!(settings.database.url, "sqlite::memory:");
    assert_eq!(settings.log.format, LogFormat::Json);
}

#[test]
#[serial]
fn test_environment_overrides_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("jobtrack.yaml"), BASE).unwrap();
    let _env = EnvGuard::set(&[
        ("JOBTRACK_DATABASE_MAX_CONNECTIONS", "9"),
        ("JOBTRACK_DATABASE_MULTITENANT", "true"),
    ]);

    let settings = JobtrackConfig::load_from(dir.path(), "dev").unwrap().settings().unwrap();
    assert_eq!(settings.database.max_connections, 9);
    assert!(settings.database.multitenant);
}

#[test]
#[serial]
fn test_profile_from_environment() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("jobtrack-staging.yaml"), "jobtrack:\n  storage:\n    bucket: staging-files\n").unwrap();
    let _env = EnvGuard::set(&[(PROFILE_ENV, "staging")]);

    let config = JobtrackConfig::load_from(dir.path(), "dev").unwrap();
    assert_eq!(config.profile(), "staging");
    assert_eq!(config.settings().unwrap().storage.bucket, "staging-files");
}

#[test]
#[serial]
fn test_dotenv_file_feeds_overlay() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env.test"), "JOBTRACK_STORAGE_BUCKET=from-dotenv\n").unwrap();
    let _env = EnvGuard {
        keys: vec!["JOBTRACK_STORAGE_BUCKET"],
    };

    let config = JobtrackConfig::load_from(dir.path(), "test").unwrap();
    assert_eq!(config.settings().unwrap().storage.bucket, "from-dotenv");
}

//! # jobtrack-core
//!
//! Configuration and logging shared by the jobtrack binaries.
//!
//! ```ignore
//! let config = JobtrackConfig::load("dev")?;
//! let settings = config.settings()?;
//! init_tracing(&settings.log);
//! ```

pub mod config;
pub mod logging;

pub use config::{ConfigError, ConfigValue, JobtrackConfig, Settings};
pub use logging::init_tracing;

//! # jobtrack
//!
//! Job application tracking on top of `jobtrack-data`.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Entities: [`User`], [`Job`], [`ResumeMainInfo`] with its [`Experience`]s, [`ResumeTemplate`] |
//! | [`requests`] | Validation of raw input into typed requests |
//! | [`use_cases`] | Operations returning a tagged [`Response`] |
//! | [`render`] | Résumé templating ([`LatexRenderer`]) |
//! | [`store`] | SQLite tables, migrations and gateways |
//! | [`services`] | [`Managers`] over the in-memory or SQLite store |
//!
//! ```ignore
//! let managers = Managers::in_memory(RetryPolicy::default());
//! let user = use_cases::add_user(&managers.users, fields).await.into_result()?;
//! ```

pub mod domain;
pub mod render;
pub mod requests;
pub mod response;
pub mod services;
pub mod store;
pub mod use_cases;

pub use domain::{
    Country, EmploymentType, Experience, Job, JobStatus, ResumeMainInfo, ResumeTemplate, User, WorkSettingType,
};
pub use render::{LatexRenderer, RenderError, TemplateRenderer};
pub use response::{Failure, FailureKind, Response};
pub use services::Managers;

//! # jobtrack-data-sqlx
//!
//! [SQLx](https://github.com/launchbadge/sqlx) backend for the jobtrack data
//! layer. It executes the statements compiled by
//! [`jobtrack_data::SqlBuilder`] against an SQLite pool.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqlGateway`] | [`Gateway`](jobtrack_data::Gateway) over one table, with optional one-to-many relations |
//! | [`OneToMany`] | A child table exposed as a list field of its parent |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//!
//! # Relations
//!
//! ```ignore
//! let experiences = SqlGateway::new(pool.clone(), experience_table());
//! let resumes = SqlGateway::new(pool.clone(), resume_table())
//!     .one_to_many("experiences", "resume_id", experiences);
//! ```
//!
//! Saving a parent that carries the relation field reconciles the child
//! table to exactly that list: unknown children are inserted, changed ones
//! updated, missing ones deleted. A parent saved without the field leaves its
//! children alone.

pub mod error;
pub mod gateway;

pub use error::SqlxErrorExt;
pub use gateway::{OneToMany, SqlGateway};

/// Re-exports of the most commonly used types from both `jobtrack-data` and this crate.
pub mod prelude {
    pub use crate::{SqlGateway, SqlxErrorExt};
    pub use jobtrack_data::prelude::*;
}

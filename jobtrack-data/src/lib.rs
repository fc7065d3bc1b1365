//! # jobtrack-data
//!
//! Backend-agnostic persistence for jobtrack.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Entity`] | Identity-bearing, validated record with lifecycle timestamps |
//! | [`Filter`] / [`Operator`] | Declarative match predicates, ANDed together |
//! | [`PageOptions`] / [`Page`] | Pagination request and response |
//! | [`Gateway`] | Raw record CRUD contract implemented per backend |
//! | [`MemoryGateway`] | Gateway over an in-process map |
//! | [`ObjectStoreGateway`] | Gateway over a bucket listing ([`BucketProvider`]) |
//! | [`SqlBuilder`] | Connection-free SQL statement compiler |
//! | [`Repository`] | Typed entity wrapper around one gateway |
//! | [`Manage`] | Use-case facing layer that retries conflicting updates |
//!
//! The SQL gateway that executes [`SqlBuilder`] statements lives in
//! `jobtrack-data-sqlx`.

pub mod entity;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod manage;
pub mod mapper;
pub mod memory;
pub mod object_store;
pub mod page;
pub mod query;
pub mod repository;
pub mod tenant;
pub mod timestamp;

/// A raw attribute mapping as exchanged with gateways.
pub type Record = serde_json::Map<String, serde_json::Value>;

pub use entity::{Entity, EntityMeta, VersionedMeta};
pub use error::{DataError, ValidationError};
pub use filter::{Filter, Operator};
pub use gateway::Gateway;
pub use manage::{Manage, RetryPolicy};
pub use mapper::Mapper;
pub use memory::MemoryGateway;
pub use object_store::{BucketProvider, MemoryBucket, ObjectStoreGateway};
pub use page::{Page, PageOptions};
pub use query::{Dialect, SqlBuilder, Statement, Table};
pub use repository::{Repository, UpdateMode};
pub use tenant::{current_tenant, with_tenant};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        DataError, Entity, EntityMeta, Filter, Gateway, Manage, Operator, Page, PageOptions, Record,
        Repository,
    };
}

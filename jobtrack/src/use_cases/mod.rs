//! Application operations.
//!
//! Every use case validates its raw input, talks to one or more managers and
//! reports the outcome as a [`Response`](crate::Response). Failures are
//! values; nothing here returns `Err`.

mod job;
mod render;
mod resume;
mod template;
mod user;

use jobtrack_data::Record;
use serde_json::Value;

pub use job::{add_job, delete_job, list_jobs, update_job};
pub use render::render_resume;
pub use resume::{add_resume_main_info, update_resume_main_info};
pub use template::{add_resume_template, update_resume_template};
pub use user::{add_user, delete_user};

/// Fields for a new revision of `current`: the stored fields with `values`
/// applied on top and `parent_id` pointing back at `current`.
fn revision(mut current: Record, values: Record) -> Record {
    let parent_id = current.remove("id").unwrap_or(Value::Null);
    for managed in ["created_at", "updated_at", "version"] {
        current.remove(managed);
    }
    current.extend(values);
    current.insert("parent_id".to_string(), parent_id);
    current
}

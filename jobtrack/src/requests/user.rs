use jobtrack_data::Record;
use uuid::Uuid;

use super::{build_create, build_id, CreateRequest, InvalidRequest};

pub fn build_add_user_request(data: Record) -> Result<CreateRequest, InvalidRequest> {
    build_create(data, &["name"])
}

pub fn build_delete_user_request(id: &str) -> Result<Uuid, InvalidRequest> {
    build_id(id)
}

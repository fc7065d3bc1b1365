use jobtrack_data::{Gateway, Manage, Record};
use uuid::Uuid;

use crate::domain::User;
use crate::requests::{build_add_user_request, build_delete_user_request};
use crate::response::{Failure, Response};

pub async fn add_user<G: Gateway>(users: &Manage<User, G>, data: Record) -> Response<User> {
    try_add_user(users, data).await.into()
}

async fn try_add_user<G: Gateway>(users: &Manage<User, G>, data: Record) -> Result<User, Failure> {
    let request = build_add_user_request(data)?;
    let user = users.create(request.data).await?;
    tracing::info!(id = %user.meta.id, "user added");
    Ok(user)
}

pub async fn delete_user<G: Gateway>(users: &Manage<User, G>, id: &str) -> Response<Uuid> {
    try_delete_user(users, id).await.into()
}

async fn try_delete_user<G: Gateway>(users: &Manage<User, G>, id: &str) -> Result<Uuid, Failure> {
    let id = build_delete_user_request(id)?;
    if !users.destroy(id).await? {
        return Err(Failure::resource(format!("User with id {id} does not exist")));
    }
    tracing::info!(%id, "user deleted");
    Ok(id)
}

use jobtrack::use_cases;
use jobtrack::Managers;
use jobtrack_data::{Gateway, Record};

use super::{report, CliResult};

pub async fn add<G: Gateway>(managers: &Managers<G>, name: &str) -> CliResult {
    let mut data = Record::new();
    data.insert("name".into(), name.into());
    let response = use_cases::add_user(&managers.users, data).await;
    report(response, |user| format!("User '{}' added (id = {})", user.name, user.meta.id))?;
    Ok(())
}

/// In the SQLite store the user's jobs and résumés go with them.
pub async fn delete<G: Gateway>(managers: &Managers<G>, id: &str) -> CliResult {
    let response = use_cases::delete_user(&managers.users, id).await;
    report(response, |id| format!("User '{id}' deleted"))?;
    Ok(())
}

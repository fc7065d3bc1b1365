//! Ambient tenant for multi-tenant gateways.
//!
//! A tenant is bound to the current task with [`with_tenant`]; multi-tenant
//! gateways read it back with [`current_tenant`] and constrain every query and
//! every written row with it.

use std::future::Future;

use crate::error::DataError;

/// Column holding the tenant id in multi-tenant tables.
pub const TENANT_COLUMN: &str = "tenant";

tokio::task_local! {
    static TENANT: String;
}

/// Run `fut` with `tenant` in scope.
pub async fn with_tenant<F: Future>(tenant: impl Into<String>, fut: F) -> F::Output {
    TENANT.scope(tenant.into(), fut).await
}

pub fn current_tenant() -> Option<String> {
    TENANT.try_with(|tenant| tenant.clone()).ok()
}

/// Like [`current_tenant`], failing with `MissingTenant` outside a scope.
pub fn require_tenant(owner: &str) -> Result<String, DataError> {
    current_tenant().ok_or_else(|| {
        DataError::MissingTenant(format!("{owner} is multi-tenant but no tenant is in scope"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scope_is_task_local() {
        assert_eq!(current_tenant(), None);
        let inside = with_tenant("acme", async { current_tenant() }).await;
        assert_eq!(inside.as_deref(), Some("acme"));
        assert_eq!(current_tenant(), None);
        assert!(matches!(require_tenant("jobs"), Err(DataError::MissingTenant(_))));
    }
}

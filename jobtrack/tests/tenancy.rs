mod common;

use common::record;
use jobtrack::use_cases::{add_job, add_user, list_jobs};
use jobtrack::{FailureKind, Managers};
use jobtrack_data::{with_tenant, RetryPolicy};
use serde_json::json;

#[tokio::test]
async fn test_tenants_only_see_their_own_jobs() {
    let pool = common::pool().await;
    let managers = Managers::sql(&pool, true, RetryPolicy::immediate(3));

    for (tenant, company) in [("acme", "Acme"), ("globex", "Globex")] {
        with_tenant(tenant, async {
            let user = add_user(&managers.users, record(json!({"name": tenant})))
                .await
                .into_result()
                .unwrap();
            let fields = record(json!({
                "user_id": user.meta.id.to_string(),
                "title": "Engineer",
                "company": company,
                "country": "France",
                "city": "Paris",
            }));
            add_job(&managers.jobs, fields).await.into_result().unwrap();
        })
        .await;
    }

    let page = with_tenant("acme", list_jobs(&managers.jobs, None, None))
        .await
        .into_result()
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].company, "Acme");

    let failure = list_jobs(&managers.jobs, None, None).await.into_result().unwrap_err();
    assert_eq!(failure.kind, FailureKind::SystemError);
}

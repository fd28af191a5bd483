//! Shared builders for integration tests.
#![allow(dead_code)]

use scim_provision::{
    InMemoryStorage, RequestContext, ScimProvider, TenantContext, GROUP_SCHEMA, USER_SCHEMA,
};
use serde_json::{json, Value};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn provider() -> ScimProvider<InMemoryStorage> {
    init_logging();
    ScimProvider::new(InMemoryStorage::new())
}

pub fn context(tenant: &str) -> RequestContext {
    RequestContext::for_tenant(TenantContext::new(tenant, "test-client"))
}

pub fn user_payload(user_name: &str) -> Value {
    json!({
        "schemas": [USER_SCHEMA],
        "userName": user_name,
        "displayName": format!("User {}", user_name),
        "active": true
    })
}

pub fn group_payload(display_name: &str, member_ids: &[&str]) -> Value {
    let members: Vec<Value> = member_ids
        .iter()
        .map(|id| json!({"value": id, "display": format!("User {}", id)}))
        .collect();
    let mut payload = json!({
        "schemas": [GROUP_SCHEMA],
        "displayName": display_name
    });
    if !members.is_empty() {
        payload["members"] = json!(members);
    }
    payload
}

pub async fn create_user(
    provider: &ScimProvider<InMemoryStorage>,
    ctx: &RequestContext,
    user_name: &str,
) -> Value {
    provider
        .create_resource("User", user_payload(user_name), ctx)
        .await
        .unwrap()
}

pub async fn create_group(
    provider: &ScimProvider<InMemoryStorage>,
    ctx: &RequestContext,
    display_name: &str,
    member_ids: &[&str],
) -> Value {
    provider
        .create_resource("Group", group_payload(display_name, member_ids), ctx)
        .await
        .unwrap()
}

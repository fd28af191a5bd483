//! Resource CRUD orchestration.
//!
//! [`ScimProvider`] ties the engines together: it resolves the tenant scope,
//! validates payloads, enforces per-tenant uniqueness, runs the PATCH
//! interpreter, stamps `meta`, populates references, and talks to storage.
//! Every write does one storage load and one save; every read does one
//! query. Validation and uniqueness failures surface before anything is
//! persisted.

use crate::error::{ScimError, ScimResult};
use crate::filter;
use crate::patch::{apply_patch_operation, PatchRequest};
use crate::projection::{omit_group_members, project};
use crate::reference::populate_references;
use crate::resource::{
    find_key_ignore_case, ListQuery, RequestContext, Resource, ResourceVersion, SortOrder,
    ENTERPRISE_USER_SCHEMA,
};
use crate::response::ListResponse;
use crate::storage::{StorageKey, StorageProvider};
use crate::tenant::Customer;
use chrono::{SecondsFormat, Utc};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Reserved storage scope for customer records. Customers sit above the
/// tenant boundary, so they live outside any customer's own scope.
const ADMIN_SCOPE: &str = "_admin";
const CUSTOMER_TYPE: &str = "Customer";

/// Orchestrator behavior fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// When set, a User's enterprise manager reference must name an existing
    /// User in the same tenant.
    pub validate_manager_reference_exists: bool,
}

/// Multi-tenant SCIM resource provider over a pluggable storage backend.
pub struct ScimProvider<S: StorageProvider> {
    storage: S,
    config: ProviderConfig,
}

impl<S: StorageProvider> ScimProvider<S> {
    /// Create a provider with default configuration.
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, ProviderConfig::default())
    }

    /// Create a provider with explicit configuration.
    pub fn with_config(storage: S, config: ProviderConfig) -> Self {
        Self { storage, config }
    }

    /// Borrow the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    // ---- Resource CRUD ----

    /// Create a resource in the request's tenant.
    pub async fn create_resource(
        &self,
        resource_type: &str,
        payload: Value,
        context: &RequestContext,
    ) -> ScimResult<Value> {
        let tenant_id = context.require_tenant_id()?;
        debug!(
            "Creating {} in tenant '{}' (request {})",
            resource_type, tenant_id, context.request_id
        );

        let mut resource = Resource::from_json(resource_type, payload)?;
        validate_payload(&resource)?;

        if resource.id().is_none() {
            resource.set_id(&Uuid::new_v4().to_string());
        }
        let id = resource
            .id()
            .map(String::from)
            .ok_or_else(|| ScimError::internal("resource id missing after generation"))?;

        self.check_uniqueness(tenant_id, &resource, None).await?;
        self.check_manager_reference(tenant_id, &resource).await?;

        let data = resource.data_mut();
        populate_references(resource_type, data);
        stamp_meta(data, resource_type, &id, None);

        let key = StorageKey::new(tenant_id, resource_type, &id);
        let stored = self
            .storage
            .put(key, resource.into_json())
            .await
            .map_err(storage_failure)?;
        info!("Created {} '{}' in tenant '{}'", resource_type, id, tenant_id);
        Ok(stored)
    }

    /// Fetch one resource. Absent and cross-tenant are the same NotFound.
    pub async fn get_resource(
        &self,
        resource_type: &str,
        id: &str,
        context: &RequestContext,
    ) -> ScimResult<Value> {
        let tenant_id = context.require_tenant_id()?;
        debug!(
            "Getting {} '{}' in tenant '{}' (request {})",
            resource_type, id, tenant_id, context.request_id
        );

        let key = StorageKey::new(tenant_id, resource_type, id);
        let data = self
            .storage
            .get(key)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| ScimError::not_found(resource_type, id))?;

        let mut map = into_map(data)?;
        if resource_type == "Group" {
            // Membership on single-Group reads is served through list
            // filtering, not inline expansion.
            omit_group_members(&mut map);
        }
        project(&mut map, &[], &[]);
        Ok(Value::Object(map))
    }

    /// List resources in the tenant with filtering, sorting, pagination, and
    /// projection.
    pub async fn list_resources(
        &self,
        resource_type: &str,
        query: &ListQuery,
        context: &RequestContext,
    ) -> ScimResult<ListResponse> {
        let tenant_id = context.require_tenant_id()?;
        debug!(
            "Listing {} in tenant '{}' (request {})",
            resource_type, tenant_id, context.request_id
        );

        let start_index = match query.start_index {
            Some(i) if i <= 0 => {
                return Err(ScimError::validation("startIndex must be a positive integer"))
            }
            Some(i) => i,
            None => 1,
        };
        let count = match query.count {
            Some(c) if c <= 0 => {
                return Err(ScimError::validation("count must be a positive integer"))
            }
            other => other,
        };
        let sort_order = match &query.sort_order {
            Some(raw) => SortOrder::parse(raw)?,
            None => SortOrder::default(),
        };
        let resource_filter = match &query.filter {
            Some(expression) => filter::translate(resource_type, expression)?,
            None => filter::ResourceFilter::All,
        };

        let prefix = StorageKey::prefix(tenant_id, resource_type);
        let records = self.storage.list(prefix).await.map_err(storage_failure)?;

        let mut matched: Vec<Map<String, Value>> = Vec::new();
        for (_, data) in records {
            let map = into_map(data)?;
            if resource_filter.matches(&map) {
                matched.push(map);
            }
        }

        if let Some(sort_by) = &query.sort_by {
            sort_resources(&mut matched, sort_by, sort_order);
        }

        let total_results = matched.len();
        let skip = (start_index - 1) as usize;
        let page: Vec<Value> = matched
            .into_iter()
            .skip(skip)
            .take(count.map(|c| c as usize).unwrap_or(usize::MAX))
            .map(|mut map| {
                project(&mut map, &query.attributes, &query.excluded_attributes);
                Value::Object(map)
            })
            .collect();

        Ok(ListResponse::new(total_results, start_index, page))
    }

    /// Replace a resource's client-mutable state (PUT semantics).
    pub async fn replace_resource(
        &self,
        resource_type: &str,
        id: &str,
        payload: Value,
        context: &RequestContext,
    ) -> ScimResult<Value> {
        let tenant_id = context.require_tenant_id()?;
        debug!(
            "Replacing {} '{}' in tenant '{}' (request {})",
            resource_type, id, tenant_id, context.request_id
        );

        let key = StorageKey::new(tenant_id, resource_type, id);
        let existing = self
            .storage
            .get(key.clone())
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| ScimError::not_found(resource_type, id))?;
        let created = existing
            .get("meta")
            .and_then(|m| m.get("created"))
            .and_then(Value::as_str)
            .map(String::from);

        let mut resource = Resource::from_json(resource_type, payload)?;
        validate_payload(&resource)?;
        resource.set_id(id);

        self.check_uniqueness(tenant_id, &resource, Some(id)).await?;
        self.check_manager_reference(tenant_id, &resource).await?;

        let data = resource.data_mut();
        populate_references(resource_type, data);
        stamp_meta(data, resource_type, id, created.as_deref());

        let stored = self
            .storage
            .put(key, resource.into_json())
            .await
            .map_err(storage_failure)?;
        Ok(stored)
    }

    /// Apply a PATCH request: load once, run every operation in order, save
    /// once. Any failing operation aborts the request with nothing persisted.
    pub async fn patch_resource(
        &self,
        resource_type: &str,
        id: &str,
        request: &PatchRequest,
        context: &RequestContext,
    ) -> ScimResult<Value> {
        let tenant_id = context.require_tenant_id()?;
        debug!(
            "Patching {} '{}' in tenant '{}' with {} operation(s) (request {})",
            resource_type,
            id,
            tenant_id,
            request.operations.len(),
            context.request_id
        );
        request.validate()?;

        let key = StorageKey::new(tenant_id, resource_type, id);
        let existing = self
            .storage
            .get(key.clone())
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| ScimError::not_found(resource_type, id))?;
        let created = existing
            .get("meta")
            .and_then(|m| m.get("created"))
            .and_then(Value::as_str)
            .map(String::from);

        let mut map = into_map(existing)?;
        for operation in &request.operations {
            apply_patch_operation(resource_type, &mut map, operation)?;
        }

        // The patched state must satisfy the same invariants create and
        // replace enforce: required fields present, uniqueness held.
        let resource = Resource::from_json(resource_type, Value::Object(map))?;
        validate_payload(&resource)?;
        self.check_uniqueness(tenant_id, &resource, Some(id)).await?;
        self.check_manager_reference(tenant_id, &resource).await?;
        let mut map = into_map(resource.into_json())?;

        populate_references(resource_type, &mut map);
        stamp_meta(&mut map, resource_type, id, created.as_deref());

        let stored = self
            .storage
            .put(key, Value::Object(map))
            .await
            .map_err(storage_failure)?;
        Ok(stored)
    }

    /// Delete a resource. Repeated deletes of the same id yield NotFound.
    pub async fn delete_resource(
        &self,
        resource_type: &str,
        id: &str,
        context: &RequestContext,
    ) -> ScimResult<()> {
        let tenant_id = context.require_tenant_id()?;
        let key = StorageKey::new(tenant_id, resource_type, id);
        let removed = self.storage.delete(key).await.map_err(storage_failure)?;
        if !removed {
            return Err(ScimError::not_found(resource_type, id));
        }
        info!("Deleted {} '{}' from tenant '{}'", resource_type, id, tenant_id);
        Ok(())
    }

    // ---- Customer administration ----

    /// Register a new customer. Administrative, not tenant-scoped.
    pub async fn register_customer(
        &self,
        display_name: &str,
        tenant_key: &str,
    ) -> ScimResult<Customer> {
        if display_name.trim().is_empty() {
            return Err(ScimError::validation("customer displayName must not be empty"));
        }
        let customer = Customer::new(display_name, tenant_key);
        let key = StorageKey::new(ADMIN_SCOPE, CUSTOMER_TYPE, &customer.id);
        let data = serde_json::to_value(&customer)
            .map_err(|e| ScimError::internal(format!("customer serialization failed: {}", e)))?;
        self.storage.put(key, data).await.map_err(storage_failure)?;
        info!("Registered customer '{}' ({})", customer.display_name, customer.id);
        Ok(customer)
    }

    /// Fetch one customer record.
    pub async fn get_customer(&self, id: &str) -> ScimResult<Customer> {
        let key = StorageKey::new(ADMIN_SCOPE, CUSTOMER_TYPE, id);
        let data = self
            .storage
            .get(key)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| ScimError::not_found(CUSTOMER_TYPE, id))?;
        serde_json::from_value(data)
            .map_err(|e| ScimError::internal(format!("stored customer is malformed: {}", e)))
    }

    /// List every registered customer.
    pub async fn list_customers(&self) -> ScimResult<Vec<Customer>> {
        let prefix = StorageKey::prefix(ADMIN_SCOPE, CUSTOMER_TYPE);
        let records = self.storage.list(prefix).await.map_err(storage_failure)?;
        let mut customers = Vec::with_capacity(records.len());
        for (_, data) in records {
            let customer = serde_json::from_value(data)
                .map_err(|e| ScimError::internal(format!("stored customer is malformed: {}", e)))?;
            customers.push(customer);
        }
        Ok(customers)
    }

    /// Delete a customer and cascade to every resource in its tenant.
    pub async fn delete_customer(&self, id: &str) -> ScimResult<()> {
        let key = StorageKey::new(ADMIN_SCOPE, CUSTOMER_TYPE, id);
        let removed = self.storage.delete(key).await.map_err(storage_failure)?;
        if !removed {
            return Err(ScimError::not_found(CUSTOMER_TYPE, id));
        }
        let mut cascaded = 0;
        for resource_type in ["User", "Group"] {
            cascaded += self
                .storage
                .delete_prefix(StorageKey::prefix(id, resource_type))
                .await
                .map_err(storage_failure)?;
        }
        info!("Deleted customer '{}' and {} tenant resource(s)", id, cascaded);
        Ok(())
    }

    // ---- Internal checks ----

    /// Per-tenant uniqueness: User `userName` (case-insensitive) and
    /// `externalId`; Group `externalId` only. One scan serves both checks.
    async fn check_uniqueness(
        &self,
        tenant_id: &str,
        resource: &Resource,
        exclude_id: Option<&str>,
    ) -> ScimResult<()> {
        let resource_type = resource.resource_type.as_str();
        let user_name = if resource_type == "User" {
            resource.user_name()
        } else {
            None
        };
        let external_id = resource.external_id();
        if user_name.is_none() && external_id.is_none() {
            return Ok(());
        }

        let prefix = StorageKey::prefix(tenant_id, resource_type);
        let records = self.storage.list(prefix).await.map_err(storage_failure)?;
        for (key, data) in records {
            if exclude_id == Some(key.resource_id()) {
                continue;
            }
            if let (Some(wanted), Some(stored)) =
                (user_name, data.get("userName").and_then(Value::as_str))
            {
                if wanted.eq_ignore_ascii_case(stored) {
                    return Err(ScimError::conflict(
                        resource_type,
                        "userName",
                        wanted,
                        tenant_id,
                    ));
                }
            }
            if let (Some(wanted), Some(stored)) =
                (external_id, data.get("externalId").and_then(Value::as_str))
            {
                if wanted == stored {
                    return Err(ScimError::conflict(
                        resource_type,
                        "externalId",
                        wanted,
                        tenant_id,
                    ));
                }
            }
        }
        Ok(())
    }

    /// Optional referential check on the enterprise manager reference.
    async fn check_manager_reference(
        &self,
        tenant_id: &str,
        resource: &Resource,
    ) -> ScimResult<()> {
        if !self.config.validate_manager_reference_exists
            || resource.resource_type != "User"
        {
            return Ok(());
        }
        let manager_id = resource
            .data()
            .get(ENTERPRISE_USER_SCHEMA)
            .and_then(|ext| ext.get("manager"))
            .and_then(|manager| match manager {
                Value::String(id) => Some(id.as_str()),
                Value::Object(obj) => obj.get("value").and_then(Value::as_str),
                _ => None,
            });
        let manager_id = match manager_id {
            Some(id) if !id.is_empty() => id,
            _ => return Ok(()),
        };

        let key = StorageKey::new(tenant_id, "User", manager_id);
        let exists = self.storage.exists(key).await.map_err(storage_failure)?;
        if !exists {
            return Err(ScimError::validation(format!(
                "manager '{}' does not reference an existing User",
                manager_id
            )));
        }
        Ok(())
    }
}

/// Structural and required-field validation applied to create and replace
/// payloads.
fn validate_payload(resource: &Resource) -> ScimResult<()> {
    let resource_type = resource.resource_type.as_str();
    let core_schema = Resource::core_schema_for(resource_type)
        .ok_or_else(|| ScimError::validation(format!("unknown resource type '{}'", resource_type)))?;
    if !resource.has_schema(core_schema) {
        return Err(ScimError::validation(format!(
            "schemas must include '{}'",
            core_schema
        )));
    }

    match resource_type {
        "User" => {
            if resource.user_name().map(str::trim).unwrap_or("").is_empty() {
                return Err(ScimError::validation("userName is required"));
            }
        }
        "Group" => {
            if resource.display_name().map(str::trim).unwrap_or("").is_empty() {
                return Err(ScimError::validation("displayName is required and must not be empty"));
            }
            if let Some(members) = resource.members() {
                for member in members {
                    let value = member.get("value").and_then(Value::as_str).unwrap_or("");
                    if value.is_empty() {
                        return Err(ScimError::validation(
                            "every group member must carry a non-empty 'value'",
                        ));
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Write the server-managed `meta` block: `created` is preserved when the
/// resource already had one, `lastModified` is always re-stamped, and
/// `version` hashes the final content.
fn stamp_meta(
    data: &mut Map<String, Value>,
    resource_type: &str,
    id: &str,
    created: Option<&str>,
) {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let created = created.map(String::from).unwrap_or_else(|| now.clone());

    let mut meta = Map::new();
    meta.insert(
        "resourceType".to_string(),
        Value::String(resource_type.to_string()),
    );
    meta.insert("created".to_string(), Value::String(created));
    meta.insert("lastModified".to_string(), Value::String(now));
    meta.insert(
        "location".to_string(),
        Value::String(format!("/{}s/{}", resource_type, id)),
    );
    data.insert("meta".to_string(), Value::Object(meta));

    let version = ResourceVersion::from_resource(&Value::Object(data.clone()));
    if let Some(meta) = data.get_mut("meta").and_then(Value::as_object_mut) {
        meta.insert(
            "version".to_string(),
            Value::String(version.as_str().to_string()),
        );
    }
}

fn sort_resources(resources: &mut [Map<String, Value>], sort_by: &str, order: SortOrder) {
    resources.sort_by(|a, b| {
        let left = sort_key(a, sort_by);
        let right = sort_key(b, sort_by);
        // Resources missing the sort attribute go last.
        let ordering = match (left, right) {
            (Some(l), Some(r)) => l.cmp(&r),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
}

fn sort_key(data: &Map<String, Value>, attribute: &str) -> Option<String> {
    let key = find_key_ignore_case(data, attribute)?;
    data.get(&key).and_then(Value::as_str).map(str::to_lowercase)
}

fn into_map(data: Value) -> ScimResult<Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map),
        _ => Err(ScimError::internal("stored resource is not a JSON object")),
    }
}

fn storage_failure<E: std::error::Error>(error: E) -> ScimError {
    warn!("Storage operation failed: {}", error);
    ScimError::internal(format!("storage failure: {}", error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{TenantContext, GROUP_SCHEMA, USER_SCHEMA};
    use crate::storage::InMemoryStorage;
    use serde_json::json;

    fn provider() -> ScimProvider<InMemoryStorage> {
        ScimProvider::new(InMemoryStorage::new())
    }

    fn context(tenant: &str) -> RequestContext {
        RequestContext::for_tenant(TenantContext::new(tenant, "client-1"))
    }

    fn user_payload(user_name: &str) -> Value {
        json!({"schemas": [USER_SCHEMA], "userName": user_name})
    }

    #[tokio::test]
    async fn create_generates_id_and_stamps_meta() {
        let provider = provider();
        let created = provider
            .create_resource("User", user_payload("jdoe"), &context("acme"))
            .await
            .unwrap();
        assert!(created["id"].as_str().is_some());
        assert_eq!(created["meta"]["resourceType"], "User");
        assert!(created["meta"]["version"].as_str().is_some());
        assert_eq!(created["meta"]["created"], created["meta"]["lastModified"]);
    }

    #[tokio::test]
    async fn create_requires_core_schema() {
        let provider = provider();
        let err = provider
            .create_resource("User", json!({"userName": "jdoe"}), &context("acme"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScimError::Validation { .. }));
    }

    #[tokio::test]
    async fn operations_require_tenant() {
        let provider = provider();
        let err = provider
            .create_resource("User", user_payload("jdoe"), &RequestContext::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, ScimError::TenantContextMissing));
    }

    #[tokio::test]
    async fn duplicate_user_name_conflicts_case_insensitively() {
        let provider = provider();
        let ctx = context("acme");
        provider
            .create_resource("User", user_payload("jdoe"), &ctx)
            .await
            .unwrap();
        let err = provider
            .create_resource("User", user_payload("JDOE"), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 409);
    }

    #[tokio::test]
    async fn group_conflict_is_external_id_only() {
        let provider = provider();
        let ctx = context("acme");
        let group = |name: &str, ext: Option<&str>| {
            let mut payload = json!({"schemas": [GROUP_SCHEMA], "displayName": name});
            if let Some(ext) = ext {
                payload["externalId"] = json!(ext);
            }
            payload
        };
        provider
            .create_resource("Group", group("Eng", Some("ext-1")), &ctx)
            .await
            .unwrap();
        // Same displayName is fine.
        provider
            .create_resource("Group", group("Eng", None), &ctx)
            .await
            .unwrap();
        let err = provider
            .create_resource("Group", group("Other", Some("ext-1")), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 409);
    }

    #[tokio::test]
    async fn replace_preserves_created_and_restamps_modified() {
        let provider = provider();
        let ctx = context("acme");
        let created = provider
            .create_resource("User", user_payload("jdoe"), &ctx)
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap();

        let replaced = provider
            .replace_resource("User", id, user_payload("jdoe2"), &ctx)
            .await
            .unwrap();
        assert_eq!(replaced["userName"], "jdoe2");
        assert_eq!(replaced["meta"]["created"], created["meta"]["created"]);
        assert_eq!(replaced["id"], created["id"]);
    }

    #[tokio::test]
    async fn manager_reference_validation_is_opt_in() {
        let storage = InMemoryStorage::new();
        let strict = ScimProvider::with_config(
            storage,
            ProviderConfig {
                validate_manager_reference_exists: true,
            },
        );
        let ctx = context("acme");
        let payload = json!({
            "schemas": [USER_SCHEMA],
            "userName": "jdoe",
            ENTERPRISE_USER_SCHEMA: {"manager": "ghost"}
        });
        let err = strict
            .create_resource("User", payload, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ScimError::Validation { .. }));
    }

    #[tokio::test]
    async fn customer_lifecycle_cascades() {
        let provider = provider();
        let customer = provider.register_customer("Acme", "acme-key").await.unwrap();
        let ctx = context(&customer.id);
        provider
            .create_resource("User", user_payload("jdoe"), &ctx)
            .await
            .unwrap();

        assert_eq!(provider.list_customers().await.unwrap().len(), 1);
        provider.delete_customer(&customer.id).await.unwrap();

        let err = provider.get_customer(&customer.id).await.unwrap_err();
        assert!(matches!(err, ScimError::NotFound { .. }));
        let listed = provider
            .list_resources("User", &ListQuery::new(), &ctx)
            .await
            .unwrap();
        assert_eq!(listed.total_results, 0);
    }

    #[tokio::test]
    async fn invalid_pagination_is_rejected() {
        let provider = provider();
        let ctx = context("acme");
        for query in [
            ListQuery::new().with_start_index(0),
            ListQuery::new().with_count(-1),
        ] {
            let err = provider
                .list_resources("User", &query, &ctx)
                .await
                .unwrap_err();
            assert_eq!(err.http_status(), 400);
        }
    }

    #[tokio::test]
    async fn list_sorts_by_attribute() {
        let provider = provider();
        let ctx = context("acme");
        for name in ["carol", "alice", "bob"] {
            provider
                .create_resource("User", user_payload(name), &ctx)
                .await
                .unwrap();
        }
        let response = provider
            .list_resources(
                "User",
                &ListQuery::new()
                    .with_sort_by("userName")
                    .with_sort_order("descending"),
                &ctx,
            )
            .await
            .unwrap();
        let names: Vec<&str> = response
            .resources
            .iter()
            .map(|r| r["userName"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["carol", "bob", "alice"]);
    }
}

//! Multi-tenant SCIM 2.0 provisioning core.
//!
//! This crate implements the protocol semantics of a SCIM 2.0 (RFC 7643/7644)
//! provisioning service: CRUD and PATCH for Users and Groups, attribute-path
//! parsing with filtered selectors, attribute projection, reference
//! population, and simple list filtering, all scoped by tenant on every
//! operation. Transport, authentication, and durable storage are the host
//! application's concern; storage plugs in through the [`StorageProvider`]
//! trait and the resolved tenant arrives in a [`RequestContext`].
//!
//! # Example
//!
//! ```no_run
//! use scim_provision::{
//!     InMemoryStorage, RequestContext, ScimProvider, TenantContext,
//! };
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), scim_provision::ScimError> {
//! let provider = ScimProvider::new(InMemoryStorage::new());
//! let customer = provider.register_customer("Acme Corp", "acme-prod").await?;
//! let context = RequestContext::for_tenant(TenantContext::new(&customer.id, "client-1"));
//!
//! let user = provider
//!     .create_resource(
//!         "User",
//!         json!({
//!             "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
//!             "userName": "jdoe"
//!         }),
//!         &context,
//!     )
//!     .await?;
//! # let _ = user;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod filter;
pub mod patch;
pub mod path;
pub mod projection;
pub mod provider;
pub mod reference;
pub mod resource;
pub mod response;
pub mod storage;
pub mod tenant;

pub use error::{ScimError, ScimResult};
pub use filter::ResourceFilter;
pub use patch::{apply_patch_operation, coerce_bool, PatchOperation, PatchRequest};
pub use path::{AttributePath, ValueFilter};
pub use projection::{omit_group_members, project};
pub use provider::{ProviderConfig, ScimProvider};
pub use reference::populate_references;
pub use resource::{
    ListQuery, RequestContext, Resource, ResourceVersion, SortOrder, TenantContext,
    ENTERPRISE_USER_SCHEMA, GROUP_SCHEMA, USER_SCHEMA,
};
pub use response::{ListResponse, ScimErrorResponse};
pub use storage::{InMemoryStorage, StorageError, StorageKey, StoragePrefix, StorageProvider};
pub use tenant::Customer;

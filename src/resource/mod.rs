//! Resource representation, request context, and versioning.

pub mod context;
pub mod resource;
pub mod version;

pub use context::{ListQuery, RequestContext, SortOrder, TenantContext};
pub use resource::{
    find_key_ignore_case, Resource, ENTERPRISE_USER_SCHEMA, ERROR_SCHEMA, GROUP_SCHEMA,
    LIST_RESPONSE_SCHEMA, PATCH_OP_SCHEMA, USER_SCHEMA,
};
pub use version::ResourceVersion;

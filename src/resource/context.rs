//! Request context and list query parameters.
//!
//! The transport layer resolves the tenant (bearer-token claim, header, or
//! URL segment) before the core runs; the core only ever sees the resolved
//! [`TenantContext`]. Operations invoked without one fail fast with
//! `TenantContextMissing`.

use crate::error::{ScimError, ScimResult};
use uuid::Uuid;

/// Resolved tenant identity for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    /// Tenant (customer) identifier every storage key is scoped by.
    pub tenant_id: String,
    /// Client credential identifier, carried for auditing.
    pub client_id: String,
}

impl TenantContext {
    /// Create a new tenant context.
    pub fn new(tenant_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
        }
    }
}

/// Per-request context: a request id for log correlation plus the resolved
/// tenant, when one was resolved.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request.
    pub request_id: String,
    /// Resolved tenant, absent when resolution failed upstream.
    pub tenant_context: Option<TenantContext>,
}

impl RequestContext {
    /// Context with an explicit request id and tenant.
    pub fn with_tenant(request_id: String, tenant_context: TenantContext) -> Self {
        Self {
            request_id,
            tenant_context: Some(tenant_context),
        }
    }

    /// Context with a generated request id and the given tenant.
    pub fn for_tenant(tenant_context: TenantContext) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            tenant_context: Some(tenant_context),
        }
    }

    /// Context with a generated request id and no tenant. Core operations
    /// reject such a context; it exists for administrative entry points.
    pub fn anonymous() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            tenant_context: None,
        }
    }

    /// The resolved tenant id, if any.
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_context.as_ref().map(|t| t.tenant_id.as_str())
    }

    /// The resolved tenant id, or `TenantContextMissing`.
    pub fn require_tenant_id(&self) -> ScimResult<&str> {
        self.tenant_id().ok_or(ScimError::TenantContextMissing)
    }
}

/// Sort direction for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Parse a `sortOrder` query value. Only `ascending`/`descending`
    /// (case-insensitive) are accepted.
    pub fn parse(value: &str) -> ScimResult<Self> {
        if value.eq_ignore_ascii_case("ascending") {
            Ok(Self::Ascending)
        } else if value.eq_ignore_ascii_case("descending") {
            Ok(Self::Descending)
        } else {
            Err(ScimError::validation(format!(
                "invalid sortOrder '{}': expected 'ascending' or 'descending'",
                value
            )))
        }
    }
}

/// Query parameters for list operations.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// 1-based index of the first returned result.
    pub start_index: Option<i64>,
    /// Maximum number of results to return.
    pub count: Option<i64>,
    /// Filter expression (simple `attr eq "value"` subset).
    pub filter: Option<String>,
    /// Attribute to sort by.
    pub sort_by: Option<String>,
    /// Raw sortOrder value, validated during list execution.
    pub sort_order: Option<String>,
    /// Attributes to include in results.
    pub attributes: Vec<String>,
    /// Attributes to exclude from results.
    pub excluded_attributes: Vec<String>,
}

impl ListQuery {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the starting index.
    pub fn with_start_index(mut self, start_index: i64) -> Self {
        self.start_index = Some(start_index);
        self
    }

    /// Set the maximum count.
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    /// Set a filter expression.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the sort attribute.
    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }

    /// Set the sort order.
    pub fn with_sort_order(mut self, sort_order: impl Into<String>) -> Self {
        self.sort_order = Some(sort_order.into());
        self
    }

    /// Add attributes to include in results.
    pub fn with_attributes(mut self, attributes: Vec<String>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Add attributes to exclude from results.
    pub fn with_excluded_attributes(mut self, attributes: Vec<String>) -> Self {
        self.excluded_attributes.extend(attributes);
        self
    }
}

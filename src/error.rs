//! Error types for SCIM provisioning operations.
//!
//! All orchestrator, interpreter, and translator operations return
//! `Result<T, ScimError>`. Panics are reserved for programming-contract
//! violations; every user-input condition maps to a variant here, and every
//! variant maps to an HTTP status and optional SCIM `scimType` keyword.

use thiserror::Error;

/// Main error type for SCIM provisioning operations.
#[derive(Debug, Clone, Error)]
pub enum ScimError {
    /// Malformed request shape, bad pagination params, bad sortOrder.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A core operation was invoked without a resolved tenant.
    #[error("Tenant context missing: operation requires a resolved tenant identifier")]
    TenantContextMissing,

    /// Uniqueness invariant violated within a tenant.
    #[error("Conflict: {resource_type} with {attribute} '{value}' already exists in tenant '{tenant_id}'")]
    Conflict {
        resource_type: String,
        attribute: String,
        value: String,
        tenant_id: String,
    },

    /// Resource absent, or present under a different tenant. The two cases
    /// are indistinguishable on purpose.
    #[error("Resource not found: {resource_type} with id '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Attribute path expression could not be parsed.
    #[error("Malformed attribute path '{path}': {detail}")]
    MalformedPath { path: String, detail: String },

    /// Filter construct outside the supported grammar subset.
    #[error("Unsupported filter: {detail}")]
    UnsupportedFilter { detail: String },

    /// Filter sub-attribute not carried by the target collection's schema.
    #[error("Unsupported filter attribute '{attribute}': {detail}")]
    UnsupportedFilterAttribute { attribute: String, detail: String },

    /// Path shape the interpreter deliberately does not serve.
    #[error("Unsupported path '{path}': {detail}")]
    UnsupportedPath { path: String, detail: String },

    /// PATCH `op` value outside add/remove/replace.
    #[error("Unsupported PATCH operation '{op}': supported operations are add, remove, replace")]
    UnsupportedOperation { op: String },

    /// Anything unexpected. The message must already be safe to surface.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ScimError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create a uniqueness conflict error.
    pub fn conflict(
        resource_type: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            resource_type: resource_type.into(),
            attribute: attribute.into(),
            value: value.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// Create a malformed-path error.
    pub fn malformed_path(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedPath {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code this error surfaces as.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. }
            | Self::TenantContextMissing
            | Self::MalformedPath { .. }
            | Self::UnsupportedFilter { .. }
            | Self::UnsupportedFilterAttribute { .. }
            | Self::UnsupportedPath { .. }
            | Self::UnsupportedOperation { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Internal { .. } => 500,
        }
    }

    /// SCIM `scimType` detail keyword (RFC 7644 §3.12), where one applies.
    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            Self::Validation { .. } => Some("invalidValue"),
            Self::Conflict { .. } => Some("uniqueness"),
            Self::MalformedPath { .. } | Self::UnsupportedPath { .. } => Some("invalidPath"),
            Self::UnsupportedFilter { .. } | Self::UnsupportedFilterAttribute { .. } => {
                Some("invalidFilter")
            }
            _ => None,
        }
    }
}

impl From<String> for ScimError {
    fn from(message: String) -> Self {
        ScimError::Internal { message }
    }
}

impl From<serde_json::Error> for ScimError {
    fn from(e: serde_json::Error) -> Self {
        ScimError::Validation {
            message: format!("Invalid JSON payload: {}", e),
        }
    }
}

/// Result alias used throughout the crate.
pub type ScimResult<T> = Result<T, ScimError>;

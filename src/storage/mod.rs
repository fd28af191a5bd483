//! Record store abstraction for SCIM resources.
//!
//! The core treats persistence as a generic record store keyed by
//! tenant → resource type → resource id. The trait covers pure data
//! operations only; SCIM semantics (metadata stamping, uniqueness rules,
//! projection) live in the provider layer. Conflicting writes to the same
//! key are expected to be serialized by the backend.

pub mod errors;
pub mod in_memory;

pub use errors::StorageError;
pub use in_memory::InMemoryStorage;

use serde_json::Value;
use std::fmt;
use std::future::Future;

/// A hierarchical key identifying one resource in storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    tenant_id: String,
    resource_type: String,
    resource_id: String,
}

impl StorageKey {
    /// Create a new storage key.
    pub fn new(
        tenant_id: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    /// Tenant scope of the key.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Resource type segment.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Resource id segment.
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Prefix covering every resource of one type within one tenant.
    pub fn prefix(tenant_id: impl Into<String>, resource_type: impl Into<String>) -> StoragePrefix {
        StoragePrefix {
            tenant_id: tenant_id.into(),
            resource_type: resource_type.into(),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.tenant_id, self.resource_type, self.resource_id
        )
    }
}

/// A (tenant, resource type) prefix for list and search operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePrefix {
    tenant_id: String,
    resource_type: String,
}

impl StoragePrefix {
    /// Tenant scope of the prefix.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Resource type segment.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }
}

impl fmt::Display for StoragePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.resource_type)
    }
}

/// Pure data persistence operations with tenant isolation baked into the
/// key structure.
///
/// PUT returns the stored data so providers can return complete resource
/// state without a second round-trip; DELETE returns whether the resource
/// existed so the provider can distinguish 204 from 404.
pub trait StorageProvider: Send + Sync {
    /// Error type returned by storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store data at the key, replacing any existing record.
    fn put(
        &self,
        key: StorageKey,
        data: Value,
    ) -> impl Future<Output = Result<Value, Self::Error>> + Send;

    /// Retrieve data by key; `None` when absent.
    fn get(
        &self,
        key: StorageKey,
    ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send;

    /// Delete by key; `true` when a record was removed.
    fn delete(&self, key: StorageKey) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// List all (key, data) pairs under a prefix, consistently ordered by
    /// resource id.
    fn list(
        &self,
        prefix: StoragePrefix,
    ) -> impl Future<Output = Result<Vec<(StorageKey, Value)>, Self::Error>> + Send;

    /// Exact-match search on a top-level or dotted attribute path.
    fn find_by_attribute(
        &self,
        prefix: StoragePrefix,
        attribute: &str,
        value: &str,
    ) -> impl Future<Output = Result<Vec<(StorageKey, Value)>, Self::Error>> + Send;

    /// Whether a record exists at the key.
    fn exists(&self, key: StorageKey) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Count records under a prefix.
    fn count(
        &self,
        prefix: StoragePrefix,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;

    /// Delete every record under a prefix, returning how many were removed.
    /// Used for tenant cascade deletion.
    fn delete_prefix(
        &self,
        prefix: StoragePrefix,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;

    /// Remove all data. Intended for tests.
    fn clear(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

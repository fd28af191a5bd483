//! Customer (tenant) entity.
//!
//! Customers are the isolation boundary: every User and Group belongs to
//! exactly one customer, and the customer's id is the tenant id on every
//! storage key. Customers are created by administrative action, never
//! through the SCIM resource endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A provisioning customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Server-generated identifier, used as the tenant id.
    pub id: String,
    /// Human-readable name.
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// External correlation key supplied at registration.
    #[serde(rename = "tenantKey")]
    pub tenant_key: String,
    /// Whether provisioning is enabled for this customer.
    pub active: bool,
    pub created: DateTime<Utc>,
    #[serde(rename = "lastModified")]
    pub last_modified: DateTime<Utc>,
}

impl Customer {
    /// Register a new active customer with a generated id.
    pub fn new(display_name: impl Into<String>, tenant_key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            display_name: display_name.into(),
            tenant_key: tenant_key.into(),
            active: true,
            created: now,
            last_modified: now,
        }
    }
}

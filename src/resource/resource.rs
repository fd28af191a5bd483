//! Hybrid SCIM resource representation.
//!
//! Resources are carried as JSON objects behind a thin typed façade: the
//! resource type is tracked explicitly while attributes stay in a
//! `serde_json::Map`, which is what the PATCH interpreter and projection
//! engine operate on. Typed accessors cover the attributes the orchestrator
//! reasons about (id, userName, displayName, externalId, members).

use crate::error::{ScimError, ScimResult};
use serde_json::{Map, Value};

/// Core User schema URI (RFC 7643 §4.1).
pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
/// Core Group schema URI (RFC 7643 §4.2).
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
/// Enterprise User extension schema URI (RFC 7643 §4.3).
pub const ENTERPRISE_USER_SCHEMA: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
/// ListResponse message URI (RFC 7644 §3.4.2).
pub const LIST_RESPONSE_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";
/// Error message URI (RFC 7644 §3.12).
pub const ERROR_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:Error";
/// PatchOp message URI (RFC 7644 §3.5.2).
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Find the stored key matching `name` case-insensitively.
///
/// SCIM attribute names are case-insensitive on input while responses keep
/// the stored (canonical) spelling, so lookups go through this helper
/// wherever a client-supplied name meets stored data.
pub fn find_key_ignore_case(map: &Map<String, Value>, name: &str) -> Option<String> {
    map.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned()
}

/// A SCIM resource: its type plus a JSON attribute map.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// "User", "Group", or "Customer".
    pub resource_type: String,
    data: Map<String, Value>,
}

impl Resource {
    /// Build a resource from a JSON payload. The payload must be an object.
    pub fn from_json(resource_type: impl Into<String>, data: Value) -> ScimResult<Self> {
        match data {
            Value::Object(map) => Ok(Self {
                resource_type: resource_type.into(),
                data: map,
            }),
            _ => Err(ScimError::validation("resource payload must be a JSON object")),
        }
    }

    /// The attribute map.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Mutable access for the PATCH interpreter and populators.
    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data
    }

    /// Consume into the underlying JSON value.
    pub fn into_json(self) -> Value {
        Value::Object(self.data)
    }

    /// Serialize to a JSON value (clone).
    pub fn to_json(&self) -> Value {
        Value::Object(self.data.clone())
    }

    /// Resource id, when present.
    pub fn id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    /// Set the resource id.
    pub fn set_id(&mut self, id: &str) {
        self.data.insert("id".to_string(), Value::String(id.to_string()));
    }

    /// `userName` (User resources).
    pub fn user_name(&self) -> Option<&str> {
        self.data.get("userName").and_then(Value::as_str)
    }

    /// `displayName`.
    pub fn display_name(&self) -> Option<&str> {
        self.data.get("displayName").and_then(Value::as_str)
    }

    /// `externalId`, when present and non-empty.
    pub fn external_id(&self) -> Option<&str> {
        self.data
            .get("externalId")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Declared schema URIs.
    pub fn schemas(&self) -> Vec<&str> {
        self.data
            .get("schemas")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Group member list (Group resources).
    pub fn members(&self) -> Option<&Vec<Value>> {
        self.data.get("members").and_then(Value::as_array)
    }

    /// Whether the declared schemas include the given URI (case-insensitive,
    /// URNs are case-insensitive per RFC 2141).
    pub fn has_schema(&self, uri: &str) -> bool {
        self.schemas().iter().any(|s| s.eq_ignore_ascii_case(uri))
    }

    /// The core schema URI expected for a resource type.
    pub fn core_schema_for(resource_type: &str) -> Option<&'static str> {
        match resource_type {
            "User" => Some(USER_SCHEMA),
            "Group" => Some(GROUP_SCHEMA),
            _ => None,
        }
    }

    /// Top-level simple attributes a path-less replace may overwrite,
    /// per resource type. `id`, `schemas`, and `meta` are server-managed
    /// and never listed here.
    pub fn replaceable_attributes(resource_type: &str) -> &'static [&'static str] {
        match resource_type {
            "User" => &[
                "userName",
                "displayName",
                "externalId",
                "active",
                "name",
                "title",
                "nickName",
                "preferredLanguage",
                "locale",
                "timezone",
                "emails",
                "phoneNumbers",
                "addresses",
                "roles",
                "groups",
            ],
            "Group" => &["displayName", "externalId", "members"],
            _ => &[],
        }
    }

    /// Multi-valued collection attributes per resource type.
    pub fn collection_attributes(resource_type: &str) -> &'static [&'static str] {
        match resource_type {
            "User" => &["emails", "phoneNumbers", "addresses", "roles", "groups"],
            "Group" => &["members"],
            _ => &[],
        }
    }

    /// Whether an attribute names a known multi-valued collection.
    pub fn is_collection_attribute(resource_type: &str, attribute: &str) -> bool {
        Self::collection_attributes(resource_type)
            .iter()
            .any(|a| a.eq_ignore_ascii_case(attribute))
    }
}

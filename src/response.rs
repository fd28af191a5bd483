//! SCIM message wire shapes (RFC 7644 §3.4.2, §3.12).

use crate::error::ScimError;
use crate::resource::{ERROR_SCHEMA, LIST_RESPONSE_SCHEMA};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// List response envelope. `totalResults` counts the filtered set before
/// pagination; `Resources` holds the page actually returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub schemas: Vec<String>,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
    #[serde(rename = "startIndex")]
    pub start_index: i64,
    #[serde(rename = "itemsPerPage")]
    pub items_per_page: usize,
    #[serde(rename = "Resources")]
    pub resources: Vec<Value>,
}

impl ListResponse {
    pub fn new(total_results: usize, start_index: i64, resources: Vec<Value>) -> Self {
        Self {
            schemas: vec![LIST_RESPONSE_SCHEMA.to_string()],
            total_results,
            start_index,
            items_per_page: resources.len(),
            resources,
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScimErrorResponse {
    pub schemas: Vec<String>,
    pub detail: String,
    pub status: u16,
    #[serde(rename = "scimType", skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<String>,
}

impl From<&ScimError> for ScimErrorResponse {
    fn from(error: &ScimError) -> Self {
        let detail = match error {
            // Internal details are not client material.
            ScimError::Internal { .. } => "An internal error occurred".to_string(),
            other => other.to_string(),
        };
        Self {
            schemas: vec![ERROR_SCHEMA.to_string()],
            detail,
            status: error.http_status(),
            scim_type: error.scim_type().map(String::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_envelope_shape() {
        let response = ListResponse::new(15, 6, vec![json!({"id": "u6"})]);
        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["schemas"][0], LIST_RESPONSE_SCHEMA);
        assert_eq!(wire["totalResults"], 15);
        assert_eq!(wire["startIndex"], 6);
        assert_eq!(wire["itemsPerPage"], 1);
        assert_eq!(wire["Resources"][0]["id"], "u6");
    }

    #[test]
    fn error_shape_carries_scim_type_when_present() {
        let error = ScimError::conflict("User", "userName", "jdoe", "acme");
        let wire = serde_json::to_value(ScimErrorResponse::from(&error)).unwrap();
        assert_eq!(wire["status"], 409);
        assert_eq!(wire["scimType"], "uniqueness");
        assert_eq!(wire["schemas"][0], ERROR_SCHEMA);
    }

    #[test]
    fn internal_detail_is_generic() {
        let error = ScimError::internal("lock poisoned at shard 3");
        let wire = serde_json::to_value(ScimErrorResponse::from(&error)).unwrap();
        assert_eq!(wire["detail"], "An internal error occurred");
        assert_eq!(wire.get("scimType"), None);
    }
}

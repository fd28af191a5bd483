//! `$ref` population for resource references.
//!
//! `$ref` is server-managed metadata: whatever a client sends is discarded
//! and the value is rederived from the reference's `value` on every write
//! (create, full update, patch). References use relative URIs so the core
//! stays agnostic of the deployment's base URL.

use crate::resource::ENTERPRISE_USER_SCHEMA;
use serde_json::{Map, Value};

/// Relative reference URI for a User id.
fn user_ref(id: &str) -> String {
    format!("../Users/{}", id)
}

/// Rederive every `$ref` the resource carries.
///
/// Group members and the enterprise manager reference both point at Users.
/// A manager supplied as a bare id string is normalized to its object form
/// here so the stored shape is uniform.
pub fn populate_references(resource_type: &str, data: &mut Map<String, Value>) {
    match resource_type {
        "Group" => populate_member_refs(data),
        "User" => populate_manager_ref(data),
        _ => {}
    }
}

fn populate_member_refs(data: &mut Map<String, Value>) {
    let members = match data.get_mut("members").and_then(Value::as_array_mut) {
        Some(members) => members,
        None => return,
    };
    for member in members {
        if let Some(obj) = member.as_object_mut() {
            let value = obj.get("value").and_then(Value::as_str).map(String::from);
            if let Some(id) = value {
                obj.insert("$ref".to_string(), Value::String(user_ref(&id)));
            }
        }
    }
}

fn populate_manager_ref(data: &mut Map<String, Value>) {
    let extension = match data
        .get_mut(ENTERPRISE_USER_SCHEMA)
        .and_then(Value::as_object_mut)
    {
        Some(extension) => extension,
        None => return,
    };

    let manager = match extension.get_mut("manager") {
        Some(manager) => manager,
        None => return,
    };

    // Bare id string normalizes to the object form.
    if let Some(id) = manager.as_str().map(String::from) {
        let mut obj = Map::new();
        obj.insert("value".to_string(), Value::String(id.clone()));
        obj.insert("$ref".to_string(), Value::String(user_ref(&id)));
        *manager = Value::Object(obj);
        return;
    }

    if let Some(obj) = manager.as_object_mut() {
        let value = obj.get("value").and_then(Value::as_str).map(String::from);
        if let Some(id) = value {
            obj.insert("$ref".to_string(), Value::String(user_ref(&id)));
        }
    }
}

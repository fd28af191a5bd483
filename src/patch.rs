//! SCIM PATCH operation interpreter (RFC 7644 §3.5.2).
//!
//! Applies add/remove/replace operations to a resource's attribute map.
//! Operations apply strictly in request order and each operation's effect is
//! visible to the next; any failure aborts the whole request before the
//! orchestrator persists, so partial updates never reach storage.
//!
//! Provisioning clients are sloppy about value shapes. The interpreter
//! accepts object literals, JSON-serialized strings, and bare scalars where
//! the target allows it, and normalizes them to one stored form.

use crate::error::{ScimError, ScimResult};
use crate::path::{AttributePath, ValueFilter};
use crate::resource::{find_key_ignore_case, Resource, PATCH_OP_SCHEMA};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A SCIM PatchOp request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRequest {
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    /// Check the request declares the PatchOp message schema and carries at
    /// least one operation.
    pub fn validate(&self) -> ScimResult<()> {
        if !self
            .schemas
            .iter()
            .any(|s| s.eq_ignore_ascii_case(PATCH_OP_SCHEMA))
        {
            return Err(ScimError::validation(format!(
                "PATCH request must declare schema '{}'",
                PATCH_OP_SCHEMA
            )));
        }
        if self.operations.is_empty() {
            return Err(ScimError::validation(
                "PATCH request must contain at least one operation",
            ));
        }
        Ok(())
    }
}

/// One add/remove/replace instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchOperation {
    /// `add`, `remove`, or `replace`, case-insensitive.
    pub op: String,
    /// Attribute path expression; absent means the whole resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Untyped payload; required for add and replace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn new(op: impl Into<String>, path: Option<String>, value: Option<Value>) -> Self {
        Self {
            op: op.into(),
            path,
            value,
        }
    }
}

/// Apply one PATCH operation to a resource's attribute map.
pub fn apply_patch_operation(
    resource_type: &str,
    data: &mut Map<String, Value>,
    operation: &PatchOperation,
) -> ScimResult<()> {
    let op = operation.op.to_ascii_lowercase();
    match op.as_str() {
        "add" => apply_add(resource_type, data, operation),
        "remove" => apply_remove(resource_type, data, operation),
        "replace" => apply_replace(resource_type, data, operation),
        _ => Err(ScimError::UnsupportedOperation {
            op: operation.op.clone(),
        }),
    }
}

fn require_value<'a>(operation: &'a PatchOperation) -> ScimResult<&'a Value> {
    operation.value.as_ref().ok_or_else(|| {
        ScimError::validation(format!(
            "PATCH {} operation requires a value",
            operation.op.to_ascii_lowercase()
        ))
    })
}

fn parse_path(resource_type: &str, raw: &str) -> ScimResult<AttributePath> {
    let path = AttributePath::parse(raw)?;
    if !path.is_extension() && (path.attribute_is("id") || path.attribute_is("meta")) {
        return Err(ScimError::validation(format!(
            "attribute '{}' is server-managed and cannot be patched",
            path.attribute
        )));
    }
    if let Some(filter) = &path.filter {
        check_filter_attribute(resource_type, &path.attribute, filter)?;
    }
    Ok(path)
}

/// Group members only carry `value`, `display`, and `$ref` (RFC 7643 §4.2),
/// so a `type` selector can never match and is rejected outright.
fn check_filter_attribute(
    resource_type: &str,
    attribute: &str,
    filter: &ValueFilter,
) -> ScimResult<()> {
    if resource_type == "Group"
        && attribute.eq_ignore_ascii_case("members")
        && filter.sub_attribute.eq_ignore_ascii_case("type")
    {
        return Err(ScimError::UnsupportedFilterAttribute {
            attribute: "type".to_string(),
            detail: "Group members carry only 'value', 'display', and '$ref' \
                     sub-attributes (RFC 7643 section 4.2); 'type' cannot be \
                     used to select members"
                .to_string(),
        });
    }
    Ok(())
}

fn apply_replace(
    resource_type: &str,
    data: &mut Map<String, Value>,
    operation: &PatchOperation,
) -> ScimResult<()> {
    let value = require_value(operation)?;
    let path = match &operation.path {
        Some(raw) => parse_path(resource_type, raw)?,
        None => return merge_recognized(resource_type, data, value),
    };

    if path.is_extension() {
        return set_extension_field(data, &path, value);
    }

    if let Some(filter) = &path.filter {
        return replace_in_collection(data, &path, filter, value);
    }

    set_field(resource_type, data, &path, value);
    Ok(())
}

fn apply_add(
    resource_type: &str,
    data: &mut Map<String, Value>,
    operation: &PatchOperation,
) -> ScimResult<()> {
    let value = require_value(operation)?;
    let path = match &operation.path {
        Some(raw) => parse_path(resource_type, raw)?,
        // Path-less add merges attributes, same as path-less replace.
        None => return merge_recognized(resource_type, data, value),
    };

    if path.is_extension() {
        // Add and replace are equivalent for singular extension fields.
        return set_extension_field(data, &path, value);
    }

    if path.filter.is_some() {
        return Err(ScimError::UnsupportedPath {
            path: operation.path.clone().unwrap_or_default(),
            detail: "add targets a whole attribute; element selection is only \
                     supported with replace or remove"
                .to_string(),
        });
    }

    if Resource::is_collection_attribute(resource_type, &path.attribute) {
        return append_to_collection(data, &path, value);
    }

    set_field(resource_type, data, &path, value);
    Ok(())
}

fn apply_remove(
    resource_type: &str,
    data: &mut Map<String, Value>,
    operation: &PatchOperation,
) -> ScimResult<()> {
    let raw = operation
        .path
        .as_deref()
        .ok_or_else(|| ScimError::validation("PATCH remove operation requires a path"))?;
    let path = parse_path(resource_type, raw)?;

    if path.is_extension() {
        return remove_extension_field(data, &path);
    }

    if let Some(filter) = &path.filter {
        remove_from_collection(data, &path, filter);
        return Ok(());
    }

    let key = match find_key_ignore_case(data, &path.attribute) {
        Some(key) => key,
        None => return Ok(()),
    };
    match &path.sub_attribute {
        Some(sub) => {
            if let Some(parent) = data.get_mut(&key).and_then(Value::as_object_mut) {
                if let Some(sub_key) = find_key_ignore_case(parent, sub) {
                    parent.remove(&sub_key);
                }
            }
        }
        None => {
            data.remove(&key);
        }
    }
    Ok(())
}

/// Path-less merge: overwrite recognized top-level attributes from the
/// supplied value, leaving everything else untouched. Unknown keys are
/// ignored; server-managed attributes are never in the recognized set.
fn merge_recognized(
    resource_type: &str,
    data: &mut Map<String, Value>,
    value: &Value,
) -> ScimResult<()> {
    let incoming = value_as_object(value)?;
    for attribute in Resource::replaceable_attributes(resource_type) {
        let incoming_key = match find_key_ignore_case(&incoming, attribute) {
            Some(key) => key,
            None => continue,
        };
        let supplied = &incoming[&incoming_key];
        if attribute.eq_ignore_ascii_case("active") {
            if let Some(flag) = coerce_bool(supplied) {
                data.insert("active".to_string(), Value::Bool(flag));
            }
            continue;
        }
        if Resource::is_collection_attribute(resource_type, attribute) {
            let elements = normalize_elements(supplied)?;
            data.insert(attribute.to_string(), Value::Array(elements));
        } else {
            data.insert(attribute.to_string(), supplied.clone());
        }
    }
    Ok(())
}

/// Overwrite a single flat or dotted field.
fn set_field(
    resource_type: &str,
    data: &mut Map<String, Value>,
    path: &AttributePath,
    value: &Value,
) {
    let key = find_key_ignore_case(data, &path.attribute)
        .unwrap_or_else(|| path.attribute.clone());

    if let Some(sub) = &path.sub_attribute {
        let parent = data
            .entry(key)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(parent) = parent.as_object_mut() {
            let sub_key = find_key_ignore_case(parent, sub).unwrap_or_else(|| sub.clone());
            parent.insert(sub_key, value.clone());
        }
        return;
    }

    if path.attribute_is("active") {
        // Unparseable input leaves the stored flag as it was.
        if let Some(flag) = coerce_bool(value) {
            data.insert(key, Value::Bool(flag));
        }
        return;
    }

    if Resource::is_collection_attribute(resource_type, &path.attribute) {
        if let Ok(elements) = normalize_elements(value) {
            data.insert(key, Value::Array(elements));
        }
        return;
    }

    data.insert(key, value.clone());
}

/// Replace inside a filtered collection: set the target sub-attribute on
/// every matching element, or swap the whole element when no target is
/// named. Zero matches is a no-op.
fn replace_in_collection(
    data: &mut Map<String, Value>,
    path: &AttributePath,
    filter: &ValueFilter,
    value: &Value,
) -> ScimResult<()> {
    let key = match find_key_ignore_case(data, &path.attribute) {
        Some(key) => key,
        None => return Ok(()),
    };
    let elements = match data.get_mut(&key).and_then(Value::as_array_mut) {
        Some(elements) => elements,
        None => return Ok(()),
    };

    for element in elements.iter_mut() {
        if !element_matches(element, filter) {
            continue;
        }
        match &path.sub_attribute {
            Some(target) => {
                if let Some(obj) = element.as_object_mut() {
                    let target_key =
                        find_key_ignore_case(obj, target).unwrap_or_else(|| target.clone());
                    obj.insert(target_key, value.clone());
                }
            }
            None => {
                *element = Value::Object(value_as_object(value)?);
            }
        }
    }
    Ok(())
}

fn remove_from_collection(
    data: &mut Map<String, Value>,
    path: &AttributePath,
    filter: &ValueFilter,
) {
    let key = match find_key_ignore_case(data, &path.attribute) {
        Some(key) => key,
        None => return,
    };
    if let Some(elements) = data.get_mut(&key).and_then(Value::as_array_mut) {
        elements.retain(|element| !element_matches(element, filter));
    }
}

fn element_matches(element: &Value, filter: &ValueFilter) -> bool {
    let obj = match element.as_object() {
        Some(obj) => obj,
        None => return false,
    };
    find_key_ignore_case(obj, &filter.sub_attribute)
        .and_then(|key| obj.get(&key))
        .and_then(Value::as_str)
        .map(|v| v == filter.value)
        .unwrap_or(false)
}

/// Append to a multi-valued collection, creating it when absent.
fn append_to_collection(
    data: &mut Map<String, Value>,
    path: &AttributePath,
    value: &Value,
) -> ScimResult<()> {
    let new_elements = normalize_elements(value)?;
    let key = find_key_ignore_case(data, &path.attribute)
        .unwrap_or_else(|| path.attribute.clone());
    let collection = data.entry(key).or_insert_with(|| Value::Array(Vec::new()));
    match collection.as_array_mut() {
        Some(elements) => elements.extend(new_elements),
        None => *collection = Value::Array(new_elements),
    }
    Ok(())
}

/// Set a sub-field inside a schema-extension block, creating the block when
/// absent. The block is keyed by the full extension URN.
fn set_extension_field(
    data: &mut Map<String, Value>,
    path: &AttributePath,
    value: &Value,
) -> ScimResult<()> {
    let urn = match &path.urn {
        Some(urn) => urn.clone(),
        None => {
            return Err(ScimError::internal(
                "extension dispatch on a non-extension path",
            ))
        }
    };

    let block_key = find_key_ignore_case(data, &urn).unwrap_or(urn);
    let block = data
        .entry(block_key)
        .or_insert_with(|| Value::Object(Map::new()));
    let block = match block.as_object_mut() {
        Some(block) => block,
        None => return Err(ScimError::validation("extension block is not an object")),
    };

    let stored = if path.attribute_is("manager") && path.sub_attribute.is_none() {
        normalize_manager(value)?
    } else {
        value.clone()
    };

    let field_key =
        find_key_ignore_case(block, &path.attribute).unwrap_or_else(|| path.attribute.clone());
    match &path.sub_attribute {
        Some(sub) => {
            let parent = block
                .entry(field_key)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Some(parent) = parent.as_object_mut() {
                let sub_key = find_key_ignore_case(parent, sub).unwrap_or_else(|| sub.clone());
                parent.insert(sub_key, stored);
            }
        }
        None => {
            block.insert(field_key, stored);
        }
    }
    Ok(())
}

fn remove_extension_field(data: &mut Map<String, Value>, path: &AttributePath) -> ScimResult<()> {
    let urn = match &path.urn {
        Some(urn) => urn.as_str(),
        None => return Ok(()),
    };
    let block_key = match find_key_ignore_case(data, urn) {
        Some(key) => key,
        None => return Ok(()),
    };
    if let Some(block) = data.get_mut(&block_key).and_then(Value::as_object_mut) {
        if let Some(field_key) = find_key_ignore_case(block, &path.attribute) {
            match &path.sub_attribute {
                Some(sub) => {
                    if let Some(parent) = block.get_mut(&field_key).and_then(Value::as_object_mut)
                    {
                        if let Some(sub_key) = find_key_ignore_case(parent, sub) {
                            parent.remove(&sub_key);
                        }
                    }
                }
                None => {
                    block.remove(&field_key);
                }
            }
        }
        if block.is_empty() {
            data.remove(&block_key);
        }
    }
    Ok(())
}

/// A manager reference arrives as a bare id string or an object carrying
/// `value` plus optional display fields. Stored form is always an object.
fn normalize_manager(value: &Value) -> ScimResult<Value> {
    match value {
        Value::String(id) => {
            let mut obj = Map::new();
            obj.insert("value".to_string(), Value::String(id.clone()));
            Ok(Value::Object(obj))
        }
        Value::Object(_) => Ok(value.clone()),
        _ => Err(ScimError::validation(
            "manager value must be an id string or a reference object",
        )),
    }
}

/// Interpret a value as a JSON object, accepting a serialized form.
fn value_as_object(value: &Value) -> ScimResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ScimError::validation(
                "value must be a JSON object or a serialized JSON object",
            )),
        },
        _ => Err(ScimError::validation("value must be a JSON object")),
    }
}

/// Normalize a collection payload into element objects. Accepts a single
/// element, an array of elements, or a JSON-serialized form of either; bare
/// scalars wrap into `{"value": ...}`.
fn normalize_elements(value: &Value) -> ScimResult<Vec<Value>> {
    match value {
        Value::Array(items) => {
            let mut elements = Vec::with_capacity(items.len());
            for item in items {
                elements.extend(normalize_elements(item)?);
            }
            Ok(elements)
        }
        Value::Object(_) => Ok(vec![value.clone()]),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => normalize_elements(&parsed),
            _ => {
                let mut obj = Map::new();
                obj.insert("value".to_string(), Value::String(raw.clone()));
                Ok(vec![Value::Object(obj)])
            }
        },
        Value::Null => Ok(Vec::new()),
        other => {
            let mut obj = Map::new();
            obj.insert("value".to_string(), other.clone());
            Ok(vec![Value::Object(obj)])
        }
    }
}

/// Permissive boolean coercion for flag attributes. Returns `None` when the
/// input has no boolean reading; callers leave the stored value unchanged in
/// that case.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(raw) => {
            let raw = raw.trim();
            if raw.eq_ignore_ascii_case("true") || raw == "1" {
                Some(true)
            } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
                Some(false)
            } else {
                None
            }
        }
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}

//! Attribute projection for response shaping.
//!
//! Applies `attributes` / `excludedAttributes` selection to a resource's
//! attribute map before it leaves the core. `id`, `schemas`, and `meta`
//! always survive projection so every response remains a well-formed SCIM
//! resource. Empty collections and nulls are suppressed unconditionally;
//! absence is the wire representation of "no value".

use crate::resource::find_key_ignore_case;
use serde_json::{Map, Value};

/// Attributes every response keeps regardless of projection.
const CORE_ATTRIBUTES: &[&str] = &["id", "schemas", "meta"];

fn is_core(name: &str) -> bool {
    CORE_ATTRIBUTES.iter().any(|c| c.eq_ignore_ascii_case(name))
}

fn name_in(list: &[String], name: &str) -> bool {
    list.iter().any(|l| l.eq_ignore_ascii_case(name))
}

/// Shape a resource for a response.
///
/// With a non-empty `attributes` list only the named attributes (plus core)
/// are kept; `excluded_attributes` then removes what it names. When an
/// attribute appears in both lists the exclusion wins. Names compare
/// case-insensitively against stored keys.
pub fn project(
    data: &mut Map<String, Value>,
    attributes: &[String],
    excluded_attributes: &[String],
) {
    if !attributes.is_empty() {
        data.retain(|key, _| is_core(key) || name_in(attributes, key));
    }
    for name in excluded_attributes {
        if is_core(name) {
            continue;
        }
        if let Some(key) = find_key_ignore_case(data, name) {
            data.remove(&key);
        }
    }
    suppress_empty(data);
}

/// Remove the `members` attribute entirely. Applied to single-Group GET
/// responses, where membership is served through list filtering instead of
/// inline expansion.
pub fn omit_group_members(data: &mut Map<String, Value>) {
    data.remove("members");
}

/// Drop null values and empty arrays; absence stands in for both.
fn suppress_empty(data: &mut Map<String, Value>) {
    data.retain(|_, value| match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        _ => true,
    });
}

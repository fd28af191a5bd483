//! Content-derived resource versions.
//!
//! `meta.version` is computed deterministically from the resource content by
//! SHA-256 hashing, so the same resource state always carries the same
//! version string regardless of which node produced it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque, content-derived version identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceVersion(String);

impl ResourceVersion {
    /// Compute a version from raw content bytes.
    pub fn from_content(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        // 12 bytes of digest is plenty for change detection and keeps the
        // meta.version string short.
        Self(URL_SAFE_NO_PAD.encode(&digest[..12]))
    }

    /// Compute a version for a resource's JSON representation, ignoring any
    /// existing `meta.version` so the hash is stable across restamps.
    pub fn from_resource(data: &Value) -> Self {
        let mut copy = data.clone();
        if let Some(meta) = copy.get_mut("meta").and_then(Value::as_object_mut) {
            meta.remove("version");
        }
        Self::from_content(copy.to_string().as_bytes())
    }

    /// The version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_content_same_version() {
        let a = ResourceVersion::from_content(b"hello");
        let b = ResourceVersion::from_content(b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn different_content_different_version() {
        let a = ResourceVersion::from_content(b"hello");
        let b = ResourceVersion::from_content(b"hello!");
        assert_ne!(a, b);
    }

    #[test]
    fn existing_version_does_not_feed_the_hash() {
        let bare = json!({"id": "u1", "userName": "jdoe"});
        let stamped = json!({
            "id": "u1",
            "userName": "jdoe",
            "meta": {"version": "stale"}
        });
        // Only the version field is ignored; other meta fields do count.
        let with_meta = json!({
            "id": "u1",
            "userName": "jdoe",
            "meta": {}
        });
        assert_eq!(
            ResourceVersion::from_resource(&stamped),
            ResourceVersion::from_resource(&with_meta)
        );
        assert_ne!(
            ResourceVersion::from_resource(&bare),
            ResourceVersion::from_resource(&stamped)
        );
    }
}

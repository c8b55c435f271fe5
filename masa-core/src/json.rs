//! JSON merge patch (RFC 7386) used for settings, theme and legal blobs.

use serde_json::{Map, Value};

/// Apply `patch` onto `target` in place.
///
/// Objects merge recursively, `null` deletes a key, any other value replaces
/// the target. A non-object patch replaces the whole document.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Return `base` with `patch` applied.
pub fn merged(base: &Value, patch: &Value) -> Value {
    let mut out = base.clone();
    merge_patch(&mut out, patch);
    out
}

// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Recursive base+overlay JSON merge used to combine `/etc/config/conf.json`
//! with `/etc/secrets/secrets.json` (the latter wins on conflicts).
//!
//! Semantics:
//! - Both sides objects: recursively merge key by key.
//! - Overlay value is `null`: the base value is preserved ("nil-preserves-base").
//! - Otherwise: the overlay value replaces the base value wholesale (arrays
//!   are replaced, not concatenated).

use serde_json::Value;

/// Recursively merges `overlay` onto `base`, with `overlay` taking
/// precedence except where it is explicitly `null`.
#[must_use]
pub fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                if overlay_value.is_null() {
                    // nil-preserves-base: an explicit null in the overlay
                    // does not delete or blank out the base entry.
                    continue;
                }
                let merged = match base_map.remove(&key) {
                    Some(base_value) => merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base_value, Value::Null) => base_value,
        (_, overlay_value) => overlay_value,
    }
}

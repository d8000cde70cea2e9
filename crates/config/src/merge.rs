use serde_json::Value;

/// Deep-merge `overlay` onto `base`.
///
/// Objects merge key-by-key recursively; any other value in the overlay
/// replaces the base value wholesale. This is the merge used both for
/// cascading rule options across config files and for folding user
/// options over a rule's declared defaults.
#[must_use]
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let entry = match merged.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), entry);
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

//! Reported-properties flattening.
//!
//! The hub reports device state as a hierarchical document of arbitrary
//! nesting depth. The local registry models attributes as a flat string map.
//! Flattening joins nested keys with `#` under the `azureiot` namespace:
//!
//! ```text
//! {"Root2": {"Inner1": {"Inner2": "v"}}}  ->  {"azureiot#Root2#Inner1#Inner2": "v"}
//! ```
//!
//! Nested containers never emit an entry themselves; only leaf scalars do.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Namespace prefix for all flattened attribute keys.
pub const ATTRIBUTE_NAMESPACE: &str = "azureiot";

/// Flat key/value attribute mapping as consumed by the local registry.
pub type FlatAttributeMap = BTreeMap<String, String>;

/// Flatten a hierarchical reported-properties document.
///
/// Keys collide only if the source document repeats a path; the last value
/// written wins rather than raising an error.
#[must_use]
pub fn flatten(properties: &Map<String, Value>) -> FlatAttributeMap {
    let mut attributes = FlatAttributeMap::new();
    for (key, value) in properties {
        flatten_value(&format!("{ATTRIBUTE_NAMESPACE}#{key}"), value, &mut attributes);
    }
    attributes
}

/// Recursively flatten a single value under the given key.
fn flatten_value(key: &str, value: &Value, attributes: &mut FlatAttributeMap) {
    match value {
        Value::Object(children) => {
            for (child_key, child) in children {
                flatten_value(&format!("{key}#{child_key}"), child, attributes);
            }
        }
        Value::String(text) => {
            attributes.insert(key.to_string(), text.clone());
        }
        scalar => {
            attributes.insert(key.to_string(), scalar.to_string());
        }
    }
}

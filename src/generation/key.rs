use serde_json::Value;

const DELIMITER: &str = "::";

/// Build the cache key for a generation (kind + serialized params).
///
/// `serde_json::Map` keeps object keys sorted, so two parameter objects
/// with the same members produce the same key regardless of the order
/// they were built in.
pub fn build_key(kind: &str, params: &Value) -> String {
    format!("{}{}{}", kind, DELIMITER, params)
}

//! Facts are arbitrary JSON values evaluated by rules. Dotted paths resolve
//! into nested objects; a missing segment yields `None`, the distinguished
//! "undefined" the expression evaluator treats as falsy.

use serde_json::{Map, Value};

/// Resolve a dotted path (`"user.role"`) against a facts value. Returns
/// `None` when any segment is missing or an intermediate value is not an
/// object.
pub fn lookup_path<'a>(facts: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = facts;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Shallow-merge one extra fact into `facts`, the new key winning on
/// conflict. Non-object inputs are replaced by a fresh single-key object.
pub fn with_fact(facts: &Value, key: &str, value: Value) -> Value {
    let mut map = match facts {
        Value::Object(m) => m.clone(),
        _ => Map::new(),
    };
    map.insert(key.to_string(), value);
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_lookup() {
        let facts = json!({"user": {"role": "admin", "tags": [1, 2]}});
        assert_eq!(lookup_path(&facts, "user.role"), Some(&json!("admin")));
        assert_eq!(lookup_path(&facts, "user.tags"), Some(&json!([1, 2])));
    }

    #[test]
    fn missing_segment_is_none() {
        let facts = json!({"user": {"role": "admin"}});
        assert_eq!(lookup_path(&facts, "user.email"), None);
        assert_eq!(lookup_path(&facts, "account.id"), None);
    }

    #[test]
    fn traversal_through_scalar_is_none() {
        let facts = json!({"user": "alice"});
        assert_eq!(lookup_path(&facts, "user.role"), None);
    }

    #[test]
    fn with_fact_overwrites() {
        let facts = json!({"score": 10, "llmOutput": "old"});
        let merged = with_fact(&facts, "llmOutput", json!("new"));
        assert_eq!(merged, json!({"score": 10, "llmOutput": "new"}));
        // original untouched
        assert_eq!(facts["llmOutput"], json!("old"));
    }

    #[test]
    fn with_fact_on_non_object() {
        let merged = with_fact(&json!(null), "llmOutput", json!("x"));
        assert_eq!(merged, json!({"llmOutput": "x"}));
    }
}

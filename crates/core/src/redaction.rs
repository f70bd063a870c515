//! Redact sensitive argument values before they reach the audit log.
//!
//! MCP tool arguments can carry secrets (package registry tokens, container
//! env vars passed via `-e KEY=VALUE`, etc.) that must never land in
//! `audit.jsonl` verbatim. This walks a JSON value and masks any object
//! value whose key looks sensitive, recursing into nested objects/arrays so
//! a secret buried in e.g. `{"env": {"API_TOKEN": "..."}}` is still caught.

use serde_json::Value;

const REDACTION_PLACEHOLDER: &str = "****";

const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "password", "secret", "token", "credential", "apikey", "api_key", "authorization",
];

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEY_FRAGMENTS.iter().any(|frag| lower.contains(frag))
}

/// Return a copy of `value` with sensitive object values replaced by a
/// fixed placeholder. Non-object values (top-level strings, arrays of
/// scalars) pass through unchanged — there is no key to judge them by.
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                if is_sensitive_key(key) && val.is_string() {
                    redacted.insert(key.clone(), Value::String(REDACTION_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_json(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_top_level_sensitive_key() {
        let input = json!({"password": "hunter2", "username": "alice"});
        let redacted = redact_json(&input);
        assert_eq!(redacted["password"], "****");
        assert_eq!(redacted["username"], "alice");
    }

    #[test]
    fn redacts_nested_sensitive_key() {
        let input = json!({"env": {"API_TOKEN": "abc123", "PATH": "/bin"}});
        let redacted = redact_json(&input);
        assert_eq!(redacted["env"]["API_TOKEN"], "****");
        assert_eq!(redacted["env"]["PATH"], "/bin");
    }

    #[test]
    fn redacts_within_array_of_objects() {
        let input = json!([{"secret": "s1"}, {"secret": "s2"}]);
        let redacted = redact_json(&input);
        assert_eq!(redacted[0]["secret"], "****");
        assert_eq!(redacted[1]["secret"], "****");
    }

    #[test]
    fn leaves_non_sensitive_values_untouched() {
        let input = json!({"container": "web", "action": "start"});
        let redacted = redact_json(&input);
        assert_eq!(redacted, input);
    }

    #[test]
    fn case_insensitive_key_match() {
        let input = json!({"AuthToken": "xyz"});
        let redacted = redact_json(&input);
        assert_eq!(redacted["AuthToken"], "****");
    }
}

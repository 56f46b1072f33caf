//! Parameter-key casing translation at the provider boundary.
//!
//! LLM parameters are supplied in camelCase (matching the rest of the public
//! API) and translated to whatever casing the target provider expects.
//! Response keys are translated back to camelCase before leaving the
//! adapter.

use serde_json::{Map, Value};

/// Converts `camelCase`/`PascalCase` to `snake_case`.
pub fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Converts `snake_case` to `camelCase`.
pub fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Recursively rewrites every object key in `value` using `convert`.
pub fn rewrite_keys(value: &Value, convert: impl Fn(&str) -> String + Copy) -> Value {
    match value {
        Value::Object(map) => {
            let mut new_map = Map::with_capacity(map.len());
            for (key, val) in map {
                new_map.insert(convert(key), rewrite_keys(val, convert));
            }
            Value::Object(new_map)
        }
        Value::Array(items) => Value::Array(items.iter().map(|item| rewrite_keys(item, convert)).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_roundtrip() {
        assert_eq!(to_snake_case("maxTokens"), "max_tokens");
        assert_eq!(to_camel_case("max_tokens"), "maxTokens");
        assert_eq!(to_camel_case(&to_snake_case("thinkingLevel")), "thinkingLevel");
    }

    #[test]
    fn rewrite_nested_object_keys() {
        let value = serde_json::json!({"topP": 0.9, "nested": {"maxTokens": 10}});
        let rewritten = rewrite_keys(&value, to_snake_case);
        assert_eq!(rewritten["top_p"], 0.9);
        assert_eq!(rewritten["nested"]["max_tokens"], 10);
    }
}

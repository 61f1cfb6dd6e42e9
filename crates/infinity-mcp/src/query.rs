//! Query-string parameter encoding.
//!
//! The Infinity API expects array-valued parameters as indexed bracketed keys
//! (`expand[0]=values&expand[1]=folder`), never as a repeated or comma-joined
//! key. Parameters are kept as an ordered list of pairs so the encoding is
//! deterministic for a given input.

use serde_json::{Map, Value};

/// Ordered query parameters.
pub type QueryParams = Vec<(String, String)>;

/// Encode an array under `key` as `key[0]`, `key[1]`, ...
pub fn indexed_params<S: AsRef<str>>(key: &str, values: &[S]) -> QueryParams {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (format!("{key}[{i}]"), v.as_ref().to_string()))
        .collect()
}

/// Encode `expand` flags.
pub fn expand_params<S: AsRef<str>>(expand: &[S]) -> QueryParams {
    indexed_params("expand", expand)
}

/// Encode a free-form query object passed through from tool arguments.
///
/// Scalars are stringified and `null` is skipped. Arrays and nested objects
/// are flattened into bracketed keys: `sort[0]=name`, `filter[status]=open`,
/// `filter[tags][1]=urgent`.
pub fn encode_query_object(query: &Map<String, Value>) -> QueryParams {
    let mut params = QueryParams::new();
    for (key, value) in query {
        encode_value(key.clone(), value, &mut params);
    }
    params
}

fn encode_value(key: String, value: &Value, params: &mut QueryParams) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                encode_value(format!("{key}[{i}]"), item, params);
            }
        }
        Value::Object(map) => {
            for (field, item) in map {
                encode_value(format!("{key}[{field}]"), item, params);
            }
        }
        Value::String(s) => params.push((key, s.clone())),
        Value::Bool(b) => params.push((key, b.to_string())),
        Value::Number(n) => params.push((key, n.to_string())),
    }
}

/// Append `overrides` to `base`, dropping any `base` entry with the same key.
pub fn merge(base: QueryParams, overrides: QueryParams) -> QueryParams {
    let mut merged: QueryParams = base
        .into_iter()
        .filter(|(k, _)| !overrides.iter().any(|(ok, _)| ok == k))
        .collect();
    merged.extend(overrides);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_expand_produces_exact_key_set() {
        let params = expand_params(&["values", "folder"]);
        let map: HashMap<_, _> = params.into_iter().collect();

        let expected: HashMap<String, String> = [
            ("expand[0]".to_string(), "values".to_string()),
            ("expand[1]".to_string(), "folder".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(map, expected);
    }

    #[test]
    fn test_expand_is_order_preserving_and_stable() {
        let flags = ["created_by", "values.attribute"];
        let first = expand_params(&flags);
        let second = expand_params(&flags);
        assert_eq!(first, second);
        assert_eq!(first[0], ("expand[0]".into(), "created_by".into()));
        assert_eq!(first[1], ("expand[1]".into(), "values.attribute".into()));
    }

    #[test]
    fn test_expand_empty() {
        assert!(expand_params::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_encode_query_object() {
        let query = json!({
            "limit": 50,
            "q": "roadmap",
            "archived": false,
            "cursor": null,
            "sort": ["name", "created_at"],
            "filter": {"status": "open"}
        });

        let params: HashMap<_, _> = encode_query_object(query.as_object().unwrap())
            .into_iter()
            .collect();

        assert_eq!(params["limit"], "50");
        assert_eq!(params["q"], "roadmap");
        assert_eq!(params["archived"], "false");
        assert!(!params.contains_key("cursor"));
        assert_eq!(params["sort[0]"], "name");
        assert_eq!(params["sort[1]"], "created_at");
        assert_eq!(params["filter[status]"], "open");
        assert!(!params.contains_key("filter"));
    }

    #[test]
    fn test_nested_query_uses_bracketed_keys() {
        let query = json!({
            "filter": {
                "status": "open",
                "tags": ["bug", "urgent"],
                "owner": {"id": 12},
                "archived_at": null
            }
        });

        let params: HashMap<_, _> = encode_query_object(query.as_object().unwrap())
            .into_iter()
            .collect();

        let expected: HashMap<String, String> = [
            ("filter[status]", "open"),
            ("filter[tags][0]", "bug"),
            ("filter[tags][1]", "urgent"),
            ("filter[owner][id]", "12"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(params, expected);
    }

    #[test]
    fn test_merge_replaces_same_keys() {
        let base = vec![
            ("expand[0]".to_string(), "stale".to_string()),
            ("limit".to_string(), "10".to_string()),
        ];
        let merged = merge(base, expand_params(&["values"]));
        assert_eq!(
            merged,
            vec![
                ("limit".to_string(), "10".to_string()),
                ("expand[0]".to_string(), "values".to_string()),
            ]
        );
    }
}

//! End-of-pagination detection.
//!
//! The listing endpoints have no cursor or total count. A page whose results
//! list is absent, `null`, or empty means there is nothing after it.

use serde_json::Value;

/// Counts the entries of the results list found by following `path` through
/// nested JSON objects.
///
/// Returns `Some(0)` when a key along the path is missing or `null`, and
/// `None` when the body has the wrong shape: a non-object where an object is
/// expected, or a non-list at the end of the path.
#[must_use]
pub fn result_count(body: &Value, path: &[String]) -> Option<usize> {
    let mut node = body;
    for key in path {
        match node {
            Value::Object(map) => match map.get(key) {
                Some(Value::Null) | None => return Some(0),
                Some(next) => node = next,
            },
            _ => return None,
        }
    }

    match node {
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn results_path() -> Vec<String> {
        vec!["data".to_owned(), "finalResult".to_owned()]
    }

    #[test]
    fn counts_results_list() {
        let body = json!({"data": {"finalResult": [{"id": 1}, {"id": 2}]}});
        assert_eq!(result_count(&body, &results_path()), Some(2));
    }

    #[test]
    fn empty_list_is_zero() {
        let body = json!({"data": {"finalResult": []}});
        assert_eq!(result_count(&body, &results_path()), Some(0));
    }

    #[test]
    fn missing_key_is_zero() {
        assert_eq!(result_count(&json!({"data": {}}), &results_path()), Some(0));
        assert_eq!(result_count(&json!({}), &results_path()), Some(0));
    }

    #[test]
    fn null_value_is_zero() {
        let body = json!({"data": null});
        assert_eq!(result_count(&body, &results_path()), Some(0));
    }

    #[test]
    fn non_object_intermediate_is_malformed() {
        let body = json!({"data": ["unexpected"]});
        assert_eq!(result_count(&body, &results_path()), None);
        assert_eq!(result_count(&json!([1, 2]), &results_path()), None);
    }

    #[test]
    fn non_list_results_is_malformed() {
        let body = json!({"data": {"finalResult": {"id": 1}}});
        assert_eq!(result_count(&body, &results_path()), None);
    }
}

//! Path resolution - addresses values inside arbitrary nested trees.
//!
//! Paths are slash-delimited. Empty segments are skipped, a `*` segment
//! maps the rest of the path over every element of a sequence, numeric
//! segments index into sequences, and any other segment is a key lookup.

use serde_json::Value;

use crate::diagnostics::{Diagnostics, NoopDiagnostics};
use crate::error::MappingError;

/// Segment that expands a sequence into per-element resolution.
pub const WILDCARD: &str = "*";

/// Resolve `path` against `tree`.
///
/// Returns `Ok(None)` when the path does not lead anywhere (explicit nulls
/// count as absent).
///
/// # Errors
///
/// Returns `MappingError::Path` if a `*` segment meets a non-sequence.
///
/// # Example
///
/// ```
/// use json_mapping::resolve;
/// use serde_json::json;
///
/// let tree = json!({"a": [{"b": 1}, {"b": 2}]});
/// assert_eq!(resolve(&tree, "a/*/b").unwrap(), Some(json!([1, 2])));
/// assert_eq!(resolve(&tree, "a/5").unwrap(), None);
/// ```
pub fn resolve(tree: &Value, path: &str) -> Result<Option<Value>, MappingError> {
    resolve_with_diagnostics(tree, path, &NoopDiagnostics)
}

/// Like [`resolve`], reporting resolution misses to `diagnostics`.
pub fn resolve_with_diagnostics(
    tree: &Value,
    path: &str,
    diagnostics: &dyn Diagnostics,
) -> Result<Option<Value>, MappingError> {
    let parts: Vec<&str> = path.split('/').collect();
    let mut current = Some(tree);

    for (idx, part) in parts.iter().enumerate() {
        let Some(value) = current.filter(|v| !v.is_null()) else {
            diagnostics.warn(&format!("could not find {} in input", path));
            current = None;
            break;
        };

        if *part == WILDCARD {
            let Value::Array(items) = value else {
                return Err(MappingError::Path {
                    prefix: parts[..idx].join("/"),
                    path: path.to_string(),
                });
            };
            let rest = parts[idx + 1..].join("/");
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                let found = resolve_with_diagnostics(item, &rest, diagnostics)?;
                resolved.push(found.unwrap_or(Value::Null));
            }
            return Ok(Some(Value::Array(resolved)));
        }

        if part.is_empty() {
            continue;
        }

        current = match value {
            Value::Array(items) => match part.parse::<usize>() {
                Ok(index) if index < items.len() => Some(&items[index]),
                _ => {
                    diagnostics.warn(&format!(
                        "index {} went out of bounds while resolving {}",
                        part, path
                    ));
                    None
                }
            },
            Value::Object(map) => map.get(*part),
            _ => None,
        };
    }

    Ok(current.filter(|v| !v.is_null()).cloned())
}

/// Require a path-like schema value to be a string.
///
/// # Errors
///
/// Returns `MappingError::Argument` naming the actual type otherwise.
pub fn expect_path(value: &Value) -> Result<&str, MappingError> {
    value.as_str().ok_or_else(|| {
        MappingError::argument(format!(
            "path must be string, not {}",
            crate::types::json_type_name(value)
        ))
    })
}

/// True when the last segment of `path` is the wildcard.
pub(crate) fn ends_with_wildcard(path: &str) -> bool {
    path.rsplit('/').next() == Some(WILDCARD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::testing::RecordingDiagnostics;
    use serde_json::json;

    #[test]
    fn resolves_nested_keys() {
        let tree = json!({"user": {"id": "42"}});
        assert_eq!(resolve(&tree, "user/id").unwrap(), Some(json!("42")));
    }

    #[test]
    fn wildcard_expands_over_elements() {
        let tree = json!({"a": [{"b": 1}, {"b": 2}]});
        assert_eq!(resolve(&tree, "a/*/b").unwrap(), Some(json!([1, 2])));
    }

    #[test]
    fn wildcard_keeps_missing_elements_as_null() {
        let tree = json!({"a": [{"b": 1}, {"c": 2}]});
        assert_eq!(resolve(&tree, "a/*/b").unwrap(), Some(json!([1, null])));
    }

    #[test]
    fn nested_wildcards_produce_nested_sequences() {
        let tree = json!({"a": [{"b": [1, 2]}, {"b": [3]}]});
        assert_eq!(resolve(&tree, "a/*/b/*").unwrap(), Some(json!([[1, 2], [3]])));
    }

    #[test]
    fn wildcard_on_mapping_is_path_error() {
        let tree = json!({"a": {"b": 1}});
        let result = resolve(&tree, "a/*");
        assert!(matches!(
            result,
            Err(MappingError::Path { ref prefix, .. }) if prefix == "a"
        ));
    }

    #[test]
    fn out_of_range_index_is_absent_and_warns() {
        let tree = json!({"a": [1]});
        let diagnostics = RecordingDiagnostics::default();
        let result = resolve_with_diagnostics(&tree, "a/5", &diagnostics).unwrap();
        assert_eq!(result, None);
        assert_eq!(diagnostics.messages().len(), 1);
        assert!(diagnostics.messages()[0].contains("out of bounds"));
    }

    #[test]
    fn numeric_segment_indexes_sequences() {
        let tree = json!({"a": [10, 20]});
        assert_eq!(resolve(&tree, "a/1").unwrap(), Some(json!(20)));
    }

    #[test]
    fn empty_segments_are_skipped() {
        let tree = json!({"a": {"b": 1}});
        assert_eq!(resolve(&tree, "/a//b/").unwrap(), Some(json!(1)));
        assert_eq!(resolve(&tree, "").unwrap(), Some(tree.clone()));
    }

    #[test]
    fn missing_intermediate_stops_with_warning() {
        let tree = json!({"a": {}});
        let diagnostics = RecordingDiagnostics::default();
        let result = resolve_with_diagnostics(&tree, "a/b/c", &diagnostics).unwrap();
        assert_eq!(result, None);
        assert_eq!(diagnostics.messages(), vec!["could not find a/b/c in input"]);
    }

    #[test]
    fn explicit_null_is_absent() {
        let tree = json!({"a": null});
        assert_eq!(resolve(&tree, "a").unwrap(), None);
    }

    #[test]
    fn resolution_does_not_mutate_input() {
        let tree = json!({"a": [[1], [2]]});
        let before = tree.clone();
        let first = resolve(&tree, "a").unwrap();
        let second = resolve(&tree, "a").unwrap();
        assert_eq!(first, second);
        assert_eq!(tree, before);
    }

    #[test]
    fn expect_path_rejects_non_strings() {
        assert_eq!(expect_path(&json!("a/b")).unwrap(), "a/b");
        assert!(matches!(
            expect_path(&json!(5)),
            Err(MappingError::Argument { .. })
        ));
    }

    #[test]
    fn wildcard_suffix_detection() {
        assert!(ends_with_wildcard("items/*"));
        assert!(ends_with_wildcard("*"));
        assert!(!ends_with_wildcard("items"));
        assert!(!ends_with_wildcard("items/*/name"));
    }
}

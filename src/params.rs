//! Placeholder substitution in schema-supplied string templates.
//!
//! Templates reference parameters as `[%name%]`. Values are lowercased on
//! substitution.

use std::collections::BTreeMap;

use serde_json::Value;

/// Placeholder name to value, threaded through recursive mapping calls.
pub type Parameters = BTreeMap<String, String>;

const OPEN: &str = "[%";
const CLOSE: &str = "%]";

/// Replace every known `[%key%]` in `template` with its lowercased value.
///
/// Substitution is a single pass over the original template, so text
/// inserted for one placeholder is never scanned for another. Unknown
/// placeholders are left as written.
///
/// ```
/// use json_mapping::{substitute, Parameters};
///
/// let mut params = Parameters::new();
/// params.insert("key_name".into(), "Email".into());
/// assert_eq!(substitute("contact_[%key_name%]", &params), "contact_email");
/// ```
pub fn substitute(template: &str, parameters: &Parameters) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        let key = &after_open[..end];
        out.push_str(&rest[..start]);
        match parameters.get(key) {
            Some(value) => out.push_str(&value.to_lowercase()),
            None => {
                out.push_str(OPEN);
                out.push_str(key);
                out.push_str(CLOSE);
            }
        }
        rest = &after_open[end + CLOSE.len()..];
    }

    out.push_str(rest);
    out
}

/// Parametrize an optional schema value.
///
/// Absent stays absent; non-strings and empty parameter sets pass through.
pub fn parametrize(template: Option<Value>, parameters: &Parameters) -> Option<Value> {
    match template {
        Some(Value::String(s)) if !parameters.is_empty() => {
            Some(Value::String(substitute(&s, parameters)))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_and_lowercases() {
        let p = params(&[("key_name", "Phone")]);
        assert_eq!(substitute("[%key_name%]", &p), "phone");
        assert_eq!(substitute("a-[%key_name%]-[%key_name%]", &p), "a-phone-phone");
    }

    #[test]
    fn every_parameter_applies() {
        let p = params(&[("a", "X"), ("b", "Y")]);
        assert_eq!(substitute("[%a%]/[%b%]", &p), "x/y");
    }

    #[test]
    fn inserted_text_is_not_rescanned() {
        let p = params(&[("a", "[%b%]"), ("b", "boom")]);
        assert_eq!(substitute("[%a%]", &p), "[%b%]");
    }

    #[test]
    fn unknown_and_unterminated_placeholders_survive() {
        let p = params(&[("a", "x")]);
        assert_eq!(substitute("[%z%] [%a%]", &p), "[%z%] x");
        assert_eq!(substitute("[%a%] [%a", &p), "x [%a");
    }

    #[test]
    fn parametrize_passes_through() {
        let p = params(&[("a", "x")]);
        assert_eq!(parametrize(None, &p), None);
        assert_eq!(parametrize(Some(json!(3)), &p), Some(json!(3)));
        assert_eq!(
            parametrize(Some(json!("[%a%]")), &Parameters::new()),
            Some(json!("[%a%]"))
        );
        assert_eq!(parametrize(Some(json!("[%a%]")), &p), Some(json!("x")));
    }
}

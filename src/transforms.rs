//! Transform pipeline - named, chainable value-to-value functions.
//!
//! A transform spec is a string or a sequence of strings, each of the form
//! `name` or `name|param1|param2`. Steps run left to right, each receiving
//! the previous step's output.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::TransformError;
use crate::types::{dedup_values, is_blank, json_type_name, value_to_text};

/// A value transformation with string parameters.
pub trait Transform: Send + Sync {
    fn apply(&self, value: Value, params: &[&str]) -> Result<Value, TransformError>;
}

impl<F> Transform for F
where
    F: Fn(Value, &[&str]) -> Result<Value, TransformError> + Send + Sync,
{
    fn apply(&self, value: Value, params: &[&str]) -> Result<Value, TransformError> {
        self(value, params)
    }
}

/// One `name|param|...` step of a transform spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformStep {
    pub name: String,
    pub params: Vec<String>,
}

impl TransformStep {
    /// Split `name|param1|param2` into its parts.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split('|');
        let name = parts.next().unwrap_or_default().to_string();
        Self {
            name,
            params: parts.map(String::from).collect(),
        }
    }
}

/// Ordered chain of transform steps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransformSpec {
    pub steps: Vec<TransformStep>,
}

impl TransformSpec {
    pub fn parse<'a, I>(raw: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            steps: raw.into_iter().map(TransformStep::parse).collect(),
        }
    }
}

/// Names of the transforms available without caller registration.
pub const DEFAULT_TRANSFORMS: &[&str] = &[
    "to_array",
    "downcase",
    "upcase",
    "to_hash",
    "first_array_value",
    "last_array_value",
    "max_array_value",
    "max_datetime_array_value",
    "max_datatime_array_value",
    "uniq_array",
    "array_size",
    "hashes_array_filter",
    "hash_value",
    "hash_values",
    "hash_keys",
    "array_select_regex",
    "json_parse",
];

/// Name to implementation lookup for transforms.
#[derive(Clone)]
pub struct TransformRegistry {
    transforms: HashMap<String, Arc<dyn Transform>>,
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.transforms.keys().collect();
        names.sort();
        f.debug_struct("TransformRegistry")
            .field("transforms", &names)
            .finish()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        let mut registry = Self {
            transforms: HashMap::new(),
        };
        registry.register("to_array", to_array);
        registry.register("downcase", downcase);
        registry.register("upcase", upcase);
        registry.register("to_hash", to_hash);
        registry.register("first_array_value", first_array_value);
        registry.register("last_array_value", last_array_value);
        registry.register("max_array_value", max_array_value);
        registry.register("max_datetime_array_value", max_datetime_array_value);
        registry.register("max_datatime_array_value", max_datetime_array_value);
        registry.register("uniq_array", uniq_array);
        registry.register("array_size", array_size);
        registry.register("hashes_array_filter", hashes_array_filter);
        registry.register("hash_value", hash_value);
        registry.register("hash_values", hash_values);
        registry.register("hash_keys", hash_keys);
        registry.register("array_select_regex", array_select_regex);
        registry.register("json_parse", json_parse);
        registry
    }
}

impl TransformRegistry {
    /// Register (or replace) a transform under `name`.
    pub fn register<T>(&mut self, name: impl Into<String>, transform: T)
    where
        T: Transform + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(transform));
    }

    pub(crate) fn insert(&mut self, name: String, transform: Arc<dyn Transform>) {
        self.transforms.insert(name, transform);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Fold `value` through every step of `spec`, left to right.
    ///
    /// # Errors
    ///
    /// `TransformError::Unknown` for an unregistered step name, or the
    /// first error raised by a step.
    pub fn apply(&self, value: Value, spec: &TransformSpec) -> Result<Value, TransformError> {
        let mut value = value;
        for step in &spec.steps {
            let transform =
                self.transforms
                    .get(&step.name)
                    .ok_or_else(|| TransformError::Unknown {
                        name: step.name.clone(),
                    })?;
            let params: Vec<&str> = step.params.iter().map(String::as_str).collect();
            value = transform.apply(value, &params)?;
        }
        Ok(value)
    }

    /// Apply an optional spec; absent specs leave the value unchanged.
    pub fn apply_optional(
        &self,
        value: Value,
        spec: Option<&TransformSpec>,
    ) -> Result<Value, TransformError> {
        match spec {
            Some(spec) => self.apply(value, spec),
            None => Ok(value),
        }
    }
}

fn expect_params(name: &str, params: &[&str], count: usize) -> Result<(), TransformError> {
    if params.len() == count {
        Ok(())
    } else {
        Err(TransformError::InvalidArguments {
            name: name.to_string(),
            message: format!("expected {} parameter(s), got {}", count, params.len()),
        })
    }
}

fn wrap(value: Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    }
}

fn to_array(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("to_array", params, 0)?;
    let items = dedup_values(wrap(value))
        .into_iter()
        .filter(|v| !v.is_null())
        .collect();
    Ok(Value::Array(items))
}

fn to_hash(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("to_hash", params, 0)?;
    let mut hash = Map::new();
    for item in dedup_values(wrap(value)) {
        let Value::Object(mut entry) = item else {
            continue;
        };
        let key = match entry.remove("key") {
            None | Some(Value::Null) => continue,
            Some(key) => value_to_text(&key),
        };
        hash.insert(key, entry.remove("value").unwrap_or(Value::Null));
    }
    Ok(Value::Object(hash))
}

fn downcase(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("downcase", params, 0)?;
    Ok(Value::String(value_to_text(&value).to_lowercase()))
}

fn upcase(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("upcase", params, 0)?;
    Ok(Value::String(value_to_text(&value).to_uppercase()))
}

fn first_array_value(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("first_array_value", params, 0)?;
    Ok(match value {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    })
}

fn last_array_value(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("last_array_value", params, 0)?;
    Ok(match value {
        Value::Array(items) => items.into_iter().last().unwrap_or(Value::Null),
        other => other,
    })
}

fn uniq_array(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("uniq_array", params, 0)?;
    Ok(match value {
        Value::Array(items) => Value::Array(dedup_values(items)),
        other => other,
    })
}

fn array_size(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("array_size", params, 0)?;
    Ok(match value {
        Value::Array(items) => Value::from(items.len()),
        _ => Value::from(0),
    })
}

fn hash_value(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("hash_value", params, 1)?;
    Ok(match value {
        Value::Object(mut map) => map.remove(params[0]).unwrap_or(Value::Null),
        other => other,
    })
}

fn hash_values(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("hash_values", params, 0)?;
    Ok(match value {
        Value::Object(map) => Value::Array(map.into_iter().map(|(_, v)| v).collect()),
        other => other,
    })
}

fn hash_keys(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("hash_keys", params, 0)?;
    Ok(match value {
        Value::Object(map) => {
            Value::Array(map.into_iter().map(|(k, _)| Value::String(k)).collect())
        }
        other => other,
    })
}

fn max_array_value(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("max_array_value", params, 0)?;
    let Value::Array(items) = value else {
        return Ok(value);
    };
    if items.is_empty() {
        return Ok(Value::Null);
    }

    if items.iter().all(Value::is_number) {
        let max = items.into_iter().fold(None::<Value>, |best, item| match best {
            Some(b) if b.as_f64() >= item.as_f64() => Some(b),
            _ => Some(item),
        });
        return Ok(max.unwrap_or(Value::Null));
    }

    if items.iter().all(Value::is_string) {
        let max = items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .max();
        return Ok(max.map(Value::String).unwrap_or(Value::Null));
    }

    Err(TransformError::Failed {
        name: "max_array_value".to_string(),
        message: "array mixes values that cannot be compared".to_string(),
    })
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

fn max_datetime_array_value(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("max_datetime_array_value", params, 0)?;
    let Value::Array(items) = value else {
        return Ok(value);
    };

    let mut latest: Option<DateTime<Utc>> = None;
    for item in &items {
        let parsed = item.as_str().and_then(parse_datetime).ok_or_else(|| {
            TransformError::Failed {
                name: "max_datetime_array_value".to_string(),
                message: format!("cannot parse {} as a date", item),
            }
        })?;
        if latest.map_or(true, |current| parsed > current) {
            latest = Some(parsed);
        }
    }
    Ok(latest
        .map(|dt| Value::String(dt.to_rfc3339()))
        .unwrap_or(Value::Null))
}

fn hashes_array_filter(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("hashes_array_filter", params, 2)?;
    let Value::Array(items) = value else {
        return Ok(value);
    };
    let keys: Vec<&str> = params[0].split('*').collect();
    let expected = Value::String(params[1].to_string());

    let selected = items
        .into_iter()
        .filter(|item| {
            let found = keys
                .iter()
                .try_fold(item, |current, key| current.get(*key));
            found == Some(&expected)
        })
        .collect();
    Ok(Value::Array(selected))
}

fn array_select_regex(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("array_select_regex", params, 1)?;
    let regex = Regex::new(params[0]).map_err(|e| TransformError::InvalidArguments {
        name: "array_select_regex".to_string(),
        message: e.to_string(),
    })?;
    let Value::Array(items) = value else {
        return Ok(Value::Array(Vec::new()));
    };
    Ok(Value::Array(
        items
            .into_iter()
            .filter(|item| regex.is_match(&value_to_text(item)))
            .collect(),
    ))
}

fn json_parse(value: Value, params: &[&str]) -> Result<Value, TransformError> {
    expect_params("json_parse", params, 0)?;
    if is_blank(&value) {
        return Ok(Value::Object(Map::new()));
    }
    match value {
        Value::String(raw) => Ok(serde_json::from_str(&raw).unwrap_or(Value::String(raw))),
        other => {
            tracing::debug!(
                "json_parse received {}, passing through",
                json_type_name(&other)
            );
            Ok(other)
        }
    }
}

//! Core types and value helpers shared by the resolver, conditions, and
//! node handlers.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::conditions::{Condition, ConditionFactory};
use crate::diagnostics::Diagnostics;
use crate::error::ConditionError;
use crate::transforms::Transform;

/// Top-level key whose value replaces the whole result when present.
pub const UNWRAP_KEY: &str = "unwrap";

/// Parameter injected by `items_all` for every iterated key.
pub const KEY_NAME_PARAM: &str = "key_name";

/// Maximum number of characters of a key exposed through `key_name`.
pub const KEY_NAME_MAX_CHARS: usize = 50;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A value that is either a single element or a sequence of elements.
///
/// Remembers which shape it came from so that "coerce to a sequence,
/// operate, collapse back" can be expressed once.
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany {
    One(Value),
    Many(Vec<Value>),
}

impl OneOrMany {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => OneOrMany::Many(items),
            other => OneOrMany::One(other),
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }

    /// Uniform view as a sequence of candidates.
    pub fn into_vec(self) -> Vec<Value> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(items) => items,
        }
    }

    /// Rebuild from filtered candidates, keeping the original shape when
    /// exactly one element survived a single-value input.
    pub fn collapse(was_many: bool, mut items: Vec<Value>) -> Value {
        if !was_many && items.len() == 1 {
            items.pop().unwrap_or(Value::Null)
        } else {
            Value::Array(items)
        }
    }
}

/// Coerce an optional default into a sequence (absent becomes empty).
pub fn default_sequence(default: Option<&Value>) -> Value {
    match default {
        None | Some(Value::Null) => Value::Array(Vec::new()),
        Some(Value::Array(items)) => Value::Array(items.clone()),
        Some(other) => Value::Array(vec![other.clone()]),
    }
}

/// Null, false, whitespace-only strings, and empty collections are blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Render a value as plain text: strings unquoted, null empty.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Remove duplicates, keeping the first occurrence of each element.
pub fn dedup_values(items: Vec<Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

/// Deep copy of `value` with every mapping key lowercased.
pub fn normalize_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut normalized = Map::new();
            for (key, child) in map {
                normalized.insert(key.to_lowercase(), normalize_keys(child));
            }
            Value::Object(normalized)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize_keys).collect()),
        other => other.clone(),
    }
}

/// Construction-time configuration for a mapping engine.
///
/// Caller-supplied transforms and condition classes take precedence over
/// the built-in ones with the same name.
#[derive(Clone, Default)]
pub struct MappingOptions {
    pub(crate) transforms: Vec<(String, Arc<dyn Transform>)>,
    pub(crate) condition_classes: Vec<(String, ConditionFactory)>,
    pub(crate) diagnostics: Option<Arc<dyn Diagnostics>>,
}

impl fmt::Debug for MappingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transforms: Vec<&str> = self.transforms.iter().map(|(n, _)| n.as_str()).collect();
        let classes: Vec<&str> = self
            .condition_classes
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        f.debug_struct("MappingOptions")
            .field("transforms", &transforms)
            .field("condition_classes", &classes)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

impl MappingOptions {
    /// Options with only the built-in transforms and condition classes,
    /// and warnings discarded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or override a transform by name.
    pub fn with_transform<T>(mut self, name: impl Into<String>, transform: T) -> Self
    where
        T: Transform + 'static,
    {
        self.transforms.push((name.into(), Arc::new(transform)));
        self
    }

    /// Add or override a condition class by name.
    pub fn with_condition_class<F>(mut self, class: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<Box<dyn Condition>, ConditionError> + Send + Sync + 'static,
    {
        self.condition_classes.push((class.into(), Arc::new(factory)));
        self
    }

    /// Route non-fatal warnings to `diagnostics`.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }
}

//! Limitation whitelists applied to assembled attribute sets.

use serde_json::{Map, Value};

/// Reference from an attribute name to a named limitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitSpec {
    pub attribute: String,
    pub limitation: String,
}

/// Named whitelists declared under `limitations` in the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Limitations {
    table: Map<String, Value>,
}

impl Limitations {
    pub fn new(table: Map<String, Value>) -> Self {
        Self { table }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn contains(&self, limitation: &str) -> bool {
        self.table.contains_key(limitation)
    }

    /// True when `attributes` must be rejected.
    ///
    /// An attribute only limits when it is present and its limitation is a
    /// sequence that does not contain the value. Unknown limitation names
    /// never reject.
    pub fn is_limited(&self, attributes: &Map<String, Value>, limits: &[LimitSpec]) -> bool {
        if self.table.is_empty() || limits.is_empty() {
            return false;
        }

        limits.iter().any(|limit| {
            let Some(value) = attributes
                .get(&limit.attribute)
                .filter(|v| !matches!(v, Value::Null | Value::Bool(false)))
            else {
                return false;
            };
            match self.table.get(&limit.limitation) {
                Some(Value::Array(allowed)) => !allowed.contains(value),
                _ => false,
            }
        })
    }
}

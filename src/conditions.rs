//! Named predicates used to filter and remap values during mapping.
//!
//! A mapping document declares conditions by name, each built from a class
//! and a predicate value:
//!
//! ```yaml
//! conditions:
//!   is_active:
//!     class: Equals
//!     predicate: active
//! ```
//!
//! Schema nodes then reference them by name, optionally extracting a field
//! from each candidate first and optionally replacing matches with a fixed
//! `output`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::diagnostics::Diagnostics;
use crate::error::{ConditionError, MappingError};
use crate::path::resolve_with_diagnostics;
use crate::types::{is_blank, json_type_name, value_to_text, OneOrMany};

/// A predicate evaluable against one value.
pub trait Condition: Send + Sync {
    fn apply(&self, value: &Value) -> bool;
}

/// Builds a condition from the `predicate` value of its definition.
pub type ConditionFactory =
    Arc<dyn Fn(&Value) -> Result<Box<dyn Condition>, ConditionError> + Send + Sync>;

/// Reference to a named condition from a schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSpec {
    pub name: String,
    /// Sub-path resolved against each candidate before the predicate runs.
    pub field: Option<String>,
    /// Replaces the surviving value(s) when the condition matches.
    pub output: Option<Value>,
}

/// Class definition of a named condition as written in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionDef {
    pub class: String,
    pub predicate: Value,
}

/// Registry of condition classes, keyed by class name.
#[derive(Clone)]
pub struct ConditionClasses {
    factories: HashMap<String, ConditionFactory>,
}

impl fmt::Debug for ConditionClasses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ConditionClasses")
            .field("classes", &names)
            .finish()
    }
}

impl Default for ConditionClasses {
    fn default() -> Self {
        let mut classes = Self {
            factories: HashMap::new(),
        };
        classes.register("Equals", |p: &Value| {
            Ok(Box::new(Equals(p.clone())) as Box<dyn Condition>)
        });
        classes.register("NotEquals", |p: &Value| {
            Ok(Box::new(NotEquals(p.clone())) as Box<dyn Condition>)
        });
        classes.register("OneOf", |p: &Value| {
            Ok(Box::new(OneOf(expect_array("OneOf", p)?)) as Box<dyn Condition>)
        });
        classes.register("NoneOf", |p: &Value| {
            Ok(Box::new(NoneOf(expect_array("NoneOf", p)?)) as Box<dyn Condition>)
        });
        classes.register("Matches", |p: &Value| {
            let pattern = p.as_str().ok_or_else(|| ConditionError::InvalidPredicate {
                class: "Matches".into(),
                message: format!("expected regex string, got {}", json_type_name(p)),
            })?;
            let regex = Regex::new(pattern).map_err(|e| ConditionError::InvalidPredicate {
                class: "Matches".into(),
                message: e.to_string(),
            })?;
            Ok(Box::new(Matches(regex)) as Box<dyn Condition>)
        });
        classes.register("Present", |_: &Value| {
            Ok(Box::new(Present) as Box<dyn Condition>)
        });
        classes.register("Blank", |_: &Value| Ok(Box::new(Blank) as Box<dyn Condition>));
        classes
    }
}

impl ConditionClasses {
    /// Register (or replace) a condition class.
    pub fn register<F>(&mut self, class: impl Into<String>, factory: F)
    where
        F: Fn(&Value) -> Result<Box<dyn Condition>, ConditionError> + Send + Sync + 'static,
    {
        self.factories.insert(class.into(), Arc::new(factory));
    }

    pub(crate) fn insert(&mut self, class: String, factory: ConditionFactory) {
        self.factories.insert(class, factory);
    }

    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    /// Construct a condition from its definition.
    ///
    /// # Errors
    ///
    /// `ConditionError::UnknownClass` if the class isn't registered, or
    /// whatever the class factory reports for a bad predicate.
    pub fn build(&self, def: &ConditionDef) -> Result<Box<dyn Condition>, ConditionError> {
        let factory = self
            .factories
            .get(&def.class)
            .ok_or_else(|| ConditionError::UnknownClass {
                class: def.class.clone(),
            })?;
        factory(&def.predicate)
    }
}

/// Instantiated named conditions of one mapping document.
#[derive(Default)]
pub struct ConditionSet {
    conditions: HashMap<String, Box<dyn Condition>>,
}

impl fmt::Debug for ConditionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.conditions.keys().collect();
        names.sort();
        f.debug_struct("ConditionSet").field("names", &names).finish()
    }
}

impl ConditionSet {
    /// Build every named definition through `classes`.
    ///
    /// # Errors
    ///
    /// Returns the first construction error.
    pub fn build<'a, I>(defs: I, classes: &ConditionClasses) -> Result<Self, ConditionError>
    where
        I: IntoIterator<Item = (&'a String, &'a ConditionDef)>,
    {
        let mut conditions = HashMap::new();
        for (name, def) in defs {
            conditions.insert(name.clone(), classes.build(def)?);
        }
        Ok(Self { conditions })
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Filter `value` through each condition spec in order.
    ///
    /// Returns `None` when nothing matched, the single contribution when
    /// exactly one condition matched, and a sequence of contributions
    /// otherwise.
    ///
    /// # Errors
    ///
    /// `ConditionError::Unknown` for an unregistered name, or a path
    /// error from resolving a `field`.
    pub fn apply(
        &self,
        value: &Value,
        specs: &[ConditionSpec],
        diagnostics: &dyn Diagnostics,
    ) -> Result<Option<Value>, MappingError> {
        let candidates = OneOrMany::from_value(value.clone());
        let was_many = candidates.is_many();
        let candidates = candidates.into_vec();
        let mut contributions = Vec::new();

        for spec in specs {
            let condition =
                self.conditions
                    .get(&spec.name)
                    .ok_or_else(|| ConditionError::Unknown {
                        name: spec.name.clone(),
                    })?;

            let mut matched = Vec::new();
            for candidate in &candidates {
                let subject = match &spec.field {
                    Some(field) => resolve_with_diagnostics(candidate, field, diagnostics)?
                        .unwrap_or(Value::Null),
                    None => candidate.clone(),
                };
                if condition.apply(&subject) {
                    matched.push(candidate.clone());
                }
            }

            if matched.is_empty() {
                continue;
            }

            match &spec.output {
                Some(output) => contributions.push(output.clone()),
                None => contributions.push(OneOrMany::collapse(was_many, matched)),
            }
        }

        Ok(match contributions.len() {
            0 => None,
            1 => contributions.pop(),
            _ => Some(Value::Array(contributions)),
        })
    }
}

fn expect_array(class: &str, predicate: &Value) -> Result<Vec<Value>, ConditionError> {
    match predicate {
        Value::Array(items) => Ok(items.clone()),
        other => Err(ConditionError::InvalidPredicate {
            class: class.to_string(),
            message: format!("expected array, got {}", json_type_name(other)),
        }),
    }
}

// --- Built-in condition classes ---

struct Equals(Value);

impl Condition for Equals {
    fn apply(&self, value: &Value) -> bool {
        *value == self.0
    }
}

struct NotEquals(Value);

impl Condition for NotEquals {
    fn apply(&self, value: &Value) -> bool {
        *value != self.0
    }
}

struct OneOf(Vec<Value>);

impl Condition for OneOf {
    fn apply(&self, value: &Value) -> bool {
        self.0.contains(value)
    }
}

struct NoneOf(Vec<Value>);

impl Condition for NoneOf {
    fn apply(&self, value: &Value) -> bool {
        !self.0.contains(value)
    }
}

struct Matches(Regex);

impl Condition for Matches {
    fn apply(&self, value: &Value) -> bool {
        self.0.is_match(&value_to_text(value))
    }
}

struct Present;

impl Condition for Present {
    fn apply(&self, value: &Value) -> bool {
        !is_blank(value)
    }
}

struct Blank;

impl Condition for Blank {
    fn apply(&self, value: &Value) -> bool {
        is_blank(value)
    }
}

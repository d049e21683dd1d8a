//! Typed form of a mapping document.
//!
//! The document arrives as a generic tree (parsed JSON or YAML). Loading
//! decides each node's kind once, from the single discriminator key it
//! carries, and checks field shapes so traversal never re-inspects them.
//!
//! | Discriminator | Kind |
//! |---------------|------|
//! | (none) | plain value at `path` |
//! | `attributes` | object (or objects) built from the candidates at `path` |
//! | `nested` | purely compositional object |
//! | `items` | flat list of objects, one per group per candidate |
//! | `items_all` | like `items`, iterating every key of the object at `path` |
//! | `hash` | one object merged across all candidates |
//! | `array` | flattened, deduplicated values of literal item schemas |
//! | `hash_array` | per-key grouping of values across candidates |
//! | `merge_arrays` | concatenation of several paths |

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::conditions::{ConditionDef, ConditionSpec};
use crate::error::MappingError;
use crate::limits::{LimitSpec, Limitations};
use crate::path::expect_path;
use crate::transforms::TransformSpec;
use crate::types::json_type_name;

/// Keys that select a node's kind. At most one may be present.
pub const DISCRIMINATORS: &[&str] = &[
    "attributes",
    "nested",
    "items",
    "items_all",
    "hash",
    "array",
    "hash_array",
    "merge_arrays",
];

/// A fully loaded mapping document.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingDocument {
    pub conditions: BTreeMap<String, ConditionDef>,
    pub limitations: Limitations,
    pub objects: Vec<SchemaNode>,
}

/// One declarative mapping instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Output key. Empty for unnamed `array` elements.
    pub name: String,
    pub kind: NodeKind,
    pub transform: Option<TransformSpec>,
    /// `Some(vec![])` is kept distinct from `None`: an empty condition list
    /// never matches.
    pub conditions: Option<Vec<ConditionSpec>>,
    pub limits: Vec<LimitSpec>,
    pub default: Option<Value>,
    pub require: bool,
}

/// The nine node semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Value {
        path: Option<String>,
    },
    Attributes {
        path: String,
        attributes: Vec<SchemaNode>,
    },
    Nested {
        nested: Vec<SchemaNode>,
    },
    Items {
        path: String,
        groups: Vec<Vec<SchemaNode>>,
    },
    ItemsAll {
        path: String,
        groups: Vec<Vec<SchemaNode>>,
        /// Lowercased keys to skip.
        exclude: Vec<String>,
    },
    Hash {
        path: String,
        fields: Vec<SchemaNode>,
    },
    Array {
        items: Vec<SchemaNode>,
    },
    HashArray {
        path: String,
        fields: Vec<SchemaNode>,
    },
    MergeArrays {
        paths: Vec<String>,
    },
}

impl NodeKind {
    /// Discriminator key for this kind, `None` for plain values.
    pub fn discriminator(&self) -> Option<&'static str> {
        match self {
            NodeKind::Value { .. } => None,
            NodeKind::Attributes { .. } => Some("attributes"),
            NodeKind::Nested { .. } => Some("nested"),
            NodeKind::Items { .. } => Some("items"),
            NodeKind::ItemsAll { .. } => Some("items_all"),
            NodeKind::Hash { .. } => Some("hash"),
            NodeKind::Array { .. } => Some("array"),
            NodeKind::HashArray { .. } => Some("hash_array"),
            NodeKind::MergeArrays { .. } => Some("merge_arrays"),
        }
    }

    /// Every direct child schema, in declaration order.
    pub fn children(&self) -> Vec<&SchemaNode> {
        match self {
            NodeKind::Value { .. } | NodeKind::MergeArrays { .. } => Vec::new(),
            NodeKind::Attributes { attributes: nodes, .. }
            | NodeKind::Nested { nested: nodes }
            | NodeKind::Hash { fields: nodes, .. }
            | NodeKind::Array { items: nodes }
            | NodeKind::HashArray { fields: nodes, .. } => nodes.iter().collect(),
            NodeKind::Items { groups, .. } | NodeKind::ItemsAll { groups, .. } => {
                groups.iter().flatten().collect()
            }
        }
    }
}

impl MappingDocument {
    /// Load a document tree with `conditions`, `limitations`, and `objects`.
    ///
    /// # Errors
    ///
    /// `MappingError::Format` for structural problems and
    /// `MappingError::Argument` for non-string paths.
    pub fn from_value(document: &Value) -> Result<Self, MappingError> {
        let Some(map) = document.as_object() else {
            return Err(MappingError::format(format!(
                "document should be a mapping, got {}",
                json_type_name(document)
            )));
        };

        let conditions = match map.get("conditions") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(defs)) => parse_condition_defs(defs)?,
            Some(other) => {
                return Err(MappingError::format(format!(
                    "conditions should be a mapping, got {}",
                    json_type_name(other)
                )))
            }
        };

        let limitations = match map.get("limitations") {
            None | Some(Value::Null) => Limitations::default(),
            Some(Value::Object(table)) => Limitations::new(table.clone()),
            Some(other) => {
                return Err(MappingError::format(format!(
                    "limitations should be a mapping, got {}",
                    json_type_name(other)
                )))
            }
        };

        let objects = match map.get("objects") {
            None | Some(Value::Null) => {
                return Err(MappingError::format(
                    "must define objects under the 'objects' name",
                ))
            }
            Some(value) => parse_node_list(value, "/objects", false)?,
        };

        Ok(Self {
            conditions,
            limitations,
            objects,
        })
    }
}

impl SchemaNode {
    /// Load a single named schema node.
    ///
    /// # Errors
    ///
    /// Same as [`MappingDocument::from_value`].
    pub fn from_value(value: &Value) -> Result<Self, MappingError> {
        parse_node(value, "", false)
    }
}

fn parse_condition_defs(
    defs: &Map<String, Value>,
) -> Result<BTreeMap<String, ConditionDef>, MappingError> {
    let mut parsed = BTreeMap::new();
    for (name, def) in defs {
        let class = def
            .get("class")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MappingError::format(format!(
                    "/conditions/{}: condition needs a string class",
                    name
                ))
            })?;
        parsed.insert(
            name.clone(),
            ConditionDef {
                class: class.to_string(),
                predicate: def.get("predicate").cloned().unwrap_or(Value::Null),
            },
        );
    }
    Ok(parsed)
}

fn parse_node_list(
    value: &Value,
    location: &str,
    unnamed: bool,
) -> Result<Vec<SchemaNode>, MappingError> {
    let Value::Array(items) = value else {
        return Err(MappingError::format(format!(
            "{}: expected a sequence of schema nodes, got {}",
            location,
            json_type_name(value)
        )));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_node(item, &format!("{}/{}", location, i), unnamed))
        .collect()
}

fn parse_groups(value: &Value, location: &str) -> Result<Vec<Vec<SchemaNode>>, MappingError> {
    let Value::Array(groups) = value else {
        return Err(MappingError::format(format!(
            "{}: expected a sequence of groups, got {}",
            location,
            json_type_name(value)
        )));
    };
    groups
        .iter()
        .enumerate()
        .map(|(i, group)| parse_node_list(group, &format!("{}/{}", location, i), false))
        .collect()
}

fn parse_node(value: &Value, location: &str, unnamed: bool) -> Result<SchemaNode, MappingError> {
    let Some(map) = value.as_object() else {
        return Err(MappingError::format(format!(
            "{}: object should be a mapping, got {}",
            location,
            json_type_name(value)
        )));
    };

    let name = match map.get("name") {
        Some(Value::String(name)) => name.clone(),
        None if unnamed => String::new(),
        None => {
            return Err(MappingError::format(format!(
                "{}: object needs a name",
                location
            )))
        }
        Some(other) => {
            return Err(MappingError::format(format!(
                "{}: name should be a string, got {}",
                location,
                json_type_name(other)
            )))
        }
    };

    let present: Vec<&str> = DISCRIMINATORS
        .iter()
        .copied()
        .filter(|key| map.contains_key(*key))
        .collect();
    if present.len() > 1 {
        return Err(MappingError::format(format!(
            "{}: object '{}' mixes node kinds: {}",
            location,
            name,
            present.join(", ")
        )));
    }

    let path = optional_path(map.get("path"))?;
    let required_path = |kind: &str| {
        path.clone().ok_or_else(|| {
            MappingError::argument(format!(
                "{}: {} object '{}' needs a path: path must be string, not null",
                location, kind, name
            ))
        })
    };

    let kind = match present.first().copied() {
        None => NodeKind::Value { path: path.clone() },
        Some(key) => {
            let body = &map[key];
            let child_location = format!("{}/{}", location, key);
            match key {
                "attributes" => NodeKind::Attributes {
                    path: required_path(key)?,
                    attributes: parse_node_list(body, &child_location, false)?,
                },
                "nested" => NodeKind::Nested {
                    nested: parse_node_list(body, &child_location, false)?,
                },
                "items" => NodeKind::Items {
                    path: required_path(key)?,
                    groups: parse_groups(body, &child_location)?,
                },
                "items_all" => NodeKind::ItemsAll {
                    path: required_path(key)?,
                    groups: parse_groups(body, &child_location)?,
                    exclude: parse_exclude(map.get("exclude"), location)?,
                },
                "hash" => NodeKind::Hash {
                    path: required_path(key)?,
                    fields: parse_node_list(body, &child_location, false)?,
                },
                "array" => NodeKind::Array {
                    items: parse_node_list(body, &child_location, true)?,
                },
                "hash_array" => NodeKind::HashArray {
                    path: required_path(key)?,
                    fields: parse_node_list(body, &child_location, false)?,
                },
                _ => NodeKind::MergeArrays {
                    paths: parse_merge_paths(body, &child_location)?,
                },
            }
        }
    };

    Ok(SchemaNode {
        kind,
        transform: parse_transform(map.get("transform"), location)?,
        conditions: parse_condition_specs(map.get("conditions"), location)?,
        limits: parse_limits(map.get("limits"), location)?,
        default: map.get("default").filter(|v| !v.is_null()).cloned(),
        require: map
            .get("require")
            .is_some_and(|v| !matches!(v, Value::Null | Value::Bool(false))),
        name,
    })
}

fn optional_path(value: Option<&Value>) -> Result<Option<String>, MappingError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(path) => expect_path(path).map(|p| Some(p.to_string())),
    }
}

fn parse_merge_paths(value: &Value, location: &str) -> Result<Vec<String>, MappingError> {
    let Value::Array(paths) = value else {
        return Err(MappingError::format(format!(
            "{}: expected a sequence of paths, got {}",
            location,
            json_type_name(value)
        )));
    };
    paths
        .iter()
        .map(|p| expect_path(p).map(String::from))
        .collect()
}

fn parse_exclude(value: Option<&Value>, location: &str) -> Result<Vec<String>, MappingError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(keys)) => keys
            .iter()
            .map(|key| {
                key.as_str().map(str::to_lowercase).ok_or_else(|| {
                    MappingError::format(format!(
                        "{}/exclude: expected strings, got {}",
                        location,
                        json_type_name(key)
                    ))
                })
            })
            .collect(),
        Some(other) => Err(MappingError::format(format!(
            "{}/exclude: expected a sequence, got {}",
            location,
            json_type_name(other)
        ))),
    }
}

fn parse_transform(
    value: Option<&Value>,
    location: &str,
) -> Result<Option<TransformSpec>, MappingError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(step)) => Ok(Some(TransformSpec::parse([step.as_str()]))),
        Some(Value::Array(steps)) => {
            let mut raw = Vec::with_capacity(steps.len());
            for step in steps {
                raw.push(step.as_str().ok_or_else(|| {
                    MappingError::format(format!(
                        "{}/transform: steps should be strings, got {}",
                        location,
                        json_type_name(step)
                    ))
                })?);
            }
            Ok(Some(TransformSpec::parse(raw)))
        }
        Some(other) => Err(MappingError::format(format!(
            "{}/transform: expected string or sequence, got {}",
            location,
            json_type_name(other)
        ))),
    }
}

fn parse_condition_specs(
    value: Option<&Value>,
    location: &str,
) -> Result<Option<Vec<ConditionSpec>>, MappingError> {
    let specs = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(specs)) => specs,
        Some(other) => {
            return Err(MappingError::format(format!(
                "{}/conditions: expected a sequence, got {}",
                location,
                json_type_name(other)
            )))
        }
    };

    let mut parsed = Vec::with_capacity(specs.len());
    for spec in specs {
        let Some(cond) = spec.as_object() else {
            return Err(MappingError::format(format!(
                "{}/conditions: conditions are a hash: {}",
                location, spec
            )));
        };
        let Some(name) = cond.get("name").and_then(Value::as_str) else {
            return Err(MappingError::format(format!(
                "{}/conditions: condition needs a string name: {}",
                location, spec
            )));
        };
        parsed.push(ConditionSpec {
            name: name.to_string(),
            field: optional_path(cond.get("field"))?,
            // null and false both mean "emit the matched values"
            output: cond
                .get("output")
                .filter(|v| !matches!(v, Value::Null | Value::Bool(false)))
                .cloned(),
        });
    }
    Ok(Some(parsed))
}

fn parse_limits(value: Option<&Value>, location: &str) -> Result<Vec<LimitSpec>, MappingError> {
    let entries = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(MappingError::format(format!(
                "{}/limits: expected a sequence, got {}",
                location,
                json_type_name(other)
            )))
        }
    };

    let mut limits = Vec::new();
    for entry in entries {
        match entry {
            Value::Null => continue,
            Value::Object(pairs) => {
                let mut pairs = pairs.iter();
                let (Some((attribute, limitation)), None) = (pairs.next(), pairs.next()) else {
                    return Err(MappingError::format(format!(
                        "{}/limits: each entry should be a single attribute: limitation pair, got {}",
                        location, entry
                    )));
                };
                let Some(limitation) = limitation.as_str() else {
                    return Err(MappingError::format(format!(
                        "{}/limits: limitation name for '{}' should be a string",
                        location, attribute
                    )));
                };
                limits.push(LimitSpec {
                    attribute: attribute.clone(),
                    limitation: limitation.to_string(),
                });
            }
            other => {
                return Err(MappingError::format(format!(
                    "{}/limits: entries should be mappings, got {}",
                    location,
                    json_type_name(other)
                )))
            }
        }
    }
    Ok(limits)
}

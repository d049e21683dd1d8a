//! Schema application - walks a schema tree against an input tree.
//!
//! Each schema node produces one value, stored in the output under the
//! node's name. Node kinds are dispatched exhaustively; see
//! [`NodeKind`](crate::NodeKind) for the nine semantics.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::conditions::{ConditionClasses, ConditionSet};
use crate::diagnostics::{Diagnostics, NoopDiagnostics};
use crate::error::MappingError;
use crate::limits::LimitSpec;
use crate::params::{parametrize, Parameters};
use crate::path::{ends_with_wildcard, resolve_with_diagnostics};
use crate::schema::{MappingDocument, NodeKind, SchemaNode};
use crate::transforms::TransformRegistry;
use crate::types::{
    dedup_values, default_sequence, is_blank, json_type_name, normalize_keys, MappingOptions,
    OneOrMany, KEY_NAME_MAX_CHARS, KEY_NAME_PARAM, UNWRAP_KEY,
};

/// A mapping engine bound to one loaded document.
///
/// Holds only immutable configuration; `apply` can be called concurrently
/// from several threads.
pub struct JsonMapping {
    document: MappingDocument,
    conditions: ConditionSet,
    transforms: TransformRegistry,
    diagnostics: Arc<dyn Diagnostics>,
}

impl std::fmt::Debug for JsonMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonMapping")
            .field("objects", &self.document.objects.len())
            .field("conditions", &self.conditions)
            .field("transforms", &self.transforms)
            .finish()
    }
}

impl JsonMapping {
    /// Load `document` and build an engine with the given options.
    ///
    /// # Errors
    ///
    /// `MappingError::Format`/`Argument` for a malformed document, or
    /// `MappingError::Condition` if a condition definition can't be built.
    pub fn new(document: &Value, options: MappingOptions) -> Result<Self, MappingError> {
        Self::from_parts(MappingDocument::from_value(document)?, options)
    }

    /// Load `document` with the default options.
    ///
    /// # Errors
    ///
    /// Same as [`JsonMapping::new`].
    pub fn from_document(document: &Value) -> Result<Self, MappingError> {
        Self::new(document, MappingOptions::default())
    }

    /// Build an engine over an already loaded document.
    ///
    /// # Errors
    ///
    /// `MappingError::Condition` if a condition definition can't be built.
    pub fn from_parts(
        document: MappingDocument,
        options: MappingOptions,
    ) -> Result<Self, MappingError> {
        let MappingOptions {
            transforms: extra_transforms,
            condition_classes,
            diagnostics,
        } = options;

        let mut classes = ConditionClasses::default();
        for (class, factory) in condition_classes {
            classes.insert(class, factory);
        }
        let conditions = ConditionSet::build(&document.conditions, &classes)?;

        let mut transforms = TransformRegistry::default();
        for (name, transform) in extra_transforms {
            transforms.insert(name, transform);
        }

        tracing::debug!(
            objects = document.objects.len(),
            conditions = conditions.len(),
            limitations = !document.limitations.is_empty(),
            "mapping engine ready"
        );

        Ok(Self {
            document,
            conditions,
            transforms,
            diagnostics: diagnostics.unwrap_or_else(|| Arc::new(NoopDiagnostics)),
        })
    }

    pub fn document(&self) -> &MappingDocument {
        &self.document
    }

    /// Map `input` through every top-level object schema.
    ///
    /// Keys of the input are lowercased first (on a copy). Results of the
    /// top-level schemas are merged, later ones winning on collision. If the
    /// merged mapping has an `unwrap` key, its value is returned instead.
    ///
    /// # Errors
    ///
    /// Any [`MappingError`]; no partial output is produced.
    pub fn apply(&self, input: &Value) -> Result<Value, MappingError> {
        let normalized = normalize_keys(input);
        let params = Parameters::new();

        let mut merged = Map::new();
        for node in &self.document.objects {
            let value = self.map_node(&normalized, node, &params)?;
            merged.insert(node.name.clone(), value);
        }

        if let Some(inner) = merged.remove(UNWRAP_KEY) {
            return Ok(inner);
        }
        Ok(Value::Object(merged))
    }

    /// Produce the value of a single schema node against `input`.
    ///
    /// # Errors
    ///
    /// Any [`MappingError`] raised by the node or its descendants.
    pub fn map_node(
        &self,
        input: &Value,
        node: &SchemaNode,
        params: &Parameters,
    ) -> Result<Value, MappingError> {
        match &node.kind {
            NodeKind::Value { path } => self.map_value(input, node, path.as_deref(), params),
            NodeKind::Attributes { path, attributes } => {
                self.map_attributes(input, node, path, attributes, params)
            }
            NodeKind::Nested { nested } => self.map_nested(input, nested, params),
            NodeKind::Items { path, groups } => self.map_items(input, node, path, groups, params),
            NodeKind::ItemsAll {
                path,
                groups,
                exclude,
            } => self.map_items_all(input, node, path, groups, exclude, params),
            NodeKind::Hash { path, fields } => self.map_hash(input, node, path, fields, params),
            NodeKind::Array { items } => self.map_array(input, node, items, params),
            NodeKind::HashArray { path, fields } => {
                self.map_hash_array(input, node, path, fields, params)
            }
            NodeKind::MergeArrays { paths } => self.map_merge_arrays(input, node, paths),
        }
    }

    // --- Node handlers ---

    fn map_value(
        &self,
        input: &Value,
        node: &SchemaNode,
        path: Option<&str>,
        params: &Parameters,
    ) -> Result<Value, MappingError> {
        let default = parametrize(node.default.clone(), params);
        let Some(path) = path else {
            return Ok(default.unwrap_or(Value::Null));
        };
        let Some(value) = self.resolve(input, path)? else {
            return Ok(default.unwrap_or(Value::Null));
        };

        let value = match &node.conditions {
            Some(specs) => match self.conditions.apply(&value, specs, self.diagnostics())? {
                Some(matched) => self.transform(matched, node)?,
                // Fallback defaults are emitted untransformed.
                None => default.unwrap_or(Value::Null),
            },
            None => self.transform(value, node)?,
        };

        Ok(parametrize(Some(value), params).unwrap_or(Value::Null))
    }

    fn map_attributes(
        &self,
        input: &Value,
        node: &SchemaNode,
        path: &str,
        attributes: &[SchemaNode],
        params: &Parameters,
    ) -> Result<Value, MappingError> {
        let Some(resolved) = self.resolve(input, path)? else {
            return Ok(node.default.clone().unwrap_or(Value::Null));
        };

        let mut kept = Vec::new();
        for candidate in OneOrMany::from_value(resolved).into_vec() {
            let Some(item) = self.filter_candidate(candidate, node)? else {
                continue;
            };
            if let Some(set) = self.attribute_set(&item, attributes, &node.limits, params)? {
                kept.push(Value::Object(set));
            }
        }

        let value = if kept.len() == 1 && !ends_with_wildcard(path) {
            kept.pop().unwrap_or(Value::Null)
        } else {
            Value::Array(kept)
        };
        self.transform(value, node)
    }

    fn map_nested(
        &self,
        input: &Value,
        nested: &[SchemaNode],
        params: &Parameters,
    ) -> Result<Value, MappingError> {
        let mut merged = Map::new();
        for child in nested {
            let value = self.map_node(input, child, params)?;
            merged.insert(child.name.clone(), value);
        }
        Ok(Value::Object(merged))
    }

    fn map_items(
        &self,
        input: &Value,
        node: &SchemaNode,
        path: &str,
        groups: &[Vec<SchemaNode>],
        params: &Parameters,
    ) -> Result<Value, MappingError> {
        let Some(resolved) = self.resolve(input, path)? else {
            return Ok(default_sequence(node.default.as_ref()));
        };

        let mut items = Vec::new();
        for candidate in OneOrMany::from_value(resolved).into_vec() {
            let Some(item) = self.filter_candidate(candidate, node)? else {
                continue;
            };
            for group in groups {
                if let Some(set) = self.attribute_set(&item, group, &node.limits, params)? {
                    items.push(Value::Object(set));
                }
            }
        }

        self.transform(Value::Array(items), node)
    }

    fn map_items_all(
        &self,
        input: &Value,
        node: &SchemaNode,
        path: &str,
        groups: &[Vec<SchemaNode>],
        exclude: &[String],
        params: &Parameters,
    ) -> Result<Value, MappingError> {
        let Some(resolved) = self.resolve(input, path)? else {
            return Ok(default_sequence(node.default.as_ref()));
        };

        let mut items = Vec::new();
        for candidate in OneOrMany::from_value(resolved).into_vec() {
            let Value::Object(entries) = candidate else {
                self.diagnostics().warn(&format!(
                    "items_all '{}' expected objects at {}, got {}",
                    node.name,
                    path,
                    json_type_name(&candidate)
                ));
                continue;
            };

            for (key, value) in entries {
                if exclude.contains(&key.to_lowercase()) {
                    continue;
                }
                let mut key_params = params.clone();
                key_params.insert(
                    KEY_NAME_PARAM.to_string(),
                    key.chars().take(KEY_NAME_MAX_CHARS).collect(),
                );
                for group in groups {
                    if let Some(set) = self.attribute_set(&value, group, &node.limits, &key_params)? {
                        items.push(Value::Object(set));
                    }
                }
            }
        }

        self.transform(Value::Array(items), node)
    }

    fn map_hash(
        &self,
        input: &Value,
        node: &SchemaNode,
        path: &str,
        fields: &[SchemaNode],
        params: &Parameters,
    ) -> Result<Value, MappingError> {
        let Some(resolved) = self.resolve(input, path)? else {
            return Ok(default_sequence(node.default.as_ref()));
        };

        let mut merged = Map::new();
        for candidate in OneOrMany::from_value(resolved).into_vec() {
            let Some(item) = self.filter_candidate(candidate, node)? else {
                continue;
            };
            for field in fields {
                let value = self.map_node(&item, field, params)?;
                merged.insert(field.name.clone(), value);
            }
        }
        Ok(Value::Object(merged))
    }

    fn map_array(
        &self,
        input: &Value,
        node: &SchemaNode,
        items: &[SchemaNode],
        params: &Parameters,
    ) -> Result<Value, MappingError> {
        let mut flattened = Vec::new();
        for item in items {
            match self.map_node(input, item, params)? {
                Value::Array(values) => flattened.extend(values),
                value => flattened.push(value),
            }
        }

        let values = dedup_values(flattened)
            .into_iter()
            .filter(|v| !v.is_null())
            .collect();
        self.transform(Value::Array(values), node)
    }

    fn map_hash_array(
        &self,
        input: &Value,
        node: &SchemaNode,
        path: &str,
        fields: &[SchemaNode],
        params: &Parameters,
    ) -> Result<Value, MappingError> {
        let Some(resolved) = self.resolve(input, path)? else {
            return Ok(default_sequence(node.default.as_ref()));
        };

        let mut grouped: Vec<(String, Vec<Value>)> = Vec::new();
        for candidate in OneOrMany::from_value(resolved).into_vec() {
            for field in fields {
                let value = self.map_node(&candidate, field, params)?;
                match grouped.iter_mut().find(|(key, _)| *key == field.name) {
                    Some((_, values)) => values.push(value),
                    None => grouped.push((field.name.clone(), vec![value])),
                }
            }
        }

        let mut result = Map::new();
        for (key, values) in grouped {
            let values = self.transform(Value::Array(dedup_values(values)), node)?;
            result.insert(key, values);
        }
        Ok(Value::Object(result))
    }

    fn map_merge_arrays(
        &self,
        input: &Value,
        node: &SchemaNode,
        paths: &[String],
    ) -> Result<Value, MappingError> {
        let mut merged = Vec::new();
        for path in paths {
            match self.resolve(input, path)? {
                None => {}
                Some(Value::Array(values)) => merged.extend(values),
                Some(value) => merged.push(value),
            }
        }
        self.transform(Value::Array(dedup_values(merged)), node)
    }

    // --- Shared steps ---

    fn diagnostics(&self) -> &dyn Diagnostics {
        self.diagnostics.as_ref()
    }

    fn resolve(&self, input: &Value, path: &str) -> Result<Option<Value>, MappingError> {
        resolve_with_diagnostics(input, path, self.diagnostics())
    }

    fn transform(&self, value: Value, node: &SchemaNode) -> Result<Value, MappingError> {
        Ok(self
            .transforms
            .apply_optional(value, node.transform.as_ref())?)
    }

    /// Apply node-level conditions to one candidate; `None` skips it.
    fn filter_candidate(
        &self,
        candidate: Value,
        node: &SchemaNode,
    ) -> Result<Option<Value>, MappingError> {
        match &node.conditions {
            Some(specs) => self.conditions.apply(&candidate, specs, self.diagnostics()),
            None => Ok(Some(candidate)),
        }
    }

    /// Map every schema against `item` into one attribute set.
    ///
    /// Returns `None` when a required attribute is blank or the set is
    /// rejected by a limitation.
    fn attribute_set(
        &self,
        item: &Value,
        schemas: &[SchemaNode],
        limits: &[LimitSpec],
        params: &Parameters,
    ) -> Result<Option<Map<String, Value>>, MappingError> {
        let mut set = Map::new();
        let mut valid = true;
        for schema in schemas {
            let value = self.map_node(item, schema, params)?;
            if schema.require && is_blank(&value) {
                valid = false;
            }
            set.insert(schema.name.clone(), value);
        }

        if !valid || self.document.limitations.is_limited(&set, limits) {
            return Ok(None);
        }
        Ok(Some(set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::testing::RecordingDiagnostics;
    use serde_json::json;

    fn engine(document: Value) -> JsonMapping {
        JsonMapping::from_document(&document).unwrap()
    }

    #[test]
    fn plain_value_end_to_end() {
        let mapping = engine(json!({"objects": [{"name": "id", "path": "user/id"}]}));
        let result = mapping.apply(&json!({"user": {"id": "42"}})).unwrap();
        assert_eq!(result, json!({"id": "42"}));
    }

    #[test]
    fn input_keys_are_normalized() {
        let mapping = engine(json!({"objects": [{"name": "id", "path": "user/id"}]}));
        let result = mapping.apply(&json!({"User": {"ID": 7}})).unwrap();
        assert_eq!(result, json!({"id": 7}));
    }

    #[test]
    fn plain_value_defaults_when_absent() {
        let mapping = engine(json!({"objects": [
            {"name": "id", "path": "user/id", "default": "unknown"},
            {"name": "nothing", "path": "user/none"}
        ]}));
        let result = mapping.apply(&json!({})).unwrap();
        assert_eq!(result, json!({"id": "unknown", "nothing": null}));
    }

    #[test]
    fn plain_value_without_path_emits_default() {
        let mapping = engine(json!({"objects": [{"name": "source", "default": "crm"}]}));
        assert_eq!(mapping.apply(&json!({})).unwrap(), json!({"source": "crm"}));
    }

    #[test]
    fn conditions_fall_back_to_untransformed_default() {
        let mapping = engine(json!({
            "conditions": {"is_m": {"class": "Equals", "predicate": "m"}},
            "objects": [{
                "name": "gender", "path": "g", "default": "unknown",
                "conditions": [{"name": "is_m", "output": "male"}],
                "transform": "upcase"
            }]
        }));
        assert_eq!(mapping.apply(&json!({"g": "m"})).unwrap(), json!({"gender": "MALE"}));
        assert_eq!(
            mapping.apply(&json!({"g": "f"})).unwrap(),
            json!({"gender": "unknown"})
        );
    }

    #[test]
    fn attributes_collapse_single_match() {
        let mapping = engine(json!({"objects": [{
            "name": "user", "path": "user",
            "attributes": [{"name": "id", "path": "id"}]
        }]}));
        let result = mapping.apply(&json!({"user": {"id": 1}})).unwrap();
        assert_eq!(result, json!({"user": {"id": 1}}));
    }

    #[test]
    fn attributes_keep_sequence_for_wildcard_paths() {
        let mapping = engine(json!({"objects": [{
            "name": "users", "path": "users/*",
            "attributes": [{"name": "id", "path": "id"}]
        }]}));
        let result = mapping.apply(&json!({"users": [{"id": 1}]})).unwrap();
        assert_eq!(result, json!({"users": [{"id": 1}]}));
    }

    #[test]
    fn attributes_drop_sets_missing_required_values() {
        let mapping = engine(json!({"objects": [{
            "name": "users", "path": "users",
            "attributes": [
                {"name": "id", "path": "id", "require": true},
                {"name": "email", "path": "email"}
            ]
        }]}));
        let result = mapping
            .apply(&json!({"users": [{"id": 1, "email": "a@x"}, {"email": "b@x"}, {"id": "  "}]}))
            .unwrap();
        assert_eq!(result, json!({"users": {"id": 1, "email": "a@x"}}));
    }

    #[test]
    fn attributes_absent_path_emits_default() {
        let mapping = engine(json!({"objects": [{
            "name": "user", "path": "user", "default": {},
            "attributes": [{"name": "id", "path": "id"}]
        }]}));
        assert_eq!(mapping.apply(&json!({})).unwrap(), json!({"user": {}}));
    }

    #[test]
    fn attributes_apply_limits() {
        let mapping = engine(json!({
            "limitations": {"status": ["active"]},
            "objects": [{
                "name": "users", "path": "users/*",
                "limits": [{"s": "status"}],
                "attributes": [{"name": "s", "path": "state"}]
            }]
        }));
        let result = mapping
            .apply(&json!({"users": [{"state": "active"}, {"state": "inactive"}, {}]}))
            .unwrap();
        assert_eq!(result, json!({"users": [{"s": "active"}, {"s": null}]}));
    }

    #[test]
    fn attributes_filter_candidates_with_conditions() {
        let mapping = engine(json!({
            "conditions": {"primary": {"class": "Equals", "predicate": true}},
            "objects": [{
                "name": "email", "path": "emails/*",
                "conditions": [{"name": "primary", "field": "primary"}],
                "attributes": [{"name": "address", "path": "address"}]
            }]
        }));
        let result = mapping
            .apply(&json!({"emails": [
                {"address": "a@x", "primary": false},
                {"address": "b@x", "primary": true}
            ]}))
            .unwrap();
        assert_eq!(result, json!({"email": [{"address": "b@x"}]}));
    }

    #[test]
    fn nested_composes_children() {
        let mapping = engine(json!({"objects": [{
            "name": "contact",
            "nested": [
                {"name": "email", "path": "mail"},
                {"name": "phone", "path": "tel", "default": "none"}
            ]
        }]}));
        let result = mapping.apply(&json!({"mail": "a@x"})).unwrap();
        assert_eq!(result, json!({"contact": {"email": "a@x", "phone": "none"}}));
    }

    #[test]
    fn items_emit_one_set_per_group() {
        let mapping = engine(json!({"objects": [{
            "name": "phones", "path": "person",
            "items": [
                [{"name": "kind", "default": "home"}, {"name": "number", "path": "home", "require": true}],
                [{"name": "kind", "default": "work"}, {"name": "number", "path": "work", "require": true}]
            ]
        }]}));
        let result = mapping.apply(&json!({"person": {"home": "111"}})).unwrap();
        assert_eq!(result, json!({"phones": [{"kind": "home", "number": "111"}]}));
    }

    #[test]
    fn items_absent_path_emits_default_sequence() {
        let mapping = engine(json!({"objects": [{
            "name": "phones", "path": "person",
            "items": [[{"name": "n", "path": "n"}]]
        }]}));
        assert_eq!(mapping.apply(&json!({})).unwrap(), json!({"phones": []}));
    }

    #[test]
    fn items_all_exposes_key_name() {
        let mapping = engine(json!({"objects": [{
            "name": "fields", "path": "",
            "items_all": [[{"name": "field", "default": "[%key_name%]"}]]
        }]}));
        let result = mapping.apply(&json!({"x": {"y": 1}})).unwrap();
        assert_eq!(result, json!({"fields": [{"field": "x"}]}));
    }

    #[test]
    fn items_all_skips_excluded_keys_and_lowercases_names() {
        let mapping = engine(json!({"objects": [{
            "name": "extras", "path": "custom",
            "exclude": ["Internal"],
            "items_all": [[
                {"name": "label", "default": "[%key_name%]"},
                {"name": "value", "path": "v"}
            ]]
        }]}));
        let result = mapping
            .apply(&json!({"custom": {"Color": {"v": "red"}, "internal": {"v": "x"}}}))
            .unwrap();
        assert_eq!(
            result,
            json!({"extras": [{"label": "color", "value": "red"}]})
        );
    }

    #[test]
    fn items_all_truncates_key_name() {
        let long_key = "k".repeat(80);
        let mapping = engine(json!({"objects": [{
            "name": "fields", "path": "",
            "items_all": [[{"name": "field", "default": "[%key_name%]"}]]
        }]}));
        let result = mapping.apply(&json!({ long_key: 1 })).unwrap();
        assert_eq!(result["fields"][0]["field"], json!("k".repeat(50)));
    }

    #[test]
    fn items_all_warns_on_non_object_candidates() {
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let mapping = JsonMapping::new(
            &json!({"objects": [{
                "name": "fields", "path": "list",
                "items_all": [[{"name": "f", "default": "[%key_name%]"}]]
            }]}),
            MappingOptions::new().with_diagnostics(diagnostics.clone()),
        )
        .unwrap();
        let result = mapping.apply(&json!({"list": [1, {"a": 2}]})).unwrap();
        assert_eq!(result, json!({"fields": [{"f": "a"}]}));
        assert_eq!(diagnostics.messages().len(), 1);
    }

    #[test]
    fn hash_merges_across_candidates() {
        let mapping = engine(json!({"objects": [{
            "name": "profile", "path": "entries/*",
            "hash": [{"name": "city", "path": "city"}]
        }]}));
        let result = mapping
            .apply(&json!({"entries": [{"city": "Oslo"}, {"city": "Rome"}]}))
            .unwrap();
        assert_eq!(result, json!({"profile": {"city": "Rome"}}));
    }

    #[test]
    fn hash_skips_candidates_failing_conditions() {
        let mapping = engine(json!({
            "conditions": {"primary": {"class": "Equals", "predicate": true}},
            "objects": [{
                "name": "profile", "path": "entries/*",
                "conditions": [{"name": "primary", "field": "primary"}],
                "hash": [{"name": "city", "path": "city"}]
            }]
        }));
        let result = mapping
            .apply(&json!({"entries": [
                {"city": "Oslo", "primary": true},
                {"city": "Rome", "primary": false}
            ]}))
            .unwrap();
        assert_eq!(result, json!({"profile": {"city": "Oslo"}}));
    }

    #[test]
    fn items_skip_candidates_failing_conditions() {
        let mapping = engine(json!({
            "conditions": {"mobile": {"class": "Equals", "predicate": "mobile"}},
            "objects": [{
                "name": "phones", "path": "phones/*",
                "conditions": [{"name": "mobile", "field": "type"}],
                "items": [[{"name": "number", "path": "number"}]]
            }]
        }));
        let result = mapping
            .apply(&json!({"phones": [
                {"type": "mobile", "number": "555-1"},
                {"type": "home", "number": "555-2"}
            ]}))
            .unwrap();
        assert_eq!(result, json!({"phones": [{"number": "555-1"}]}));
    }

    #[test]
    fn items_all_rejects_limited_sets() {
        let mapping = engine(json!({
            "limitations": {"status": ["active"]},
            "objects": [{
                "name": "accounts", "path": "accounts",
                "limits": [{"s": "status"}],
                "items_all": [[
                    {"name": "account", "default": "[%key_name%]"},
                    {"name": "s", "path": "state"}
                ]]
            }]
        }));
        let result = mapping
            .apply(&json!({"accounts": {
                "a": {"state": "active"},
                "b": {"state": "closed"}
            }}))
            .unwrap();
        assert_eq!(result, json!({"accounts": [{"account": "a", "s": "active"}]}));
    }

    #[test]
    fn hash_absent_path_emits_sequence_default() {
        let mapping = engine(json!({"objects": [{
            "name": "profile", "path": "missing",
            "hash": [{"name": "city", "path": "city"}]
        }]}));
        assert_eq!(mapping.apply(&json!({})).unwrap(), json!({"profile": []}));
    }

    #[test]
    fn array_flattens_dedups_and_compacts() {
        let mapping = engine(json!({"objects": [{
            "name": "emails",
            "array": [{"path": "work"}, {"path": "home"}, {"path": "others"}, {"path": "none"}],
            "transform": "downcase_all"
        }]}));
        let err = mapping.apply(&json!({})).unwrap_err();
        assert!(matches!(err, MappingError::Transform(_)));

        let mapping = engine(json!({"objects": [{
            "name": "emails",
            "array": [{"path": "work"}, {"path": "home"}, {"path": "others"}, {"path": "none"}]
        }]}));
        let result = mapping
            .apply(&json!({"work": "a@x", "home": "b@x", "others": ["a@x", "c@x"]}))
            .unwrap();
        assert_eq!(result, json!({"emails": ["a@x", "b@x", "c@x"]}));
    }

    #[test]
    fn hash_array_groups_by_key() {
        let mapping = engine(json!({"objects": [{
            "name": "by_field", "path": "rows/*",
            "hash_array": [
                {"name": "city", "path": "city"},
                {"name": "zip", "path": "zip"}
            ],
            "transform": "to_array"
        }]}));
        let result = mapping
            .apply(&json!({"rows": [
                {"city": "Oslo", "zip": "1"},
                {"city": "Oslo", "zip": "2"},
                {"city": "Rome"}
            ]}))
            .unwrap();
        assert_eq!(
            result,
            json!({"by_field": {"city": ["Oslo", "Rome"], "zip": ["1", "2"]}})
        );
    }

    #[test]
    fn merge_arrays_concatenates_and_dedups() {
        let mapping = engine(json!({"objects": [{
            "name": "tags",
            "merge_arrays": ["a", "b", "missing", "c"]
        }]}));
        let result = mapping
            .apply(&json!({"a": ["x", "y"], "b": ["y", "z"], "c": "w"}))
            .unwrap();
        assert_eq!(result, json!({"tags": ["x", "y", "z", "w"]}));
    }

    #[test]
    fn later_objects_override_earlier() {
        let mapping = engine(json!({"objects": [
            {"name": "id", "path": "a"},
            {"name": "id", "path": "b"}
        ]}));
        assert_eq!(mapping.apply(&json!({"a": 1, "b": 2})).unwrap(), json!({"id": 2}));
    }

    #[test]
    fn unwrap_key_replaces_result() {
        let mapping = engine(json!({"objects": [
            {"name": "meta", "default": "dropped"},
            {"name": "unwrap", "path": "users/*", "attributes": [{"name": "id", "path": "id"}]}
        ]}));
        let result = mapping.apply(&json!({"users": [{"id": 1}, {"id": 2}]})).unwrap();
        assert_eq!(result, json!([{"id": 1}, {"id": 2}]));
    }

    #[test]
    fn wildcard_on_mapping_aborts() {
        let mapping = engine(json!({"objects": [{"name": "x", "path": "a/*"}]}));
        let result = mapping.apply(&json!({"a": {"b": 1}}));
        assert!(matches!(result, Err(MappingError::Path { .. })));
    }

    #[test]
    fn unknown_condition_aborts() {
        let mapping = engine(json!({"objects": [{
            "name": "x", "path": "a", "conditions": [{"name": "nope"}]
        }]}));
        assert!(matches!(
            mapping.apply(&json!({"a": 1})),
            Err(MappingError::Condition(_))
        ));
    }

    #[test]
    fn unknown_condition_class_fails_construction() {
        let result = JsonMapping::from_document(&json!({
            "conditions": {"c": {"class": "Nope"}},
            "objects": []
        }));
        assert!(matches!(result, Err(MappingError::Condition(_))));
    }

    #[test]
    fn caller_transforms_override_builtins() {
        fn reverse(value: Value, _: &[&str]) -> Result<Value, crate::TransformError> {
            Ok(Value::String(
                value.as_str().unwrap_or_default().chars().rev().collect(),
            ))
        }

        let mapping = JsonMapping::new(
            &json!({"objects": [{"name": "n", "path": "n", "transform": "downcase"}]}),
            MappingOptions::new().with_transform("downcase", reverse),
        )
        .unwrap();
        assert_eq!(mapping.apply(&json!({"n": "abc"})).unwrap(), json!({"n": "cba"}));
    }

    #[test]
    fn apply_is_repeatable_and_leaves_input_untouched() {
        let mapping = engine(json!({"objects": [{
            "name": "users", "path": "users/*",
            "attributes": [{"name": "id", "path": "id"}]
        }]}));
        let input = json!({"Users": [{"ID": 1}, {"ID": 2}]});
        let before = input.clone();
        let first = mapping.apply(&input).unwrap();
        let second = mapping.apply(&input).unwrap();
        assert_eq!(first, second);
        assert_eq!(input, before);
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JsonMapping>();
    }
}

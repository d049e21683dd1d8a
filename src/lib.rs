//! JSON Mapping
//!
//! Schema-driven reshaping of arbitrary nested documents.
//!
//! A mapping document declares the shape of the output. Each schema node
//! names an output key and says how to find and reshape its value inside
//! the input: which path to read, which named conditions filter it, which
//! transforms post-process it.
//!
//! # Example
//!
//! ```
//! use json_mapping::JsonMapping;
//! use serde_json::json;
//!
//! let document = json!({
//!     "conditions": {
//!         "primary": { "class": "Equals", "predicate": true }
//!     },
//!     "objects": [
//!         { "name": "id", "path": "user/id" },
//!         {
//!             "name": "email",
//!             "path": "user/emails/*",
//!             "conditions": [{ "name": "primary", "field": "primary" }],
//!             "attributes": [
//!                 { "name": "address", "path": "address", "transform": "downcase" }
//!             ]
//!         }
//!     ]
//! });
//!
//! let mapping = JsonMapping::from_document(&document).unwrap();
//! let output = mapping.apply(&json!({
//!     "User": {
//!         "ID": "42",
//!         "Emails": [
//!             { "Address": "Old@Example.com", "Primary": false },
//!             { "Address": "Ann@Example.com", "Primary": true }
//!         ]
//!     }
//! })).unwrap();
//!
//! assert_eq!(output, json!({
//!     "id": "42",
//!     "email": [{ "address": "ann@example.com" }]
//! }));
//! ```
//!
//! # Node Kinds
//!
//! | Key | Output |
//! |-----|--------|
//! | (none) | value at `path`, or `default` |
//! | `attributes` | object per candidate at `path`, collapsed when single |
//! | `nested` | object composed from child nodes |
//! | `items` | flat list, one object per candidate per group |
//! | `items_all` | like `items`, over every key of the object at `path` |
//! | `hash` | one object merged across candidates |
//! | `array` | deduplicated values of literal item nodes |
//! | `hash_array` | per-field value lists across candidates |
//! | `merge_arrays` | concatenation of several paths |
//!
//! Input keys are lowercased before mapping, so paths are written in
//! lowercase. A top-level output key named `unwrap` replaces the whole
//! result with its value.

mod conditions;
mod diagnostics;
mod error;
mod limits;
mod linter;
mod loader;
mod mapper;
mod params;
mod path;
mod schema;
mod transforms;
mod types;
mod validator;

pub use conditions::{
    Condition, ConditionClasses, ConditionDef, ConditionFactory, ConditionSet, ConditionSpec,
};
pub use diagnostics::{Diagnostics, NoopDiagnostics, TracingDiagnostics};
pub use error::{ConditionError, LoadError, MappingError, TransformError, ValidateError, Violation};
pub use limits::{LimitSpec, Limitations};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{is_url, load_document, load_document_auto, load_document_str, DocumentFormat};
pub use mapper::JsonMapping;
pub use params::{parametrize, substitute, Parameters};
pub use path::{expect_path, resolve, resolve_with_diagnostics, WILDCARD};
pub use schema::{MappingDocument, NodeKind, SchemaNode, DISCRIMINATORS};
pub use transforms::{
    Transform, TransformRegistry, TransformSpec, TransformStep, DEFAULT_TRANSFORMS,
};
pub use types::{is_blank, json_type_name, MappingOptions, OneOrMany};
pub use validator::validate_output;

#[cfg(feature = "remote")]
pub use loader::load_document_url;

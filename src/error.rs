//! Error types for mapping schema loading, application, and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or applying a mapping schema.
///
/// Every variant is fatal to the current `apply` call; no partial output
/// is returned.
#[derive(Debug, Error)]
pub enum MappingError {
    /// Malformed schema: missing `name`/`objects`, wrong node type, etc.
    #[error("invalid mapping schema: {message}")]
    Format { message: String },

    /// A `*` segment was applied to something that is not a sequence.
    #[error("{prefix} is not an array (while resolving \"{path}\")")]
    Path { prefix: String, path: String },

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Condition(#[from] ConditionError),

    /// Input contract violation, e.g. a non-string path.
    #[error("invalid argument: {message}")]
    Argument { message: String },
}

impl MappingError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    pub(crate) fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors from the transform pipeline.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("unknown transform \"{name}\"")]
    Unknown { name: String },

    #[error("transform \"{name}\": {message}")]
    InvalidArguments { name: String, message: String },

    #[error("transform \"{name}\" failed: {message}")]
    Failed { name: String, message: String },
}

/// Errors from condition construction and evaluation.
#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("unknown condition named \"{name}\"")]
    Unknown { name: String },

    #[error("unknown condition class \"{class}\"")]
    UnknownClass { class: String },

    #[error("invalid predicate for condition class \"{class}\": {message}")]
    InvalidPredicate { class: String, message: String },
}

/// Errors while reading mapping documents or inputs from disk or network.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors while validating mapped output against a JSON Schema.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid output schema: {message}")]
    InvalidSchema { message: String },

    #[error("output failed validation with {} error(s)", violations.len())]
    Invalid { violations: Vec<Violation> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Load(e) => e.exit_code(),
            ValidateError::InvalidSchema { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }
}

/// Single validation failure with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Violation {
    /// JSON Pointer (RFC 6901) to the offending output field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

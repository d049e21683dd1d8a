//! Mapping document linting - static analysis of mapping files.
//!
//! Validates mapping documents for:
//! - JSON/YAML syntax errors
//! - Malformed schema nodes
//! - Condition references and definitions that can never evaluate
//! - Transform and limitation names that are likely typos

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::conditions::{ConditionClasses, ConditionSpec};
use crate::loader::load_document;
use crate::schema::{MappingDocument, NodeKind, SchemaNode};
use crate::transforms::DEFAULT_TRANSFORMS;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/objects/0/attributes/1/transform")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json, .yaml and .yml
/// files. If `strict` is true, warnings are treated as errors.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_mapping_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        total_errors += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        total_warnings += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    tracing::debug!(files = files.len(), failed, "lint finished");

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single mapping document.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut lint = FileLint {
        file,
        diagnostics: Vec::new(),
    };

    match load_document(file) {
        Err(e) => lint.error("E001", "/", format!("syntax error: {}", e)),
        Ok(raw) => match MappingDocument::from_value(&raw) {
            Err(e) => lint.error("E002", "/", e.to_string()),
            Ok(document) => lint.check_document(&document),
        },
    }

    let diagnostics = lint.diagnostics;
    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

struct FileLint<'a> {
    file: &'a Path,
    diagnostics: Vec<Diagnostic>,
}

impl FileLint<'_> {
    fn push(&mut self, severity: Severity, code: &str, path: &str, message: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            file: self.file.to_path_buf(),
            path: path.to_string(),
            message,
        });
    }

    fn error(&mut self, code: &str, path: &str, message: String) {
        self.push(Severity::Error, code, path, message);
    }

    fn warning(&mut self, code: &str, path: &str, message: String) {
        self.push(Severity::Warning, code, path, message);
    }

    fn check_document(&mut self, document: &MappingDocument) {
        let classes = ConditionClasses::default();
        for (name, def) in &document.conditions {
            if let Err(e) = classes.build(def) {
                self.error("E004", &format!("/conditions/{}", name), e.to_string());
            }
        }

        for (i, node) in document.objects.iter().enumerate() {
            self.check_node(document, node, &format!("/objects/{}", i));
        }
    }

    fn check_node(&mut self, document: &MappingDocument, node: &SchemaNode, path: &str) {
        if let Some(specs) = &node.conditions {
            self.check_condition_refs(document, specs, path);
            if matches!(node.kind, NodeKind::ItemsAll { .. }) {
                self.warning(
                    "W003",
                    &format!("{}/conditions", path),
                    "conditions are ignored on items_all nodes".to_string(),
                );
            }
        }

        if let Some(spec) = &node.transform {
            for (i, step) in spec.steps.iter().enumerate() {
                if !DEFAULT_TRANSFORMS.contains(&step.name.as_str()) {
                    self.warning(
                        "W001",
                        &format!("{}/transform/{}", path, i),
                        format!(
                            "transform \"{}\" is not built in; it must be registered by the caller",
                            step.name
                        ),
                    );
                }
            }
        }

        for (i, limit) in node.limits.iter().enumerate() {
            if !document.limitations.contains(&limit.limitation) {
                self.warning(
                    "W002",
                    &format!("{}/limits/{}", path, i),
                    format!("undefined limitation \"{}\"", limit.limitation),
                );
            }
        }

        let Some(key) = node.kind.discriminator() else {
            return;
        };
        match &node.kind {
            NodeKind::Items { groups, .. } | NodeKind::ItemsAll { groups, .. } => {
                for (g, group) in groups.iter().enumerate() {
                    for (i, child) in group.iter().enumerate() {
                        self.check_node(document, child, &format!("{}/{}/{}/{}", path, key, g, i));
                    }
                }
            }
            kind => {
                for (i, child) in kind.children().into_iter().enumerate() {
                    self.check_node(document, child, &format!("{}/{}/{}", path, key, i));
                }
            }
        }
    }

    fn check_condition_refs(
        &mut self,
        document: &MappingDocument,
        specs: &[ConditionSpec],
        path: &str,
    ) {
        for (i, spec) in specs.iter().enumerate() {
            if !document.conditions.contains_key(&spec.name) {
                self.error(
                    "E003",
                    &format!("{}/conditions/{}", path, i),
                    format!("undefined condition \"{}\"", spec.name),
                );
            }
        }
    }
}

fn is_mapping_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e, "json" | "yaml" | "yml"))
        .unwrap_or(false)
}

/// Collect all mapping files in a path (file or directory).
fn collect_mapping_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if is_mapping_file(path) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if is_mapping_file(&path) {
            files.push(path);
        }
    }
}

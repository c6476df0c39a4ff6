//! Schema syntax checking.
//!
//! Checks one schema location at a time (as the validator does lazily) or a
//! whole schema tree, and checks schema files on disk:
//! - JSON syntax errors
//! - keyword values of the wrong shape
//! - unknown keywords (warnings)
//! - broken `$ref` references

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::config::ValidationConfiguration;
use crate::dialect::Dialect;
use crate::loader::{load_schema, source_ref};
use crate::report::{Domain, LogLevel, ProcessingMessage, ProcessingReport};
use crate::tree::SchemaTree;
use crate::types::json_type_name;
use crate::walker::{expand_references, NoTransform, SchemaListener, SchemaWalker};

/// Check the keywords of the schema object at `tree`.
///
/// Keywords unknown to `dialect` produce a single warning listing them;
/// known keywords run their syntax checkers in name order.
pub fn check_location(dialect: &Dialect, tree: &SchemaTree, report: &mut ProcessingReport) {
    let Some(map) = tree.node().as_object() else {
        let found = json_type_name(tree.node());
        report.log(
            ProcessingMessage::new(
                LogLevel::Error,
                Domain::Syntax,
                "core.notASchema",
                format!("value is not a JSON Schema: not an object (found {})", found),
            )
            .with_schema(tree.loading_ref().locator_string(), tree.pointer().clone())
            .put("found", found),
        );
        return;
    };

    let mut ignored: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|name| !dialect.contains(name))
        .collect();
    if !ignored.is_empty() {
        ignored.sort_unstable();
        report.log(
            ProcessingMessage::new(
                LogLevel::Warning,
                Domain::Syntax,
                "core.unknownKeywords",
                format!("the following keywords are unknown and will be ignored: [{}]", ignored.join(", ")),
            )
            .with_schema(tree.loading_ref().locator_string(), tree.pointer().clone())
            .put("ignored", ignored),
        );
    }

    for keyword in dialect.present_in(tree.node()) {
        keyword.check_syntax(tree, report);
    }
}

struct SyntaxListener<'a> {
    dialect: &'a Dialect,
    report: ProcessingReport,
}

impl SchemaListener for SyntaxListener<'_> {
    fn enter(&mut self, tree: &SchemaTree) {
        check_location(self.dialect, tree, &mut self.report);
    }
}

/// Check every location of the schema at `tree`, without following `$ref`s.
pub fn validate_schema(tree: &SchemaTree, config: &ValidationConfiguration) -> ProcessingReport {
    let dialect = config.engine_for(tree.root()).dialect();
    let mut listener = SyntaxListener {
        dialect,
        report: config.new_report(),
    };
    let walked = SchemaWalker::new(dialect).walk(tree, &mut NoTransform, &mut listener);
    let mut report = listener.report;
    if let Err(e) = walked {
        report.log(e.to_message());
    }
    report
}

/// Status of a checked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of checking a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    pub report: ProcessingReport,
}

/// Result of checking a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct CheckSummary {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl CheckSummary {
    /// Returns true if all files passed.
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }
}

/// Check a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings fail a file too.
pub fn check_files(path: &Path, config: &ValidationConfiguration, strict: bool) -> CheckSummary {
    let files = collect_schema_files(path);
    let results: Vec<FileResult> = files.iter().map(|file| check_file(file, config)).collect();

    let errors = results
        .iter()
        .map(|r| r.report.at_least(LogLevel::Error).count())
        .sum();
    let warnings = results
        .iter()
        .map(|r| r.report.iter().filter(|m| m.level() == LogLevel::Warning).count())
        .sum();

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

    CheckSummary {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Check a single schema file: JSON, keyword syntax, then references.
pub fn check_file(file: &Path, config: &ValidationConfiguration) -> FileResult {
    let mut report = config.new_report();
    match load_schema(file) {
        Ok(schema) => check_document(schema, file, config, &mut report),
        Err(e) => report.log(ProcessingMessage::new(
            LogLevel::Fatal,
            Domain::Syntax,
            "core.unreadable",
            e.to_string(),
        )),
    }

    let status = if !report.success() {
        FileStatus::Error
    } else if report.max_level() == Some(LogLevel::Warning) {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };
    FileResult {
        file: file.to_path_buf(),
        status,
        report,
    }
}

fn check_document(schema: Value, file: &Path, config: &ValidationConfiguration, report: &mut ProcessingReport) {
    let tree = match file.to_str().map(source_ref) {
        Some(Ok(loading_ref)) => SchemaTree::with_loading_ref(schema, loading_ref),
        _ => SchemaTree::new(schema),
    };
    let syntax = validate_schema(&tree, config);
    let clean = syntax.success();
    report.merge(syntax);
    if clean {
        if let Err(e) = expand_references(&tree, config) {
            report.log(e.to_message());
        }
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
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
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn check(schema: Value) -> ProcessingReport {
        let mut report = ProcessingReport::new();
        check_location(&Dialect::draft_v4(), &SchemaTree::new(schema), &mut report);
        report
    }

    #[test]
    fn valid_location() {
        assert!(check(json!({"type": "string", "minLength": 1})).is_empty());
    }

    #[test]
    fn non_object_location() {
        let report = check(json!([1]));
        assert_eq!(report.messages()[0].key(), "core.notASchema");
        assert!(!report.success());
    }

    #[test]
    fn unknown_keywords_single_sorted_warning() {
        let report = check(json!({"zeta": 1, "alpha": 2, "type": "null"}));
        assert!(report.success());
        assert_eq!(report.len(), 1);
        assert_eq!(report.messages()[0].get("ignored"), Some(&json!(["alpha", "zeta"])));
    }

    #[test]
    fn whole_tree_syntax() {
        let tree = SchemaTree::new(json!({
            "properties": {"a": {"minimum": "1"}},
            "items": [{"maxItems": -2}]
        }));
        let report = validate_schema(&tree, &ValidationConfiguration::default());
        let pointers: Vec<String> = report
            .iter()
            .filter_map(|m| m.schema().map(|s| s.pointer.to_string()))
            .collect();
        assert_eq!(pointers, ["/items/0", "/properties/a"]);
    }

    #[test]
    fn check_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type": "object", "properties": {{"id": {{"type": "string"}}}}}}"#).unwrap();

        let result = check_file(file.path(), &ValidationConfiguration::default());
        assert_eq!(result.status, FileStatus::Ok);
        assert!(result.report.is_empty());
    }

    #[test]
    fn check_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not valid json }}").unwrap();

        let result = check_file(file.path(), &ValidationConfiguration::default());
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.report.messages()[0].key(), "core.unreadable");
    }

    #[test]
    fn check_broken_ref() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r##"{{"items": {{"$ref": "#/definitions/missing"}}}}"##).unwrap();

        let result = check_file(file.path(), &ValidationConfiguration::default());
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.report.messages()[0].key(), "refs.unresolvable");
    }

    #[test]
    fn check_ref_to_sibling_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("types.json"), r#"{"definitions": {"id": {"type": "string"}}}"#).unwrap();
        std::fs::write(
            dir.path().join("order.json"),
            r##"{"properties": {"id": {"$ref": "types.json#/definitions/id"}}}"##,
        )
        .unwrap();

        let summary = check_files(dir.path(), &ValidationConfiguration::default(), false);
        assert_eq!(summary.files_checked, 2);
        assert!(summary.is_ok());
    }

    #[test]
    fn check_directory_strict() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), r#"{"type": "string"}"#).unwrap();
        std::fs::write(dir.path().join("b.json"), r#"{"x-note": "hi"}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let lenient = check_files(dir.path(), &ValidationConfiguration::default(), false);
        assert_eq!(lenient.files_checked, 2);
        assert_eq!(lenient.warnings, 1);
        assert!(lenient.is_ok());

        let strict = check_files(dir.path(), &ValidationConfiguration::default(), true);
        assert_eq!(strict.failed, 1);
        assert!(!strict.is_ok());
    }
}

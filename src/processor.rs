//! Validation orchestration.
//!
//! For each (schema location, instance) pair the orchestrator resolves
//! references, checks the location's syntax, selects the keyword digests
//! applicable to the instance kind, builds their validators through the
//! configuration's cache and runs them. Keyword validators re-enter
//! [`ValidationContext::validate`] for child locations.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::config::{DialectEngine, ValidationConfiguration};
use crate::digest::SchemaDigest;
use crate::format::{attribute_name, FormatAttribute};
use crate::keyword::{Keyword, KeywordValidator};
use crate::pointer::JsonPointer;
use crate::report::{Domain, LogLevel, ProcessingMessage, ProcessingReport};
use crate::resolver::RefResolver;
use crate::syntax;
use crate::tree::{SchemaKey, SchemaTree};
use crate::types::NodeType;

/// An instance value and its position in the instance document.
#[derive(Debug, Clone)]
pub struct Instance<'a> {
    pub value: &'a Value,
    pub pointer: JsonPointer,
}

impl<'a> Instance<'a> {
    /// The document root.
    pub fn root(value: &'a Value) -> Self {
        Self {
            value,
            pointer: JsonPointer::root(),
        }
    }

    /// Array element or object member of this instance.
    pub fn child(&self, token: impl Into<String>, value: &'a Value) -> Self {
        Self {
            value,
            pointer: self.pointer.append(token),
        }
    }
}

/// Schema location and instance handed to keyword validators.
#[derive(Debug, Clone)]
pub struct FullData<'a> {
    pub schema: SchemaTree,
    pub instance: Instance<'a>,
}

impl FullData<'_> {
    /// Validation error about `keyword`, located at the current schema and
    /// instance positions.
    pub fn message(&self, keyword: &str, key: &str, text: impl Into<String>) -> ProcessingMessage {
        ProcessingMessage::new(LogLevel::Error, Domain::Validation, key, text)
            .with_keyword(keyword)
            .with_schema(self.schema.loading_ref().locator_string(), self.schema.pointer().clone())
            .with_instance(self.instance.pointer.clone())
    }
}

/// What one schema location needs for validation, computed on first visit.
#[derive(Debug)]
struct LocationPlan {
    syntax: ProcessingReport,
    digest: SchemaDigest,
    format: Option<Arc<dyn FormatAttribute>>,
    unknown_format: Option<String>,
}

impl LocationPlan {
    fn is_valid(&self) -> bool {
        self.syntax.success()
    }
}

/// State of one validation run.
///
/// Holds the reference resolver and the per-location plans; both live for a
/// single call and are never shared between threads.
pub struct ValidationContext<'c> {
    config: &'c ValidationConfiguration,
    engine: &'c DialectEngine,
    resolver: RefResolver<'c>,
    plans: HashMap<SchemaKey, Rc<LocationPlan>>,
}

impl<'c> ValidationContext<'c> {
    /// Context for validating against `root` with the dialect `engine`.
    pub fn new(config: &'c ValidationConfiguration, engine: &'c DialectEngine, root: &SchemaTree) -> Self {
        Self {
            config,
            engine,
            resolver: RefResolver::new(config.store(), root),
            plans: HashMap::new(),
        }
    }

    /// Validate `instance` against the schema at `schema`, appending every
    /// finding to `report`.
    pub fn validate(&mut self, report: &mut ProcessingReport, schema: &SchemaTree, instance: &Instance<'_>) {
        let schema = match self.resolver.resolve(schema) {
            Ok(resolved) => resolved,
            Err(e) => {
                report.log(
                    e.to_message()
                        .with_schema(schema.loading_ref().locator_string(), schema.pointer().clone())
                        .with_instance(instance.pointer.clone()),
                );
                return;
            }
        };
        trace!(schema = %schema, instance = %instance.pointer, "validating");

        let (plan, first_visit) = self.plan(&schema);
        if first_visit || !plan.is_valid() {
            report.merge(plan.syntax.clone());
        }
        if !plan.is_valid() {
            report.log(
                ProcessingMessage::new(
                    LogLevel::Fatal,
                    Domain::Syntax,
                    "syntax.invalidSchema",
                    "schema is invalid, cannot continue",
                )
                .with_schema(schema.loading_ref().locator_string(), schema.pointer().clone())
                .with_instance(instance.pointer.clone()),
            );
            return;
        }
        if let (true, Some(name)) = (first_visit, &plan.unknown_format) {
            report.log(
                ProcessingMessage::new(
                    LogLevel::Warning,
                    Domain::Validation,
                    "format.unknownAttribute",
                    format!("format attribute \"{}\" not supported", name),
                )
                .with_keyword("format")
                .with_schema(schema.loading_ref().locator_string(), schema.pointer().clone())
                .put("attribute", name.as_str()),
            );
        }

        let kind = NodeType::of(instance.value);
        let engine = self.engine;
        let mut validators: Vec<Arc<dyn KeywordValidator>> = Vec::new();
        for entry in plan.digest.applicable(kind) {
            let Some(descriptor) = engine.dialect().keyword(&entry.keyword).and_then(Keyword::descriptor) else {
                continue;
            };
            match engine.cache().build(descriptor, &entry.digest) {
                Ok(validator) => validators.push(validator),
                Err(e) => report.log(
                    e.to_message()
                        .with_schema(schema.loading_ref().locator_string(), schema.pointer().clone())
                        .with_instance(instance.pointer.clone()),
                ),
            }
        }

        let data = FullData {
            schema,
            instance: instance.clone(),
        };
        for validator in validators {
            validator.validate(self, report, &data);
        }
        if let Some(format) = plan.format.as_ref().filter(|f| f.kinds().contains(kind)) {
            format.validate(report, &data);
        }
    }

    /// The plan for `schema`, and whether this is its first visit.
    fn plan(&mut self, schema: &SchemaTree) -> (Rc<LocationPlan>, bool) {
        let key = schema.key();
        if let Some(plan) = self.plans.get(&key) {
            return (Rc::clone(plan), false);
        }
        let dialect = self.engine.dialect();
        let mut syntax = ProcessingReport::with_log_level(LogLevel::Debug);
        syntax::check_location(dialect, schema, &mut syntax);
        let valid = syntax.success();
        let node = schema.node();

        let (mut format, mut unknown_format) = (None, None);
        if valid && self.config.use_format() {
            if let Some(name) = attribute_name(node) {
                match self.config.formats().get(name) {
                    Some(attribute) => format = Some(Arc::clone(attribute)),
                    None => unknown_format = Some(name.to_string()),
                }
            }
        }
        let plan = Rc::new(LocationPlan {
            syntax,
            digest: if valid { SchemaDigest::compute(dialect, node) } else { SchemaDigest::default() },
            format,
            unknown_format,
        });
        self.plans.insert(key, Rc::clone(&plan));
        (plan, true)
    }
}

impl std::fmt::Debug for ValidationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationContext")
            .field("dialect", &self.engine.dialect().id())
            .field("plans", &self.plans.len())
            .finish_non_exhaustive()
    }
}

/// Validate `instance` against the schema rooted at `schema`.
///
/// The dialect is chosen from the root `$schema` member, falling back to the
/// configuration's default.
pub fn validate(schema: &SchemaTree, instance: &Value, config: &ValidationConfiguration) -> ProcessingReport {
    let engine = config.engine_for(schema.root());
    let mut report = config.new_report();
    let mut ctx = ValidationContext::new(config, engine, schema);
    ctx.validate(&mut report, schema, &Instance::root(instance));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(schema: Value, instance: Value) -> ProcessingReport {
        validate(&SchemaTree::new(schema), &instance, &ValidationConfiguration::default())
    }

    fn keys(report: &ProcessingReport) -> Vec<&str> {
        report.iter().map(ProcessingMessage::key).collect()
    }

    #[test]
    fn instance_child_pointers() {
        let value = json!({"a": [1]});
        let root = Instance::root(&value);
        let a = root.child("a", &value["a"]);
        let first = a.child("0", &value["a"][0]);
        assert_eq!(first.pointer.to_string(), "/a/0");
        assert_eq!(first.value, &json!(1));
    }

    #[test]
    fn empty_schema_accepts_anything() {
        assert!(run(json!({}), json!({"anything": [1, 2]})).success());
    }

    #[test]
    fn keywords_filtered_by_instance_kind() {
        let schema = json!({"minimum": 5, "minLength": 3});
        assert!(run(schema.clone(), json!("abcd")).success());
        assert!(run(schema.clone(), json!(7)).success());
        let report = run(schema, json!(2));
        assert_eq!(keys(&report), ["minimum.tooSmall"]);
        assert_eq!(report.messages()[0].instance_pointer().map(ToString::to_string), Some(String::new()));
    }

    #[test]
    fn invalid_location_is_fatal_and_not_digested() {
        let report = run(json!({"minimum": "zero"}), json!(1));
        assert!(report.has_fatal());
        assert_eq!(keys(&report), ["common.incorrectType", "syntax.invalidSchema"]);
    }

    #[test]
    fn invalid_location_reported_on_every_visit() {
        let schema = json!({"items": {"minLength": -1}});
        let report = run(schema, json!(["a", "b"]));
        let fatal = report.at_least(LogLevel::Fatal).count();
        assert_eq!(fatal, 2);
    }

    #[test]
    fn unknown_keyword_warning_logged_once() {
        let schema = json!({"items": {"x-custom": true}});
        let report = run(schema, json!([1, 2, 3]));
        assert!(report.success());
        let warnings: Vec<_> = report.at_least(LogLevel::Warning).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key(), "core.unknownKeywords");
    }

    #[test]
    fn child_messages_carry_pointers() {
        let schema = json!({"properties": {"age": {"type": "integer"}}});
        let report = run(schema, json!({"age": "old"}));
        let msg = &report.messages()[0];
        assert_eq!(msg.key(), "type.incorrect");
        assert_eq!(msg.instance_pointer().map(ToString::to_string).as_deref(), Some("/age"));
        assert_eq!(msg.schema().map(|s| s.pointer.to_string()).as_deref(), Some("/properties/age"));
    }

    #[test]
    fn unresolvable_ref_is_fatal() {
        let report = run(json!({"$ref": "#/definitions/missing"}), json!(1));
        assert!(report.has_fatal());
        assert_eq!(keys(&report), ["refs.unresolvable"]);
    }

    #[test]
    fn format_runs_after_keywords() {
        let schema = json!({"format": "ipv4", "maxLength": 3});
        let report = run(schema, json!("not-an-ip"));
        assert_eq!(keys(&report), ["maxLength.tooLong", "format.invalid"]);
    }

    #[test]
    fn unknown_format_warns() {
        let report = run(json!({"format": "color"}), json!("red"));
        assert!(report.success());
        assert_eq!(keys(&report), ["format.unknownAttribute"]);
    }
}

//! Keyword registry entries.
//!
//! A keyword is fully described by four function values registered under its
//! name: a syntax checker, an optional pointer collector (for keywords that
//! hold subschemas), and, for keywords that constrain instances, a
//! [`KeywordDescriptor`] pairing a digester with a validator factory.
//!
//! Digesters reduce the schema object to the smallest value that determines
//! the validator's behaviour. Two schema fragments with equivalent digests
//! share one validator, so a digester must capture everything its validator
//! reads and nothing else.

pub(crate) mod array;
pub(crate) mod combinator;
pub(crate) mod common;
pub(crate) mod draft3;
pub(crate) mod numeric;
pub(crate) mod object;
pub(crate) mod string;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ProcessingError;
use crate::pointer::JsonPointer;
use crate::processor::{FullData, ValidationContext};
use crate::report::{Domain, LogLevel, ProcessingMessage, ProcessingReport};
use crate::tree::SchemaTree;
use crate::types::{json_type_name, NodeType, NodeTypeSet};

/// Checks the shape of one keyword's value in a schema object.
pub type SyntaxChecker = Arc<dyn Fn(&SyntaxContext<'_>, &mut ProcessingReport) + Send + Sync>;

/// Reduces a schema object to the digest of one keyword.
pub type Digester = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Builds a validator from a digest.
pub type ValidatorFactory =
    Arc<dyn Fn(&Value) -> Result<Arc<dyn KeywordValidator>, ProcessingError> + Send + Sync>;

/// Lists the subschemas of one keyword, relative to the schema object.
pub type PointerCollector = Arc<dyn Fn(&Value) -> Vec<JsonPointer> + Send + Sync>;

/// Validator for one keyword, built once per distinct digest.
pub trait KeywordValidator: Send + Sync + fmt::Debug {
    /// Check `data.instance` and append any findings to `report`.
    fn validate(
        &self,
        ctx: &mut ValidationContext<'_>,
        report: &mut ProcessingReport,
        data: &FullData<'_>,
    );
}

/// What the orchestrator needs to validate one keyword.
#[derive(Clone)]
pub struct KeywordDescriptor {
    name: String,
    kinds: NodeTypeSet,
    digester: Digester,
    factory: ValidatorFactory,
}

impl KeywordDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance kinds this keyword applies to.
    pub fn kinds(&self) -> NodeTypeSet {
        self.kinds
    }

    pub fn digest(&self, schema: &Value) -> Value {
        (self.digester)(schema)
    }

    pub fn build(&self, digest: &Value) -> Result<Arc<dyn KeywordValidator>, ProcessingError> {
        (self.factory)(digest)
    }
}

impl fmt::Debug for KeywordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywordDescriptor")
            .field("name", &self.name)
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

/// A registered keyword.
#[derive(Clone)]
pub struct Keyword {
    name: String,
    syntax: SyntaxChecker,
    collector: Option<PointerCollector>,
    descriptor: Option<KeywordDescriptor>,
}

impl Keyword {
    /// A keyword accepting any value and doing nothing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            syntax: Arc::new(|_: &SyntaxContext<'_>, _: &mut ProcessingReport| {}),
            collector: None,
            descriptor: None,
        }
    }

    pub fn with_syntax<F>(mut self, checker: F) -> Self
    where
        F: Fn(&SyntaxContext<'_>, &mut ProcessingReport) + Send + Sync + 'static,
    {
        self.syntax = Arc::new(checker);
        self
    }

    pub fn with_collector<F>(mut self, collector: F) -> Self
    where
        F: Fn(&Value) -> Vec<JsonPointer> + Send + Sync + 'static,
    {
        self.collector = Some(Arc::new(collector));
        self
    }

    /// Make this keyword validate instances of the given kinds.
    pub fn with_validator<D, F, V>(mut self, kinds: NodeTypeSet, digester: D, factory: F) -> Self
    where
        D: Fn(&Value) -> Value + Send + Sync + 'static,
        F: Fn(&Value) -> Result<V, ProcessingError> + Send + Sync + 'static,
        V: KeywordValidator + 'static,
    {
        self.descriptor = Some(KeywordDescriptor {
            name: self.name.clone(),
            kinds,
            digester: Arc::new(digester),
            factory: Arc::new(move |digest: &Value| {
                factory(digest).map(|v| Arc::new(v) as Arc<dyn KeywordValidator>)
            }),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check_syntax(&self, tree: &SchemaTree, report: &mut ProcessingReport) {
        let ctx = SyntaxContext {
            tree,
            keyword: &self.name,
        };
        (self.syntax)(&ctx, report);
    }

    /// Subschema pointers of this keyword in `schema`, empty for leaf keywords.
    pub fn collect(&self, schema: &Value) -> Vec<JsonPointer> {
        self.collector
            .as_ref()
            .map(|collect| collect(schema))
            .unwrap_or_default()
    }

    pub fn has_collector(&self) -> bool {
        self.collector.is_some()
    }

    pub fn descriptor(&self) -> Option<&KeywordDescriptor> {
        self.descriptor.as_ref()
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyword")
            .field("name", &self.name)
            .field("collector", &self.collector.is_some())
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// A keyword's value being syntax-checked, with its location.
pub struct SyntaxContext<'a> {
    pub tree: &'a SchemaTree,
    pub keyword: &'a str,
}

impl SyntaxContext<'_> {
    /// The keyword's value (`null` if absent).
    pub fn value(&self) -> &Value {
        self.tree.node().get(self.keyword).unwrap_or(&crate::tree::NULL)
    }

    /// The schema object holding the keyword.
    pub fn schema(&self) -> &Value {
        self.tree.node()
    }

    /// Syntax error about this keyword.
    pub fn error(&self, key: &str, text: impl Into<String>) -> ProcessingMessage {
        ProcessingMessage::new(LogLevel::Error, Domain::Syntax, key, text)
            .with_keyword(self.keyword)
            .with_schema(self.tree.loading_ref().locator_string(), self.tree.pointer().clone())
    }
}

// --- Syntax helpers ---

/// Check the keyword's value kind; `number` accepts integers.
pub(crate) fn check_type(
    ctx: &SyntaxContext<'_>,
    report: &mut ProcessingReport,
    allowed: &[NodeType],
) -> bool {
    let found = NodeType::of(ctx.value());
    let ok = allowed.contains(&found)
        || (found == NodeType::Integer && allowed.contains(&NodeType::Number));
    if !ok {
        let expected: Vec<&str> = allowed.iter().map(|t| t.name()).collect();
        report.log(
            ctx.error(
                "common.incorrectType",
                format!(
                    "value has incorrect type (found {}, expected one of [{}])",
                    found,
                    expected.join(", ")
                ),
            )
            .put("found", found.name())
            .put("expected", expected),
        );
    }
    ok
}

/// Integer at least zero.
pub(crate) fn check_non_negative_integer(ctx: &SyntaxContext<'_>, report: &mut ProcessingReport) {
    if !check_type(ctx, report, &[NodeType::Integer]) {
        return;
    }
    if ctx.value().as_u64().is_none() && number_of(ctx.value()).is_some_and(|d| d.is_negative()) {
        report.log(
            ctx.error("common.integerTooSmall", "value must be a non-negative integer")
                .put("found", ctx.value().clone()),
        );
    }
}

/// Object or array of objects (single schema or schema array).
pub(crate) fn check_schema_or_array(ctx: &SyntaxContext<'_>, report: &mut ProcessingReport) {
    if !check_type(ctx, report, &[NodeType::Object, NodeType::Array]) {
        return;
    }
    if let Value::Array(items) = ctx.value() {
        check_array_elements_are_schemas(ctx, report, items);
    }
}

/// Non-empty array of objects.
pub(crate) fn check_schema_array(ctx: &SyntaxContext<'_>, report: &mut ProcessingReport) {
    if !check_type(ctx, report, &[NodeType::Array]) {
        return;
    }
    let items = ctx.value().as_array().map(Vec::as_slice).unwrap_or_default();
    if items.is_empty() {
        report.log(ctx.error("common.array.empty", "array must have at least one element"));
    }
    check_array_elements_are_schemas(ctx, report, items);
}

fn check_array_elements_are_schemas(
    ctx: &SyntaxContext<'_>,
    report: &mut ProcessingReport,
    items: &[Value],
) {
    for (index, item) in items.iter().enumerate() {
        if !item.is_object() {
            report.log(
                ctx.error(
                    "common.array.element.incorrectType",
                    format!("array element {} is not a schema (found {})", index, json_type_name(item)),
                )
                .put("index", index)
                .put("found", json_type_name(item)),
            );
        }
    }
}

/// Object whose members are all objects.
pub(crate) fn check_schema_map(ctx: &SyntaxContext<'_>, report: &mut ProcessingReport) {
    if !check_type(ctx, report, &[NodeType::Object]) {
        return;
    }
    if let Some(map) = ctx.value().as_object() {
        for (name, member) in map {
            if !member.is_object() {
                report.log(
                    ctx.error(
                        "common.map.member.incorrectType",
                        format!("member \"{}\" is not a schema (found {})", name, json_type_name(member)),
                    )
                    .put("member", name.as_str())
                    .put("found", json_type_name(member)),
                );
            }
        }
    }
}

/// Boolean or object.
pub(crate) fn check_bool_or_schema(ctx: &SyntaxContext<'_>, report: &mut ProcessingReport) {
    check_type(ctx, report, &[NodeType::Boolean, NodeType::Object]);
}

/// Array of unique strings, optionally required non-empty.
pub(crate) fn check_string_array(
    ctx: &SyntaxContext<'_>,
    report: &mut ProcessingReport,
    non_empty: bool,
) {
    if !check_type(ctx, report, &[NodeType::Array]) {
        return;
    }
    let items = ctx.value().as_array().map(Vec::as_slice).unwrap_or_default();
    if non_empty && items.is_empty() {
        report.log(ctx.error("common.array.empty", "array must have at least one element"));
    }
    let mut seen = std::collections::HashSet::new();
    for (index, item) in items.iter().enumerate() {
        match item.as_str() {
            Some(s) if !seen.insert(s) => report.log(
                ctx.error("common.array.duplicateElements", format!("duplicate element \"{}\"", s))
                    .put("index", index),
            ),
            Some(_) => {}
            None => report.log(
                ctx.error(
                    "common.array.element.incorrectType",
                    format!("array element {} is not a string (found {})", index, json_type_name(item)),
                )
                .put("index", index)
                .put("found", json_type_name(item)),
            ),
        }
    }
}

// --- Collector helpers ---

/// The keyword's value when it is a schema.
pub(crate) fn collect_single(keyword: &'static str) -> impl Fn(&Value) -> Vec<JsonPointer> {
    move |schema| match schema.get(keyword) {
        Some(Value::Object(_)) => vec![JsonPointer::root().append(keyword)],
        _ => Vec::new(),
    }
}

/// Every schema element of an array value.
pub(crate) fn collect_array(keyword: &'static str) -> impl Fn(&Value) -> Vec<JsonPointer> {
    move |schema| match schema.get(keyword) {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_object())
            .map(|(i, _)| JsonPointer::root().append(keyword).append(i.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

/// A single schema or every schema element of an array.
pub(crate) fn collect_single_or_array(keyword: &'static str) -> impl Fn(&Value) -> Vec<JsonPointer> {
    let single = collect_single(keyword);
    let array = collect_array(keyword);
    move |schema| {
        let mut pointers = single(schema);
        pointers.extend(array(schema));
        pointers
    }
}

/// Every schema member of an object value, in sorted key order.
pub(crate) fn collect_map(keyword: &'static str) -> impl Fn(&Value) -> Vec<JsonPointer> {
    move |schema| match schema.get(keyword) {
        Some(Value::Object(map)) => sorted_keys(map)
            .into_iter()
            .filter(|name| map[*name].is_object())
            .map(|name| JsonPointer::root().append(keyword).append(name.as_str()))
            .collect(),
        _ => Vec::new(),
    }
}

// --- Digest helpers ---

/// Digest made of the keyword's value alone.
pub(crate) fn value_digester(keyword: &'static str) -> impl Fn(&Value) -> Value {
    move |schema| schema.get(keyword).cloned().unwrap_or(Value::Null)
}

pub(crate) fn sorted_keys(map: &Map<String, Value>) -> Vec<&String> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys
}

/// Sorted member names of an object, as a JSON array.
pub(crate) fn sorted_names(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Object(map)) => Value::Array(
            sorted_keys(map)
                .into_iter()
                .map(|k| Value::String(k.clone()))
                .collect(),
        ),
        _ => Value::Array(Vec::new()),
    }
}

pub(crate) fn number_of(value: &Value) -> Option<crate::number::Decimal> {
    value.as_number().and_then(crate::number::Decimal::from_number)
}

/// Non-negative integer value of a count keyword (`minLength`, `maxItems`...).
pub(crate) fn count_of(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| number_of(value).and_then(|d| d.to_u64()))
}

/// String elements of an array value; anything else yields nothing.
pub(crate) fn string_elements(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// String elements of a digest array member.
pub(crate) fn digest_strings(digest: &Value, field: &str) -> Vec<String> {
    digest.get(field).map(string_elements).unwrap_or_default()
}

pub(crate) fn construction_error(keyword: &str, message: impl Into<String>) -> ProcessingError {
    ProcessingError::Construction {
        keyword: keyword.to_string(),
        message: message.into(),
    }
}

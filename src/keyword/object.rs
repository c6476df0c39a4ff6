//! Object keywords.
//!
//! `properties`, `patternProperties` and `additionalProperties` split the
//! members of an instance between them: each validates the members it owns,
//! so a member matched by several keywords is checked against each matching
//! subschema exactly once.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use super::string::{check_regex, compile_pattern, Pattern};
use super::{
    check_bool_or_schema, check_non_negative_integer, check_schema_map, check_string_array,
    check_type, collect_map, collect_single, construction_error, count_of, digest_strings,
    sorted_keys, sorted_names, string_elements, Keyword, KeywordValidator, SyntaxContext,
};
use crate::error::ProcessingError;
use crate::processor::{FullData, ValidationContext};
use crate::report::ProcessingReport;
use crate::types::{json_type_name, NodeType, NodeTypeSet};

// --- required (draft-04) ---

pub(crate) fn required() -> Keyword {
    Keyword::new("required")
        .with_syntax(|ctx, report| check_string_array(ctx, report, true))
        .with_validator(NodeTypeSet::OBJECT, digest_required, |digest| {
            if !digest.is_array() {
                return Err(construction_error("required", "digest is not an array"));
            }
            Ok(RequiredValidator {
                keyword: "required",
                names: string_elements(digest),
            })
        })
}

fn digest_required(schema: &Value) -> Value {
    let mut names = schema.get("required").map(string_elements).unwrap_or_default();
    names.sort_unstable();
    names.dedup();
    Value::from(names)
}

/// Reports members of `names` absent from the instance.
///
/// `keyword` is `properties` for draft-03, where requirement is declared
/// inside each property schema.
#[derive(Debug)]
pub(crate) struct RequiredValidator {
    pub(crate) keyword: &'static str,
    pub(crate) names: Vec<String>,
}

impl RequiredValidator {
    pub(crate) fn check(&self, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(object) = data.instance.value.as_object() else {
            return;
        };
        let missing: Vec<&str> = self
            .names
            .iter()
            .filter(|name| !object.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            return;
        }
        report.log(
            data.message(
                self.keyword,
                "required.missing",
                format!(
                    "object has missing required properties ([{}])",
                    missing.iter().map(|m| format!("\"{}\"", m)).collect::<Vec<_>>().join(",")
                ),
            )
            .put("required", self.names.clone())
            .put("missing", missing),
        );
    }
}

impl KeywordValidator for RequiredValidator {
    fn validate(&self, _ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        self.check(report, data);
    }
}

// --- properties ---

pub(crate) fn properties() -> Keyword {
    Keyword::new("properties")
        .with_syntax(check_schema_map)
        .with_collector(collect_map("properties"))
        .with_validator(
            NodeTypeSet::OBJECT,
            |schema| sorted_names(schema.get("properties")),
            |digest| {
                Ok(PropertiesValidator {
                    names: string_elements(digest),
                })
            },
        )
}

#[derive(Debug)]
pub(crate) struct PropertiesValidator {
    pub(crate) names: Vec<String>,
}

impl KeywordValidator for PropertiesValidator {
    fn validate(&self, ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(object) = data.instance.value.as_object() else {
            return;
        };
        let properties = data.schema.append("properties");
        for name in &self.names {
            if let Some(member) = object.get(name) {
                let child = data.instance.child(name.as_str(), member);
                ctx.validate(report, &properties.append(name.as_str()), &child);
            }
        }
    }
}

// --- patternProperties ---

pub(crate) fn pattern_properties() -> Keyword {
    Keyword::new("patternProperties")
        .with_syntax(|ctx, report| {
            check_schema_map(ctx, report);
            if let Some(map) = ctx.value().as_object() {
                for pattern in sorted_keys(map) {
                    check_regex(ctx, report, pattern);
                }
            }
        })
        .with_collector(collect_map("patternProperties"))
        .with_validator(
            NodeTypeSet::OBJECT,
            |schema| sorted_names(schema.get("patternProperties")),
            PatternPropertiesValidator::from_digest,
        )
}

fn compile_all(keyword: &str, patterns: &[String]) -> Result<Vec<Pattern>, ProcessingError> {
    patterns
        .iter()
        .map(|p| compile_pattern(p).map_err(|e| construction_error(keyword, format!("invalid regex \"{}\": {}", p, e))))
        .collect()
}

#[derive(Debug)]
pub(crate) struct PatternPropertiesValidator {
    patterns: Vec<Pattern>,
}

impl PatternPropertiesValidator {
    fn from_digest(digest: &Value) -> Result<Self, ProcessingError> {
        let patterns: Vec<String> = digest
            .as_array()
            .ok_or_else(|| construction_error("patternProperties", "digest is not an array"))?
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        Ok(Self {
            patterns: compile_all("patternProperties", &patterns)?,
        })
    }
}

impl KeywordValidator for PatternPropertiesValidator {
    fn validate(&self, ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(object) = data.instance.value.as_object() else {
            return;
        };
        let base = data.schema.append("patternProperties");
        for name in sorted_keys(object) {
            for regex in &self.patterns {
                if regex.is_match(name) {
                    let child = data.instance.child(name.as_str(), &object[name.as_str()]);
                    ctx.validate(report, &base.append(regex.as_str()), &child);
                }
            }
        }
    }
}

// --- additionalProperties ---

pub(crate) fn additional_properties() -> Keyword {
    Keyword::new("additionalProperties")
        .with_syntax(check_bool_or_schema)
        .with_collector(collect_single("additionalProperties"))
        .with_validator(
            NodeTypeSet::OBJECT,
            digest_additional_properties,
            AdditionalPropertiesValidator::from_digest,
        )
}

fn digest_additional_properties(schema: &Value) -> Value {
    let additional = schema.get("additionalProperties");
    json!({
        "allowed": additional != Some(&Value::Bool(false)),
        "schema": additional.is_some_and(Value::is_object),
        "properties": sorted_names(schema.get("properties")),
        "patternProperties": sorted_names(schema.get("patternProperties")),
    })
}

#[derive(Debug)]
pub(crate) struct AdditionalPropertiesValidator {
    allowed: bool,
    schema: bool,
    properties: Vec<String>,
    patterns: Vec<Pattern>,
}

impl AdditionalPropertiesValidator {
    fn from_digest(digest: &Value) -> Result<Self, ProcessingError> {
        let allowed = digest.get("allowed").and_then(Value::as_bool).unwrap_or(true);
        let schema = digest.get("schema").and_then(Value::as_bool).unwrap_or(false);
        Ok(Self {
            allowed,
            schema,
            properties: digest_strings(digest, "properties"),
            patterns: compile_all("additionalProperties", &digest_strings(digest, "patternProperties"))?,
        })
    }

    fn extras<'o>(&self, object: &'o Map<String, Value>) -> Vec<&'o String> {
        sorted_keys(object)
            .into_iter()
            .filter(|name| self.properties.binary_search(*name).is_err())
            .filter(|name| !self.patterns.iter().any(|r| r.is_match(name)))
            .collect()
    }
}

impl KeywordValidator for AdditionalPropertiesValidator {
    fn validate(&self, ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        if self.allowed && !self.schema {
            return;
        }
        let Some(object) = data.instance.value.as_object() else {
            return;
        };
        let extras = self.extras(object);
        if extras.is_empty() {
            return;
        }
        if !self.allowed {
            report.log(
                data.message(
                    "additionalProperties",
                    "additionalProperties.notAllowed",
                    format!(
                        "object instance has properties which are not allowed by the schema: [{}]",
                        extras.iter().map(|m| format!("\"{}\"", m)).collect::<Vec<_>>().join(",")
                    ),
                )
                .put("unwanted", extras.iter().map(|s| s.as_str()).collect::<Vec<_>>()),
            );
            return;
        }
        let additional = data.schema.append("additionalProperties");
        for name in extras {
            let child = data.instance.child(name.as_str(), &object[name.as_str()]);
            ctx.validate(report, &additional, &child);
        }
    }
}

// --- minProperties / maxProperties ---

pub(crate) fn min_properties() -> Keyword {
    count_keyword("minProperties", false)
}

pub(crate) fn max_properties() -> Keyword {
    count_keyword("maxProperties", true)
}

fn count_keyword(name: &'static str, upper: bool) -> Keyword {
    Keyword::new(name)
        .with_syntax(check_non_negative_integer)
        .with_validator(NodeTypeSet::OBJECT, super::value_digester(name), move |digest| {
            let limit = count_of(digest).ok_or_else(|| construction_error(name, "count is not a non-negative integer"))?;
            Ok(MemberCountValidator { keyword: name, limit, upper })
        })
}

#[derive(Debug)]
pub(crate) struct MemberCountValidator {
    keyword: &'static str,
    limit: u64,
    upper: bool,
}

impl KeywordValidator for MemberCountValidator {
    fn validate(&self, _ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(object) = data.instance.value.as_object() else {
            return;
        };
        let count = object.len() as u64;
        let (failed, key, text) = if self.upper {
            (count > self.limit, "maxProperties.tooMany", "object has too many properties")
        } else {
            (count < self.limit, "minProperties.tooFew", "object has too few properties")
        };
        if failed {
            report.log(
                data.message(self.keyword, key, format!("{} (required: {}, found: {})", text, self.limit, count))
                    .put(self.keyword, self.limit)
                    .put("found", count),
            );
        }
    }
}

// --- dependencies ---

/// Dependencies in both drafts.
///
/// Draft-03 additionally allows a single property name as a dependency.
pub(crate) fn dependencies(allow_single_name: bool) -> Keyword {
    Keyword::new("dependencies")
        .with_syntax(move |ctx, report| check_dependencies(ctx, report, allow_single_name))
        .with_collector(collect_map("dependencies"))
        .with_validator(NodeTypeSet::OBJECT, digest_dependencies, DependenciesValidator::from_digest)
}

fn check_dependencies(ctx: &SyntaxContext<'_>, report: &mut ProcessingReport, allow_single_name: bool) {
    if !check_type(ctx, report, &[NodeType::Object]) {
        return;
    }
    let Some(map) = ctx.value().as_object() else {
        return;
    };
    for name in sorted_keys(map) {
        match &map[name.as_str()] {
            Value::Object(_) => {}
            Value::String(_) if allow_single_name => {}
            Value::Array(items) => {
                let mut seen = std::collections::HashSet::new();
                for item in items {
                    match item.as_str() {
                        Some(s) if !seen.insert(s) => report.log(
                            ctx.error(
                                "dependencies.duplicateElements",
                                format!("property dependencies of \"{}\" must be unique", name),
                            )
                            .put("property", name.as_str()),
                        ),
                        Some(_) => {}
                        None => report.log(
                            ctx.error(
                                "dependencies.element.incorrectType",
                                format!("property dependencies of \"{}\" must be strings", name),
                            )
                            .put("property", name.as_str())
                            .put("found", json_type_name(item)),
                        ),
                    }
                }
            }
            other => report.log(
                ctx.error(
                    "dependencies.member.incorrectType",
                    format!("dependency \"{}\" has incorrect type ({})", name, json_type_name(other)),
                )
                .put("property", name.as_str())
                .put("found", json_type_name(other)),
            ),
        }
    }
}

fn digest_dependencies(schema: &Value) -> Value {
    let mut properties = BTreeMap::new();
    let mut schemas = Vec::new();
    if let Some(map) = schema.get("dependencies").and_then(Value::as_object) {
        for name in sorted_keys(map) {
            match &map[name.as_str()] {
                Value::Object(_) => schemas.push(name.clone()),
                Value::String(single) => {
                    properties.insert(name.clone(), vec![single.clone()]);
                }
                Value::Array(items) => {
                    let mut deps: Vec<String> = items.iter().filter_map(|v| v.as_str().map(String::from)).collect();
                    deps.sort_unstable();
                    deps.dedup();
                    properties.insert(name.clone(), deps);
                }
                _ => {}
            }
        }
    }
    json!({"properties": properties, "schemas": schemas})
}

#[derive(Debug)]
pub(crate) struct DependenciesValidator {
    properties: BTreeMap<String, Vec<String>>,
    schemas: Vec<String>,
}

impl DependenciesValidator {
    fn from_digest(digest: &Value) -> Result<Self, ProcessingError> {
        let properties = digest
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| construction_error("dependencies", "digest lacks property dependencies"))?
            .iter()
            .map(|(name, deps)| {
                (name.clone(), string_elements(deps))
            })
            .collect();
        Ok(Self {
            properties,
            schemas: digest_strings(digest, "schemas"),
        })
    }
}

impl KeywordValidator for DependenciesValidator {
    fn validate(&self, ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(object) = data.instance.value.as_object() else {
            return;
        };
        for (name, deps) in &self.properties {
            if !object.contains_key(name) {
                continue;
            }
            let missing: Vec<&str> = deps
                .iter()
                .filter(|d| !object.contains_key(d.as_str()))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                report.log(
                    data.message(
                        "dependencies",
                        "dependencies.missing",
                        format!("property \"{}\" is missing its dependencies [{}]", name, missing.join(", ")),
                    )
                    .put("property", name.as_str())
                    .put("required", deps.clone())
                    .put("missing", missing),
                );
            }
        }
        let base = data.schema.append("dependencies");
        for name in &self.schemas {
            if object.contains_key(name) {
                ctx.validate(report, &base.append(name.as_str()), &data.instance);
            }
        }
    }
}

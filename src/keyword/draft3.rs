//! Keywords whose draft-03 form differs from draft-04.

use std::collections::HashSet;

use serde_json::{json, Value};

use super::common::type_matches;
use super::object::{PropertiesValidator, RequiredValidator};
use super::{
    check_schema_map, check_schema_or_array, check_type, collect_map, collect_single_or_array,
    construction_error, digest_strings, sorted_keys, Keyword, KeywordValidator, SyntaxContext,
};
use crate::error::ProcessingError;
use crate::pointer::JsonPointer;
use crate::processor::{FullData, ValidationContext};
use crate::report::ProcessingReport;
use crate::types::{json_type_name, NodeType, NodeTypeSet};

/// `type` and `disallow`: simple type names, `any`, or inline schemas.
pub(crate) fn type_v3() -> Keyword {
    union_keyword("type", false)
}

pub(crate) fn disallow() -> Keyword {
    union_keyword("disallow", true)
}

fn union_keyword(name: &'static str, negated: bool) -> Keyword {
    Keyword::new(name)
        .with_syntax(check_type_union)
        .with_collector(move |schema| match schema.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.is_object())
                .map(|(i, _)| JsonPointer::root().append(name).append(i.to_string()))
                .collect(),
            _ => Vec::new(),
        })
        .with_validator(
            NodeTypeSet::ALL,
            move |schema| digest_type_union(schema.get(name)),
            move |digest| TypeUnionValidator::from_digest(name, negated, digest),
        )
}

fn check_type_union(ctx: &SyntaxContext<'_>, report: &mut ProcessingReport) {
    if !check_type(ctx, report, &[NodeType::String, NodeType::Array]) {
        return;
    }
    let elements: Vec<&Value> = match ctx.value() {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };
    let mut seen = HashSet::new();
    for element in elements {
        match element {
            Value::String(s) if s != "any" && NodeType::parse(s).is_none() => report.log(
                ctx.error("type.unknownType", format!("unknown simple type \"{}\"", s))
                    .put("found", s.as_str()),
            ),
            Value::String(s) if !seen.insert(s.as_str()) => report.log(
                ctx.error("common.array.duplicateElements", format!("duplicate type \"{}\"", s))
                    .put("found", s.as_str()),
            ),
            Value::String(_) | Value::Object(_) => {}
            other => report.log(
                ctx.error(
                    "common.array.element.incorrectType",
                    format!("element must be a type name or a schema (found {})", json_type_name(other)),
                )
                .put("found", json_type_name(other)),
            ),
        }
    }
}

fn digest_type_union(value: Option<&Value>) -> Value {
    let mut names = Vec::new();
    let mut schemas = Vec::new();
    match value {
        Some(Value::String(s)) => names.push(s.clone()),
        Some(Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => names.push(s.clone()),
                    Value::Object(_) => schemas.push(index),
                    _ => {}
                }
            }
        }
        _ => {}
    }
    names.sort_unstable();
    names.dedup();
    json!({"types": names, "schemas": schemas})
}

#[derive(Debug)]
pub(crate) struct TypeUnionValidator {
    keyword: &'static str,
    negated: bool,
    types: Vec<String>,
    schemas: Vec<usize>,
}

impl TypeUnionValidator {
    fn from_digest(keyword: &'static str, negated: bool, digest: &Value) -> Result<Self, ProcessingError> {
        let schemas = digest
            .get("schemas")
            .and_then(Value::as_array)
            .ok_or_else(|| construction_error(keyword, "digest lacks schema indexes"))?
            .iter()
            .filter_map(|v| v.as_u64().map(|i| i as usize))
            .collect();
        Ok(Self {
            keyword,
            negated,
            types: digest_strings(digest, "types"),
            schemas,
        })
    }

    /// What the instance matched: a type name or a schema pointer.
    fn matches(&self, ctx: &mut ValidationContext<'_>, report: &ProcessingReport, data: &FullData<'_>) -> Option<Value> {
        let kind = NodeType::of(data.instance.value);
        if let Some(name) = self.types.iter().find(|name| type_matches(name, kind)) {
            return Some(Value::String(name.clone()));
        }
        let base = data.schema.append(self.keyword);
        for index in &self.schemas {
            let mut branch = report.fork();
            ctx.validate(&mut branch, &base.append(index.to_string()), &data.instance);
            if branch.success() {
                return Some(Value::String(base.pointer().append(index.to_string()).to_string()));
            }
        }
        None
    }
}

impl KeywordValidator for TypeUnionValidator {
    fn validate(&self, ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let kind = NodeType::of(data.instance.value);
        match (self.matches(ctx, report, data), self.negated) {
            (None, false) => report.log(
                data.message(
                    self.keyword,
                    "type.incorrect",
                    format!(
                        "instance type ({}) does not match any allowed primitive type (allowed: [{}])",
                        kind,
                        self.types.join(", ")
                    ),
                )
                .put("found", kind.name())
                .put("expected", self.types.clone()),
            ),
            (Some(matched), true) => report.log(
                data.message(
                    self.keyword,
                    "disallow.forbidden",
                    format!("instance type ({}) is disallowed", kind),
                )
                .put("found", kind.name())
                .put("disallowed", matched),
            ),
            _ => {}
        }
    }
}

// --- extends ---

pub(crate) fn extends() -> Keyword {
    Keyword::new("extends")
        .with_syntax(check_schema_or_array)
        .with_collector(collect_single_or_array("extends"))
        .with_validator(
            NodeTypeSet::ALL,
            |schema| match schema.get("extends") {
                Some(Value::Array(items)) => json!({"array": true, "count": items.len()}),
                _ => json!({"array": false, "count": 1}),
            },
            |digest| {
                let array = digest
                    .get("array")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| construction_error("extends", "digest lacks the array flag"))?;
                let count = digest.get("count").and_then(Value::as_u64).unwrap_or(0) as usize;
                Ok(ExtendsValidator { array, count })
            },
        )
}

#[derive(Debug)]
pub(crate) struct ExtendsValidator {
    array: bool,
    count: usize,
}

impl KeywordValidator for ExtendsValidator {
    fn validate(&self, ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let base = data.schema.append("extends");
        if !self.array {
            ctx.validate(report, &base, &data.instance);
            return;
        }
        for index in 0..self.count {
            ctx.validate(report, &base.append(index.to_string()), &data.instance);
        }
    }
}

// --- properties and required ---

/// Draft-03 `properties`, which also enforces per-property `required: true`.
pub(crate) fn properties_v3() -> Keyword {
    Keyword::new("properties")
        .with_syntax(check_schema_map)
        .with_collector(collect_map("properties"))
        .with_validator(NodeTypeSet::OBJECT, digest_properties_v3, |digest| {
            if !digest.is_object() {
                return Err(construction_error("properties", "digest is not an object"));
            }
            Ok(PropertiesV3Validator {
                properties: PropertiesValidator {
                    names: digest_strings(digest, "names"),
                },
                required: RequiredValidator {
                    keyword: "properties",
                    names: digest_strings(digest, "required"),
                },
            })
        })
}

fn digest_properties_v3(schema: &Value) -> Value {
    let Some(map) = schema.get("properties").and_then(Value::as_object) else {
        return json!({"names": [], "required": []});
    };
    let names = sorted_keys(map);
    let required: Vec<&String> = names
        .iter()
        .copied()
        .filter(|name| map[name.as_str()].get("required") == Some(&Value::Bool(true)))
        .collect();
    json!({"names": names, "required": required})
}

#[derive(Debug)]
pub(crate) struct PropertiesV3Validator {
    properties: PropertiesValidator,
    required: RequiredValidator,
}

impl KeywordValidator for PropertiesV3Validator {
    fn validate(&self, ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        self.required.check(report, data);
        self.properties.validate(ctx, report, data);
    }
}

/// Draft-03 `required`: a boolean read by the enclosing `properties`.
pub(crate) fn required_v3() -> Keyword {
    Keyword::new("required").with_syntax(|ctx, report| {
        check_type(ctx, report, &[NodeType::Boolean]);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_digest_separates_names_and_schemas() {
        assert_eq!(
            digest_type_union(Some(&json!(["string", {"type": "integer"}, "null"]))),
            json!({"types": ["null", "string"], "schemas": [1]})
        );
        assert_eq!(
            digest_type_union(Some(&json!("any"))),
            json!({"types": ["any"], "schemas": []})
        );
    }

    #[test]
    fn properties_digest_collects_required_members() {
        let digest = digest_properties_v3(&json!({
            "properties": {
                "b": {"required": true},
                "a": {"type": "string"},
                "c": {"required": false}
            }
        }));
        assert_eq!(digest, json!({"names": ["a", "b", "c"], "required": ["b"]}));
    }

    #[test]
    fn union_collector_only_lists_schemas() {
        let kw = type_v3();
        let pointers: Vec<String> = kw
            .collect(&json!({"type": ["string", {}, "null", {}]}))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(pointers, ["/type/1", "/type/3"]);
    }
}

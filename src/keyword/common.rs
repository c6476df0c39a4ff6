//! Keywords applying to every instance kind, and annotation keywords.

use std::collections::HashSet;

use serde_json::Value;

use super::{
    check_schema_map, check_type, collect_map, construction_error, Keyword, KeywordValidator,
    SyntaxContext,
};
use crate::equivalence::Equivalent;
use crate::error::ProcessingError;
use crate::processor::{FullData, ValidationContext};
use crate::report::ProcessingReport;
use crate::types::{json_type_name, NodeType, NodeTypeSet};

/// Keywords that only carry a string (`$schema`, `id`, `title`, ...).
pub(crate) fn string_annotation(name: &'static str) -> Keyword {
    Keyword::new(name).with_syntax(|ctx, report| {
        check_type(ctx, report, &[NodeType::String]);
    })
}

/// `$ref`: resolved by the processor before any keyword runs.
pub(crate) fn reference() -> Keyword {
    string_annotation("$ref")
}

/// `format`: checked by the processor's format step.
pub(crate) fn format() -> Keyword {
    string_annotation("format")
}

pub(crate) fn definitions() -> Keyword {
    Keyword::new("definitions")
        .with_syntax(check_schema_map)
        .with_collector(collect_map("definitions"))
}

/// `default` accepts any value.
pub(crate) fn default_value() -> Keyword {
    Keyword::new("default")
}

/// True when an instance of `kind` satisfies the type name `name`.
///
/// `number` accepts integers and `any` (draft-03) accepts everything.
pub(crate) fn type_matches(name: &str, kind: NodeType) -> bool {
    match name {
        "any" => true,
        "number" => matches!(kind, NodeType::Number | NodeType::Integer),
        other => other == kind.name(),
    }
}

// --- type (draft-04) ---

pub(crate) fn type_v4() -> Keyword {
    Keyword::new("type")
        .with_syntax(check_type_v4)
        .with_validator(NodeTypeSet::ALL, digest_type_v4, TypeValidator::from_digest)
}

fn check_type_v4(ctx: &SyntaxContext<'_>, report: &mut ProcessingReport) {
    if !check_type(ctx, report, &[NodeType::String, NodeType::Array]) {
        return;
    }
    let names: Vec<&Value> = match ctx.value() {
        Value::Array(items) => {
            if items.is_empty() {
                report.log(ctx.error("common.array.empty", "array must have at least one element"));
            }
            items.iter().collect()
        }
        single => vec![single],
    };
    let mut seen = HashSet::new();
    for name in names {
        match name.as_str() {
            Some(s) if NodeType::parse(s).is_none() => report.log(
                ctx.error("type.unknownType", format!("unknown simple type \"{}\"", s))
                    .put("found", s),
            ),
            Some(s) if !seen.insert(s) => report.log(
                ctx.error("common.array.duplicateElements", format!("duplicate type \"{}\"", s))
                    .put("found", s),
            ),
            Some(_) => {}
            None => report.log(
                ctx.error(
                    "common.array.element.incorrectType",
                    format!("type names must be strings (found {})", json_type_name(name)),
                )
                .put("found", json_type_name(name)),
            ),
        }
    }
}

fn digest_type_v4(schema: &Value) -> Value {
    let mut names: Vec<&str> = match schema.get("type") {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    names.sort_unstable();
    names.dedup();
    Value::from(names)
}

#[derive(Debug)]
pub(crate) struct TypeValidator {
    expected: Vec<String>,
}

impl TypeValidator {
    fn from_digest(digest: &Value) -> Result<Self, ProcessingError> {
        let expected: Vec<String> = digest
            .as_array()
            .ok_or_else(|| construction_error("type", "digest is not an array"))?
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        if let Some(unknown) = expected.iter().find(|n| NodeType::parse(n).is_none()) {
            return Err(construction_error("type", format!("unknown simple type \"{}\"", unknown)));
        }
        Ok(Self { expected })
    }
}

impl KeywordValidator for TypeValidator {
    fn validate(&self, _ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let kind = NodeType::of(data.instance.value);
        if self.expected.iter().any(|name| type_matches(name, kind)) {
            return;
        }
        report.log(
            data.message(
                "type",
                "type.incorrect",
                format!(
                    "instance type ({}) does not match any allowed primitive type (allowed: [{}])",
                    kind,
                    self.expected.join(", ")
                ),
            )
            .put("found", kind.name())
            .put("expected", self.expected.clone()),
        );
    }
}

// --- enum ---

pub(crate) fn enumeration() -> Keyword {
    Keyword::new("enum")
        .with_syntax(check_enum)
        .with_validator(NodeTypeSet::ALL, super::value_digester("enum"), EnumValidator::from_digest)
}

fn check_enum(ctx: &SyntaxContext<'_>, report: &mut ProcessingReport) {
    if !check_type(ctx, report, &[NodeType::Array]) {
        return;
    }
    let items = ctx.value().as_array().map(Vec::as_slice).unwrap_or_default();
    if items.is_empty() {
        report.log(ctx.error("common.array.empty", "array must have at least one element"));
    }
    let mut seen = HashSet::new();
    if !items.iter().all(|item| seen.insert(Equivalent(item.clone()))) {
        report.log(ctx.error("common.array.duplicateElements", "enum elements must be unique"));
    }
}

#[derive(Debug)]
pub(crate) struct EnumValidator {
    values: Value,
    members: HashSet<Equivalent>,
}

impl EnumValidator {
    fn from_digest(digest: &Value) -> Result<Self, ProcessingError> {
        let items = digest
            .as_array()
            .ok_or_else(|| construction_error("enum", "digest is not an array"))?;
        Ok(Self {
            values: digest.clone(),
            members: items.iter().cloned().map(Equivalent).collect(),
        })
    }
}

impl KeywordValidator for EnumValidator {
    fn validate(&self, _ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        if self.members.contains(&Equivalent(data.instance.value.clone())) {
            return;
        }
        report.log(
            data.message("enum", "enum.notInEnum", "instance value not found in enum")
                .put("value", data.instance.value.clone())
                .put("enum", self.values.clone()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_digest_is_sorted_and_deduplicated() {
        assert_eq!(digest_type_v4(&json!({"type": ["string", "null", "string"]})), json!(["null", "string"]));
        assert_eq!(digest_type_v4(&json!({"type": "object"})), json!(["object"]));
    }

    #[test]
    fn type_matching() {
        assert!(type_matches("number", NodeType::Integer));
        assert!(!type_matches("integer", NodeType::Number));
        assert!(type_matches("any", NodeType::Null));
        assert!(type_matches("string", NodeType::String));
    }

    #[test]
    fn type_factory_rejects_unknown_names() {
        assert!(TypeValidator::from_digest(&json!(["strin"])).is_err());
        assert!(TypeValidator::from_digest(&json!("string")).is_err());
        assert!(TypeValidator::from_digest(&json!(["string"])).is_ok());
    }

    #[test]
    fn enum_members_use_equivalence() {
        let v = EnumValidator::from_digest(&json!([1, "a", {"x": [1]}])).unwrap();
        let one: Value = serde_json::from_str("1.0").unwrap();
        assert!(v.members.contains(&Equivalent(one)));
        let obj: Value = serde_json::from_str(r#"{"x": [1.00]}"#).unwrap();
        assert!(v.members.contains(&Equivalent(obj)));
        assert!(!v.members.contains(&Equivalent(json!("1"))));
    }
}

//! Array keywords: `items`, `additionalItems`, `minItems`, `maxItems`, `uniqueItems`.

use std::collections::HashSet;

use serde_json::{json, Value};

use super::{
    check_bool_or_schema, check_non_negative_integer, check_schema_or_array, check_type,
    collect_single, collect_single_or_array, construction_error, count_of, Keyword,
    KeywordValidator,
};
use crate::equivalence::Equivalent;
use crate::error::ProcessingError;
use crate::processor::{FullData, ValidationContext};
use crate::report::ProcessingReport;
use crate::types::{NodeType, NodeTypeSet};

// --- items ---

pub(crate) fn items() -> Keyword {
    Keyword::new("items")
        .with_syntax(check_schema_or_array)
        .with_collector(collect_single_or_array("items"))
        .with_validator(NodeTypeSet::ARRAY, digest_items, ItemsValidator::from_digest)
}

fn digest_items(schema: &Value) -> Value {
    match schema.get("items") {
        Some(Value::Array(tuple)) => json!({"array": true, "count": tuple.len()}),
        _ => json!({"array": false, "count": 0}),
    }
}

/// Validates elements covered by `items`; the rest belongs to `additionalItems`.
#[derive(Debug)]
pub(crate) struct ItemsValidator {
    tuple: Option<usize>,
}

impl ItemsValidator {
    fn from_digest(digest: &Value) -> Result<Self, ProcessingError> {
        let array = digest
            .get("array")
            .and_then(Value::as_bool)
            .ok_or_else(|| construction_error("items", "digest lacks the array flag"))?;
        let count = digest.get("count").and_then(Value::as_u64).unwrap_or(0) as usize;
        Ok(Self {
            tuple: array.then_some(count),
        })
    }
}

impl KeywordValidator for ItemsValidator {
    fn validate(&self, ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(elements) = data.instance.value.as_array() else {
            return;
        };
        let items = data.schema.append("items");
        match self.tuple {
            Some(count) => {
                for (index, element) in elements.iter().enumerate().take(count) {
                    let child = data.instance.child(index.to_string(), element);
                    ctx.validate(report, &items.append(index.to_string()), &child);
                }
            }
            None => {
                for (index, element) in elements.iter().enumerate() {
                    let child = data.instance.child(index.to_string(), element);
                    ctx.validate(report, &items, &child);
                }
            }
        }
    }
}

// --- additionalItems ---

pub(crate) fn additional_items() -> Keyword {
    Keyword::new("additionalItems")
        .with_syntax(check_bool_or_schema)
        .with_collector(collect_single("additionalItems"))
        .with_validator(NodeTypeSet::ARRAY, digest_additional_items, AdditionalItemsValidator::from_digest)
}

/// Only meaningful next to an array-form `items`; otherwise every element is
/// already covered and the digest says so.
fn digest_additional_items(schema: &Value) -> Value {
    match schema.get("items") {
        Some(Value::Array(tuple)) => {
            let additional = schema.get("additionalItems");
            json!({
                "allowed": additional != Some(&Value::Bool(false)),
                "schema": additional.is_some_and(Value::is_object),
                "count": tuple.len(),
            })
        }
        _ => json!({"allowed": true, "schema": false, "count": 0}),
    }
}

#[derive(Debug)]
pub(crate) struct AdditionalItemsValidator {
    allowed: bool,
    schema: bool,
    count: usize,
}

impl AdditionalItemsValidator {
    fn from_digest(digest: &Value) -> Result<Self, ProcessingError> {
        let flag = |name: &str| {
            digest
                .get(name)
                .and_then(Value::as_bool)
                .ok_or_else(|| construction_error("additionalItems", format!("digest lacks \"{}\"", name)))
        };
        Ok(Self {
            allowed: flag("allowed")?,
            schema: flag("schema")?,
            count: digest.get("count").and_then(Value::as_u64).unwrap_or(0) as usize,
        })
    }
}

impl KeywordValidator for AdditionalItemsValidator {
    fn validate(&self, ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(elements) = data.instance.value.as_array() else {
            return;
        };
        if elements.len() <= self.count {
            return;
        }
        if !self.allowed {
            report.log(
                data.message(
                    "additionalItems",
                    "additionalItems.notAllowed",
                    format!(
                        "array is too long (allowed: {}, found: {})",
                        self.count,
                        elements.len()
                    ),
                )
                .put("allowed", self.count)
                .put("found", elements.len()),
            );
            return;
        }
        if self.schema {
            let additional = data.schema.append("additionalItems");
            for (index, element) in elements.iter().enumerate().skip(self.count) {
                let child = data.instance.child(index.to_string(), element);
                ctx.validate(report, &additional, &child);
            }
        }
    }
}

// --- minItems / maxItems ---

pub(crate) fn min_items() -> Keyword {
    size_keyword("minItems", false)
}

pub(crate) fn max_items() -> Keyword {
    size_keyword("maxItems", true)
}

fn size_keyword(name: &'static str, upper: bool) -> Keyword {
    Keyword::new(name)
        .with_syntax(check_non_negative_integer)
        .with_validator(NodeTypeSet::ARRAY, super::value_digester(name), move |digest| {
            let limit = count_of(digest).ok_or_else(|| construction_error(name, "size is not a non-negative integer"))?;
            Ok(SizeValidator { keyword: name, limit, upper })
        })
}

#[derive(Debug)]
pub(crate) struct SizeValidator {
    keyword: &'static str,
    limit: u64,
    upper: bool,
}

impl KeywordValidator for SizeValidator {
    fn validate(&self, _ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(elements) = data.instance.value.as_array() else {
            return;
        };
        let size = elements.len() as u64;
        let (failed, key, text) = if self.upper {
            (size > self.limit, "maxItems.tooMany", "array has too many items")
        } else {
            (size < self.limit, "minItems.tooFew", "array has too few items")
        };
        if failed {
            report.log(
                data.message(self.keyword, key, format!("{} (required: {}, found: {})", text, self.limit, size))
                    .put(self.keyword, self.limit)
                    .put("found", size),
            );
        }
    }
}

// --- uniqueItems ---

pub(crate) fn unique_items() -> Keyword {
    Keyword::new("uniqueItems")
        .with_syntax(|ctx, report| {
            check_type(ctx, report, &[NodeType::Boolean]);
        })
        .with_validator(
            NodeTypeSet::ARRAY,
            |schema| Value::Bool(schema.get("uniqueItems") == Some(&Value::Bool(true))),
            |digest| {
                Ok(UniqueItemsValidator {
                    enabled: digest.as_bool().unwrap_or(false),
                })
            },
        )
}

#[derive(Debug)]
pub(crate) struct UniqueItemsValidator {
    enabled: bool,
}

impl KeywordValidator for UniqueItemsValidator {
    fn validate(&self, _ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        if !self.enabled {
            return;
        }
        let Some(elements) = data.instance.value.as_array() else {
            return;
        };
        let mut seen = HashSet::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            if !seen.insert(Equivalent(element.clone())) {
                report.log(
                    data.message("uniqueItems", "uniqueItems.duplicate", "array must not contain duplicate elements")
                        .put("index", index),
                );
                return;
            }
        }
    }
}

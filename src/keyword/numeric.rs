//! Numeric keywords: `minimum`, `maximum`, their exclusive flags, `multipleOf`.

use serde_json::{json, Value};

use super::{check_type, construction_error, number_of, Keyword, KeywordValidator, SyntaxContext};
use crate::error::ProcessingError;
use crate::number::Decimal;
use crate::processor::{FullData, ValidationContext};
use crate::report::ProcessingReport;
use crate::types::{NodeType, NodeTypeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Lower,
    Upper,
}

impl Bound {
    fn keyword(self) -> &'static str {
        match self {
            Bound::Lower => "minimum",
            Bound::Upper => "maximum",
        }
    }

    fn exclusive_keyword(self) -> &'static str {
        match self {
            Bound::Lower => "exclusiveMinimum",
            Bound::Upper => "exclusiveMaximum",
        }
    }
}

pub(crate) fn minimum() -> Keyword {
    bound_keyword(Bound::Lower)
}

pub(crate) fn maximum() -> Keyword {
    bound_keyword(Bound::Upper)
}

fn bound_keyword(bound: Bound) -> Keyword {
    Keyword::new(bound.keyword())
        .with_syntax(|ctx, report| {
            check_type(ctx, report, &[NodeType::Number]);
        })
        .with_validator(
            NodeTypeSet::NUMERIC,
            move |schema| {
                json!({
                    (bound.keyword()): schema.get(bound.keyword()).cloned().unwrap_or(Value::Null),
                    "exclusive": schema.get(bound.exclusive_keyword()) == Some(&Value::Bool(true)),
                })
            },
            move |digest| BoundValidator::from_digest(bound, digest),
        )
}

/// `exclusiveMinimum` / `exclusiveMaximum`: a boolean next to its bound.
pub(crate) fn exclusive_minimum() -> Keyword {
    exclusive_flag(Bound::Lower)
}

pub(crate) fn exclusive_maximum() -> Keyword {
    exclusive_flag(Bound::Upper)
}

fn exclusive_flag(bound: Bound) -> Keyword {
    Keyword::new(bound.exclusive_keyword()).with_syntax(move |ctx, report| {
        if !check_type(ctx, report, &[NodeType::Boolean]) {
            return;
        }
        if ctx.schema().get(bound.keyword()).is_none() {
            report.log(
                ctx.error(
                    &format!("{}.missingBound", bound.exclusive_keyword()),
                    format!("\"{}\" requires \"{}\"", bound.exclusive_keyword(), bound.keyword()),
                )
                .put("required", bound.keyword()),
            );
        }
    })
}

#[derive(Debug)]
pub(crate) struct BoundValidator {
    bound: Bound,
    limit: Decimal,
    limit_value: Value,
    exclusive: bool,
}

impl BoundValidator {
    fn from_digest(bound: Bound, digest: &Value) -> Result<Self, ProcessingError> {
        let limit_value = digest.get(bound.keyword()).cloned().unwrap_or(Value::Null);
        let limit = number_of(&limit_value)
            .ok_or_else(|| construction_error(bound.keyword(), "bound is not a number"))?;
        Ok(Self {
            bound,
            limit,
            limit_value,
            exclusive: digest.get("exclusive").and_then(Value::as_bool).unwrap_or(false),
        })
    }
}

impl KeywordValidator for BoundValidator {
    fn validate(&self, _ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(value) = number_of(data.instance.value) else {
            return;
        };
        let ordering = value.cmp(&self.limit);
        let (violated, equal) = match self.bound {
            Bound::Lower => (ordering.is_lt(), ordering.is_eq()),
            Bound::Upper => (ordering.is_gt(), ordering.is_eq()),
        };
        let keyword = self.bound.keyword();
        let message = if violated {
            let (key, text) = match self.bound {
                Bound::Lower => ("minimum.tooSmall", "numeric instance is lower than the required minimum"),
                Bound::Upper => ("maximum.tooLarge", "numeric instance is greater than the required maximum"),
            };
            data.message(keyword, key, format!("{} ({}: {}, found: {})", text, keyword, self.limit_value, data.instance.value))
        } else if equal && self.exclusive {
            let (key, text) = match self.bound {
                Bound::Lower => ("minimum.notExclusive", "numeric instance is not strictly greater than the required minimum"),
                Bound::Upper => ("maximum.notExclusive", "numeric instance is not strictly lower than the required maximum"),
            };
            data.message(keyword, key, format!("{} {}", text, self.limit_value))
                .put(self.bound.exclusive_keyword(), true)
        } else {
            return;
        };
        report.log(
            message
                .put(keyword, self.limit_value.clone())
                .put("found", data.instance.value.clone()),
        );
    }
}

/// `multipleOf`; draft-03's `divisibleBy` shares the implementation.
pub(crate) fn multiple_of() -> Keyword {
    divisor_keyword("multipleOf")
}

pub(crate) fn divisor_keyword(name: &'static str) -> Keyword {
    Keyword::new(name)
        .with_syntax(check_divisor)
        .with_validator(NodeTypeSet::NUMERIC, super::value_digester(name), move |digest| {
            MultipleValidator::from_digest(name, digest)
        })
}

fn check_divisor(ctx: &SyntaxContext<'_>, report: &mut ProcessingReport) {
    if !check_type(ctx, report, &[NodeType::Number]) {
        return;
    }
    let positive = number_of(ctx.value()).is_some_and(|d| !d.is_zero() && !d.is_negative());
    if !positive {
        report.log(
            ctx.error("common.divisor.notPositive", "divisor must be strictly greater than 0")
                .put("found", ctx.value().clone()),
        );
    }
}

#[derive(Debug)]
pub(crate) struct MultipleValidator {
    keyword: &'static str,
    divisor: Decimal,
    divisor_value: Value,
}

impl MultipleValidator {
    fn from_digest(keyword: &'static str, digest: &Value) -> Result<Self, ProcessingError> {
        let divisor = number_of(digest).ok_or_else(|| construction_error(keyword, "divisor is not a number"))?;
        if divisor.is_zero() || divisor.is_negative() {
            return Err(construction_error(keyword, "divisor must be strictly greater than 0"));
        }
        Ok(Self {
            keyword,
            divisor,
            divisor_value: digest.clone(),
        })
    }
}

impl KeywordValidator for MultipleValidator {
    fn validate(&self, _ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(value) = number_of(data.instance.value) else {
            return;
        };
        if value.is_multiple_of(&self.divisor) {
            return;
        }
        report.log(
            data.message(
                self.keyword,
                &format!("{}.notMultiple", self.keyword),
                format!("remainder of division is not zero ({} / {})", data.instance.value, self.divisor_value),
            )
            .put("divisor", self.divisor_value.clone())
            .put("found", data.instance.value.clone()),
        );
    }
}

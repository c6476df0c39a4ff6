//! String keywords: `minLength`, `maxLength`, `pattern`.

use fancy_regex::Regex;
use serde_json::Value;

use super::{
    check_non_negative_integer, check_type, construction_error, count_of, Keyword, KeywordValidator,
    SyntaxContext,
};
use crate::error::ProcessingError;
use crate::processor::{FullData, ValidationContext};
use crate::report::ProcessingReport;
use crate::types::{NodeType, NodeTypeSet};

/// A compiled schema regular expression.
///
/// Patterns are matched unanchored, as ECMA-262 `RegExp.prototype.test` does.
/// Lookaround and backreferences are supported; `\d` and `\w` match ASCII
/// only.
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// The pattern as written in the schema.
    pub(crate) fn as_str(&self) -> &str {
        &self.source
    }

    /// Exceeding the backtracking limit counts as no match.
    pub(crate) fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text).unwrap_or(false)
    }
}

/// Compile a schema regular expression.
pub(crate) fn compile_pattern(pattern: &str) -> Result<Pattern, fancy_regex::Error> {
    Ok(Pattern {
        source: pattern.to_string(),
        regex: Regex::new(&ascii_classes(pattern))?,
    })
}

/// Rewrite `\d`, `\D`, `\w` and `\W` into their ASCII ECMA-262 meaning.
///
/// Negated classes inside a bracket expression are left alone.
fn ascii_classes(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('d') => out.push_str(if in_class { "0-9" } else { "[0-9]" }),
                Some('D') if !in_class => out.push_str("[^0-9]"),
                Some('w') => out.push_str(if in_class { "0-9A-Za-z_" } else { "[0-9A-Za-z_]" }),
                Some('W') if !in_class => out.push_str("[^0-9A-Za-z_]"),
                Some(escaped) => {
                    out.push('\\');
                    out.push(escaped);
                }
                None => out.push('\\'),
            },
            '[' if !in_class => {
                in_class = true;
                out.push(c);
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Syntax check shared by every keyword whose value is a regex.
pub(crate) fn check_regex(ctx: &SyntaxContext<'_>, report: &mut ProcessingReport, pattern: &str) {
    if let Err(e) = compile_pattern(pattern) {
        report.log(
            ctx.error("common.invalidRegex", format!("invalid regular expression \"{}\": {}", pattern, e))
                .put("value", pattern),
        );
    }
}

pub(crate) fn min_length() -> Keyword {
    length_keyword("minLength", false)
}

pub(crate) fn max_length() -> Keyword {
    length_keyword("maxLength", true)
}

fn length_keyword(name: &'static str, upper: bool) -> Keyword {
    Keyword::new(name)
        .with_syntax(check_non_negative_integer)
        .with_validator(NodeTypeSet::STRING, super::value_digester(name), move |digest| {
            let limit = count_of(digest).ok_or_else(|| construction_error(name, "length is not a non-negative integer"))?;
            Ok(LengthValidator { keyword: name, limit, upper })
        })
}

#[derive(Debug)]
pub(crate) struct LengthValidator {
    keyword: &'static str,
    limit: u64,
    upper: bool,
}

impl KeywordValidator for LengthValidator {
    fn validate(&self, _ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(s) = data.instance.value.as_str() else {
            return;
        };
        // Length in Unicode code points, not bytes.
        let length = s.chars().count() as u64;
        let (failed, key, text) = if self.upper {
            (length > self.limit, "maxLength.tooLong", "string is too long")
        } else {
            (length < self.limit, "minLength.tooShort", "string is too short")
        };
        if failed {
            report.log(
                data.message(
                    self.keyword,
                    key,
                    format!("{} (length: {}, {}: {})", text, length, self.keyword, self.limit),
                )
                .put("value", s)
                .put("found", length)
                .put(self.keyword, self.limit),
            );
        }
    }
}

pub(crate) fn pattern() -> Keyword {
    Keyword::new("pattern")
        .with_syntax(|ctx, report| {
            if check_type(ctx, report, &[NodeType::String]) {
                if let Some(p) = ctx.value().as_str() {
                    check_regex(ctx, report, p);
                }
            }
        })
        .with_validator(NodeTypeSet::STRING, super::value_digester("pattern"), PatternValidator::from_digest)
}

#[derive(Debug)]
pub(crate) struct PatternValidator {
    regex: Pattern,
}

impl PatternValidator {
    fn from_digest(digest: &Value) -> Result<Self, ProcessingError> {
        let source = digest
            .as_str()
            .ok_or_else(|| construction_error("pattern", "pattern is not a string"))?;
        let regex = compile_pattern(source).map_err(|e| construction_error("pattern", e.to_string()))?;
        Ok(Self { regex })
    }
}

impl KeywordValidator for PatternValidator {
    fn validate(&self, _ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(s) = data.instance.value.as_str() else {
            return;
        };
        if !self.regex.is_match(s) {
            report.log(
                data.message(
                    "pattern",
                    "pattern.noMatch",
                    format!("ECMA 262 regex \"{}\" does not match input string \"{}\"", self.regex.as_str(), s),
                )
                .put("regex", self.regex.as_str())
                .put("string", s),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pattern_is_unanchored() {
        let v = PatternValidator::from_digest(&json!("b+")).unwrap();
        assert!(v.regex.is_match("abbbc"));
        assert!(!v.regex.is_match("ac"));
    }

    #[test]
    fn lookaround_and_backreferences_compile() {
        let v = PatternValidator::from_digest(&json!("^(?!foo)")).unwrap();
        assert!(v.regex.is_match("bar"));
        assert!(!v.regex.is_match("food"));
        assert!(compile_pattern(r"(a)\1").unwrap().is_match("xaax"));
    }

    #[test]
    fn digit_and_word_classes_are_ascii() {
        let digits = compile_pattern(r"^\d+$").unwrap();
        assert!(digits.is_match("042"));
        assert!(!digits.is_match("\u{0663}"));
        assert!(compile_pattern(r"^[\d.]+$").unwrap().is_match("1.5"));
        assert!(!compile_pattern(r"^\w$").unwrap().is_match("é"));
        assert_eq!(compile_pattern(r"\d").unwrap().as_str(), r"\d");
    }

    #[test]
    fn bad_pattern_fails_construction() {
        let err = PatternValidator::from_digest(&json!("(")).unwrap_err();
        assert!(matches!(err, ProcessingError::Construction { ref keyword, .. } if keyword == "pattern"));
    }

    #[test]
    fn length_digest_is_the_count() {
        let kw = min_length();
        let descriptor = kw.descriptor().unwrap();
        assert_eq!(descriptor.digest(&json!({"minLength": 2, "pattern": "x"})), json!(2));
        assert!(descriptor.build(&json!(-1)).is_err());
        assert!(descriptor.build(&json!(2)).is_ok());
    }
}

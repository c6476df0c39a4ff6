//! Combining keywords: `allOf`, `anyOf`, `oneOf`, `not`.
//!
//! Every branch is validated into its own forked report. Branch reports are
//! kept whole in the failure message so a caller can tell which branch
//! failed and why.

use serde_json::{json, Value};

use super::{
    check_schema_array, check_type, collect_array, collect_single, construction_error, Keyword,
    KeywordValidator,
};
use crate::processor::{FullData, ValidationContext};
use crate::report::ProcessingReport;
use crate::tree::SchemaTree;
use crate::types::{NodeType, NodeTypeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    All,
    Any,
    One,
}

impl Mode {
    fn keyword(self) -> &'static str {
        match self {
            Mode::All => "allOf",
            Mode::Any => "anyOf",
            Mode::One => "oneOf",
        }
    }
}

pub(crate) fn all_of() -> Keyword {
    branches_keyword(Mode::All)
}

pub(crate) fn any_of() -> Keyword {
    branches_keyword(Mode::Any)
}

pub(crate) fn one_of() -> Keyword {
    branches_keyword(Mode::One)
}

fn branches_keyword(mode: Mode) -> Keyword {
    let name = mode.keyword();
    Keyword::new(name)
        .with_syntax(check_schema_array)
        .with_collector(collect_array(name))
        .with_validator(
            NodeTypeSet::ALL,
            move |schema| {
                let count = schema.get(name).and_then(Value::as_array).map_or(0, Vec::len);
                json!({ "count": count })
            },
            move |digest| {
                let count = digest
                    .get("count")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| construction_error(name, "digest lacks the branch count"))?;
                Ok(BranchesValidator {
                    mode,
                    count: count as usize,
                })
            },
        )
}

/// Runs each branch in a forked report, returning the branch reports.
pub(crate) fn run_branches(
    ctx: &mut ValidationContext<'_>,
    report: &ProcessingReport,
    data: &FullData<'_>,
    base: &SchemaTree,
    count: usize,
) -> Vec<ProcessingReport> {
    (0..count)
        .map(|index| {
            let mut branch = report.fork();
            ctx.validate(&mut branch, &base.append(index.to_string()), &data.instance);
            branch
        })
        .collect()
}

/// Branch reports keyed by the branch's schema pointer.
pub(crate) fn branch_reports(base: &SchemaTree, reports: &[ProcessingReport]) -> Value {
    let map = reports
        .iter()
        .enumerate()
        .map(|(index, r)| (base.pointer().append(index.to_string()).to_string(), r.to_value()))
        .collect::<serde_json::Map<_, _>>();
    Value::Object(map)
}

#[derive(Debug)]
pub(crate) struct BranchesValidator {
    mode: Mode,
    count: usize,
}

impl KeywordValidator for BranchesValidator {
    fn validate(&self, ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let keyword = self.mode.keyword();
        let base = data.schema.append(keyword);
        match self.mode {
            Mode::All => {
                for branch in run_branches(ctx, report, data, &base, self.count) {
                    report.merge(branch);
                }
            }
            Mode::Any => {
                let mut failures = Vec::with_capacity(self.count);
                for index in 0..self.count {
                    let mut branch = report.fork();
                    ctx.validate(&mut branch, &base.append(index.to_string()), &data.instance);
                    if branch.success() {
                        for failure in failures.into_iter().filter(ProcessingReport::has_fatal) {
                            report.merge(failure);
                        }
                        return;
                    }
                    failures.push(branch);
                }
                report.log(
                    data.message(
                        keyword,
                        "anyOf.noMatch",
                        format!("instance failed to match any of the {} schemas", self.count),
                    )
                    .put("nrSchemas", self.count)
                    .put("reports", branch_reports(&base, &failures)),
                );
                for failure in failures.into_iter().filter(ProcessingReport::has_fatal) {
                    report.merge(failure);
                }
            }
            Mode::One => {
                let branches = run_branches(ctx, report, data, &base, self.count);
                let matched: Vec<usize> = branches
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.success())
                    .map(|(i, _)| i)
                    .collect();
                if matched.len() == 1 {
                    for branch in branches.into_iter().filter(ProcessingReport::has_fatal) {
                        report.merge(branch);
                    }
                    return;
                }
                report.log(
                    data.message(
                        keyword,
                        "oneOf.fail",
                        format!(
                            "instance failed to match exactly one schema (matched {} out of {})",
                            matched.len(),
                            self.count
                        ),
                    )
                    .put("matched", matched)
                    .put("nrSchemas", self.count)
                    .put("reports", branch_reports(&base, &branches)),
                );
                for branch in branches.into_iter().filter(ProcessingReport::has_fatal) {
                    report.merge(branch);
                }
            }
        }
    }
}

// --- not ---

pub(crate) fn not() -> Keyword {
    Keyword::new("not")
        .with_syntax(|ctx, report| {
            check_type(ctx, report, &[NodeType::Object]);
        })
        .with_collector(collect_single("not"))
        .with_validator(NodeTypeSet::ALL, |_| json!({}), |_| Ok(NotValidator))
}

#[derive(Debug)]
pub(crate) struct NotValidator;

impl KeywordValidator for NotValidator {
    fn validate(&self, ctx: &mut ValidationContext<'_>, report: &mut ProcessingReport, data: &FullData<'_>) {
        let mut branch = report.fork();
        ctx.validate(&mut branch, &data.schema.append("not"), &data.instance);
        if branch.has_fatal() {
            report.merge(branch);
            return;
        }
        if branch.success() {
            report.log(data.message("not", "not.fail", "instance matched a schema which it should not"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_digest_is_the_count() {
        let kw = one_of();
        let descriptor = kw.descriptor().unwrap();
        assert_eq!(
            descriptor.digest(&json!({"oneOf": [{"type": "string"}, {"minimum": 3}]})),
            json!({"count": 2})
        );
        assert!(descriptor.build(&json!({})).is_err());
    }

    #[test]
    fn not_digest_is_constant() {
        let kw = not();
        let descriptor = kw.descriptor().unwrap();
        assert_eq!(
            descriptor.digest(&json!({"not": {"type": "string"}})),
            descriptor.digest(&json!({"not": {"minimum": 0}}))
        );
    }

    #[test]
    fn branch_reports_are_keyed_by_pointer() {
        let tree = SchemaTree::new(json!({"anyOf": [{}, {}]})).append("anyOf");
        let reports = vec![ProcessingReport::new(), ProcessingReport::new()];
        let value = branch_reports(&tree, &reports);
        assert_eq!(value, json!({"/anyOf/0": [], "/anyOf/1": []}));
    }
}

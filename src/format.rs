//! Format attributes for the `format` keyword.

use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use serde_json::Value;

use crate::keyword::string::compile_pattern;
use crate::processor::FullData;
use crate::report::ProcessingReport;
use crate::types::NodeTypeSet;

/// Semantic check named by a `format` value.
pub trait FormatAttribute: Send + Sync + fmt::Debug {
    /// Instance kinds this attribute applies to.
    fn kinds(&self) -> NodeTypeSet;

    fn validate(&self, report: &mut ProcessingReport, data: &FullData<'_>);
}

/// A string format decided by a predicate.
#[derive(Clone, Copy)]
pub struct StringFormat {
    name: &'static str,
    check: fn(&str) -> bool,
}

impl StringFormat {
    pub const fn new(name: &'static str, check: fn(&str) -> bool) -> Self {
        Self { name, check }
    }
}

impl fmt::Debug for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StringFormat").field(&self.name).finish()
    }
}

impl FormatAttribute for StringFormat {
    fn kinds(&self) -> NodeTypeSet {
        NodeTypeSet::STRING
    }

    fn validate(&self, report: &mut ProcessingReport, data: &FullData<'_>) {
        let Some(value) = data.instance.value.as_str() else {
            return;
        };
        if !(self.check)(value) {
            report.log(
                data.message(
                    "format",
                    "format.invalid",
                    format!("string \"{}\" is not a valid {}", value, self.name),
                )
                .put("attribute", self.name)
                .put("value", value),
            );
        }
    }
}

/// Format attributes by name.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    attributes: HashMap<String, Arc<dyn FormatAttribute>>,
}

impl FormatRegistry {
    /// Registry without any attribute.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the draft-04 attributes.
    pub fn with_defaults() -> Self {
        [
            StringFormat::new("date-time", is_date_time),
            StringFormat::new("email", is_email),
            StringFormat::new("hostname", is_hostname),
            StringFormat::new("ipv4", |s| s.parse::<Ipv4Addr>().is_ok()),
            StringFormat::new("ipv6", |s| s.parse::<Ipv6Addr>().is_ok()),
            StringFormat::new("uri", |s| url::Url::parse(s).is_ok()),
            StringFormat::new("regex", |s| compile_pattern(s).is_ok()),
        ]
        .into_iter()
        .fold(Self::empty(), |registry, format| {
            registry.register(format.name, Arc::new(format))
        })
    }

    /// Add or replace an attribute.
    pub fn register(mut self, name: impl Into<String>, attribute: Arc<dyn FormatAttribute>) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn FormatAttribute>> {
        self.attributes.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn is_date_time(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !s.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn is_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    !s.is_empty()
        && s.len() <= 253
        && s.split('.').all(|label| {
            (1..=63).contains(&label.len())
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

/// Value of the `format` member when it is a string.
pub(crate) fn attribute_name(schema: &Value) -> Option<&str> {
    schema.get("format").and_then(Value::as_str)
}

//! Diagnostics produced by schema processing.
//!
//! A [`ProcessingReport`] accumulates [`ProcessingMessage`]s. Its outcome is
//! derived from the highest level ever logged, independently of which
//! messages the report's threshold chose to keep.
//!
//! Fatal messages never clear what was logged before them: a report that saw
//! a fatal error still lists every earlier diagnostic, and merging a fatal
//! report into a clean one makes the result fatal.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::pointer::JsonPointer;

/// Severity of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        })
    }
}

/// What a message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Domain {
    /// The schema itself is malformed.
    Syntax,
    /// The instance does not conform, or a validator could not be built.
    Validation,
    /// A `$ref` could not be followed.
    RefResolution,
}

/// Location of the schema a message refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaLocation {
    #[serde(rename = "loadingURI")]
    pub loading_uri: String,
    pub pointer: JsonPointer,
}

/// A single diagnostic.
///
/// `key` is a stable dotted identifier (`"minimum.tooSmall"`) that renderers
/// can map to localized text; `message` is the default English rendering.
/// Keyword-specific parameters live in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMessage {
    level: LogLevel,
    domain: Domain,
    #[serde(skip_serializing_if = "Option::is_none")]
    keyword: Option<String>,
    key: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<SchemaLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance: Option<JsonPointer>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl ProcessingMessage {
    pub fn new(
        level: LogLevel,
        domain: Domain,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            domain,
            keyword: None,
            key: key.into(),
            message: message.into(),
            schema: None,
            instance: None,
            fields: Map::new(),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_schema(mut self, loading_uri: impl Into<String>, pointer: JsonPointer) -> Self {
        self.schema = Some(SchemaLocation {
            loading_uri: loading_uri.into(),
            pointer,
        });
        self
    }

    pub fn with_instance(mut self, pointer: JsonPointer) -> Self {
        self.instance = Some(pointer);
        self
    }

    /// Attach a named parameter.
    pub fn put(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn schema(&self) -> Option<&SchemaLocation> {
        self.schema.as_ref()
    }

    pub fn instance_pointer(&self) -> Option<&JsonPointer> {
        self.instance.as_ref()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// JSON rendering of this message.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for ProcessingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.level)?;
        if let Some(instance) = &self.instance {
            write!(f, "[{}] ", if instance.is_root() { "/".to_string() } else { instance.to_string() })?;
        }
        f.write_str(&self.message)
    }
}

/// Ordered collection of messages with success/fatal state.
#[derive(Debug, Clone)]
pub struct ProcessingReport {
    log_level: LogLevel,
    max_level: Option<LogLevel>,
    messages: Vec<ProcessingMessage>,
}

impl Default for ProcessingReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingReport {
    /// Empty report keeping messages of level info and above.
    pub fn new() -> Self {
        Self::with_log_level(LogLevel::Info)
    }

    /// Empty report keeping messages at or above `log_level`.
    pub fn with_log_level(log_level: LogLevel) -> Self {
        Self {
            log_level,
            max_level: None,
            messages: Vec::new(),
        }
    }

    /// Empty report with the same threshold, for sub-validations.
    pub fn fork(&self) -> Self {
        Self::with_log_level(self.log_level)
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Record a message.
    ///
    /// The report outcome always accounts for the message, even when it falls
    /// below the threshold and is not stored.
    pub fn log(&mut self, message: ProcessingMessage) {
        self.max_level = self.max_level.max(Some(message.level));
        if message.level >= self.log_level {
            self.messages.push(message);
        }
    }

    /// Append every message of `other`.
    pub fn merge(&mut self, other: ProcessingReport) {
        let threshold = self.log_level;
        self.max_level = self.max_level.max(other.max_level);
        self.messages
            .extend(other.messages.into_iter().filter(|m| m.level >= threshold));
    }

    /// True when nothing at error level or above was logged.
    pub fn success(&self) -> bool {
        self.max_level.map_or(true, |level| level < LogLevel::Error)
    }

    pub fn has_fatal(&self) -> bool {
        self.max_level == Some(LogLevel::Fatal)
    }

    /// Highest level logged so far.
    pub fn max_level(&self) -> Option<LogLevel> {
        self.max_level
    }

    pub fn messages(&self) -> &[ProcessingMessage] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProcessingMessage> {
        self.messages.iter()
    }

    /// Messages at or above `level`.
    pub fn at_least(&self, level: LogLevel) -> impl Iterator<Item = &ProcessingMessage> {
        self.messages.iter().filter(move |m| m.level >= level)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<ProcessingMessage> {
        self.messages
    }

    /// JSON rendering of the stored messages.
    pub fn to_value(&self) -> Value {
        Value::Array(self.messages.iter().map(ProcessingMessage::to_value).collect())
    }
}

impl<'a> IntoIterator for &'a ProcessingReport {
    type Item = &'a ProcessingMessage;
    type IntoIter = std::slice::Iter<'a, ProcessingMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl Serialize for ProcessingReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ProcessingReport", 2)?;
        state.serialize_field("success", &self.success())?;
        state.serialize_field("messages", &self.messages)?;
        state.end()
    }
}

impl fmt::Display for ProcessingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.messages {
            writeln!(f, "{}", message)?;
        }
        Ok(())
    }
}

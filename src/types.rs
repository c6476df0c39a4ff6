//! Instance value kinds.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::number::Decimal;

/// Kind of a JSON value as seen by keyword dispatch.
///
/// A number is an [`NodeType::Integer`] when it is mathematically integral,
/// whatever its textual form (`1`, `1.0` and `1e0` are all integers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl NodeType {
    pub const ALL: [NodeType; 7] = [
        NodeType::Array,
        NodeType::Boolean,
        NodeType::Integer,
        NodeType::Null,
        NodeType::Number,
        NodeType::Object,
        NodeType::String,
    ];

    /// Returns the kind of `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => NodeType::Null,
            Value::Bool(_) => NodeType::Boolean,
            Value::Number(n) => match Decimal::from_number(n) {
                Some(d) if d.is_integer() => NodeType::Integer,
                _ => NodeType::Number,
            },
            Value::String(_) => NodeType::String,
            Value::Array(_) => NodeType::Array,
            Value::Object(_) => NodeType::Object,
        }
    }

    /// Returns the JSON Schema name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Array => "array",
            NodeType::Boolean => "boolean",
            NodeType::Integer => "integer",
            NodeType::Null => "null",
            NodeType::Number => "number",
            NodeType::Object => "object",
            NodeType::String => "string",
        }
    }

    /// Parse a JSON Schema type name.
    ///
    /// Returns `None` for unknown names (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        NodeType::ALL.into_iter().find(|t| t.name() == s)
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the JSON type name for messages.
pub fn json_type_name(value: &Value) -> &'static str {
    NodeType::of(value).name()
}

/// Set of [`NodeType`]s a keyword applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeTypeSet(u8);

impl NodeTypeSet {
    pub const EMPTY: NodeTypeSet = NodeTypeSet(0);
    pub const ALL: NodeTypeSet = NodeTypeSet(0b111_1111);
    pub const NUMERIC: NodeTypeSet =
        NodeTypeSet((1 << NodeType::Integer as u8) | (1 << NodeType::Number as u8));
    pub const STRING: NodeTypeSet = NodeTypeSet(1 << NodeType::String as u8);
    pub const ARRAY: NodeTypeSet = NodeTypeSet(1 << NodeType::Array as u8);
    pub const OBJECT: NodeTypeSet = NodeTypeSet(1 << NodeType::Object as u8);

    pub fn of(types: &[NodeType]) -> Self {
        types.iter().fold(Self::EMPTY, |set, t| set.with(*t))
    }

    pub fn with(self, t: NodeType) -> Self {
        NodeTypeSet(self.0 | t.bit())
    }

    pub fn contains(self, t: NodeType) -> bool {
        self.0 & t.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = NodeType> {
        NodeType::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}

//! JSON Pointer (RFC 6901).

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::ProcessingError;

/// Path from a document root to one of its nodes.
///
/// Tokens are stored unescaped; the empty pointer is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    pub fn root() -> Self {
        Self::default()
    }

    /// Pointer made of the given raw tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the string form (`""`, `"/a/b~1c"`).
    ///
    /// # Errors
    ///
    /// Returns `ProcessingError::InvalidPointer` when a non-empty pointer does
    /// not start with `/` or contains an illegal escape.
    pub fn parse(s: &str) -> Result<Self, ProcessingError> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = s.strip_prefix('/') else {
            return Err(ProcessingError::InvalidPointer {
                pointer: s.to_string(),
                message: "must be empty or start with '/'".to_string(),
            });
        };
        let tokens = rest
            .split('/')
            .map(|raw| unescape(raw).ok_or_else(|| ProcessingError::InvalidPointer {
                pointer: s.to_string(),
                message: format!("illegal escape in token \"{}\"", raw),
            }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tokens })
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// New pointer with `token` appended.
    pub fn append(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Self { tokens }
    }

    /// New pointer with every token of `other` appended.
    pub fn join(&self, other: &JsonPointer) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.extend(other.tokens.iter().cloned());
        Self { tokens }
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.tokens.split_last()?;
        Some(Self {
            tokens: init.to_vec(),
        })
    }

    /// True when `self` is `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &JsonPointer) -> bool {
        other.tokens.starts_with(&self.tokens)
    }

    /// Node designated by this pointer, if any.
    ///
    /// Array tokens must be canonical decimal indices.
    pub fn resolve<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.tokens.iter().try_fold(root, |node, token| match node {
            Value::Object(map) => map.get(token),
            Value::Array(items) => parse_index(token).and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn resolve_mut<'v>(&self, root: &'v mut Value) -> Option<&'v mut Value> {
        self.tokens.iter().try_fold(root, |node, token| match node {
            Value::Object(map) => map.get_mut(token),
            Value::Array(items) => parse_index(token).and_then(move |i| items.get_mut(i)),
            _ => None,
        })
    }
}

fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", token.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_and_display() {
        let p = JsonPointer::parse("/a~1b/c~0d/0").unwrap();
        assert_eq!(p.tokens(), ["a/b", "c~d", "0"]);
        assert_eq!(p.to_string(), "/a~1b/c~0d/0");
        assert!(JsonPointer::parse("").unwrap().is_root());
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(matches!(
            JsonPointer::parse("a/b"),
            Err(ProcessingError::InvalidPointer { .. })
        ));
        assert!(JsonPointer::parse("/a~2").is_err());
    }

    #[test]
    fn resolve_objects_and_arrays() {
        let doc = json!({"items": [{"x": 1}, {"x": 2}], "": "empty"});
        let p = JsonPointer::parse("/items/1/x").unwrap();
        assert_eq!(p.resolve(&doc), Some(&json!(2)));
        assert_eq!(JsonPointer::parse("/").unwrap().resolve(&doc), Some(&json!("empty")));
        assert_eq!(JsonPointer::parse("/items/01").unwrap().resolve(&doc), None);
        assert_eq!(JsonPointer::parse("/items/5").unwrap().resolve(&doc), None);
    }

    #[test]
    fn resolve_mut_replaces_node() {
        let mut doc = json!({"a": [1, 2]});
        *JsonPointer::parse("/a/0").unwrap().resolve_mut(&mut doc).unwrap() = json!("x");
        assert_eq!(doc, json!({"a": ["x", 2]}));
    }

    #[test]
    fn append_join_parent() {
        let p = JsonPointer::root().append("properties").append("a");
        assert_eq!(p.to_string(), "/properties/a");
        assert_eq!(p.parent().unwrap().to_string(), "/properties");
        assert!(JsonPointer::root().parent().is_none());
        let q = JsonPointer::from_tokens(["items", "0"]);
        assert_eq!(p.join(&q).to_string(), "/properties/a/items/0");
        assert!(p.is_prefix_of(&p.join(&q)));
        assert!(!q.is_prefix_of(&p));
    }
}

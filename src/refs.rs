//! JSON references: a document locator plus a fragment.

use std::fmt;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::ProcessingError;
use crate::pointer::JsonPointer;

/// A parsed reference URI.
///
/// The locator identifies a document (`None` for an anonymous schema that was
/// not loaded from a URI); the fragment is kept in its raw, percent-encoded
/// form and turned into a [`JsonPointer`] on demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JsonRef {
    locator: Option<Url>,
    fragment: String,
}

impl JsonRef {
    /// The reference of an anonymous document root.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Reference to the root of the document at `url`.
    pub fn from_url(url: &Url) -> Self {
        let mut locator = url.clone();
        let fragment = locator.fragment().unwrap_or_default().to_string();
        locator.set_fragment(None);
        Self {
            locator: Some(locator),
            fragment,
        }
    }

    /// Parse an absolute URI or a fragment-only reference.
    ///
    /// # Errors
    ///
    /// Returns `ProcessingError::InvalidRef` for relative references, which
    /// need a base to resolve against.
    pub fn parse(s: &str) -> Result<Self, ProcessingError> {
        if s.is_empty() {
            return Ok(Self::anonymous());
        }
        if let Some(fragment) = s.strip_prefix('#') {
            return Ok(Self {
                locator: None,
                fragment: fragment.to_string(),
            });
        }
        Url::parse(s)
            .map(|url| Self::from_url(&url))
            .map_err(|e| ProcessingError::InvalidRef {
                reference: s.to_string(),
                message: e.to_string(),
            })
    }

    /// Resolve `reference` against this reference taken as a base URI.
    ///
    /// # Errors
    ///
    /// Returns `ProcessingError::InvalidRef` when the reference is malformed,
    /// or relative while this base is anonymous.
    pub fn resolve(&self, reference: &str) -> Result<JsonRef, ProcessingError> {
        if let Some(fragment) = reference.strip_prefix('#') {
            return Ok(Self {
                locator: self.locator.clone(),
                fragment: fragment.to_string(),
            });
        }
        if reference.is_empty() {
            return Ok(Self {
                locator: self.locator.clone(),
                fragment: String::new(),
            });
        }
        match &self.locator {
            Some(base) => base
                .join(reference)
                .map(|url| Self::from_url(&url))
                .map_err(|e| ProcessingError::InvalidRef {
                    reference: reference.to_string(),
                    message: e.to_string(),
                }),
            None => Self::parse(reference).map_err(|_| ProcessingError::InvalidRef {
                reference: reference.to_string(),
                message: "relative reference in a schema without a base URI".to_string(),
            }),
        }
    }

    pub fn locator(&self) -> Option<&Url> {
        self.locator.as_ref()
    }

    /// Locator as a string, empty for an anonymous document.
    pub fn locator_string(&self) -> String {
        self.locator.as_ref().map(Url::to_string).unwrap_or_default()
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn is_anonymous(&self) -> bool {
        self.locator.is_none()
    }

    /// True when both references designate the same document.
    pub fn same_document(&self, other: &JsonRef) -> bool {
        self.locator == other.locator
    }

    /// Same document, no fragment.
    pub fn document(&self) -> JsonRef {
        Self {
            locator: self.locator.clone(),
            fragment: String::new(),
        }
    }

    /// Same document, with `pointer` as the fragment.
    pub fn at_pointer(&self, pointer: &JsonPointer) -> JsonRef {
        Self {
            locator: self.locator.clone(),
            fragment: pointer.to_string(),
        }
    }

    /// The fragment as a JSON Pointer.
    ///
    /// # Errors
    ///
    /// Returns `ProcessingError::InvalidPointer` when the fragment is not a
    /// pointer (plain-name fragments are not supported).
    pub fn pointer(&self) -> Result<JsonPointer, ProcessingError> {
        let decoded = percent_decode_str(&self.fragment)
            .decode_utf8()
            .map_err(|e| ProcessingError::InvalidPointer {
                pointer: self.to_string(),
                message: e.to_string(),
            })?;
        JsonPointer::parse(&decoded).map_err(|e| match e {
            ProcessingError::InvalidPointer { message, .. } => ProcessingError::InvalidPointer {
                pointer: self.to_string(),
                message,
            },
            other => other,
        })
    }
}

impl fmt::Display for JsonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(locator) = &self.locator {
            write!(f, "{}", locator)?;
        }
        write!(f, "#{}", self.fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fragment_only() {
        let r = JsonRef::parse("#/definitions/a").unwrap();
        assert!(r.is_anonymous());
        assert_eq!(r.fragment(), "/definitions/a");
        assert_eq!(r.to_string(), "#/definitions/a");
    }

    #[test]
    fn parse_absolute() {
        let r = JsonRef::parse("http://example.com/schema.json#/a").unwrap();
        assert_eq!(r.locator_string(), "http://example.com/schema.json");
        assert_eq!(r.fragment(), "/a");
        assert_eq!(r.to_string(), "http://example.com/schema.json#/a");
    }

    #[test]
    fn parse_relative_fails() {
        assert!(matches!(
            JsonRef::parse("other.json"),
            Err(ProcessingError::InvalidRef { .. })
        ));
    }

    #[test]
    fn resolve_against_base() {
        let base = JsonRef::parse("http://example.com/dir/root.json").unwrap();
        let r = base.resolve("types.json#/definitions/b").unwrap();
        assert_eq!(r.to_string(), "http://example.com/dir/types.json#/definitions/b");
        let local = base.resolve("#/x").unwrap();
        assert!(local.same_document(&base));
    }

    #[test]
    fn resolve_relative_against_anonymous_fails() {
        let base = JsonRef::anonymous();
        assert!(base.resolve("#/a").is_ok());
        assert!(base.resolve("other.json").is_err());
        assert!(base.resolve("http://example.com/x.json").is_ok());
    }

    #[test]
    fn pointer_is_percent_decoded() {
        let r = JsonRef::parse("#/definitions/a%20b").unwrap();
        assert_eq!(r.pointer().unwrap().tokens(), ["definitions", "a b"]);
        assert!(JsonRef::parse("#").unwrap().pointer().unwrap().is_root());
    }

    #[test]
    fn plain_name_fragment_is_an_invalid_pointer() {
        let err = JsonRef::parse("#plain").unwrap().pointer().unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidPointer { ref pointer, .. } if pointer == "#plain"));
        assert_eq!(err.key(), "refs.invalidPointer");
        assert!(JsonRef::parse("#/a%FF").unwrap().pointer().is_err());
    }

    #[test]
    fn at_pointer_normalizes_fragment() {
        let encoded = JsonRef::parse("http://example.com/s.json#/definitions/a%20b").unwrap();
        let normalized = encoded.document().at_pointer(&encoded.pointer().unwrap());
        assert_eq!(normalized.fragment(), "/definitions/a b");
        assert!(normalized.same_document(&encoded));
    }
}

//! Dialects: named registries of keyword behaviours.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::keyword::{array, combinator, common, draft3, numeric, object, string, Keyword, KeywordDescriptor};

/// Identifier of JSON Schema draft 4.
pub const DRAFT_V4: &str = "http://json-schema.org/draft-04/schema#";

/// Identifier of JSON Schema draft 3.
pub const DRAFT_V3: &str = "http://json-schema.org/draft-03/schema#";

/// Dialect identifiers compare without a trailing empty fragment.
pub fn normalize_id(id: &str) -> &str {
    id.strip_suffix('#').unwrap_or(id)
}

/// A keyword registry associated with a dialect identifier.
///
/// Immutable once built and shared read-only between validations.
#[derive(Debug, Clone)]
pub struct Dialect {
    id: String,
    keywords: BTreeMap<String, Keyword>,
}

impl Dialect {
    /// JSON Schema draft 4.
    pub fn draft_v4() -> Self {
        DialectBuilder::new(DRAFT_V4)
            .keywords(annotations())
            .keyword(common::type_v4())
            .keyword(common::enumeration())
            .keyword(combinator::all_of())
            .keyword(combinator::any_of())
            .keyword(combinator::one_of())
            .keyword(combinator::not())
            .keywords(numeric_keywords())
            .keyword(numeric::multiple_of())
            .keywords(string_keywords())
            .keywords(array_keywords())
            .keyword(object::required())
            .keyword(object::properties())
            .keyword(object::pattern_properties())
            .keyword(object::additional_properties())
            .keyword(object::min_properties())
            .keyword(object::max_properties())
            .keyword(object::dependencies(false))
            .build()
    }

    /// JSON Schema draft 3.
    pub fn draft_v3() -> Self {
        DialectBuilder::new(DRAFT_V3)
            .keywords(annotations())
            .keyword(draft3::type_v3())
            .keyword(draft3::disallow())
            .keyword(draft3::extends())
            .keyword(common::enumeration())
            .keywords(numeric_keywords())
            .keyword(numeric::divisor_keyword("divisibleBy"))
            .keywords(string_keywords())
            .keywords(array_keywords())
            .keyword(draft3::properties_v3())
            .keyword(draft3::required_v3())
            .keyword(object::pattern_properties())
            .keyword(object::additional_properties())
            .keyword(object::dependencies(true))
            .build()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when `id` names this dialect.
    pub fn matches(&self, id: &str) -> bool {
        normalize_id(&self.id) == normalize_id(id)
    }

    pub fn keyword(&self, name: &str) -> Option<&Keyword> {
        self.keywords.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keywords.contains_key(name)
    }

    /// Keywords in name order.
    pub fn keywords(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.values()
    }

    /// Descriptors of the keywords that validate instances.
    pub fn descriptors(&self) -> impl Iterator<Item = &KeywordDescriptor> {
        self.keywords.values().filter_map(Keyword::descriptor)
    }

    /// Keywords of `schema` that this dialect knows, in name order.
    pub fn present_in<'s>(&'s self, schema: &'s Value) -> impl Iterator<Item = &'s Keyword> + 's {
        let members = schema.as_object();
        self.keywords
            .values()
            .filter(move |k| members.is_some_and(|m| m.contains_key(k.name())))
    }
}

fn annotations() -> Vec<Keyword> {
    vec![
        common::string_annotation("$schema"),
        common::string_annotation("id"),
        common::string_annotation("title"),
        common::string_annotation("description"),
        common::default_value(),
        common::definitions(),
        common::reference(),
        common::format(),
    ]
}

fn numeric_keywords() -> Vec<Keyword> {
    vec![
        numeric::minimum(),
        numeric::maximum(),
        numeric::exclusive_minimum(),
        numeric::exclusive_maximum(),
    ]
}

fn string_keywords() -> Vec<Keyword> {
    vec![string::min_length(), string::max_length(), string::pattern()]
}

fn array_keywords() -> Vec<Keyword> {
    vec![
        array::items(),
        array::additional_items(),
        array::min_items(),
        array::max_items(),
        array::unique_items(),
    ]
}

/// Builds a [`Dialect`], either from scratch or on top of an existing one.
#[derive(Debug, Clone)]
pub struct DialectBuilder {
    id: String,
    keywords: BTreeMap<String, Keyword>,
}

impl DialectBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            keywords: BTreeMap::new(),
        }
    }

    /// Start from every keyword of `base`, under a new identifier.
    pub fn extending(id: impl Into<String>, base: &Dialect) -> Self {
        Self {
            id: id.into(),
            keywords: base.keywords.clone(),
        }
    }

    /// Register a keyword, replacing any keyword of the same name.
    pub fn keyword(mut self, keyword: Keyword) -> Self {
        self.keywords.insert(keyword.name().to_string(), keyword);
        self
    }

    pub fn keywords(self, keywords: impl IntoIterator<Item = Keyword>) -> Self {
        keywords.into_iter().fold(self, Self::keyword)
    }

    /// Drop a keyword; schemas using it then get an unknown-keyword warning.
    pub fn without(mut self, name: &str) -> Self {
        self.keywords.remove(name);
        self
    }

    pub fn build(self) -> Dialect {
        Dialect {
            id: self.id,
            keywords: self.keywords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_ignore_trailing_hash() {
        let dialect = Dialect::draft_v4();
        assert!(dialect.matches("http://json-schema.org/draft-04/schema"));
        assert!(dialect.matches(DRAFT_V4));
        assert!(!dialect.matches(DRAFT_V3));
    }

    #[test]
    fn draft_v4_keywords() {
        let dialect = Dialect::draft_v4();
        assert!(dialect.contains("multipleOf"));
        assert!(!dialect.contains("divisibleBy"));
        assert!(dialect.keyword("title").unwrap().descriptor().is_none());
        assert!(dialect.keyword("minimum").unwrap().descriptor().is_some());
        assert!(dialect.keyword("properties").unwrap().has_collector());
    }

    #[test]
    fn draft_v3_keywords() {
        let dialect = Dialect::draft_v3();
        assert!(dialect.contains("divisibleBy"));
        assert!(dialect.contains("disallow"));
        assert!(dialect.contains("extends"));
        assert!(!dialect.contains("allOf"));
        assert!(dialect.keyword("required").unwrap().descriptor().is_none());
    }

    #[test]
    fn builder_without_and_extending() {
        let custom = DialectBuilder::extending("urn:custom", &Dialect::draft_v4())
            .without("pattern")
            .keyword(Keyword::new("x-note"))
            .build();
        assert_eq!(custom.id(), "urn:custom");
        assert!(!custom.contains("pattern"));
        assert!(custom.contains("x-note"));
        assert!(custom.contains("minimum"));
    }

    #[test]
    fn present_in_is_sorted() {
        let dialect = Dialect::draft_v4();
        let schema = json!({"type": "integer", "minimum": 0, "x-unknown": 1, "enum": [1]});
        let names: Vec<&str> = dialect.present_in(&schema).map(Keyword::name).collect();
        assert_eq!(names, ["enum", "minimum", "type"]);
    }
}

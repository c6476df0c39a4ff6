//! Applicable keyword digests of one schema location.

use serde_json::Value;

use crate::dialect::Dialect;
use crate::types::{NodeType, NodeTypeSet};

/// Digest of one keyword at one schema location.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordDigest {
    pub keyword: String,
    pub kinds: NodeTypeSet,
    pub digest: Value,
}

/// Every validating keyword of a schema object, digested once.
///
/// Entries are sorted by keyword name, which fixes the order in which
/// validators are built and run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDigest {
    entries: Vec<KeywordDigest>,
}

impl SchemaDigest {
    /// Digest the keywords of `node` that `dialect` knows and validates with.
    pub fn compute(dialect: &Dialect, node: &Value) -> Self {
        let entries = dialect
            .present_in(node)
            .filter_map(|keyword| keyword.descriptor())
            .map(|descriptor| KeywordDigest {
                keyword: descriptor.name().to_string(),
                kinds: descriptor.kinds(),
                digest: descriptor.digest(node),
            })
            .collect();
        Self { entries }
    }

    /// Digests whose keyword applies to instances of `kind`.
    pub fn applicable(&self, kind: NodeType) -> impl Iterator<Item = &KeywordDigest> {
        self.entries.iter().filter(move |e| e.kinds.contains(kind))
    }

    pub fn entries(&self) -> &[KeywordDigest] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equivalence::equivalent;
    use serde_json::json;

    fn keywords(digest: &SchemaDigest, kind: NodeType) -> Vec<&str> {
        digest.applicable(kind).map(|e| e.keyword.as_str()).collect()
    }

    #[test]
    fn filters_by_instance_kind() {
        let dialect = Dialect::draft_v4();
        let schema = json!({"type": "integer", "minimum": 0, "pattern": "^a", "title": "n"});
        let digest = SchemaDigest::compute(&dialect, &schema);
        assert_eq!(digest.len(), 3);
        assert_eq!(keywords(&digest, NodeType::Integer), ["minimum", "type"]);
        assert_eq!(keywords(&digest, NodeType::String), ["pattern", "type"]);
        assert_eq!(keywords(&digest, NodeType::Null), ["type"]);
    }

    #[test]
    fn digests_are_deterministic() {
        let dialect = Dialect::draft_v4();
        let schema = json!({
            "properties": {"b": {}, "a": {}},
            "required": ["b", "a"],
            "dependencies": {"z": ["y", "x"], "c": {"type": "object"}}
        });
        let first = SchemaDigest::compute(&dialect, &schema);
        let _other = SchemaDigest::compute(&dialect, &json!({"minimum": 1}));
        let second = SchemaDigest::compute(&dialect, &schema);
        for (a, b) in first.entries().iter().zip(second.entries()) {
            assert!(equivalent(&a.digest, &b.digest));
        }
    }

    #[test]
    fn additional_properties_ignores_sibling_internals() {
        let dialect = Dialect::draft_v4();
        let one = json!({"properties": {"a": {"type": "string"}}, "additionalProperties": {"type": "integer"}});
        let two = json!({"properties": {"a": {"minLength": 3}}, "additionalProperties": {"maximum": 3}});
        let d1 = SchemaDigest::compute(&dialect, &one);
        let d2 = SchemaDigest::compute(&dialect, &two);
        let find = |d: &SchemaDigest| {
            d.entries()
                .iter()
                .find(|e| e.keyword == "additionalProperties")
                .map(|e| e.digest.clone())
        };
        assert_eq!(find(&d1), find(&d2));
    }

    #[test]
    fn numeric_representations_digest_equivalently() {
        let dialect = Dialect::draft_v4();
        let a: Value = serde_json::from_str(r#"{"maximum": 1, "exclusiveMaximum": true}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"maximum": 1.0, "exclusiveMaximum": true}"#).unwrap();
        let da = SchemaDigest::compute(&dialect, &a);
        let db = SchemaDigest::compute(&dialect, &b);
        assert!(equivalent(&da.entries()[0].digest, &db.entries()[0].digest));
    }
}

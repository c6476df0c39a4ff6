//! Schema walking and reference expansion through the public API.

use std::collections::HashSet;

use schemaproc::{
    equivalent, expand_references, validate, validate_schema, Dialect, JsonRef, LocationRecorder,
    ProcessingError, RefExpander, Rewrite, SchemaStore, SchemaTransform, SchemaTree, SchemaWalker,
    ValidationConfiguration,
};
use serde_json::{json, Value};

fn reference_free_schema() -> Value {
    json!({
        "title": "order",
        "type": "object",
        "definitions": {
            "money": {"type": "object", "properties": {"amount": {"type": "number"}}}
        },
        "properties": {
            "lines": {
                "type": "array",
                "items": [{"type": "string"}, {"allOf": [{"minimum": 0}, {"not": {"type": "null"}}]}],
                "additionalItems": {"type": "boolean"}
            },
            "status": {"enum": ["open", "closed"]}
        },
        "patternProperties": {"^x-": {}},
        "additionalProperties": {"anyOf": [{"type": "string"}, {"type": "integer"}]},
        "dependencies": {"a": ["b"], "c": {"required": ["d"]}}
    })
}

#[test]
fn expansion_without_references_is_a_no_op() {
    let schema = reference_free_schema();
    let tree = SchemaTree::new(schema.clone());
    let store = SchemaStore::default();
    let dialect = Dialect::draft_v4();
    let mut expander = RefExpander::new(&store, &tree);
    let mut recorder = LocationRecorder::default();

    let walked = SchemaWalker::new(&dialect)
        .walk(&tree, &mut expander, &mut recorder)
        .unwrap();

    assert!(equivalent(walked.root(), &schema));
    let visited: Vec<String> = recorder.locations.iter().map(ToString::to_string).collect();
    let unique: HashSet<&String> = visited.iter().collect();
    assert_eq!(unique.len(), visited.len());
    assert_eq!(
        visited,
        [
            "",
            "/additionalProperties",
            "/additionalProperties/anyOf/0",
            "/additionalProperties/anyOf/1",
            "/definitions/money",
            "/definitions/money/properties/amount",
            "/dependencies/c",
            "/patternProperties/^x-",
            "/properties/lines",
            "/properties/lines/additionalItems",
            "/properties/lines/items/0",
            "/properties/lines/items/1",
            "/properties/lines/items/1/allOf/0",
            "/properties/lines/items/1/allOf/1",
            "/properties/lines/items/1/allOf/1/not",
            "/properties/status",
        ]
    );
}

#[test]
fn expanded_schema_validates_like_the_original() {
    let schema = json!({
        "definitions": {
            "positive": {"type": "integer", "minimum": 1},
            "pair": {"type": "array", "items": [{"$ref": "#/definitions/positive"}, {"$ref": "#/definitions/positive"}]}
        },
        "properties": {
            "size": {"$ref": "#/definitions/pair"},
            "children": {"type": "array", "items": {"$ref": "#"}}
        }
    });
    let config = ValidationConfiguration::default();
    let tree = SchemaTree::new(schema);
    let expanded = expand_references(&tree, &config).unwrap();

    assert_eq!(
        expanded.root()["properties"]["size"]["items"][0],
        json!({"type": "integer", "minimum": 1})
    );
    assert_eq!(expanded.root()["properties"]["children"]["items"], json!({"$ref": "#"}));

    for instance in [
        json!({"size": [1, 2]}),
        json!({"size": [0, 2]}),
        json!({"children": [{"size": [3, 4]}, {"size": ["x"]}]}),
        json!({"children": []}),
    ] {
        assert_eq!(
            validate(&tree, &instance, &config).success(),
            validate(&expanded, &instance, &config).success(),
            "instance {}",
            instance
        );
    }
}

#[test]
fn chained_references_expand_to_final_target() {
    let tree = SchemaTree::new(json!({
        "definitions": {
            "alias": {"$ref": "#/definitions/real"},
            "real": {"type": "boolean"}
        },
        "not": {"$ref": "#/definitions/alias"}
    }));
    let expanded = expand_references(&tree, &ValidationConfiguration::default()).unwrap();
    assert_eq!(expanded.root()["not"], json!({"type": "boolean"}));
    assert_eq!(expanded.root()["definitions"]["alias"], json!({"type": "boolean"}));
}

#[test]
fn unresolvable_reference_fails_expansion() {
    let tree = SchemaTree::new(json!({"items": {"$ref": "#/definitions/none"}}));
    let err = expand_references(&tree, &ValidationConfiguration::default()).unwrap_err();
    assert!(matches!(err, ProcessingError::UnresolvableRef { .. }));
}

/// Replaces every `{"type": "integer"}` by `{"type": "number"}`.
struct Widen;

impl SchemaTransform for Widen {
    fn transform(&mut self, tree: &SchemaTree, _path: &[JsonRef]) -> Result<Rewrite, ProcessingError> {
        if tree.node().get("type") == Some(&json!("integer")) {
            let mut value = tree.node().clone();
            value["type"] = json!("number");
            return Ok(Rewrite::Replaced {
                value,
                origin: schemaproc::identity(tree),
            });
        }
        Ok(Rewrite::Unchanged)
    }
}

#[test]
fn custom_transform_rewrites_copy_on_write() {
    let schema = json!({
        "properties": {"a": {"type": "integer"}, "b": {"items": {"type": "integer"}}}
    });
    let tree = SchemaTree::new(schema.clone());
    let dialect = Dialect::draft_v4();
    let rewritten = SchemaWalker::new(&dialect)
        .walk(&tree, &mut Widen, &mut LocationRecorder::default())
        .unwrap();

    assert_eq!(rewritten.root()["properties"]["a"], json!({"type": "number"}));
    assert_eq!(rewritten.root()["properties"]["b"]["items"], json!({"type": "number"}));
    assert_eq!(tree.root(), &schema);
}

#[test]
fn schema_syntax_is_checked_everywhere() {
    let tree = SchemaTree::new(json!({
        "definitions": {"unused": {"type": "strnig"}},
        "properties": {"a": {"required": "yes"}}
    }));
    let report = validate_schema(&tree, &ValidationConfiguration::default());
    assert!(!report.success());
    let pointers: Vec<String> = report
        .iter()
        .filter_map(|m| m.schema().map(|s| s.pointer.to_string()))
        .collect();
    assert_eq!(pointers, ["/definitions/unused", "/properties/a"]);
}

//! Schema documents with a current position.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::pointer::JsonPointer;
use crate::refs::JsonRef;

pub(crate) static NULL: Value = Value::Null;

/// A schema document, a position inside it, and the URI it was loaded from.
///
/// Moving the position ([`SchemaTree::append`], [`SchemaTree::with_pointer`])
/// yields a cheap view sharing the same root. Rewriting a node
/// ([`SchemaTree::replace_node`]) never affects other views of the root.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    root: Arc<Value>,
    pointer: JsonPointer,
    loading_ref: JsonRef,
}

/// Identity of a schema location: its document and pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub document: JsonRef,
    pub pointer: JsonPointer,
}

impl SchemaTree {
    /// Tree for an anonymous schema.
    pub fn new(root: Value) -> Self {
        Self::with_loading_ref(root, JsonRef::anonymous())
    }

    /// Tree for a schema loaded from `loading_ref`.
    pub fn with_loading_ref(root: Value, loading_ref: JsonRef) -> Self {
        Self::from_shared(Arc::new(root), loading_ref)
    }

    pub fn from_shared(root: Arc<Value>, loading_ref: JsonRef) -> Self {
        Self {
            root,
            pointer: JsonPointer::root(),
            loading_ref: loading_ref.document(),
        }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn shared_root(&self) -> Arc<Value> {
        Arc::clone(&self.root)
    }

    pub fn pointer(&self) -> &JsonPointer {
        &self.pointer
    }

    pub fn loading_ref(&self) -> &JsonRef {
        &self.loading_ref
    }

    /// Node at the current position, `null` when the pointer is dangling.
    pub fn node(&self) -> &Value {
        self.try_node().unwrap_or(&NULL)
    }

    pub fn try_node(&self) -> Option<&Value> {
        self.pointer.resolve(&self.root)
    }

    /// View one token deeper.
    pub fn append(&self, token: impl Into<String>) -> Self {
        self.with_pointer(self.pointer.append(token))
    }

    /// View at the current position extended by `relative`.
    pub fn join(&self, relative: &JsonPointer) -> Self {
        self.with_pointer(self.pointer.join(relative))
    }

    /// View at an absolute pointer in the same document.
    pub fn with_pointer(&self, pointer: JsonPointer) -> Self {
        Self {
            root: Arc::clone(&self.root),
            pointer,
            loading_ref: self.loading_ref.clone(),
        }
    }

    /// Resolution scope at the current position.
    ///
    /// Starts from the loading URI and applies every string `id` met on the
    /// way down from the root, the current node included.
    pub fn base(&self) -> JsonRef {
        let mut base = self.loading_ref.clone();
        let mut node: &Value = &self.root;
        base = apply_id(base, node);
        for token in self.pointer.tokens() {
            let next = match node {
                Value::Object(map) => map.get(token),
                Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            let Some(next) = next else { break };
            node = next;
            base = apply_id(base, node);
        }
        base.document()
    }

    /// True when `reference` designates this document, either through its
    /// loading URI or through the `id` of its root.
    pub fn contains_document(&self, reference: &JsonRef) -> bool {
        if reference.same_document(&self.loading_ref) {
            return true;
        }
        let root_scope = apply_id(self.loading_ref.clone(), &self.root);
        reference.same_document(&root_scope)
    }

    /// Same tree, moved to an absolute pointer.
    pub fn into_pointer(mut self, pointer: JsonPointer) -> Self {
        self.pointer = pointer;
        self
    }

    /// Tree with the node at the current position replaced by `value`.
    ///
    /// The root is copied only while other trees still share it; a tree that
    /// owns its root alone is rewritten in place. Returns `self` unchanged if
    /// the current pointer is dangling.
    pub fn replace_node(mut self, value: Value) -> Self {
        if self.try_node().is_none() {
            return self;
        }
        let root = Arc::make_mut(&mut self.root);
        if let Some(slot) = self.pointer.resolve_mut(root) {
            *slot = value;
        }
        self
    }

    pub fn key(&self) -> SchemaKey {
        SchemaKey {
            document: self.loading_ref.clone(),
            pointer: self.pointer.clone(),
        }
    }

    /// Consume the tree, returning its root.
    pub fn into_root(self) -> Value {
        Arc::try_unwrap(self.root).unwrap_or_else(|shared| (*shared).clone())
    }
}

fn apply_id(base: JsonRef, node: &Value) -> JsonRef {
    match node.get("id").and_then(Value::as_str) {
        Some(id) => base.resolve(id).unwrap_or(base),
        None => base,
    }
}

impl fmt::Display for SchemaTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.loading_ref.locator_string(), self.pointer)
    }
}

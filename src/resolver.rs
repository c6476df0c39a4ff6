//! `$ref` resolution across schema documents.
//!
//! A [`RefResolver`] follows reference chains starting at a schema location.
//! Targets in the current document are looked up directly; other documents
//! come from the [`SchemaStore`] and are indexed by the `id`s they declare so
//! that later references into them resolve without another load.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::error::ProcessingError;
use crate::loader::SchemaStore;
use crate::pointer::JsonPointer;
use crate::refs::JsonRef;
use crate::tree::SchemaTree;

/// The reference identifying a schema location: its document and pointer.
pub fn identity(tree: &SchemaTree) -> JsonRef {
    tree.loading_ref().at_pointer(tree.pointer())
}

/// Follows `$ref` chains for one validation or expansion run.
#[derive(Debug)]
pub struct RefResolver<'c> {
    store: &'c SchemaStore,
    scopes: HashMap<JsonRef, SchemaTree>,
}

impl<'c> RefResolver<'c> {
    /// Resolver for references made from `root`.
    pub fn new(store: &'c SchemaStore, root: &SchemaTree) -> Self {
        let mut resolver = Self {
            store,
            scopes: HashMap::new(),
        };
        resolver.register(&root.with_pointer(JsonPointer::root()));
        resolver
    }

    /// The location `tree` designates once every `$ref` is followed.
    ///
    /// Returns a view of `tree` itself when its node holds no `$ref`.
    ///
    /// # Errors
    ///
    /// `ProcessingError::RefLoop` when the chain comes back to a location it
    /// already went through; `ProcessingError::UnresolvableRef` when a target
    /// does not exist; `ProcessingError::Load` when a document cannot be
    /// fetched.
    pub fn resolve(&mut self, tree: &SchemaTree) -> Result<SchemaTree, ProcessingError> {
        let mut current = tree.clone();
        let mut chain = vec![identity(&current)];
        while let Some(reference) = current.node().get("$ref").and_then(Value::as_str) {
            let target = current.base().resolve(reference)?;
            let pointer = target.pointer()?;
            let next = self.locate(&current, &target.document(), &pointer)?;
            let next_identity = identity(&next);
            if chain.contains(&next_identity) {
                return Err(ProcessingError::RefLoop {
                    reference: target.to_string(),
                    chain: chain.iter().map(ToString::to_string).collect(),
                });
            }
            if next.try_node().is_none() {
                return Err(ProcessingError::UnresolvableRef {
                    reference: target.to_string(),
                    pointer: identity(&current).to_string(),
                });
            }
            trace!(from = %identity(&current), to = %next_identity, "followed reference");
            chain.push(next_identity);
            current = next;
        }
        Ok(current)
    }

    /// Tree positioned at `pointer` inside the scope named by `document`.
    fn locate(
        &mut self,
        from: &SchemaTree,
        document: &JsonRef,
        pointer: &JsonPointer,
    ) -> Result<SchemaTree, ProcessingError> {
        if from.contains_document(document) {
            return Ok(from.with_pointer(pointer.clone()));
        }
        if let Some(scope) = self.scopes.get(document) {
            return Ok(scope.join(pointer));
        }
        let Some(url) = document.locator() else {
            return Err(ProcessingError::UnresolvableRef {
                reference: document.at_pointer(pointer).to_string(),
                pointer: identity(from).to_string(),
            });
        };
        let loaded = self.store.get(url).map_err(|source| ProcessingError::Load {
            uri: url.to_string(),
            source,
        })?;
        let root = SchemaTree::from_shared(Arc::clone(&loaded), document.clone());
        self.register(&root);
        Ok(self
            .scopes
            .get(document)
            .map_or_else(|| root.join(pointer), |scope| scope.join(pointer)))
    }

    /// Index `root` under its loading URI and every `id` scope it declares.
    fn register(&mut self, root: &SchemaTree) {
        self.scopes
            .entry(root.loading_ref().document())
            .or_insert_with(|| root.clone());
        let mut pending = vec![root.clone()];
        while let Some(tree) = pending.pop() {
            match tree.node() {
                Value::Object(map) => {
                    if map.get("id").is_some_and(Value::is_string) {
                        self.scopes.entry(tree.base()).or_insert_with(|| tree.clone());
                    }
                    for (name, member) in map {
                        if member.is_object() || member.is_array() {
                            pending.push(tree.append(name.as_str()));
                        }
                    }
                }
                Value::Array(items) => {
                    for (index, item) in items.iter().enumerate() {
                        if item.is_object() || item.is_array() {
                            pending.push(tree.append(index.to_string()));
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

//! Schema tree walking and reference expansion.
//!
//! The walker visits every schema location reachable through the keyword
//! pointer collectors, pre-order. At each location a [`SchemaTransform`] may
//! substitute the node; the walk then continues into the new content. A
//! [`SchemaListener`] observes each location on the way down and up.

use serde_json::Value;
use tracing::trace;

use crate::config::ValidationConfiguration;
use crate::dialect::Dialect;
use crate::equivalence::equivalent;
use crate::error::ProcessingError;
use crate::loader::SchemaStore;
use crate::pointer::JsonPointer;
use crate::refs::JsonRef;
use crate::resolver::{identity, RefResolver};
use crate::tree::SchemaTree;

/// Outcome of a transform at one location.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    Unchanged,
    /// Substitute `value` for the node. `origin` identifies where the value
    /// came from and becomes the identity of the substituted subtree.
    Replaced { value: Value, origin: JsonRef },
}

/// Rewrites schema locations during a walk.
pub trait SchemaTransform {
    /// Decide what to do with the node at `tree`. `path` holds the identities
    /// of the locations enclosing it, outermost first.
    fn transform(&mut self, tree: &SchemaTree, path: &[JsonRef]) -> Result<Rewrite, ProcessingError>;
}

/// Observes the locations of a walk.
pub trait SchemaListener {
    fn enter(&mut self, _tree: &SchemaTree) {}

    fn exit(&mut self, _tree: &SchemaTree) {}
}

/// Leaves every node as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransform;

impl SchemaTransform for NoTransform {
    fn transform(&mut self, _tree: &SchemaTree, _path: &[JsonRef]) -> Result<Rewrite, ProcessingError> {
        Ok(Rewrite::Unchanged)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl SchemaListener for NoopListener {}

/// Records the pointer of every location entered.
#[derive(Debug, Clone, Default)]
pub struct LocationRecorder {
    pub locations: Vec<JsonPointer>,
}

impl SchemaListener for LocationRecorder {
    fn enter(&mut self, tree: &SchemaTree) {
        self.locations.push(tree.pointer().clone());
    }
}

/// Walks schema trees using the collectors of one dialect.
#[derive(Debug, Clone, Copy)]
pub struct SchemaWalker<'d> {
    dialect: &'d Dialect,
}

impl<'d> SchemaWalker<'d> {
    pub fn new(dialect: &'d Dialect) -> Self {
        Self { dialect }
    }

    /// Walk the subtree at `tree`, returning the (possibly rewritten) tree
    /// positioned where the walk started.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `transform`.
    pub fn walk(
        &self,
        tree: &SchemaTree,
        transform: &mut dyn SchemaTransform,
        listener: &mut dyn SchemaListener,
    ) -> Result<SchemaTree, ProcessingError> {
        let mut path = Vec::new();
        self.visit(tree.clone(), identity(tree), transform, listener, &mut path)
    }

    fn visit(
        &self,
        mut tree: SchemaTree,
        mut current: JsonRef,
        transform: &mut dyn SchemaTransform,
        listener: &mut dyn SchemaListener,
        path: &mut Vec<JsonRef>,
    ) -> Result<SchemaTree, ProcessingError> {
        if let Rewrite::Replaced { value, origin } = transform.transform(&tree, path)? {
            if !equivalent(&value, tree.node()) {
                trace!(at = %tree, from = %origin, "node replaced");
                tree = tree.replace_node(value);
                current = origin;
            }
        }

        listener.enter(&tree);
        let children: Vec<JsonPointer> = self
            .dialect
            .present_in(tree.node())
            .flat_map(|keyword| keyword.collect(tree.node()))
            .collect();
        let base = current.pointer()?;
        let here = tree.pointer().clone();
        path.push(current.clone());
        // The child holds the only handle on the root while it is visited.
        for relative in children {
            let child = tree.into_pointer(here.join(&relative));
            let child_identity = current.at_pointer(&base.join(&relative));
            tree = self
                .visit(child, child_identity, transform, listener, path)?
                .into_pointer(here.clone());
        }
        path.pop();
        listener.exit(&tree);
        Ok(tree)
    }
}

/// Replaces each `$ref` by the schema it designates.
///
/// A reference whose target encloses it (a recursive schema) is left in
/// place. Content brought in from another resolution scope gets an `id`
/// naming that scope.
#[derive(Debug)]
pub struct RefExpander<'c> {
    resolver: RefResolver<'c>,
}

impl<'c> RefExpander<'c> {
    pub fn new(store: &'c SchemaStore, root: &SchemaTree) -> Self {
        Self {
            resolver: RefResolver::new(store, root),
        }
    }
}

impl SchemaTransform for RefExpander<'_> {
    fn transform(&mut self, tree: &SchemaTree, path: &[JsonRef]) -> Result<Rewrite, ProcessingError> {
        if !tree.node().get("$ref").is_some_and(Value::is_string) {
            return Ok(Rewrite::Unchanged);
        }
        let target = self.resolver.resolve(tree)?;
        let origin = identity(&target);
        if path.contains(&origin) {
            trace!(at = %tree, target = %origin, "recursive reference kept");
            return Ok(Rewrite::Unchanged);
        }

        let mut value = target.node().clone();
        let scope = target.base();
        if scope != tree.base() && !scope.is_anonymous() {
            if let Value::Object(map) = &mut value {
                map.insert("id".to_string(), Value::String(scope.locator_string()));
            }
        }
        Ok(Rewrite::Replaced { value, origin })
    }
}

/// Copy of `tree` with every non-recursive `$ref` replaced by its target.
///
/// # Errors
///
/// `ProcessingError::RefLoop` for a reference chain that loops,
/// `ProcessingError::UnresolvableRef` for a missing target and
/// `ProcessingError::Load` when a referenced document cannot be fetched.
pub fn expand_references(
    tree: &SchemaTree,
    config: &ValidationConfiguration,
) -> Result<SchemaTree, ProcessingError> {
    let dialect = config.engine_for(tree.root()).dialect();
    let mut expander = RefExpander::new(config.store(), tree);
    SchemaWalker::new(dialect).walk(tree, &mut expander, &mut NoopListener)
}

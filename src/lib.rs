//! Schema Processor
//!
//! Schema-driven structural validation of JSON values.
//!
//! Schemas are processed lazily, one location at a time: each keyword of a
//! schema object is reduced to a digest, validators are built once per
//! distinct digest and cached in the [`ValidationConfiguration`], and the
//! resulting diagnostics are collected in a [`ProcessingReport`].
//!
//! # Example
//!
//! ```
//! use schemaproc::{validate, SchemaTree, ValidationConfiguration};
//! use serde_json::json;
//!
//! let schema = SchemaTree::new(json!({
//!     "type": "object",
//!     "properties": {
//!         "id": { "type": "string" },
//!         "quantity": { "type": "integer", "minimum": 1 }
//!     },
//!     "required": ["id"]
//! }));
//! let config = ValidationConfiguration::default();
//!
//! let report = validate(&schema, &json!({"id": "a1", "quantity": 2}), &config);
//! assert!(report.success());
//!
//! let report = validate(&schema, &json!({"quantity": 0}), &config);
//! assert!(!report.success());
//! assert_eq!(report.messages().len(), 2);
//! ```
//!
//! # Dialects
//!
//! | `$schema` | Dialect |
//! |-----------|---------|
//! | `http://json-schema.org/draft-04/schema#` | draft 4 |
//! | `http://json-schema.org/draft-03/schema#` | draft 3 |
//! | absent or unregistered | configuration default (draft 4) |
//!
//! Custom dialects are built with [`DialectBuilder`] and registered through
//! [`ValidationConfiguration::builder`].

mod builder;
mod config;
mod dialect;
mod digest;
mod equivalence;
mod error;
mod format;
pub mod keyword;
mod loader;
mod number;
mod pointer;
mod processor;
mod refs;
mod report;
mod resolver;
mod syntax;
mod tree;
mod types;
mod walker;

pub use builder::ValidatorCache;
pub use config::{DialectEngine, ValidationConfiguration, ValidationConfigurationBuilder};
pub use dialect::{normalize_id, Dialect, DialectBuilder, DRAFT_V3, DRAFT_V4};
pub use digest::{KeywordDigest, SchemaDigest};
pub use equivalence::{equivalent, hash_value, Equivalent};
pub use error::{ConfigError, LoadError, ProcessingError};
pub use format::{FormatAttribute, FormatRegistry, StringFormat};
pub use keyword::{Keyword, KeywordDescriptor, KeywordValidator, SyntaxContext};
pub use loader::{
    is_url, load_schema, load_schema_auto, load_schema_str, source_ref, DefaultLoader, SchemaLoader,
    SchemaStore,
};
pub use number::Decimal;
pub use pointer::JsonPointer;
pub use processor::{validate, FullData, Instance, ValidationContext};
pub use refs::JsonRef;
pub use report::{Domain, LogLevel, ProcessingMessage, ProcessingReport, SchemaLocation};
pub use resolver::{identity, RefResolver};
pub use syntax::{check_file, check_files, check_location, validate_schema, CheckSummary, FileResult, FileStatus};
pub use tree::{SchemaKey, SchemaTree};
pub use types::{json_type_name, NodeType, NodeTypeSet};
pub use walker::{
    expand_references, LocationRecorder, NoTransform, NoopListener, RefExpander, Rewrite, SchemaListener,
    SchemaTransform, SchemaWalker,
};

#[cfg(feature = "remote")]
pub use loader::load_schema_url;

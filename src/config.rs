//! Validation configuration.
//!
//! A [`ValidationConfiguration`] owns everything shared between validation
//! runs: the registered dialects with their validator caches, the format
//! attributes and the schema document store. It is `Send + Sync` and meant
//! to be built once and passed by reference.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::builder::ValidatorCache;
use crate::dialect::{normalize_id, Dialect, DRAFT_V4};
use crate::error::ConfigError;
use crate::format::{FormatAttribute, FormatRegistry};
use crate::loader::{DefaultLoader, SchemaLoader, SchemaStore};
use crate::report::{LogLevel, ProcessingReport};

/// A dialect together with the validators built for it.
#[derive(Debug)]
pub struct DialectEngine {
    dialect: Dialect,
    cache: ValidatorCache,
}

impl DialectEngine {
    pub fn new(dialect: Dialect) -> Self {
        let cache = ValidatorCache::new(&dialect);
        Self { dialect, cache }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn cache(&self) -> &ValidatorCache {
        &self.cache
    }
}

/// Shared validation settings and caches.
#[derive(Debug)]
pub struct ValidationConfiguration {
    engines: Vec<DialectEngine>,
    default_engine: usize,
    use_format: bool,
    formats: FormatRegistry,
    store: SchemaStore,
    log_level: LogLevel,
}

impl ValidationConfiguration {
    pub fn builder() -> ValidationConfigurationBuilder {
        ValidationConfigurationBuilder::new()
    }

    /// The engine for a schema document: the dialect named by its `$schema`
    /// member when registered, the default dialect otherwise.
    pub fn engine_for(&self, root: &Value) -> &DialectEngine {
        let declared = root.get("$schema").and_then(Value::as_str);
        if let Some(id) = declared {
            if let Some(engine) = self.engines.iter().find(|e| e.dialect.matches(id)) {
                return engine;
            }
            debug!(schema = id, "unregistered $schema, using default dialect");
        }
        &self.engines[self.default_engine]
    }

    /// The registered dialect named `id`.
    pub fn dialect(&self, id: &str) -> Option<&Dialect> {
        self.engines
            .iter()
            .map(DialectEngine::dialect)
            .find(|d| d.matches(id))
    }

    pub fn default_dialect(&self) -> &Dialect {
        &self.engines[self.default_engine].dialect
    }

    /// Identifiers of the registered dialects.
    pub fn dialect_ids(&self) -> impl Iterator<Item = &str> {
        self.engines.iter().map(|e| e.dialect.id())
    }

    pub fn use_format(&self) -> bool {
        self.use_format
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn store(&self) -> &SchemaStore {
        &self.store
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Empty report with the configured threshold.
    pub fn new_report(&self) -> ProcessingReport {
        ProcessingReport::with_log_level(self.log_level)
    }
}

impl Default for ValidationConfiguration {
    /// Draft-04 by default, draft-03 selectable through `$schema`, formats on.
    fn default() -> Self {
        Self {
            engines: builtin_dialects().into_iter().map(DialectEngine::new).collect(),
            default_engine: 0,
            use_format: true,
            formats: FormatRegistry::with_defaults(),
            store: SchemaStore::default(),
            log_level: LogLevel::Info,
        }
    }
}

fn builtin_dialects() -> Vec<Dialect> {
    vec![Dialect::draft_v4(), Dialect::draft_v3()]
}

/// Builder for [`ValidationConfiguration`].
pub struct ValidationConfigurationBuilder {
    dialects: Vec<Dialect>,
    default_dialect: String,
    use_format: bool,
    formats: FormatRegistry,
    loader: Arc<dyn SchemaLoader>,
    preloaded: Vec<(String, Value)>,
    log_level: LogLevel,
}

impl ValidationConfigurationBuilder {
    /// Draft-04 default, formats on, documents loaded by [`DefaultLoader`].
    pub fn new() -> Self {
        Self {
            dialects: Vec::new(),
            default_dialect: DRAFT_V4.to_string(),
            use_format: true,
            formats: FormatRegistry::with_defaults(),
            loader: Arc::new(DefaultLoader::new()),
            preloaded: Vec::new(),
            log_level: LogLevel::Info,
        }
    }

    /// Register a dialect. A dialect with the identifier of a built-in one
    /// replaces it.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialects.push(dialect);
        self
    }

    /// Dialect used when a schema has no (or an unregistered) `$schema`.
    pub fn default_dialect(mut self, id: impl Into<String>) -> Self {
        self.default_dialect = id.into();
        self
    }

    /// Enable or disable `format` checking.
    pub fn use_format(mut self, use_format: bool) -> Self {
        self.use_format = use_format;
        self
    }

    /// Add or replace a format attribute.
    pub fn format(mut self, name: impl Into<String>, attribute: Arc<dyn FormatAttribute>) -> Self {
        self.formats = self.formats.register(name, attribute);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn SchemaLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Serve `document` for references to `uri` without loading it.
    pub fn preload(mut self, uri: impl Into<String>, document: Value) -> Self {
        self.preloaded.push((uri.into(), document));
        self
    }

    /// Lowest level kept in reports.
    pub fn log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// # Errors
    ///
    /// `ConfigError::DuplicateDialect` when two registered dialects share an
    /// identifier, `ConfigError::UnknownDialect` when the default names no
    /// dialect, `ConfigError::InvalidPreloadUri` for a malformed preload URI.
    pub fn build(self) -> Result<ValidationConfiguration, ConfigError> {
        let mut seen = HashSet::new();
        for dialect in &self.dialects {
            if !seen.insert(normalize_id(dialect.id()).to_string()) {
                return Err(ConfigError::DuplicateDialect {
                    id: dialect.id().to_string(),
                });
            }
        }

        let mut dialects: Vec<Dialect> = builtin_dialects()
            .into_iter()
            .filter(|builtin| !seen.contains(normalize_id(builtin.id())))
            .collect();
        dialects.extend(self.dialects);

        let default_engine = dialects
            .iter()
            .position(|d| d.matches(&self.default_dialect))
            .ok_or_else(|| ConfigError::UnknownDialect {
                id: self.default_dialect.clone(),
            })?;

        let store = SchemaStore::new(self.loader);
        for (uri, document) in self.preloaded {
            let url = Url::parse(&uri).map_err(|e| ConfigError::InvalidPreloadUri {
                uri: uri.clone(),
                message: e.to_string(),
            })?;
            store.preload(&url, document);
        }

        Ok(ValidationConfiguration {
            engines: dialects.into_iter().map(DialectEngine::new).collect(),
            default_engine,
            use_format: self.use_format,
            formats: self.formats,
            store,
            log_level: self.log_level,
        })
    }
}

impl Default for ValidationConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValidationConfigurationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationConfigurationBuilder")
            .field("dialects", &self.dialects.iter().map(Dialect::id).collect::<Vec<_>>())
            .field("default_dialect", &self.default_dialect)
            .field("use_format", &self.use_format)
            .field("preloaded", &self.preloaded.len())
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{DialectBuilder, DRAFT_V3};
    use serde_json::json;

    #[test]
    fn default_configuration() {
        let config = ValidationConfiguration::default();
        assert!(config.use_format());
        assert_eq!(config.default_dialect().id(), DRAFT_V4);
        assert_eq!(config.dialect_ids().collect::<Vec<_>>(), [DRAFT_V4, DRAFT_V3]);
        assert_eq!(config.log_level(), LogLevel::Info);
    }

    #[test]
    fn engine_selected_by_schema_member() {
        let config = ValidationConfiguration::default();
        let v3 = json!({"$schema": "http://json-schema.org/draft-03/schema"});
        assert_eq!(config.engine_for(&v3).dialect().id(), DRAFT_V3);
        let unknown = json!({"$schema": "urn:nowhere"});
        assert_eq!(config.engine_for(&unknown).dialect().id(), DRAFT_V4);
        assert_eq!(config.engine_for(&json!({})).dialect().id(), DRAFT_V4);
    }

    #[test]
    fn builder_settings() {
        let config = ValidationConfiguration::builder()
            .default_dialect(DRAFT_V3)
            .use_format(false)
            .log_level(LogLevel::Warning)
            .build()
            .unwrap();
        assert_eq!(config.default_dialect().id(), DRAFT_V3);
        assert!(!config.use_format());
        assert_eq!(config.new_report().log_level(), LogLevel::Warning);
    }

    #[test]
    fn custom_dialect_replaces_builtin() {
        let custom = DialectBuilder::extending(DRAFT_V4, &Dialect::draft_v4())
            .without("format")
            .build();
        let config = ValidationConfiguration::builder().dialect(custom).build().unwrap();
        assert_eq!(config.dialect_ids().count(), 2);
        assert!(!config.default_dialect().contains("format"));
    }

    #[test]
    fn duplicate_dialects_rejected() {
        let result = ValidationConfiguration::builder()
            .dialect(DialectBuilder::new("urn:a").build())
            .dialect(DialectBuilder::new("urn:a#").build())
            .build();
        assert!(matches!(result, Err(ConfigError::DuplicateDialect { .. })));
    }

    #[test]
    fn unknown_default_rejected() {
        let result = ValidationConfiguration::builder().default_dialect("urn:missing").build();
        assert!(matches!(result, Err(ConfigError::UnknownDialect { .. })));
    }

    #[test]
    fn preload_requires_absolute_uri() {
        let result = ValidationConfiguration::builder()
            .preload("relative.json", json!({}))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidPreloadUri { .. })));

        let config = ValidationConfiguration::builder()
            .preload("http://example.invalid/a.json", json!({"type": "null"}))
            .build()
            .unwrap();
        assert_eq!(config.store().len(), 1);
    }

    #[test]
    fn configuration_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ValidationConfiguration>();
    }
}

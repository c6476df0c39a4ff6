//! Schema loading from various sources.
//!
//! Handles loading schemas from files, strings, and HTTP URLs, and caches
//! loaded documents for reference resolution.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::LoadError;
use crate::refs::JsonRef;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a schema from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_schema(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a schema from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_schema_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a schema from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails,
/// or `LoadError::InvalidJson` if the response isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_schema_url(url: &str) -> Result<Value, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    // Check for HTTP errors before parsing
    let response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(network)?;

    let body = response.text().map_err(network)?;
    load_schema_str(&body)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a schema from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_schema_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_schema_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::UnsupportedScheme {
                scheme: source.split(':').next().unwrap_or_default().to_string(),
                uri: source.to_string(),
            })
        }
    } else {
        load_schema(Path::new(source))
    }
}

/// The reference a document loaded from `source` is known under.
///
/// URLs are taken as is; file paths become absolute `file:` URLs so that
/// relative `$ref`s inside the document resolve against its directory.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` for a missing file and
/// `LoadError::InvalidUri` for a malformed URL.
pub fn source_ref(source: &str) -> Result<JsonRef, LoadError> {
    if is_url(source) {
        return Url::parse(source)
            .map(|url| JsonRef::from_url(&url))
            .map_err(|e| LoadError::InvalidUri {
                uri: source.to_string(),
                message: e.to_string(),
            });
    }
    let path = Path::new(source);
    let absolute = path.canonicalize().map_err(|_| LoadError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    Url::from_file_path(&absolute)
        .map(|url| JsonRef::from_url(&url))
        .map_err(|()| LoadError::InvalidFileUri {
            uri: absolute.display().to_string(),
        })
}

/// Fetches schema documents by URI.
pub trait SchemaLoader: Send + Sync {
    /// Load the document at `uri` (which carries no fragment).
    fn load(&self, uri: &Url) -> Result<Value, LoadError>;
}

/// Loads `file:` URIs from disk and, with the `remote` feature, `http(s):`
/// URIs over the network.
///
/// A URL mapping redirects URIs under a remote prefix to a local directory,
/// so published schemas can be validated against a local checkout.
#[derive(Debug, Clone, Default)]
pub struct DefaultLoader {
    mapping: Option<(String, PathBuf)>,
}

impl DefaultLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve URIs starting with `remote_base` from `local_base`.
    ///
    /// # Example
    /// ```text
    /// remote_base = "https://example.com/draft"
    /// local_base = Path::new("site")
    /// https://example.com/draft/schemas/order.json -> site/schemas/order.json
    /// ```
    pub fn with_mapping(mut self, remote_base: impl Into<String>, local_base: impl Into<PathBuf>) -> Self {
        self.mapping = Some((remote_base.into(), local_base.into()));
        self
    }

    fn mapped_path(&self, uri: &str) -> Option<PathBuf> {
        let (remote_base, local_base) = self.mapping.as_ref()?;
        let remainder = uri.strip_prefix(remote_base.as_str())?;
        Some(local_base.join(remainder.trim_start_matches('/')))
    }
}

impl SchemaLoader for DefaultLoader {
    fn load(&self, uri: &Url) -> Result<Value, LoadError> {
        if let Some(path) = self.mapped_path(uri.as_str()) {
            return load_schema(&path);
        }
        match uri.scheme() {
            "file" => {
                let path = uri.to_file_path().map_err(|()| LoadError::InvalidFileUri {
                    uri: uri.to_string(),
                })?;
                load_schema(&path)
            }
            #[cfg(feature = "remote")]
            "http" | "https" => load_schema_url(uri.as_str()),
            scheme => Err(LoadError::UnsupportedScheme {
                scheme: scheme.to_string(),
                uri: uri.to_string(),
            }),
        }
    }
}

/// Loaded schema documents, keyed by locator.
///
/// Documents are fetched once and shared; preloaded documents are served
/// without touching the loader.
pub struct SchemaStore {
    loader: Arc<dyn SchemaLoader>,
    documents: DashMap<Url, Arc<Value>>,
}

impl SchemaStore {
    pub fn new(loader: Arc<dyn SchemaLoader>) -> Self {
        Self {
            loader,
            documents: DashMap::new(),
        }
    }

    /// Register `document` under `uri`.
    pub fn preload(&self, uri: &Url, document: Value) {
        self.documents.insert(without_fragment(uri), Arc::new(document));
    }

    /// The document at `uri`, loading it on first request.
    ///
    /// # Errors
    ///
    /// Returns the loader's error; failures are not cached.
    pub fn get(&self, uri: &Url) -> Result<Arc<Value>, LoadError> {
        let key = without_fragment(uri);
        if let Some(document) = self.documents.get(&key) {
            return Ok(Arc::clone(document.value()));
        }
        debug!(uri = %key, "loading schema document");
        let document = Arc::new(self.loader.load(&key)?);
        Ok(Arc::clone(self.documents.entry(key).or_insert(document).value()))
    }

    /// Number of documents held.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Default for SchemaStore {
    fn default() -> Self {
        Self::new(Arc::new(DefaultLoader::new()))
    }
}

impl fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaStore")
            .field("documents", &self.documents.len())
            .finish_non_exhaustive()
    }
}

fn without_fragment(uri: &Url) -> Url {
    let mut key = uri.clone();
    key.set_fragment(None);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn load_schema_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type": "object"}}"#).unwrap();

        let schema = load_schema(file.path()).unwrap();
        assert_eq!(schema["type"], "object");
    }

    #[test]
    fn load_schema_file_not_found() {
        let result = load_schema(Path::new("/nonexistent/path.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_schema_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_schema(file.path());
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_schema_str_invalid() {
        let result = load_schema_str("not json");
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/schema.json"));
        assert!(is_url("http://example.com/schema.json"));
        assert!(!is_url("/path/to/schema.json"));
        assert!(!is_url("schema.json"));
    }

    #[test]
    fn load_schema_auto_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type": "string"}}"#).unwrap();

        let schema = load_schema_auto(file.path().to_str().unwrap()).unwrap();
        assert_eq!(schema["type"], "string");
    }

    #[test]
    fn source_ref_of_a_file_is_a_file_url() {
        let file = NamedTempFile::new().unwrap();
        let reference = source_ref(file.path().to_str().unwrap()).unwrap();
        assert_eq!(reference.locator().map(Url::scheme), Some("file"));
        assert!(matches!(
            source_ref("/nonexistent/schema.json"),
            Err(LoadError::FileNotFound { .. })
        ));
    }

    #[test]
    fn default_loader_reads_file_urls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("types.json");
        std::fs::write(&path, r#"{"definitions": {"id": {"type": "string"}}}"#).unwrap();
        let url = Url::from_file_path(&path).unwrap();
        let document = DefaultLoader::new().load(&url).unwrap();
        assert_eq!(document["definitions"]["id"]["type"], "string");
    }

    #[test]
    fn default_loader_rejects_unknown_schemes() {
        let url = Url::parse("ftp://example.com/schema.json").unwrap();
        assert!(matches!(
            DefaultLoader::new().load(&url),
            Err(LoadError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn url_mapping_serves_local_files() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("schemas")).unwrap();
        std::fs::write(dir.path().join("schemas/order.json"), r#"{"type": "object"}"#).unwrap();
        let loader = DefaultLoader::new().with_mapping("https://example.com/draft", dir.path());
        let url = Url::parse("https://example.com/draft/schemas/order.json").unwrap();
        assert_eq!(loader.load(&url).unwrap()["type"], "object");
    }

    #[test]
    fn mapped_path_strips_leading_slash() {
        let loader = DefaultLoader::new().with_mapping("https://example.com/draft", "/local");
        assert_eq!(
            loader.mapped_path("https://example.com/draft/schemas/foo.json"),
            Some(PathBuf::from("/local/schemas/foo.json"))
        );
        assert_eq!(loader.mapped_path("https://other.com/foo.json"), None);
    }

    struct Counting(AtomicUsize);

    impl SchemaLoader for Counting {
        fn load(&self, _uri: &Url) -> Result<Value, LoadError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({"type": "null"}))
        }
    }

    #[test]
    fn store_loads_each_document_once() {
        let loader = Arc::new(Counting(AtomicUsize::new(0)));
        let store = SchemaStore::new(loader.clone());
        let url = Url::parse("urn:example:a").unwrap();
        store.get(&url).unwrap();
        store.get(&url).unwrap();
        assert_eq!(loader.0.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_serves_preloaded_documents() {
        let store = SchemaStore::default();
        let url = Url::parse("http://example.invalid/schema.json#").unwrap();
        store.preload(&url, serde_json::json!({"type": "integer"}));
        let document = store.get(&Url::parse("http://example.invalid/schema.json").unwrap()).unwrap();
        assert_eq!(document["type"], "integer");
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_schema_url_valid() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/schema.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"type": "string"}"#)
                .create();

            let schema = load_schema_url(&format!("{}/schema.json", server.url())).unwrap();
            assert_eq!(schema["type"], "string");
            mock.assert();
        }

        #[test]
        fn load_schema_url_404() {
            let mut server = mockito::Server::new();
            let _mock = server.mock("GET", "/missing.json").with_status(404).create();

            let result = load_schema_url(&format!("{}/missing.json", server.url()));
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
        }

        #[test]
        fn load_schema_url_invalid_json() {
            let mut server = mockito::Server::new();
            let _mock = server
                .mock("GET", "/broken.json")
                .with_status(200)
                .with_body("{ not json")
                .create();

            let result = load_schema_url(&format!("{}/broken.json", server.url()));
            assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
        }
    }
}

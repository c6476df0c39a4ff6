//! Error types for schema loading, reference handling and validator construction.

use std::path::PathBuf;
use thiserror::Error;

use crate::report::{Domain, LogLevel, ProcessingMessage};

/// Errors while fetching a schema document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("no loader for URI scheme \"{scheme}\" ({uri})")]
    UnsupportedScheme { scheme: String, uri: String },

    #[error("cannot convert {uri} to a file path")]
    InvalidFileUri { uri: String },

    #[error("invalid URI \"{uri}\": {message}")]
    InvalidUri { uri: String, message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors raised while processing a schema: references, pointers and
/// keyword validator construction.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("cannot build validator for keyword \"{keyword}\": {message}")]
    Construction { keyword: String, message: String },

    #[error("keyword \"{keyword}\" has no registered validator")]
    UnknownKeyword { keyword: String },

    #[error("reference loop detected at \"{reference}\" (chain: {})", chain.join(" -> "))]
    RefLoop {
        reference: String,
        chain: Vec<String>,
    },

    #[error("unresolvable reference \"{reference}\" (from {pointer})")]
    UnresolvableRef { reference: String, pointer: String },

    #[error("invalid reference \"{reference}\": {message}")]
    InvalidRef { reference: String, message: String },

    #[error("invalid JSON Pointer \"{pointer}\": {message}")]
    InvalidPointer { pointer: String, message: String },

    #[error("cannot load {uri}: {source}")]
    Load {
        uri: String,
        #[source]
        source: LoadError,
    },
}

impl ProcessingError {
    /// Domain a diagnostic for this error belongs to.
    pub fn domain(&self) -> Domain {
        match self {
            ProcessingError::Construction { .. } | ProcessingError::UnknownKeyword { .. } => {
                Domain::Validation
            }
            _ => Domain::RefResolution,
        }
    }

    /// Stable message key for this error.
    pub fn key(&self) -> &'static str {
        match self {
            ProcessingError::Construction { .. } => "build.constructionFailed",
            ProcessingError::UnknownKeyword { .. } => "build.unknownKeyword",
            ProcessingError::RefLoop { .. } => "refs.loop",
            ProcessingError::UnresolvableRef { .. } => "refs.unresolvable",
            ProcessingError::InvalidRef { .. } => "refs.invalid",
            ProcessingError::InvalidPointer { .. } => "refs.invalidPointer",
            ProcessingError::Load { .. } => "refs.loadFailed",
        }
    }

    /// Fatal diagnostic describing this error.
    pub fn to_message(&self) -> ProcessingMessage {
        let message = ProcessingMessage::new(LogLevel::Fatal, self.domain(), self.key(), self.to_string());
        match self {
            ProcessingError::Construction { keyword, .. }
            | ProcessingError::UnknownKeyword { keyword } => message.with_keyword(keyword.clone()),
            ProcessingError::RefLoop { reference, chain } => message
                .put("ref", reference.clone())
                .put("chain", chain.clone()),
            ProcessingError::UnresolvableRef { reference, .. }
            | ProcessingError::InvalidRef { reference, .. } => message.put("ref", reference.clone()),
            ProcessingError::InvalidPointer { pointer, .. } => message.put("pointer", pointer.clone()),
            ProcessingError::Load { uri, .. } => message.put("uri", uri.clone()),
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProcessingError::Load { source, .. } => source.exit_code(),
            _ => 2,
        }
    }
}

/// Errors while assembling a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("dialect \"{id}\" is registered twice")]
    DuplicateDialect { id: String },

    #[error("unknown dialect \"{id}\"")]
    UnknownDialect { id: String },

    #[error("cannot preload \"{uri}\": {message}")]
    InvalidPreloadUri { uri: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("schema.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = LoadError::UnsupportedScheme {
            scheme: "ftp".into(),
            uri: "ftp://example.com/s.json".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn processing_error_exit_codes() {
        let err = ProcessingError::Load {
            uri: "file:///missing.json".into(),
            source: LoadError::FileNotFound {
                path: PathBuf::from("/missing.json"),
            },
        };
        assert_eq!(err.exit_code(), 3);

        let err = ProcessingError::UnknownKeyword {
            keyword: "frobnicate".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn construction_error_becomes_fatal_keyword_message() {
        let err = ProcessingError::Construction {
            keyword: "pattern".into(),
            message: "unclosed group".into(),
        };
        let msg = err.to_message();
        assert_eq!(msg.level(), LogLevel::Fatal);
        assert_eq!(msg.keyword(), Some("pattern"));
        assert_eq!(msg.domain(), Domain::Validation);
        assert_eq!(msg.key(), "build.constructionFailed");
    }

    #[test]
    fn ref_loop_display() {
        let err = ProcessingError::RefLoop {
            reference: "#/a".into(),
            chain: vec!["#/a".into(), "#/b".into()],
        };
        assert_eq!(
            err.to_string(),
            "reference loop detected at \"#/a\" (chain: #/a -> #/b)"
        );
        assert_eq!(err.to_message().domain(), Domain::RefResolution);
    }
}

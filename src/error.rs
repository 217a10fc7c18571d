use std::path::PathBuf;
use thiserror::Error;

pub type AppResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Form number that is not valid hex
    #[error("invalid form id: {0}")]
    InvalidFormId(String),

    /// Unknown record type signature
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Unknown scope tag
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// Unknown object type name
    #[error("invalid object type: {0}")]
    InvalidObjectType(String),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("unknown group: {0}")]
    UnknownGroup(String),

    #[error("validation failed: {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigErrorKind,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("failed to read file: {0}")]
    Read(std::io::Error),

    #[error("failed to parse file: {0}")]
    Parse(toml::de::Error),

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnv(String, String),

    #[error("scan interval must be between 0 and {max} seconds, got {value}")]
    ScanInterval { value: f64, max: f64 },
}

/// Reasons a single definition file is rejected. The file is skipped, loading goes on.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("{file}: malformed JSON: {source}")]
    Malformed {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file}: {path}: {message}")]
    Invalid {
        file: String,
        path: String,
        message: String,
    },

    #[error("{file}: file name does not match the collection file pattern")]
    BadFileName { file: String },
}

/// Failures that abort the whole one-time load. Collections stay empty afterwards.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("definitions directory unusable: {0}")]
    Directory(#[source] anyhow::Error),

    #[error("load order is empty, no plugin can own a form")]
    EmptyLoadOrder,
}

//! # Keel Storage System Errors
//!
//! Defines error types specific to the Keel Storage System.
//!
//! [`StorageSystemError`] covers file I/O, configuration parsing, and the
//! cache artifacts the application registry reads. A cache artifact that
//! exists but cannot be trusted is [`StorageSystemError::CacheCorrupt`], which
//! is never conflated with an absent artifact.
use std::path::PathBuf;

use thiserror::Error;

use crate::plugin_system::manifest::ManifestKind;

#[derive(Debug, Error)]
pub enum StorageSystemError {
    #[error("I/O error during operation '{operation}' on path '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache artifact '{kind}' at '{path}' is corrupt: {reason}")]
    CacheCorrupt {
        kind: ManifestKind,
        path: PathBuf,
        reason: String,
    },

    #[error("Serialization to '{format}' failed: {source}")]
    SerializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Deserialization from '{format}' failed: {source}")]
    DeserializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedConfigFormat(String),

    #[error("Storage operation '{operation}' failed for path '{path}': {message}")]
    OperationFailed {
        operation: String,
        path: PathBuf,
        message: String,
    },
}

// Helper for creating Io errors, ensuring path is always included.
impl StorageSystemError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        StorageSystemError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }

    pub fn corrupt(kind: ManifestKind, path: PathBuf, reason: impl Into<String>) -> Self {
        StorageSystemError::CacheCorrupt { kind, path, reason: reason.into() }
    }
}

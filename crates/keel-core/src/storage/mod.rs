//! # Keel Storage
//!
//! Filesystem access ([`StorageProvider`], [`LocalStorageProvider`]), the
//! manifest [`CacheStore`], and application configuration ([`AppConfig`]).
pub mod cache;
pub mod config;
pub mod error;
pub mod local;
pub mod provider;

/// Re-export key types
pub use cache::CacheStore;
pub use config::{AppConfig, ConfigFormat};
pub use error::StorageSystemError;
pub use local::LocalStorageProvider;
pub use provider::StorageProvider;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::kernel::constants::{CACHE_DIR, DEFAULT_STORAGE_DIR, FRAMEWORK_PLUGIN};
use crate::kernel::error::{Error, Result};
use crate::storage::error::StorageSystemError;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

fn default_name() -> String {
    crate::kernel::constants::APP_NAME.to_string()
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_DIR)
}

fn default_plugins() -> Vec<String> {
    vec![FRAMEWORK_PLUGIN.to_string()]
}

/// Application configuration handed to the kernels.
///
/// `plugins` is the ordered list of plugin ids whose declarations make up the
/// application; its order is the aggregation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_plugins")]
    pub plugins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            environment: default_environment(),
            debug: false,
            storage_path: default_storage_path(),
            plugins: default_plugins(),
        }
    }
}

impl AppConfig {
    /// Load a config file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            StorageSystemError::UnsupportedConfigFormat(
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .unwrap_or("<none>")
                    .to_string(),
            )
        })?;
        let data = fs::read_to_string(path).map_err(|e| Error::io(e, "read_config", path.to_path_buf()))?;
        log::debug!("Loading {} config from {}", format.extension(), path.display());
        Self::parse(&data, format)
    }

    /// Deserialize from string based on format
    pub fn parse(data: &str, format: ConfigFormat) -> Result<Self> {
        let deserialization = |source: Box<dyn std::error::Error + Send + Sync>| StorageSystemError::DeserializationError {
            format: format.extension().to_string(),
            source,
        };
        let config = match format {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| deserialization(Box::new(e)))?,
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| deserialization(Box::new(e)))?,
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| deserialization(Box::new(e)))?,
        };
        Ok(config)
    }

    /// Serialize to string based on format
    pub fn serialize(&self, format: ConfigFormat) -> Result<String> {
        let serialization = |source: Box<dyn std::error::Error + Send + Sync>| StorageSystemError::SerializationError {
            format: format.extension().to_string(),
            source,
        };
        let data = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| serialization(Box::new(e)))?,
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(|e| serialization(Box::new(e)))?,
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| serialization(Box::new(e)))?,
        };
        Ok(data)
    }

    /// Directory holding the cache artifacts.
    pub fn cache_path(&self) -> PathBuf {
        self.storage_path.join(CACHE_DIR)
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    pub fn with_plugins<I, S>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugins = plugins.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

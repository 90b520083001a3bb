//! # Keel Plugin System Errors
//!
//! Defines error types specific to the Keel Plugin System.
//!
//! [`PluginSystemError`] covers plugin table registration (duplicates,
//! incompatible API ranges) and manifest aggregation, where a failing
//! declaration accessor aborts the whole merge and names the plugin at fault.
use crate::plugin_system::manifest::ManifestKind;
use crate::plugin_system::traits::PluginError;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin '{plugin_id}' failed to declare its {declaration}: {source}")]
    AggregationError {
        plugin_id: String,
        declaration: ManifestKind,
        #[source]
        source: PluginError,
    },

    #[error("Plugin '{plugin_id}' is not registered")]
    UnknownPlugin { plugin_id: String },

    #[error("Plugin '{plugin_id}' is already registered")]
    DuplicatePlugin { plugin_id: String },

    #[error("Plugin '{plugin_id}' is not compatible with API version {api_version} (supports: {supported})")]
    IncompatibleApi {
        plugin_id: String,
        api_version: String,
        supported: String,
    },
}

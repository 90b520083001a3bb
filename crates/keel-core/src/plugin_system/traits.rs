use std::collections::BTreeMap;
use std::fmt;

use crate::kernel::component::Components;
use crate::kernel::error::Result;
use crate::plugin_system::version::VersionRange;

/// Error type for a plugin's own declaration accessors
#[derive(Debug)]
pub enum PluginError {
    /// The plugin could not produce a declaration list
    DeclarationError(String),
    /// The plugin's configuration is unusable
    ConfigError(String),
    /// Anything else the plugin wants to surface
    Other(String),
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::DeclarationError(msg) => write!(f, "Plugin declaration error: {}", msg),
            PluginError::ConfigError(msg) => write!(f, "Plugin configuration error: {}", msg),
            PluginError::Other(msg) => write!(f, "Plugin error: {}", msg),
        }
    }
}

impl std::error::Error for PluginError {}

/// Listener ids keyed by event type.
pub type EventMap = BTreeMap<String, Vec<String>>;

/// Core trait that all plugins must implement.
///
/// A plugin declares the identifiers of the extension points it contributes;
/// the [`PluginRegistry`](crate::plugin_system::PluginRegistry) merges those
/// declarations across plugins. The objects behind the identifiers are bound
/// separately in [`register_components`](Plugin::register_components).
///
/// Declarations must be pure: the same plugin returns the same lists on every
/// call, so a cached manifest stays equivalent to a freshly computed one.
pub trait Plugin: Send + Sync {
    /// The name of the plugin; also its id in the plugin table and config
    fn name(&self) -> &'static str;

    /// The version of the plugin
    fn version(&self) -> &str;

    /// Compatible API versions
    fn compatible_api_versions(&self) -> Vec<VersionRange>;

    /// Service provider ids, in registration order
    fn providers(&self) -> std::result::Result<Vec<String>, PluginError> {
        Ok(Vec::new())
    }

    /// Console command ids
    fn commands(&self) -> std::result::Result<Vec<String>, PluginError> {
        Ok(Vec::new())
    }

    /// Controller ids
    fn controllers(&self) -> std::result::Result<Vec<String>, PluginError> {
        Ok(Vec::new())
    }

    /// Middleware ids, outermost first
    fn middleware(&self) -> std::result::Result<Vec<String>, PluginError> {
        Ok(Vec::new())
    }

    /// Listener ids per event type, in invocation order
    fn events(&self) -> std::result::Result<EventMap, PluginError> {
        Ok(EventMap::new())
    }

    /// Bind the objects behind the ids declared above.
    ///
    /// Runs on every bootstrap, whether the manifest came from the cache or
    /// was aggregated fresh.
    fn register_components(&self, _components: &mut Components<'_>) -> Result<()> {
        Ok(())
    }
}

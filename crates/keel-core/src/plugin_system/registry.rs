use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::console::FrameworkPlugin;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::manifest::{AggregatedManifest, PluginDeclarations};
use crate::plugin_system::traits::Plugin;
use crate::plugin_system::version::ApiVersion;

/// Every plugin the process knows about, keyed by name.
///
/// Built once at startup from explicit registrations and shared read-only
/// afterwards. Which of these plugins an application actually uses, and in
/// which order, comes from [`AppConfig::plugins`](crate::storage::AppConfig).
pub struct PluginTable {
    plugins: HashMap<String, Arc<dyn Plugin>>,
    /// Registration order, for listings
    order: Vec<String>,
    api_version: ApiVersion,
}

impl PluginTable {
    pub fn new(api_version: ApiVersion) -> Self {
        Self {
            plugins: HashMap::new(),
            order: Vec::new(),
            api_version,
        }
    }

    /// A table for the current API version holding the built-in framework plugin.
    pub fn with_framework() -> Result<Self, PluginSystemError> {
        let mut table = Self::new(ApiVersion::current());
        table.register(Arc::new(FrameworkPlugin))?;
        Ok(table)
    }

    /// Register a plugin, rejecting duplicate names and incompatible API ranges.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginSystemError> {
        let id = plugin.name().to_string();
        if self.plugins.contains_key(&id) {
            return Err(PluginSystemError::DuplicatePlugin { plugin_id: id });
        }

        let ranges = plugin.compatible_api_versions();
        if !ranges.iter().any(|range| range.includes_api(&self.api_version)) {
            let supported = ranges
                .iter()
                .map(|range| range.constraint_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(PluginSystemError::IncompatibleApi {
                plugin_id: id,
                api_version: self.api_version.to_string(),
                supported,
            });
        }

        log::debug!("Registered plugin '{}' v{}", id, plugin.version());
        self.order.push(id.clone());
        self.plugins.insert(id, plugin);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    /// Plugin names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl fmt::Debug for PluginTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginTable")
            .field("plugins", &self.order)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Merges the declarations of an ordered list of plugins.
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    table: Arc<PluginTable>,
}

impl PluginRegistry {
    pub fn new(table: Arc<PluginTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<PluginTable> {
        &self.table
    }

    /// Aggregate the declarations of `ids`, in order.
    ///
    /// Each plugin's five accessors are all called before anything of that
    /// plugin is merged. The first failure aborts the whole aggregation.
    pub fn aggregate<S: AsRef<str>>(&self, ids: &[S]) -> Result<AggregatedManifest, PluginSystemError> {
        let mut manifest = AggregatedManifest::new();
        for id in ids {
            let id = id.as_ref();
            let plugin = self
                .table
                .get(id)
                .ok_or_else(|| PluginSystemError::UnknownPlugin { plugin_id: id.to_string() })?;

            let declarations = PluginDeclarations::collect(plugin.as_ref()).map_err(|(declaration, source)| {
                PluginSystemError::AggregationError {
                    plugin_id: id.to_string(),
                    declaration,
                    source,
                }
            })?;
            manifest.merge(declarations);
        }
        log::debug!("Aggregated {} plugin(s) into {} declaration(s)", ids.len(), manifest.len());
        Ok(manifest)
    }
}

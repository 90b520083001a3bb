use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::kernel::error::{Error, Result};
use crate::plugin_system::manifest::{AggregatedManifest, Artifact, ManifestKind};
use crate::plugin_system::registry::{PluginRegistry, PluginTable};
use crate::plugin_system::traits::EventMap;
use crate::storage::{AppConfig, CacheStore};

/// Answers "which providers, commands, controllers, middleware and listeners
/// does this application have", from the cache when present.
///
/// A present artifact is trusted verbatim; it is not checked against the
/// current plugin list. Aggregation runs at most once per registry and its
/// result is never written by a read.
pub struct ApplicationRegistry {
    plugin_ids: Vec<String>,
    plugins: PluginRegistry,
    cache: CacheStore,
    manifest: Mutex<Option<Arc<AggregatedManifest>>>,
}

impl ApplicationRegistry {
    pub fn new(plugin_ids: Vec<String>, table: Arc<PluginTable>, cache: CacheStore) -> Self {
        Self {
            plugin_ids,
            plugins: PluginRegistry::new(table),
            cache,
            manifest: Mutex::new(None),
        }
    }

    /// Registry over `config.plugins`, caching under `config.storage_path`.
    pub fn from_config(config: &AppConfig, table: Arc<PluginTable>) -> Self {
        Self::new(config.plugins.clone(), table, CacheStore::new(config.storage_path.clone()))
    }

    /// Configured plugin ids, in aggregation order.
    pub fn plugin_ids(&self) -> &[String] {
        &self.plugin_ids
    }

    pub fn cache_store(&self) -> &CacheStore {
        &self.cache
    }

    /// `kind`'s collection: the cached artifact if one exists, else the
    /// aggregated one. A corrupt artifact is an error, not a miss.
    pub fn get(&self, kind: ManifestKind) -> Result<Artifact> {
        if let Some(artifact) = self.cache.read(kind)? {
            return Ok(artifact);
        }
        Ok(self.manifest()?.slice(kind))
    }

    pub fn providers(&self) -> Result<Vec<String>> {
        Ok(self.get(ManifestKind::Providers)?.ids())
    }

    pub fn commands(&self) -> Result<Vec<String>> {
        Ok(self.get(ManifestKind::Commands)?.ids())
    }

    pub fn controllers(&self) -> Result<BTreeSet<String>> {
        Ok(match self.get(ManifestKind::Controllers)? {
            Artifact::Controllers(ids) => ids,
            other => other.ids().into_iter().collect(),
        })
    }

    pub fn middleware(&self) -> Result<Vec<String>> {
        Ok(self.get(ManifestKind::Middleware)?.ids())
    }

    pub fn events(&self) -> Result<EventMap> {
        match self.get(ManifestKind::Events)? {
            Artifact::Events(events) => Ok(events),
            other => Err(Error::Other(format!("Expected an events artifact, got '{}'", other.kind()))),
        }
    }

    /// The aggregated manifest, computed on first use.
    pub fn manifest(&self) -> Result<Arc<AggregatedManifest>> {
        let mut memo = self
            .manifest
            .lock()
            .map_err(|_| Error::Other("Application registry lock poisoned".to_string()))?;
        if let Some(manifest) = memo.as_ref() {
            return Ok(manifest.clone());
        }
        let manifest = Arc::new(self.plugins.aggregate(self.plugin_ids.as_slice())?);
        log::info!(
            "Aggregated manifest from {} plugin(s): {} provider(s), {} command(s), {} controller(s), {} middleware, {} event type(s)",
            self.plugin_ids.len(),
            manifest.providers.len(),
            manifest.commands.len(),
            manifest.controllers.len(),
            manifest.middleware.len(),
            manifest.events.len()
        );
        *memo = Some(manifest.clone());
        Ok(manifest)
    }

    /// `kind`'s collection from the plugins, ignoring any cache file.
    pub fn fresh(&self, kind: ManifestKind) -> Result<Artifact> {
        Ok(self.manifest()?.slice(kind))
    }

    /// Aggregate `kind` and write it to the cache.
    pub fn cache(&self, kind: ManifestKind) -> Result<Artifact> {
        let artifact = self.fresh(kind)?;
        self.cache.write(&artifact)?;
        Ok(artifact)
    }

    /// Delete `kind`'s cache file; returns whether one existed.
    pub fn clear(&self, kind: ManifestKind) -> Result<bool> {
        self.cache.delete(kind)
    }

    /// Delete every cache file; returns how many existed.
    pub fn clear_all(&self) -> Result<usize> {
        let mut removed = 0;
        for kind in ManifestKind::ALL {
            if self.clear(kind)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn is_cached(&self, kind: ManifestKind) -> bool {
        self.cache.exists(kind)
    }
}

impl fmt::Debug for ApplicationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationRegistry")
            .field("plugin_ids", &self.plugin_ids)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::plugin_system::traits::{EventMap, Plugin, PluginError};

/// The five extension-point collections a manifest holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    Providers,
    Commands,
    Controllers,
    Middleware,
    Events,
}

impl ManifestKind {
    /// Every kind, in the order `cache:optimize` writes them.
    pub const ALL: [ManifestKind; 5] = [
        ManifestKind::Providers,
        ManifestKind::Commands,
        ManifestKind::Controllers,
        ManifestKind::Middleware,
        ManifestKind::Events,
    ];

    /// File stem of this kind's cache artifact.
    pub fn stem(&self) -> &'static str {
        match self {
            ManifestKind::Providers => "providers",
            ManifestKind::Commands => "commands",
            ManifestKind::Controllers => "controllers",
            ManifestKind::Middleware => "middleware",
            ManifestKind::Events => "events",
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

impl FromStr for ManifestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ManifestKind::ALL
            .into_iter()
            .find(|kind| kind.stem() == s)
            .ok_or_else(|| format!("Unknown manifest kind '{}'", s))
    }
}

/// Everything one plugin declares, collected before any of it is merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginDeclarations {
    pub providers: Vec<String>,
    pub commands: Vec<String>,
    pub controllers: Vec<String>,
    pub middleware: Vec<String>,
    pub events: EventMap,
}

impl PluginDeclarations {
    /// Call all five accessors; the first failure names the declaration it came from.
    pub fn collect(plugin: &dyn Plugin) -> Result<Self, (ManifestKind, PluginError)> {
        Ok(Self {
            providers: plugin.providers().map_err(|e| (ManifestKind::Providers, e))?,
            commands: plugin.commands().map_err(|e| (ManifestKind::Commands, e))?,
            controllers: plugin.controllers().map_err(|e| (ManifestKind::Controllers, e))?,
            middleware: plugin.middleware().map_err(|e| (ManifestKind::Middleware, e))?,
            events: plugin.events().map_err(|e| (ManifestKind::Events, e))?,
        })
    }
}

/// The merged declarations of an ordered list of plugins.
///
/// Lists keep plugin order and duplicates; controllers form a set; each
/// event's listeners keep plugin order. Maps and sets are ordered so equal
/// manifests serialize to equal bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedManifest {
    pub providers: Vec<String>,
    pub commands: Vec<String>,
    pub controllers: BTreeSet<String>,
    pub middleware: Vec<String>,
    pub events: EventMap,
}

impl AggregatedManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one plugin's declarations.
    pub fn merge(&mut self, declarations: PluginDeclarations) {
        self.providers.extend(declarations.providers);
        self.commands.extend(declarations.commands);
        self.controllers.extend(declarations.controllers);
        self.middleware.extend(declarations.middleware);
        for (event, listeners) in declarations.events {
            self.events.entry(event).or_default().extend(listeners);
        }
    }

    /// This manifest's `kind` collection.
    pub fn slice(&self, kind: ManifestKind) -> Artifact {
        match kind {
            ManifestKind::Providers => Artifact::Providers(self.providers.clone()),
            ManifestKind::Commands => Artifact::Commands(self.commands.clone()),
            ManifestKind::Controllers => Artifact::Controllers(self.controllers.clone()),
            ManifestKind::Middleware => Artifact::Middleware(self.middleware.clone()),
            ManifestKind::Events => Artifact::Events(self.events.clone()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Total number of declared ids across every collection.
    pub fn len(&self) -> usize {
        self.providers.len()
            + self.commands.len()
            + self.controllers.len()
            + self.middleware.len()
            + self.events.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One kind's slice of a manifest; the unit the cache stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Providers(Vec<String>),
    Commands(Vec<String>),
    Controllers(BTreeSet<String>),
    Middleware(Vec<String>),
    Events(EventMap),
}

impl Artifact {
    pub fn kind(&self) -> ManifestKind {
        match self {
            Artifact::Providers(_) => ManifestKind::Providers,
            Artifact::Commands(_) => ManifestKind::Commands,
            Artifact::Controllers(_) => ManifestKind::Controllers,
            Artifact::Middleware(_) => ManifestKind::Middleware,
            Artifact::Events(_) => ManifestKind::Events,
        }
    }

    /// JSON payload: an array of ids, or an object of id arrays for events.
    pub fn to_value(&self) -> Value {
        fn list<'a>(ids: impl Iterator<Item = &'a String>) -> Value {
            Value::Array(ids.map(|id| Value::String(id.clone())).collect())
        }

        match self {
            Artifact::Providers(ids) | Artifact::Commands(ids) | Artifact::Middleware(ids) => list(ids.iter()),
            Artifact::Controllers(ids) => list(ids.iter()),
            Artifact::Events(events) => Value::Object(
                events
                    .iter()
                    .map(|(event, listeners)| (event.clone(), list(listeners.iter())))
                    .collect(),
            ),
        }
    }

    /// Parse a payload produced by [`to_value`](Artifact::to_value).
    pub fn from_value(kind: ManifestKind, value: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            ManifestKind::Providers => Artifact::Providers(serde_json::from_value(value)?),
            ManifestKind::Commands => Artifact::Commands(serde_json::from_value(value)?),
            ManifestKind::Controllers => Artifact::Controllers(serde_json::from_value(value)?),
            ManifestKind::Middleware => Artifact::Middleware(serde_json::from_value(value)?),
            ManifestKind::Events => Artifact::Events(serde_json::from_value(value)?),
        })
    }

    /// Flat list of ids; event listeners are flattened in key order.
    pub fn ids(&self) -> Vec<String> {
        match self {
            Artifact::Providers(ids) | Artifact::Commands(ids) | Artifact::Middleware(ids) => ids.clone(),
            Artifact::Controllers(ids) => ids.iter().cloned().collect(),
            Artifact::Events(events) => events.values().flatten().cloned().collect(),
        }
    }
}

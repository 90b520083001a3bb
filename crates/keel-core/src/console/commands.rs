//! Built-in framework commands: `list` and the cache maintenance commands.
//!
//! They are contributed by [`FrameworkPlugin`] and go through the same
//! declaration and aggregation path as any third-party command.
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::ApplicationRegistry;
use crate::console::{Command, ConsoleInput, ConsoleOutput};
use crate::exception::DispatchError;
use crate::kernel::component::{Components, Container, ContainerExt};
use crate::kernel::constants::{APP_NAME, APP_VERSION, APPLICATION_REGISTRY_ID, EXIT_SUCCESS, FRAMEWORK_PLUGIN};
use crate::kernel::error::Result as KernelResult;
use crate::plugin_system::manifest::{Artifact, ManifestKind};
use crate::plugin_system::traits::{Plugin, PluginError};
use crate::plugin_system::version::VersionRange;

const COMPATIBLE_API_REQ: &str = "^0.1";

fn registry(container: &dyn Container) -> Result<Arc<ApplicationRegistry>, DispatchError> {
    Ok(container.resolve::<Arc<ApplicationRegistry>>(APPLICATION_REGISTRY_ID)?)
}

fn command_id(name: &str) -> String {
    format!("keel.command.{}", name)
}

/// Prints every registered command with its description.
pub struct ListCommand;

#[async_trait]
impl Command for ListCommand {
    fn name(&self) -> &str {
        "list"
    }

    fn description(&self) -> &str {
        "List available commands"
    }

    async fn execute(
        &self,
        _input: &ConsoleInput,
        output: &mut ConsoleOutput,
        container: &dyn Container,
    ) -> Result<i32, DispatchError> {
        let registry = registry(container)?;
        let mut commands: BTreeMap<String, String> = BTreeMap::new();
        for id in registry.commands()? {
            let command = container.resolve::<Arc<dyn Command>>(&id)?;
            commands
                .entry(command.name().to_string())
                .or_insert_with(|| command.description().to_string());
        }

        let width = commands.keys().map(String::len).max().unwrap_or(0);
        output.line(format!("{} {}", APP_NAME, APP_VERSION));
        output.line("Available commands:");
        for (name, description) in commands {
            output.line(format!("  {:width$}  {}", name, description, width = width));
        }
        Ok(EXIT_SUCCESS)
    }
}

/// `<kind>:cache`: aggregate one collection fresh and write it to the cache.
pub struct CacheKindCommand {
    kind: ManifestKind,
    name: String,
    description: String,
}

impl CacheKindCommand {
    pub fn new(kind: ManifestKind) -> Self {
        Self {
            kind,
            name: format!("{}:cache", kind.stem()),
            description: format!("Cache the aggregated {} manifest", kind),
        }
    }
}

#[async_trait]
impl Command for CacheKindCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(
        &self,
        _input: &ConsoleInput,
        output: &mut ConsoleOutput,
        container: &dyn Container,
    ) -> Result<i32, DispatchError> {
        let registry = registry(container)?;
        let artifact = registry.cache(self.kind)?;
        output.line(format!(
            "Cached {} manifest ({} entries) to {}",
            self.kind,
            entry_count(&artifact),
            registry.cache_store().path(self.kind).display()
        ));
        Ok(EXIT_SUCCESS)
    }
}

/// `<kind>:clear`: delete one collection's cache file.
pub struct ClearKindCommand {
    kind: ManifestKind,
    name: String,
    description: String,
}

impl ClearKindCommand {
    pub fn new(kind: ManifestKind) -> Self {
        Self {
            kind,
            name: format!("{}:clear", kind.stem()),
            description: format!("Remove the cached {} manifest", kind),
        }
    }
}

#[async_trait]
impl Command for ClearKindCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(
        &self,
        _input: &ConsoleInput,
        output: &mut ConsoleOutput,
        container: &dyn Container,
    ) -> Result<i32, DispatchError> {
        let registry = registry(container)?;
        if registry.clear(self.kind)? {
            output.line(format!("Cleared cached {} manifest", self.kind));
        } else {
            output.line(format!("No cached {} manifest to clear", self.kind));
        }
        Ok(EXIT_SUCCESS)
    }
}

/// `cache:optimize`: every `<kind>:cache` in order, stopping at the first failure.
pub struct OptimizeCommand;

#[async_trait]
impl Command for OptimizeCommand {
    fn name(&self) -> &str {
        "cache:optimize"
    }

    fn description(&self) -> &str {
        "Cache every manifest collection"
    }

    async fn execute(
        &self,
        input: &ConsoleInput,
        output: &mut ConsoleOutput,
        container: &dyn Container,
    ) -> Result<i32, DispatchError> {
        for kind in ManifestKind::ALL {
            let code = CacheKindCommand::new(kind).execute(input, output, container).await?;
            if code != EXIT_SUCCESS {
                return Ok(code);
            }
        }
        output.line("Application manifest cached successfully.");
        Ok(EXIT_SUCCESS)
    }
}

/// `cache:clear`: delete every cache file.
pub struct ClearCacheCommand;

#[async_trait]
impl Command for ClearCacheCommand {
    fn name(&self) -> &str {
        "cache:clear"
    }

    fn description(&self) -> &str {
        "Remove every cached manifest collection"
    }

    async fn execute(
        &self,
        _input: &ConsoleInput,
        output: &mut ConsoleOutput,
        container: &dyn Container,
    ) -> Result<i32, DispatchError> {
        let removed = registry(container)?.clear_all()?;
        output.line(format!("Cleared {} cached manifest file(s).", removed));
        Ok(EXIT_SUCCESS)
    }
}

fn entry_count(artifact: &Artifact) -> usize {
    artifact.ids().len()
}

/// Built-in plugin contributing the framework commands.
#[derive(Debug, Default)]
pub struct FrameworkPlugin;

impl FrameworkPlugin {
    fn all_commands() -> Vec<Arc<dyn Command>> {
        let mut commands: Vec<Arc<dyn Command>> = Vec::new();
        commands.push(Arc::new(ListCommand));
        commands.push(Arc::new(ClearCacheCommand));
        commands.push(Arc::new(OptimizeCommand));
        for kind in ManifestKind::ALL {
            commands.push(Arc::new(CacheKindCommand::new(kind)));
            commands.push(Arc::new(ClearKindCommand::new(kind)));
        }
        commands
    }
}

impl Plugin for FrameworkPlugin {
    fn name(&self) -> &'static str {
        FRAMEWORK_PLUGIN
    }

    fn version(&self) -> &str {
        APP_VERSION
    }

    fn compatible_api_versions(&self) -> Vec<VersionRange> {
        match VersionRange::from_constraint(COMPATIBLE_API_REQ) {
            Ok(range) => vec![range],
            Err(e) => {
                log::error!(
                    "Failed to parse API version requirement ('{}') for {}: {}",
                    COMPATIBLE_API_REQ,
                    self.name(),
                    e
                );
                vec![]
            }
        }
    }

    fn commands(&self) -> Result<Vec<String>, PluginError> {
        Ok(Self::all_commands()
            .iter()
            .map(|command| command_id(command.name()))
            .collect())
    }

    fn register_components(&self, components: &mut Components<'_>) -> KernelResult<()> {
        for command in Self::all_commands() {
            let id = command_id(command.name());
            components.command(&id, command)?;
        }
        Ok(())
    }
}

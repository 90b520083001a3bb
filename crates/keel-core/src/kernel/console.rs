use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::application::ApplicationRegistry;
use crate::console::{Command, CommandError, ConsoleInput, ConsoleOutput};
use crate::event::types::{KernelEvent, Surface};
use crate::exception::handler::GENERIC_MESSAGE;
use crate::exception::{DispatchContext, DispatchError, ExceptionHandler, Rendered};
use crate::kernel::bootstrap::{KernelCore, KernelLifecycle, KernelPhase, panic_message};
use crate::kernel::component::Container;
use crate::kernel::constants::{DEFAULT_COMMAND, EXIT_FAILURE};
use crate::kernel::error::{KernelLifecyclePhase, Result};
use crate::plugin_system::PluginTable;
use crate::storage::AppConfig;

/// Commands keyed by the name they are invoked by.
struct ConsoleRuntime {
    commands: BTreeMap<String, Arc<dyn Command>>,
}

/// CLI entry point: boots once, then runs one command per `handle` call.
pub struct ConsoleKernel {
    core: KernelCore,
    lifecycle: KernelLifecycle<ConsoleRuntime>,
}

impl ConsoleKernel {
    pub fn new(config: AppConfig, plugins: Arc<PluginTable>) -> Self {
        Self {
            core: KernelCore::new(config, plugins),
            lifecycle: KernelLifecycle::new(),
        }
    }

    pub fn with_container(mut self, container: Arc<dyn Container>) -> Self {
        self.core.set_container(container);
        self
    }

    pub fn with_exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.core.set_exception_handler(handler);
        self
    }

    pub fn with_registry(mut self, registry: Arc<ApplicationRegistry>) -> Self {
        self.core.set_registry(registry);
        self
    }

    pub fn core(&self) -> &KernelCore {
        &self.core
    }

    pub fn container(&self) -> &Arc<dyn Container> {
        self.core.container()
    }

    pub fn registry(&self) -> &Arc<ApplicationRegistry> {
        self.core.registry()
    }

    pub async fn phase(&self) -> KernelPhase {
        self.lifecycle.phase().await
    }

    /// Boot the kernel. A second call is a no-op; after a failed boot every
    /// call returns [`Error::NotBootstrapped`](crate::kernel::Error::NotBootstrapped).
    pub async fn bootstrap(&self) -> Result<()> {
        self.lifecycle.bootstrap_with(|| self.boot()).await
    }

    async fn boot(&self) -> Result<ConsoleRuntime> {
        log::info!("Bootstrapping console kernel");
        self.core.register_foundation()?;
        self.core.register_providers().await?;

        let command_ids = self.core.registry().commands()?;
        let mut commands: BTreeMap<String, Arc<dyn Command>> = BTreeMap::new();
        for (id, command) in self
            .core
            .resolve_all::<Arc<dyn Command>>(&command_ids, KernelLifecyclePhase::RegisterSurface)?
        {
            let name = command.name().to_string();
            if commands.contains_key(&name) {
                log::warn!("Command '{}' already registered; ignoring duplicate '{}'", name, id);
                continue;
            }
            commands.insert(name, command);
        }

        self.core.wire_events()?;
        log::info!("Console kernel ready: {} command(s)", commands.len());
        self.core.emit(&KernelEvent::Booted { surface: Surface::Console }).await;
        Ok(ConsoleRuntime { commands })
    }

    /// Run the command `input` names and return its exit code.
    ///
    /// An empty command name runs `list`. The only error is `NotBootstrapped`:
    /// unknown commands and command failures are reported, rendered to
    /// `output`'s error stream and turned into a non-zero exit code.
    pub async fn handle(&self, input: ConsoleInput, output: &mut ConsoleOutput) -> Result<i32> {
        let runtime = self.lifecycle.runtime().await?;
        let name = if input.command.is_empty() { DEFAULT_COMMAND } else { input.command.as_str() };

        let outcome = match runtime.commands.get(name) {
            None => Err(DispatchError::Command(CommandError::not_found(name))),
            Some(command) => {
                let run = command.execute(&input, output, self.core.container().as_ref());
                match AssertUnwindSafe(run).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(payload) => Err(DispatchError::Panic(panic_message(payload.as_ref()))),
                }
            }
        };

        let exit_code = match outcome {
            Ok(code) => code,
            Err(failure) => self.fail(name, &failure, output).await,
        };
        log::debug!("Command '{}' finished with exit code {}", name, exit_code);

        self.core
            .emit(&KernelEvent::CommandFinished { command: name.to_string(), exit_code })
            .await;
        Ok(exit_code)
    }

    /// Names of the registered commands, sorted; empty before bootstrap.
    pub async fn command_names(&self) -> Vec<String> {
        match self.lifecycle.runtime().await {
            Ok(runtime) => runtime.commands.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn fail(&self, command: &str, failure: &DispatchError, output: &mut ConsoleOutput) -> i32 {
        self.core.report_failure(Surface::Console, failure).await;
        let context = DispatchContext::Console { command };
        let (exit_code, lines) = match self.core.render(&context, failure) {
            Some(Rendered::Console { exit_code, lines }) => (exit_code, lines),
            Some(Rendered::Http(_)) | None => (failure.exit_code(), self.fallback_lines(command, failure)),
        };
        for line in lines {
            output.error(line);
        }
        if exit_code == 0 { EXIT_FAILURE } else { exit_code }
    }

    /// Lines used when the exception handler itself could not render.
    fn fallback_lines(&self, command: &str, failure: &DispatchError) -> Vec<String> {
        match failure {
            DispatchError::Command(e) => vec![e.message().to_string()],
            _ if self.core.config().debug => vec![
                format!("Command '{}' failed: {}", command, GENERIC_MESSAGE),
                failure.to_string(),
            ],
            _ => vec![format!("Command '{}' failed: {}", command, GENERIC_MESSAGE)],
        }
    }
}

impl fmt::Debug for ConsoleKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleKernel")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::RwLock;

use crate::application::ApplicationRegistry;
use crate::event::types::{KernelEvent, Surface};
use crate::event::{Event, EventDispatcher};
use crate::exception::{DefaultExceptionHandler, DispatchContext, DispatchError, ExceptionHandler, Rendered};
use crate::kernel::component::{Components, Container, ContainerExt, DefaultContainer, ServiceProvider};
use crate::kernel::constants;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::PluginTable;
use crate::storage::AppConfig;

/// Observable phase of a kernel, without the runtime payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelPhase {
    Uninitialized,
    Bootstrapped,
    FailedToBootstrap,
}

impl fmt::Display for KernelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelPhase::Uninitialized => write!(f, "uninitialized"),
            KernelPhase::Bootstrapped => write!(f, "bootstrapped"),
            KernelPhase::FailedToBootstrap => write!(f, "failed-to-bootstrap"),
        }
    }
}

enum KernelState<R> {
    Uninitialized,
    Bootstrapped(Arc<R>),
    FailedToBootstrap(String),
}

/// The `Uninitialized -> Bootstrapped` state machine shared by both kernels.
///
/// The transition runs under the write half of a single lock, so concurrent
/// `bootstrap` calls boot once and `handle` calls wait for an in-flight boot.
/// A failed boot is terminal.
pub struct KernelLifecycle<R> {
    state: RwLock<KernelState<R>>,
}

impl<R> KernelLifecycle<R> {
    pub fn new() -> Self {
        Self { state: RwLock::new(KernelState::Uninitialized) }
    }

    /// Run `boot` unless the kernel already left `Uninitialized`.
    pub async fn bootstrap_with<F, Fut>(&self, boot: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let mut state = self.state.write().await;
        match &*state {
            KernelState::Bootstrapped(_) => {
                log::debug!("Kernel already bootstrapped; bootstrap() is a no-op");
                return Ok(());
            }
            KernelState::FailedToBootstrap(reason) => {
                return Err(Error::NotBootstrapped { reason: Some(reason.clone()) });
            }
            KernelState::Uninitialized => {}
        }

        let outcome = match AssertUnwindSafe(async move { boot().await }).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Bootstrap,
                component_name: None,
                message: format!("bootstrap panicked: {}", panic_message(payload.as_ref())),
                source: None,
            }),
        };

        match outcome {
            Ok(runtime) => {
                *state = KernelState::Bootstrapped(Arc::new(runtime));
                Ok(())
            }
            Err(e) => {
                log::error!("Kernel bootstrap failed: {}", e);
                *state = KernelState::FailedToBootstrap(e.to_string());
                Err(e)
            }
        }
    }

    /// The booted runtime, or `NotBootstrapped`.
    pub async fn runtime(&self) -> Result<Arc<R>> {
        match &*self.state.read().await {
            KernelState::Bootstrapped(runtime) => Ok(runtime.clone()),
            KernelState::Uninitialized => Err(Error::NotBootstrapped { reason: None }),
            KernelState::FailedToBootstrap(reason) => {
                Err(Error::NotBootstrapped { reason: Some(reason.clone()) })
            }
        }
    }

    pub async fn phase(&self) -> KernelPhase {
        match &*self.state.read().await {
            KernelState::Uninitialized => KernelPhase::Uninitialized,
            KernelState::Bootstrapped(_) => KernelPhase::Bootstrapped,
            KernelState::FailedToBootstrap(_) => KernelPhase::FailedToBootstrap,
        }
    }
}

impl<R> Default for KernelLifecycle<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything both kernel variants share: configuration, the registry they
/// read the manifest from, the container, events and exception handling.
pub struct KernelCore {
    config: Arc<AppConfig>,
    plugins: Arc<PluginTable>,
    registry: Arc<ApplicationRegistry>,
    container: Arc<dyn Container>,
    events: Arc<EventDispatcher>,
    exceptions: Arc<dyn ExceptionHandler>,
}

impl KernelCore {
    pub fn new(config: AppConfig, plugins: Arc<PluginTable>) -> Self {
        let registry = Arc::new(ApplicationRegistry::from_config(&config, plugins.clone()));
        let exceptions: Arc<dyn ExceptionHandler> = Arc::new(DefaultExceptionHandler::new(config.debug));
        Self {
            config: Arc::new(config),
            plugins,
            registry,
            container: Arc::new(DefaultContainer::new()),
            events: Arc::new(EventDispatcher::new()),
            exceptions,
        }
    }

    pub fn set_container(&mut self, container: Arc<dyn Container>) {
        self.container = container;
    }

    pub fn set_exception_handler(&mut self, handler: Arc<dyn ExceptionHandler>) {
        self.exceptions = handler;
    }

    pub fn set_registry(&mut self, registry: Arc<ApplicationRegistry>) {
        self.registry = registry;
    }

    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ApplicationRegistry> {
        &self.registry
    }

    pub fn container(&self) -> &Arc<dyn Container> {
        &self.container
    }

    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.events
    }

    pub fn exceptions(&self) -> &Arc<dyn ExceptionHandler> {
        &self.exceptions
    }

    /// Core bindings, then every configured plugin's component bindings.
    pub(crate) fn register_foundation(&self) -> Result<()> {
        let container = self.container.as_ref();
        container.instance(constants::CONFIG_ID, self.config.clone())?;
        container.instance(constants::APPLICATION_REGISTRY_ID, self.registry.clone())?;
        container.instance(constants::EVENT_DISPATCHER_ID, self.events.clone())?;

        for plugin_id in self.registry.plugin_ids() {
            let plugin = self
                .plugins
                .get(plugin_id)
                .ok_or_else(|| PluginSystemError::UnknownPlugin { plugin_id: plugin_id.clone() })?;
            let mut components = Components::new(container);
            plugin.register_components(&mut components).map_err(|e| {
                Error::lifecycle(
                    KernelLifecyclePhase::RegisterComponents,
                    Some(plugin_id.as_str()),
                    "plugin failed to bind its components",
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Register every provider, then boot every provider, both in manifest order.
    pub(crate) async fn register_providers(&self) -> Result<()> {
        let container = self.container.as_ref();
        let provider_ids = self.registry.providers()?;
        let mut providers = Vec::with_capacity(provider_ids.len());

        for id in &provider_ids {
            let provider = container.resolve::<Arc<dyn ServiceProvider>>(id).map_err(|e| {
                Error::lifecycle(KernelLifecyclePhase::RegisterProviders, Some(id.as_str()), "provider not resolvable", e.into())
            })?;
            log::debug!("Registering provider '{}'", id);
            provider.register(container).map_err(|e| {
                Error::lifecycle(KernelLifecyclePhase::RegisterProviders, Some(id.as_str()), "provider registration failed", e)
            })?;
            providers.push((id, provider));
        }

        for (id, provider) in providers {
            provider.boot(container).await.map_err(|e| {
                Error::lifecycle(KernelLifecyclePhase::BootProviders, Some(id.as_str()), "provider boot failed", e)
            })?;
        }
        log::info!("Registered {} service provider(s)", provider_ids.len());
        Ok(())
    }

    /// Subscribe every declared listener, in declared order per event type.
    pub(crate) fn wire_events(&self) -> Result<()> {
        let mut count = 0;
        for (event_type, listeners) in self.registry.events()? {
            for listener_id in listeners {
                self.events
                    .subscribe(&event_type, &listener_id, self.container.as_ref())
                    .map_err(|e| {
                        Error::lifecycle(KernelLifecyclePhase::WireEvents, Some(listener_id.as_str()), "listener not resolvable", e.into())
                    })?;
                count += 1;
            }
        }
        log::info!("Wired {} event listener(s)", count);
        Ok(())
    }

    /// Dispatch a framework event; listener failures and panics are logged, never raised.
    pub(crate) async fn emit(&self, event: &KernelEvent) {
        let dispatch = self.events.dispatch(event, self.container.as_ref());
        match AssertUnwindSafe(dispatch).catch_unwind().await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => log::warn!("Dispatching '{}' failed: {}", event.name(), e),
            Err(payload) => log::warn!(
                "A listener panicked while handling '{}': {}",
                event.name(),
                panic_message(payload.as_ref())
            ),
        }
    }

    /// Report a failure. Errors and panics inside `report` are swallowed.
    pub(crate) fn report(&self, failure: &DispatchError) {
        match catch_unwind(AssertUnwindSafe(|| self.exceptions.report(failure))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Exception handler failed to report: {}", e),
            Err(_) => log::warn!("Exception handler panicked while reporting"),
        }
    }

    /// Report `failure` once and announce it to `kernel.exception` listeners.
    pub(crate) async fn report_failure(&self, surface: Surface, failure: &DispatchError) {
        self.report(failure);
        self.emit(&KernelEvent::ExceptionReported { surface, message: failure.to_string() })
            .await;
    }

    /// Resolve every id in `ids` as `T` for `phase`.
    pub(crate) fn resolve_all<T: Any + Clone>(&self, ids: &[String], phase: KernelLifecyclePhase) -> Result<Vec<(String, T)>> {
        ids.iter()
            .map(|id| {
                self.container
                    .resolve::<T>(id)
                    .map(|component| (id.clone(), component))
                    .map_err(|e| Error::lifecycle(phase, Some(id.as_str()), "component not resolvable", e.into()))
            })
            .collect()
    }

    /// Render a failure; a panicking handler yields `None`.
    pub(crate) fn render(&self, context: &DispatchContext<'_>, failure: &DispatchError) -> Option<Rendered> {
        match catch_unwind(AssertUnwindSafe(|| self.exceptions.render(context, failure))) {
            Ok(rendered) => Some(rendered),
            Err(_) => {
                log::warn!("Exception handler panicked while rendering");
                None
            }
        }
    }
}

impl fmt::Debug for KernelCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelCore")
            .field("config", &self.config)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

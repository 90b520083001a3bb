//! Core logging plugin.
//!
//! Installs a `tracing` subscriber (with `log` records bridged in) when the
//! application boots, logs every request that passes through the HTTP
//! kernel, and records kernel lifecycle events.
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use keel_core::event::types::KernelEvent;
use keel_core::event::{Event, EventResult, Listener};
use keel_core::exception::DispatchError;
use keel_core::http::{Middleware, Next, Request, Response};
use keel_core::kernel::constants::CONFIG_ID;
use keel_core::kernel::error::Result as KernelResult;
use keel_core::kernel::{Components, Container, ContainerExt, ServiceProvider};
use keel_core::plugin_system::traits::{EventMap, Plugin, PluginError};
use keel_core::plugin_system::version::VersionRange;
use keel_core::storage::AppConfig;
use tracing_subscriber::EnvFilter;

pub const PLUGIN_NAME: &str = "core-logging";
pub const PROVIDER_ID: &str = "core-logging.provider";
pub const REQUEST_LOGGER_ID: &str = "core-logging.request_logger";
pub const LIFECYCLE_LISTENER_ID: &str = "core-logging.lifecycle";

const COMPATIBLE_API_REQ: &str = "^0.1";

/// Default filter directive when `RUST_LOG` is unset.
pub fn default_directive(debug: bool) -> &'static str {
    if debug { "debug" } else { "warn" }
}

/// Install the global fmt subscriber on stderr, bridging `log` records.
///
/// Returns `false` if a subscriber was already installed; that is not an error.
pub fn init_subscriber(debug: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));
    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
    {
        Ok(()) => true,
        Err(e) => {
            log::debug!("Logging subscriber already installed: {}", e);
            false
        }
    }
}

#[derive(Default)]
pub struct LoggingPlugin;

impl Plugin for LoggingPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn compatible_api_versions(&self) -> Vec<VersionRange> {
        match VersionRange::from_constraint(COMPATIBLE_API_REQ) {
            Ok(vr) => vec![vr],
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

    fn providers(&self) -> Result<Vec<String>, PluginError> {
        Ok(vec![PROVIDER_ID.to_string()])
    }

    fn middleware(&self) -> Result<Vec<String>, PluginError> {
        Ok(vec![REQUEST_LOGGER_ID.to_string()])
    }

    fn events(&self) -> Result<EventMap, PluginError> {
        let mut events = EventMap::new();
        for event in [KernelEvent::BOOTED, KernelEvent::COMMAND_FINISHED, KernelEvent::EXCEPTION_REPORTED] {
            events.insert(event.to_string(), vec![LIFECYCLE_LISTENER_ID.to_string()]);
        }
        Ok(events)
    }

    fn register_components(&self, components: &mut Components<'_>) -> KernelResult<()> {
        components.provider(PROVIDER_ID, Arc::new(LoggingProvider))?;
        components.middleware(REQUEST_LOGGER_ID, Arc::new(RequestLogger))?;
        components.listener(LIFECYCLE_LISTENER_ID, Arc::new(LifecycleLogger))?;
        Ok(())
    }
}

/// Installs the subscriber at the level `AppConfig::debug` selects.
pub struct LoggingProvider;

#[async_trait]
impl ServiceProvider for LoggingProvider {
    fn register(&self, container: &dyn Container) -> KernelResult<()> {
        let debug = container
            .resolve::<Arc<AppConfig>>(CONFIG_ID)
            .map(|config| config.debug)
            .unwrap_or(false);
        init_subscriber(debug);
        Ok(())
    }

    async fn boot(&self, container: &dyn Container) -> KernelResult<()> {
        if let Ok(config) = container.resolve::<Arc<AppConfig>>(CONFIG_ID) {
            tracing::info!(app = %config.name, environment = %config.environment, debug = config.debug, "Logging ready");
        }
        Ok(())
    }
}

/// Logs method, path, status and latency of every request.
pub struct RequestLogger;

#[async_trait]
impl Middleware for RequestLogger {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, DispatchError> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let started = Instant::now();

        let outcome = next.run(request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(response) => tracing::info!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                elapsed_ms,
                "request"
            ),
            Err(e) => tracing::warn!(method = %method, path = %path, elapsed_ms, error = %e, "request failed"),
        }
        outcome
    }
}

/// Records kernel lifecycle events.
pub struct LifecycleLogger;

#[async_trait]
impl Listener for LifecycleLogger {
    async fn handle(&self, event: &dyn Event, _container: &dyn Container) -> EventResult {
        match event.as_any().downcast_ref::<KernelEvent>() {
            Some(KernelEvent::Booted { surface }) => tracing::info!(%surface, "kernel booted"),
            Some(KernelEvent::CommandFinished { command, exit_code }) => {
                tracing::debug!(%command, exit_code, "command finished")
            }
            Some(KernelEvent::ExceptionReported { surface, message }) => {
                tracing::debug!(%surface, %message, "exception reported")
            }
            Some(other) => tracing::trace!(event = other.name(), "kernel event"),
            None => tracing::trace!(event = event.name(), "event"),
        }
        EventResult::Continue
    }
}

//! Example plugin contributing one of every component kind: a service
//! provider, a `greet` command, a `GET /hello` controller, a response
//! header middleware and a boot listener.
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use keel_core::console::{Command, CommandError, ConsoleInput, ConsoleOutput};
use keel_core::event::types::KernelEvent;
use keel_core::event::{Event, EventResult, Listener};
use keel_core::exception::DispatchError;
use keel_core::http::{Controller, HttpError, Middleware, Next, Request, Response, Route};
use keel_core::kernel::constants::{CONFIG_ID, EXIT_INVALID, EXIT_SUCCESS};
use keel_core::kernel::error::Result as KernelResult;
use keel_core::kernel::{Components, Container, ContainerExt, ServiceProvider};
use keel_core::plugin_system::traits::{EventMap, Plugin, PluginError};
use keel_core::plugin_system::version::VersionRange;
use keel_core::storage::AppConfig;
use serde_json::json;

pub const PLUGIN_NAME: &str = "greeter";
pub const PROVIDER_ID: &str = "greeter.provider";
pub const SERVICE_ID: &str = "greeter.service";
pub const COMMAND_ID: &str = "greeter.command.greet";
pub const CONTROLLER_ID: &str = "greeter.controller.hello";
pub const MIDDLEWARE_ID: &str = "greeter.powered_by";
pub const LISTENER_ID: &str = "greeter.on_boot";

const COMPATIBLE_API_REQ: &str = ">=0.1.0, <0.2.0";
const DEFAULT_NAME: &str = "world";

/// Builds greetings for the command and the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeter {
    app: String,
}

impl Greeter {
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into() }
    }

    pub fn greet(&self, name: &str) -> String {
        format!("Hello, {}! Greetings from {}.", name, self.app)
    }
}

#[derive(Default)]
pub struct GreeterPlugin;

impl Plugin for GreeterPlugin {
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
                log::error!("Invalid API range for {}: {}", PLUGIN_NAME, e);
                vec![]
            }
        }
    }

    fn providers(&self) -> Result<Vec<String>, PluginError> {
        Ok(vec![PROVIDER_ID.to_string()])
    }

    fn commands(&self) -> Result<Vec<String>, PluginError> {
        Ok(vec![COMMAND_ID.to_string()])
    }

    fn controllers(&self) -> Result<Vec<String>, PluginError> {
        Ok(vec![CONTROLLER_ID.to_string()])
    }

    fn middleware(&self) -> Result<Vec<String>, PluginError> {
        Ok(vec![MIDDLEWARE_ID.to_string()])
    }

    fn events(&self) -> Result<EventMap, PluginError> {
        let mut events = EventMap::new();
        events.insert(KernelEvent::BOOTED.to_string(), vec![LISTENER_ID.to_string()]);
        Ok(events)
    }

    fn register_components(&self, components: &mut Components<'_>) -> KernelResult<()> {
        components.provider(PROVIDER_ID, Arc::new(GreeterProvider))?;
        components.command(COMMAND_ID, Arc::new(GreetCommand))?;
        components.controller(CONTROLLER_ID, Arc::new(HelloController))?;
        components.middleware(MIDDLEWARE_ID, Arc::new(PoweredBy))?;
        components.listener(LISTENER_ID, Arc::new(BootListener))?;
        Ok(())
    }
}

/// Binds the shared [`Greeter`], named after the configured application.
pub struct GreeterProvider;

#[async_trait]
impl ServiceProvider for GreeterProvider {
    fn register(&self, container: &dyn Container) -> KernelResult<()> {
        let app = container
            .resolve::<Arc<AppConfig>>(CONFIG_ID)
            .map(|config| config.name.clone())
            .unwrap_or_else(|_| "Keel".to_string());
        container.instance(SERVICE_ID, Arc::new(Greeter::new(app)))?;
        Ok(())
    }
}

fn greeter(container: &dyn Container) -> Result<Arc<Greeter>, DispatchError> {
    Ok(container.resolve::<Arc<Greeter>>(SERVICE_ID)?)
}

/// `greet [name]`
pub struct GreetCommand;

#[async_trait]
impl Command for GreetCommand {
    fn name(&self) -> &str {
        "greet"
    }

    fn description(&self) -> &str {
        "Print a greeting"
    }

    async fn execute(
        &self,
        input: &ConsoleInput,
        output: &mut ConsoleOutput,
        container: &dyn Container,
    ) -> Result<i32, DispatchError> {
        let name = input.arg(0).unwrap_or(DEFAULT_NAME).trim();
        if name.is_empty() {
            return Err(CommandError::new("Usage: greet [name]").with_exit_code(EXIT_INVALID).into());
        }
        output.line(greeter(container)?.greet(name));
        Ok(EXIT_SUCCESS)
    }
}

/// `GET /hello?name=...` answering with a JSON greeting.
pub struct HelloController;

#[async_trait]
impl Controller for HelloController {
    fn routes(&self) -> Vec<Route> {
        vec![Route::get("/hello")]
    }

    async fn handle(&self, request: Request, container: &dyn Container) -> Result<Response, DispatchError> {
        let name = query_param(&request, "name").unwrap_or(DEFAULT_NAME);
        if name.is_empty() {
            return Err(HttpError::bad_request("name must not be empty").into());
        }

        let body = json!({ "message": greeter(container)?.greet(name) });
        let mut response = Response::new(body.to_string());
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(response)
    }
}

fn query_param<'a>(request: &'a Request, key: &str) -> Option<&'a str> {
    request
        .uri()
        .query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Stamps every successful response with `x-powered-by: keel`.
pub struct PoweredBy;

#[async_trait]
impl Middleware for PoweredBy {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, DispatchError> {
        let mut response = next.run(request).await?;
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-powered-by"), HeaderValue::from_static("keel"));
        Ok(response)
    }
}

pub struct BootListener;

#[async_trait]
impl Listener for BootListener {
    async fn handle(&self, event: &dyn Event, container: &dyn Container) -> EventResult {
        if let Some(KernelEvent::Booted { surface }) = event.as_any().downcast_ref::<KernelEvent>() {
            log::debug!("Greeter ready on {} (service bound: {})", surface, container.has(SERVICE_ID));
        }
        EventResult::Continue
    }
}

#[cfg(test)]
mod tests;

#![cfg(test)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::{HeaderValue, StatusCode};

use crate::console::{Command, CommandError, ConsoleInput, ConsoleOutput};
use crate::event::{Event, EventResult, Listener};
use crate::exception::{DefaultExceptionHandler, DispatchContext, DispatchError, ExceptionHandler, Rendered, ReportError};
use crate::http::{Controller, Middleware, Next, Request, Response, Route};
use crate::kernel::component::{Components, Container, ContainerExt, ServiceProvider};
use crate::kernel::error::Result as KernelResult;
use crate::plugin_system::manifest::{ManifestKind, PluginDeclarations};
use crate::plugin_system::traits::{EventMap, Plugin, PluginError};
use crate::plugin_system::version::VersionRange;
use crate::plugin_system::PluginTable;
use crate::storage::AppConfig;

/// Shared, ordered record of what ran.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

// ===== MOCK PLUGINS =====

/// A component a [`MockPlugin`] binds at bootstrap.
#[derive(Clone)]
pub enum Component {
    Provider(Arc<dyn ServiceProvider>),
    Command(Arc<dyn Command>),
    Controller(Arc<dyn Controller>),
    Middleware(Arc<dyn Middleware>),
    Listener(Arc<dyn Listener>),
}

/// Configurable plugin: fixed declarations, optional failing accessor, and
/// the components to bind behind the declared ids.
pub struct MockPlugin {
    name: &'static str,
    api_range: &'static str,
    declarations: PluginDeclarations,
    fail_on: Option<ManifestKind>,
    components: Vec<(String, Component)>,
    declaration_calls: Arc<AtomicUsize>,
    component_calls: Arc<AtomicUsize>,
}

impl MockPlugin {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            api_range: ">=0.1.0",
            declarations: PluginDeclarations::default(),
            fail_on: None,
            components: Vec::new(),
            declaration_calls: Arc::new(AtomicUsize::new(0)),
            component_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn api_range(mut self, range: &'static str) -> Self {
        self.api_range = range;
        self
    }

    pub fn providers(mut self, ids: &[&str]) -> Self {
        self.declarations.providers = strings(ids);
        self
    }

    pub fn commands(mut self, ids: &[&str]) -> Self {
        self.declarations.commands = strings(ids);
        self
    }

    pub fn controllers(mut self, ids: &[&str]) -> Self {
        self.declarations.controllers = strings(ids);
        self
    }

    pub fn middleware(mut self, ids: &[&str]) -> Self {
        self.declarations.middleware = strings(ids);
        self
    }

    pub fn event(mut self, event: &str, listeners: &[&str]) -> Self {
        self.declarations.events.insert(event.to_string(), strings(listeners));
        self
    }

    pub fn failing_on(mut self, kind: ManifestKind) -> Self {
        self.fail_on = Some(kind);
        self
    }

    pub fn bind(mut self, id: &str, component: Component) -> Self {
        self.components.push((id.to_string(), component));
        self
    }

    /// How many times `providers()` was called, i.e. how often this plugin was aggregated.
    pub fn declaration_calls(&self) -> Arc<AtomicUsize> {
        self.declaration_calls.clone()
    }

    pub fn component_calls(&self) -> Arc<AtomicUsize> {
        self.component_calls.clone()
    }

    fn check(&self, kind: ManifestKind) -> Result<(), PluginError> {
        if self.fail_on == Some(kind) {
            return Err(PluginError::DeclarationError(format!("{} declaration unavailable", kind)));
        }
        Ok(())
    }
}

impl Plugin for MockPlugin {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn compatible_api_versions(&self) -> Vec<VersionRange> {
        vec![self.api_range.parse().unwrap()]
    }

    fn providers(&self) -> Result<Vec<String>, PluginError> {
        self.declaration_calls.fetch_add(1, Ordering::SeqCst);
        self.check(ManifestKind::Providers)?;
        Ok(self.declarations.providers.clone())
    }

    fn commands(&self) -> Result<Vec<String>, PluginError> {
        self.check(ManifestKind::Commands)?;
        Ok(self.declarations.commands.clone())
    }

    fn controllers(&self) -> Result<Vec<String>, PluginError> {
        self.check(ManifestKind::Controllers)?;
        Ok(self.declarations.controllers.clone())
    }

    fn middleware(&self) -> Result<Vec<String>, PluginError> {
        self.check(ManifestKind::Middleware)?;
        Ok(self.declarations.middleware.clone())
    }

    fn events(&self) -> Result<EventMap, PluginError> {
        self.check(ManifestKind::Events)?;
        Ok(self.declarations.events.clone())
    }

    fn register_components(&self, components: &mut Components<'_>) -> KernelResult<()> {
        self.component_calls.fetch_add(1, Ordering::SeqCst);
        for (id, component) in &self.components {
            match component.clone() {
                Component::Provider(p) => components.provider(id, p)?,
                Component::Command(c) => components.command(id, c)?,
                Component::Controller(c) => components.controller(id, c)?,
                Component::Middleware(m) => components.middleware(id, m)?,
                Component::Listener(l) => components.listener(id, l)?,
            }
        }
        Ok(())
    }
}

fn strings(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

/// A plugin table holding the framework plugin plus `plugins`.
pub fn table(plugins: Vec<MockPlugin>) -> Arc<PluginTable> {
    let mut table = PluginTable::with_framework().unwrap();
    for plugin in plugins {
        table.register(Arc::new(plugin)).unwrap();
    }
    Arc::new(table)
}

/// Config storing under `storage` and using `plugins`, in order.
pub fn config(storage: &Path, plugins: &[&str]) -> AppConfig {
    AppConfig::default()
        .with_storage_path(storage)
        .with_plugins(plugins.iter().copied())
}

// ===== MOCK COMPONENTS =====

/// Records `register:<id>` / `boot:<id>` and binds `<id>.service` to a greeting.
pub struct RecordingProvider {
    id: String,
    journal: Journal,
    pub register_calls: Arc<AtomicUsize>,
}

impl RecordingProvider {
    pub fn new(id: &str, journal: Journal) -> Self {
        Self { id: id.to_string(), journal, register_calls: Arc::new(AtomicUsize::new(0)) }
    }
}

#[async_trait]
impl ServiceProvider for RecordingProvider {
    fn register(&self, container: &dyn Container) -> KernelResult<()> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().unwrap().push(format!("register:{}", self.id));
        container.instance(&format!("{}.service", self.id), format!("service from {}", self.id))?;
        Ok(())
    }

    async fn boot(&self, _container: &dyn Container) -> KernelResult<()> {
        self.journal.lock().unwrap().push(format!("boot:{}", self.id));
        Ok(())
    }
}

/// Provider whose `register` always fails.
pub struct BrokenProvider;

#[async_trait]
impl ServiceProvider for BrokenProvider {
    fn register(&self, _container: &dyn Container) -> KernelResult<()> {
        Err("provider exploded".into())
    }
}

/// Provider whose `register` panics after counting the call.
#[derive(Default)]
pub struct PanickingProvider {
    pub register_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ServiceProvider for PanickingProvider {
    fn register(&self, _container: &dyn Container) -> KernelResult<()> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        panic!("provider register panicked");
    }
}

/// How a [`ScriptedCommand`] behaves.
#[derive(Clone, Copy)]
pub enum Script {
    Succeed(i32),
    Fail(i32),
    Unclassified,
    Panic,
}

pub struct ScriptedCommand {
    name: &'static str,
    script: Script,
    journal: Journal,
}

impl ScriptedCommand {
    pub fn new(name: &'static str, script: Script, journal: Journal) -> Self {
        Self { name, script, journal }
    }
}

#[async_trait]
impl Command for ScriptedCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "scripted test command"
    }

    async fn execute(
        &self,
        input: &ConsoleInput,
        output: &mut ConsoleOutput,
        _container: &dyn Container,
    ) -> Result<i32, DispatchError> {
        self.journal.lock().unwrap().push(format!("command:{}", self.name));
        match self.script {
            Script::Succeed(code) => {
                output.line(format!("{} ran with {:?}", self.name, input.args));
                Ok(code)
            }
            Script::Fail(code) => Err(CommandError::new(format!("{} failed", self.name)).with_exit_code(code).into()),
            Script::Unclassified => Err(DispatchError::other("disk on fire")),
            Script::Panic => panic!("command panicked"),
        }
    }
}

/// How a [`ScriptedController`] behaves.
#[derive(Clone, Copy)]
pub enum Reply {
    Text(&'static str),
    Unclassified,
    Forbidden,
    Panic,
}

pub struct ScriptedController {
    routes: Vec<Route>,
    reply: Reply,
}

impl ScriptedController {
    pub fn new(routes: Vec<Route>, reply: Reply) -> Self {
        Self { routes, reply }
    }
}

#[async_trait]
impl Controller for ScriptedController {
    fn routes(&self) -> Vec<Route> {
        self.routes.clone()
    }

    async fn handle(&self, _request: Request, _container: &dyn Container) -> Result<Response, DispatchError> {
        match self.reply {
            Reply::Text(body) => Ok(Response::new(body.to_string())),
            Reply::Unclassified => Err(DispatchError::other("database connection refused")),
            Reply::Forbidden => Err(crate::http::HttpError::forbidden("not yours").into()),
            Reply::Panic => panic!("controller panicked"),
        }
    }
}

/// Appends its tag to the journal on the way in and to `x-trace` on the way out.
pub struct TagMiddleware {
    tag: &'static str,
    journal: Journal,
}

impl TagMiddleware {
    pub fn new(tag: &'static str, journal: Journal) -> Self {
        Self { tag, journal }
    }
}

#[async_trait]
impl Middleware for TagMiddleware {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, DispatchError> {
        self.journal.lock().unwrap().push(format!("middleware:{}", self.tag));
        let mut response = next.run(request).await?;
        let trace = match response.headers().get("x-trace").and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{},{}", existing, self.tag),
            None => self.tag.to_string(),
        };
        response.headers_mut().insert("x-trace", HeaderValue::from_str(&trace).unwrap());
        Ok(response)
    }
}

/// Answers 401 without calling `next`.
pub struct GateMiddleware;

#[async_trait]
impl Middleware for GateMiddleware {
    async fn handle(&self, _request: Request, _next: Next<'_>) -> Result<Response, DispatchError> {
        let mut response = Response::new("halt".to_string());
        *response.status_mut() = StatusCode::UNAUTHORIZED;
        Ok(response)
    }
}

/// Records `<id>:<event name>` for every event it sees.
pub struct RecordingListener {
    id: &'static str,
    journal: Journal,
    result: EventResult,
}

impl RecordingListener {
    pub fn new(id: &'static str, journal: Journal) -> Self {
        Self { id, journal, result: EventResult::Continue }
    }

    pub fn stopping(id: &'static str, journal: Journal) -> Self {
        Self { id, journal, result: EventResult::Stop }
    }
}

#[async_trait]
impl Listener for RecordingListener {
    async fn handle(&self, event: &dyn Event, _container: &dyn Container) -> EventResult {
        self.journal.lock().unwrap().push(format!("{}:{}", self.id, event.name()));
        self.result
    }
}

/// Listener that panics on every event.
pub struct PanickingListener;

#[async_trait]
impl Listener for PanickingListener {
    async fn handle(&self, event: &dyn Event, _container: &dyn Container) -> EventResult {
        panic!("listener for '{}' panicked", event.name());
    }
}

/// Wraps the default handler and counts `report` calls.
pub struct CountingHandler {
    inner: DefaultExceptionHandler,
    pub reports: Arc<AtomicUsize>,
    fail_report: bool,
}

impl CountingHandler {
    pub fn new(debug: bool) -> Self {
        Self { inner: DefaultExceptionHandler::new(debug), reports: Arc::new(AtomicUsize::new(0)), fail_report: false }
    }

    /// A handler whose `report` returns an error after counting.
    pub fn failing() -> Self {
        Self { fail_report: true, ..Self::new(false) }
    }
}

impl ExceptionHandler for CountingHandler {
    fn report(&self, failure: &DispatchError) -> Result<(), ReportError> {
        self.reports.fetch_add(1, Ordering::SeqCst);
        if self.fail_report {
            return Err(ReportError { message: format!("log sink offline while reporting {}", failure) });
        }
        self.inner.report(failure)
    }

    fn render(&self, context: &DispatchContext<'_>, failure: &DispatchError) -> Rendered {
        self.inner.render(context, failure)
    }
}

/// Handler that panics in both `report` and `render`.
pub struct PanickingHandler;

impl ExceptionHandler for PanickingHandler {
    fn report(&self, _failure: &DispatchError) -> Result<(), ReportError> {
        panic!("report panicked");
    }

    fn render(&self, _context: &DispatchContext<'_>, _failure: &DispatchError) -> Rendered {
        panic!("render panicked");
    }
}

pub fn get(path: &str) -> Request {
    http::Request::builder().method("GET").uri(path).body(String::new()).unwrap()
}

pub fn post(path: &str) -> Request {
    http::Request::builder().method("POST").uri(path).body(String::new()).unwrap()
}

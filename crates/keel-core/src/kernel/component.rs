use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::console::Command;
use crate::event::Listener;
use crate::http::{Controller, Middleware};
use crate::kernel::error::Result;

/// A resolved instance, type-erased.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Produces an instance on every `get`. May resolve its own dependencies
/// through the container it is handed.
pub type Resolver = Arc<dyn Fn(&dyn Container) -> std::result::Result<Instance, ContainerError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("No binding registered for '{id}'")]
    NotBound { id: String },

    #[error("Binding '{id}' does not hold a value of type {expected}")]
    TypeMismatch { id: String, expected: &'static str },

    #[error("Failed to resolve '{id}': {message}")]
    Resolution { id: String, message: String },

    #[error("Container lock poisoned during '{operation}'")]
    Poisoned { operation: &'static str },
}

/// Dependency injection capability consumed by the kernels.
///
/// Identifiers are plain strings; the same identifiers appear in plugin
/// declarations and in the cached manifest.
pub trait Container: Send + Sync + Debug {
    /// Bind `id` to a resolver, replacing any previous binding.
    fn bind(&self, id: &str, resolver: Resolver) -> std::result::Result<(), ContainerError>;

    /// Resolve `id`.
    fn get(&self, id: &str) -> std::result::Result<Instance, ContainerError>;

    /// Whether `id` has a binding.
    fn has(&self, id: &str) -> bool;
}

/// Typed helpers available on every [`Container`], including `dyn Container`.
pub trait ContainerExt: Container {
    /// Bind a shared value: every `get` returns the same instance.
    fn instance<T: Any + Send + Sync>(&self, id: &str, value: T) -> std::result::Result<(), ContainerError> {
        let shared: Instance = Arc::new(value);
        self.bind(id, Arc::new(move |_: &dyn Container| Ok(shared.clone())))
    }

    /// Bind a factory producing a fresh value on every `get`.
    fn factory<T, F>(&self, id: &str, factory: F) -> std::result::Result<(), ContainerError>
    where
        T: Any + Send + Sync,
        F: Fn(&dyn Container) -> std::result::Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.bind(id, Arc::new(move |c: &dyn Container| factory(c).map(|v| Arc::new(v) as Instance)))
    }

    /// Resolve `id` and clone the stored value out as `T`.
    ///
    /// Trait objects are stored as `Arc<dyn Trait>` values, so
    /// `resolve::<Arc<dyn Middleware>>(id)` is the usual shape.
    fn resolve<T: Any + Clone>(&self, id: &str) -> std::result::Result<T, ContainerError> {
        let instance = self.get(id)?;
        instance
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ContainerError::TypeMismatch {
                id: id.to_string(),
                expected: type_name::<T>(),
            })
    }
}

impl<C: Container + ?Sized> ContainerExt for C {}

/// Default container: a map of resolvers behind a `RwLock`.
///
/// The lock is released before a resolver runs, so resolvers may call back
/// into the container.
#[derive(Default)]
pub struct DefaultContainer {
    bindings: RwLock<HashMap<String, Resolver>>,
}

impl DefaultContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers currently bound, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = match self.bindings.read() {
            Ok(bindings) => bindings.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        ids.sort();
        ids
    }
}

impl Debug for DefaultContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.bindings.read().map(|b| b.len()).unwrap_or(0);
        f.debug_struct("DefaultContainer")
            .field("bindings_count", &count)
            .finish()
    }
}

impl Container for DefaultContainer {
    fn bind(&self, id: &str, resolver: Resolver) -> std::result::Result<(), ContainerError> {
        let mut bindings = self
            .bindings
            .write()
            .map_err(|_| ContainerError::Poisoned { operation: "bind" })?;
        if bindings.insert(id.to_string(), resolver).is_some() {
            log::debug!("Container binding '{}' replaced", id);
        }
        Ok(())
    }

    fn get(&self, id: &str) -> std::result::Result<Instance, ContainerError> {
        let resolver = {
            let bindings = self
                .bindings
                .read()
                .map_err(|_| ContainerError::Poisoned { operation: "get" })?;
            bindings
                .get(id)
                .cloned()
                .ok_or_else(|| ContainerError::NotBound { id: id.to_string() })?
        };
        resolver(self)
    }

    fn has(&self, id: &str) -> bool {
        self.bindings
            .read()
            .map(|bindings| bindings.contains_key(id))
            .unwrap_or(false)
    }
}

/// A service provider registers services into the container during
/// bootstrap, then gets a chance to boot once every provider is registered.
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    fn register(&self, container: &dyn Container) -> Result<()>;

    async fn boot(&self, _container: &dyn Container) -> Result<()> {
        Ok(())
    }
}

/// Binds the concrete objects behind the identifiers a plugin declares.
///
/// Handed to [`Plugin::register_components`](crate::plugin_system::Plugin::register_components)
/// during bootstrap.
pub struct Components<'a> {
    container: &'a dyn Container,
}

impl<'a> Components<'a> {
    pub fn new(container: &'a dyn Container) -> Self {
        Self { container }
    }

    /// The underlying container, for plugins binding plain services.
    pub fn container(&self) -> &'a dyn Container {
        self.container
    }

    pub fn provider(&mut self, id: &str, provider: Arc<dyn ServiceProvider>) -> Result<()> {
        Ok(self.container.instance(id, provider)?)
    }

    pub fn command(&mut self, id: &str, command: Arc<dyn Command>) -> Result<()> {
        Ok(self.container.instance(id, command)?)
    }

    pub fn controller(&mut self, id: &str, controller: Arc<dyn Controller>) -> Result<()> {
        Ok(self.container.instance(id, controller)?)
    }

    pub fn middleware(&mut self, id: &str, middleware: Arc<dyn Middleware>) -> Result<()> {
        Ok(self.container.instance(id, middleware)?)
    }

    pub fn listener(&mut self, id: &str, listener: Arc<dyn Listener>) -> Result<()> {
        Ok(self.container.instance(id, listener)?)
    }
}

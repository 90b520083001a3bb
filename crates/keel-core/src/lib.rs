pub mod application;
pub mod console;
pub mod event;
pub mod exception;
pub mod http;
pub mod kernel;
pub mod plugin_system;
pub mod storage;

// Re-export key public types/traits for easier use by the binary and plugins
pub use application::ApplicationRegistry;
pub use console::{Command, CommandError, ConsoleInput, ConsoleOutput};
pub use event::{Event, EventDispatcher, EventResult, Listener};
pub use exception::{DefaultExceptionHandler, DispatchError, ExceptionHandler};
pub use self::http::{Controller, HttpError, Middleware, Next, Request, Response, Route};
pub use kernel::error::Error as KernelError;
pub use kernel::{Components, ConsoleKernel, Container, ContainerExt, HttpKernel, ServiceProvider};
pub use plugin_system::{AggregatedManifest, ManifestKind, Plugin, PluginRegistry, PluginTable};
pub use storage::{AppConfig, CacheStore};

#[cfg(test)]
mod tests;

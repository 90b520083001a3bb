pub mod dispatcher;
pub mod error;
pub mod types;

use std::any::Any;
use std::fmt;

use async_trait::async_trait;

use crate::kernel::component::Container;

/// Result of event processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Event was processed successfully and propagation should continue
    Continue,
    /// Event was processed and propagation should stop
    Stop,
}

/// Core event trait
pub trait Event: Any + fmt::Debug + Send + Sync {
    /// Event type; listeners are declared against this name
    fn name(&self) -> &str;

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// A declared event listener, bound in the container under its id.
#[async_trait]
pub trait Listener: Send + Sync {
    async fn handle(&self, event: &dyn Event, container: &dyn Container) -> EventResult;
}

/// Re-export important types
pub use dispatcher::EventDispatcher;
pub use error::EventSystemError;
pub use types::{KernelEvent, Surface};

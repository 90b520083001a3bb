use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::event::error::EventSystemError;
use crate::event::{Event, EventResult, Listener};
use crate::kernel::component::{Container, ContainerExt};

/// Maps event types to ordered listener ids.
///
/// Listeners are resolved from the container on every dispatch, so the
/// dispatcher holds no reference to the container itself.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<HashMap<String, Vec<String>>>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count: usize = self
            .listeners
            .read()
            .map(|l| l.values().map(Vec::len).sum())
            .unwrap_or(0);
        f.debug_struct("EventDispatcher")
            .field("subscriptions_count", &count)
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `listener_id` to `event_type`'s listeners. The id must already
    /// be bound in `container`.
    pub fn subscribe(
        &self,
        event_type: &str,
        listener_id: &str,
        container: &dyn Container,
    ) -> Result<(), EventSystemError> {
        if !container.has(listener_id) {
            return Err(EventSystemError::ListenerNotBound {
                event_name: event_type.to_string(),
                listener_id: listener_id.to_string(),
            });
        }
        let mut listeners = self
            .listeners
            .write()
            .map_err(|_| EventSystemError::DispatcherPoisoned { component: "listeners".to_string() })?;
        listeners
            .entry(event_type.to_string())
            .or_default()
            .push(listener_id.to_string());
        log::debug!("Subscribed '{}' to '{}'", listener_id, event_type);
        Ok(())
    }

    /// Listener ids for `event_type`, in invocation order.
    pub fn listeners(&self, event_type: &str) -> Vec<String> {
        self.listeners
            .read()
            .ok()
            .and_then(|l| l.get(event_type).cloned())
            .unwrap_or_default()
    }

    /// Event types with at least one listener, sorted.
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .listeners
            .read()
            .map(|l| l.keys().cloned().collect())
            .unwrap_or_default();
        types.sort();
        types
    }

    /// Run `event`'s listeners in order until one returns [`EventResult::Stop`].
    pub async fn dispatch(&self, event: &dyn Event, container: &dyn Container) -> Result<EventResult, EventSystemError> {
        let ids = self.listeners(event.name());
        for id in ids {
            let listener = container
                .resolve::<Arc<dyn Listener>>(&id)
                .map_err(|e| EventSystemError::DispatchError {
                    event_name: event.name().to_string(),
                    reason: e.to_string(),
                })?;
            if listener.handle(event, container).await == EventResult::Stop {
                log::debug!("Listener '{}' stopped propagation of '{}'", id, event.name());
                return Ok(EventResult::Stop);
            }
        }
        Ok(EventResult::Continue)
    }
}

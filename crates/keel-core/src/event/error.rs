//! # Keel Event System Errors
//!
//! [`EventSystemError`] covers listener subscription and dispatch: a
//! declared listener id with no container binding, or one bound to something
//! that is not a listener.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventSystemError {
    #[error("Listener '{listener_id}' for event '{event_name}' is not bound in the container")]
    ListenerNotBound { event_name: String, listener_id: String },

    #[error("Event dispatch failed for event '{event_name}': {reason}")]
    DispatchError { event_name: String, reason: String },

    #[error("Attempted to operate on a poisoned event dispatcher component: {component}")]
    DispatcherPoisoned { component: String },
}

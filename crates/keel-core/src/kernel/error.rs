//! # Keel Kernel Errors
//!
//! Defines error types specific to the Keel Kernel.
//!
//! This module includes [`Error`], the primary enum encompassing the errors
//! that can occur while bootstrapping a kernel or consulting the application
//! registry: plugin aggregation failures, cache corruption, container lookup
//! failures and the lifecycle precondition [`Error::NotBootstrapped`].
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::event::error::EventSystemError;
use crate::kernel::component::ContainerError;
use crate::plugin_system::error::PluginSystemError;
use crate::storage::error::StorageSystemError;

/// Custom error type for the Keel kernel
#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed plugin system error
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Specific, typed storage system error (cache artifacts, configuration)
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    /// Dependency injection failure
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Event system error
    #[error("Event system error: {0}")]
    EventSystem(#[from] EventSystemError),

    /// `handle()` (or a repeated `bootstrap()`) on a kernel that never booted successfully.
    #[error("Kernel is not bootstrapped{}", reason.as_ref().map(|r| format!(" (bootstrap failed: {})", r)).unwrap_or_default())]
    NotBootstrapped { reason: Option<String> },

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        component_name: Option<String>,
        message: String,
        #[source]
        source: Option<Box<Error>>, // Can wrap another KernelError or a subsystem error
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase in the kernel's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Bootstrap")]
    Bootstrap,
    #[error("RegisterComponents")]
    RegisterComponents,
    #[error("RegisterProviders")]
    RegisterProviders,
    #[error("BootProviders")]
    BootProviders,
    #[error("RegisterSurface")]
    RegisterSurface,
    #[error("WireEvents")]
    WireEvents,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl Error {
    /// Helper to create an I/O error with context, wrapped as a storage error.
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        Error::StorageSystem(StorageSystemError::io(source, operation, path))
    }

    /// Wrap `source` as a failure of `phase`, attributed to `component`.
    pub fn lifecycle(
        phase: KernelLifecyclePhase,
        component: Option<&str>,
        message: impl Into<String>,
        source: Error,
    ) -> Self {
        Error::KernelLifecycleError {
            phase,
            component_name: component.map(str::to_string),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this is the lifecycle precondition failure.
    pub fn is_not_bootstrapped(&self) -> bool {
        matches!(self, Error::NotBootstrapped { .. })
    }
}

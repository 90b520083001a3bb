//! # Keel Exception Handling
//!
//! Every failure that escapes a middleware, controller or command reaches the
//! kernel boundary as a [`DispatchError`]. The kernel hands it to an
//! [`ExceptionHandler`] twice: once to [`report`](ExceptionHandler::report)
//! it (logging, telemetry) and once to [`render`](ExceptionHandler::render)
//! a transport-appropriate result.
pub mod handler;

use std::error::Error as StdError;

use http::{HeaderMap, Method, Uri};
use thiserror::Error;

use crate::console::CommandError;
use crate::event::error::EventSystemError;
use crate::http::{HttpError, Response};
use crate::kernel::component::ContainerError;
use crate::kernel::constants::EXIT_FAILURE;
use crate::kernel::error::Error as KernelError;

pub use handler::DefaultExceptionHandler;

/// Any failure raised while handling one dispatch unit.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Classified HTTP failure; rendered with its own status.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Classified console failure; rendered with its own exit code.
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Event system error: {0}")]
    Event(#[from] EventSystemError),

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Handler panicked: {0}")]
    Panic(String),

    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync>),
}

impl DispatchError {
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        DispatchError::Other(error.into())
    }

    /// Whether the failure carries its own user-facing status or exit code.
    pub fn is_classified(&self) -> bool {
        matches!(self, DispatchError::Http(_) | DispatchError::Command(_))
    }

    /// Exit code for console rendering; never zero.
    pub fn exit_code(&self) -> i32 {
        match self {
            DispatchError::Command(e) if e.exit_code() != 0 => e.exit_code(),
            _ => EXIT_FAILURE,
        }
    }

    /// Machine-readable kind used in rendered bodies and logs.
    pub fn kind(&self) -> &str {
        match self {
            DispatchError::Http(e) => e.kind(),
            DispatchError::Command(_) => "command_failed",
            _ => "internal_error",
        }
    }
}

/// Where a failure happened.
#[derive(Debug, Clone, Copy)]
pub enum DispatchContext<'a> {
    Http {
        method: &'a Method,
        uri: &'a Uri,
        headers: &'a HeaderMap,
    },
    Console {
        command: &'a str,
    },
}

/// The user-facing result of rendering a failure.
#[derive(Debug)]
pub enum Rendered {
    Http(Response),
    Console { exit_code: i32, lines: Vec<String> },
}

#[derive(Debug, Error)]
#[error("Failed to report failure: {message}")]
pub struct ReportError {
    pub message: String,
}

/// Converts failures into observability side effects and user responses.
pub trait ExceptionHandler: Send + Sync {
    /// Record the failure. The kernel swallows errors and panics raised here.
    fn report(&self, failure: &DispatchError) -> Result<(), ReportError>;

    /// Map the failure to a response for `context`. Must not leak internal
    /// detail for unclassified failures outside debug mode.
    fn render(&self, context: &DispatchContext<'_>, failure: &DispatchError) -> Rendered;
}

use std::any::Any;
use std::fmt;

use crate::event::Event;

/// Which kernel raised an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Http,
    Console,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Http => write!(f, "http"),
            Surface::Console => write!(f, "console"),
        }
    }
}

/// Events the kernels dispatch during their lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelEvent {
    /// Bootstrap completed
    Booted { surface: Surface },
    /// A request produced a response (including rendered failures)
    RequestHandled { method: String, path: String, status: u16 },
    /// A console command finished
    CommandFinished { command: String, exit_code: i32 },
    /// A dispatch failure was reported to the exception handler
    ExceptionReported { surface: Surface, message: String },
}

impl KernelEvent {
    pub const BOOTED: &'static str = "kernel.booted";
    pub const REQUEST_HANDLED: &'static str = "kernel.request_handled";
    pub const COMMAND_FINISHED: &'static str = "kernel.command_finished";
    pub const EXCEPTION_REPORTED: &'static str = "kernel.exception";
}

impl Event for KernelEvent {
    fn name(&self) -> &str {
        match self {
            KernelEvent::Booted { .. } => Self::BOOTED,
            KernelEvent::RequestHandled { .. } => Self::REQUEST_HANDLED,
            KernelEvent::CommandFinished { .. } => Self::COMMAND_FINISHED,
            KernelEvent::ExceptionReported { .. } => Self::EXCEPTION_REPORTED,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An application-defined event carrying a name and a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedEvent {
    pub name: String,
    pub payload: serde_json::Value,
}

impl NamedEvent {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self { name: name.into(), payload }
    }
}

impl Event for NamedEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

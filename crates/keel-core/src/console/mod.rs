//! # Keel Console Surface
//!
//! Console commands are looked up by name by the
//! [`ConsoleKernel`](crate::kernel::ConsoleKernel) and run once per
//! invocation. The built-in framework commands live in [`commands`].
pub mod commands;

use std::error::Error as StdError;
use std::io::Write;

use async_trait::async_trait;
use thiserror::Error;

use crate::exception::DispatchError;
use crate::kernel::component::Container;
use crate::kernel::constants::{EXIT_FAILURE, EXIT_INVALID};

pub use commands::FrameworkPlugin;

/// A named console command.
#[async_trait]
pub trait Command: Send + Sync {
    /// Name the command is invoked by, e.g. `cache:clear`.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Run the command and return its exit code.
    async fn execute(
        &self,
        input: &ConsoleInput,
        output: &mut ConsoleOutput,
        container: &dyn Container,
    ) -> Result<i32, DispatchError>;
}

/// One parsed invocation: a command name and its remaining arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleInput {
    pub command: String,
    pub args: Vec<String>,
}

impl ConsoleInput {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self { command: command.into(), args }
    }

    /// Split `argv`-style tokens into a command name and arguments.
    pub fn from_args<I, S>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let command = args.next()?;
        Some(Self { command, args: args.collect() })
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// Where a command writes. Either passes lines straight to stdout/stderr or
/// captures them for inspection.
#[derive(Debug, Default)]
pub struct ConsoleOutput {
    capture: bool,
    lines: Vec<String>,
    errors: Vec<String>,
}

impl ConsoleOutput {
    pub fn stdout() -> Self {
        Self { capture: false, lines: Vec::new(), errors: Vec::new() }
    }

    pub fn captured() -> Self {
        Self { capture: true, lines: Vec::new(), errors: Vec::new() }
    }

    pub fn line(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.capture {
            self.lines.push(text);
        } else {
            let mut out = std::io::stdout().lock();
            if writeln!(out, "{}", text).is_err() {
                log::debug!("stdout closed; dropping console line");
            }
        }
    }

    pub fn error(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.capture {
            self.errors.push(text);
        } else {
            let mut err = std::io::stderr().lock();
            if writeln!(err, "{}", text).is_err() {
                log::debug!("stderr closed; dropping console error line");
            }
        }
    }

    /// Captured standard lines (empty unless `captured()`).
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Captured error lines (empty unless `captured()`).
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

/// A classified command failure carrying the exit code to report.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
    exit_code: i32,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), exit_code: EXIT_FAILURE, source: None }
    }

    pub fn not_found(command: &str) -> Self {
        Self::new(format!("Command '{}' is not defined.", command)).with_exit_code(EXIT_INVALID)
    }

    /// Override the exit code; zero is replaced by the generic failure code.
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = if exit_code == 0 { EXIT_FAILURE } else { exit_code };
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.source = Some(source.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

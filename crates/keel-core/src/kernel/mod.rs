//! # Keel Kernel
//!
//! The `kernel` module holds the two entry points of a Keel application and
//! everything they share.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Lifecycle**: [`KernelLifecycle`](bootstrap::KernelLifecycle) is the
//!   `Uninitialized -> Bootstrapped` state machine both kernels use; a failed
//!   bootstrap is terminal. [`KernelCore`](bootstrap::KernelCore) runs the
//!   shared bootstrap phases (core bindings, plugin components, service
//!   providers, event listeners) and wraps the exception handler.
//! - **Surfaces**: [`HttpKernel`] runs requests through the middleware
//!   pipeline into the router; [`ConsoleKernel`] runs one command by name.
//! - **Components**: the [`Container`] capability, its default implementation
//!   and [`ServiceProvider`], in the `component` submodule.
//! - **Core Constants** and **Error Handling** in `constants` and `error`.
pub mod bootstrap;
pub mod component;
pub mod console;
pub mod constants;
pub mod error;
pub mod http;

pub use bootstrap::{KernelCore, KernelLifecycle, KernelPhase};
pub use component::{Components, Container, ContainerError, ContainerExt, DefaultContainer, ServiceProvider};
pub use console::ConsoleKernel;
pub use error::{Error, Result};
pub use self::http::HttpKernel;

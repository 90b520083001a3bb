//! # Keel HTTP Surface
//!
//! Transport types and extension points consumed by the
//! [`HttpKernel`](crate::kernel::HttpKernel):
//!
//! - [`Middleware`] and [`Next`]: the onion pipeline, outer to inner in
//!   manifest order.
//! - [`Controller`]: terminal handlers; each declares the [`Route`]s it serves.
//! - [`router`]: the [`Router`](router::Router) capability and a default exact-match router.
//! - [`error`]: [`HttpError`], a classified failure carrying its own status.
//! - [`view`]: the template capability used for HTML error pages.
//!
//! Requests and responses are `http` crate values with `String` bodies; wire
//! protocol handling belongs to whatever server feeds the kernel.
pub mod error;
pub mod router;
pub mod view;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;

use crate::exception::DispatchError;
use crate::kernel::component::Container;

pub use error::HttpError;
pub use router::{Router, SimpleRouter};
pub use view::{ViewError, ViewRenderer};

/// Inbound request handled by the kernel
pub type Request = http::Request<String>;

/// Outbound response produced by the kernel
pub type Response = http::Response<String>;

/// A method and exact path served by a controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    pub method: Method,
    pub path: String,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into() }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// A terminal request handler.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Routes this controller serves; read once when the router is built.
    fn routes(&self) -> Vec<Route>;

    async fn handle(&self, request: Request, container: &dyn Container) -> Result<Response, DispatchError>;
}

/// One layer of the request pipeline.
///
/// Call `next.run(request)` to continue inward, or return a response
/// directly to short-circuit.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, DispatchError>;
}

/// Innermost stage of a pipeline, reached once every middleware called `next`.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, request: Request) -> Result<Response, DispatchError>;
}

/// The remainder of a pipeline.
pub struct Next<'a> {
    middleware: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(middleware: &'a [Arc<dyn Middleware>], endpoint: &'a dyn Endpoint) -> Self {
        Self { middleware, endpoint }
    }

    /// Run the next middleware, or the endpoint once none are left.
    pub async fn run(self, request: Request) -> Result<Response, DispatchError> {
        match self.middleware.split_first() {
            Some((current, rest)) => {
                let next = Next { middleware: rest, endpoint: self.endpoint };
                current.handle(request, next).await
            }
            None => self.endpoint.call(request).await,
        }
    }

    /// Middleware still ahead of the endpoint.
    pub fn remaining(&self) -> usize {
        self.middleware.len()
    }
}

/// Endpoint that asks the router for a controller and runs it.
pub(crate) struct RouterEndpoint<'a> {
    pub(crate) router: &'a dyn Router,
    pub(crate) container: &'a dyn Container,
}

#[async_trait]
impl Endpoint for RouterEndpoint<'_> {
    async fn call(&self, request: Request) -> Result<Response, DispatchError> {
        let controller = self.router.dispatch(&request)?;
        controller.handle(request, self.container).await
    }
}

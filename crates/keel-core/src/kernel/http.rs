use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};

use crate::application::ApplicationRegistry;
use crate::event::types::{KernelEvent, Surface};
use crate::exception::{DispatchContext, DispatchError, ExceptionHandler, Rendered};
use crate::http::router::{Router, SimpleRouter};
use crate::http::{Controller, Middleware, Next, Request, Response, Route, RouterEndpoint};
use crate::kernel::bootstrap::{KernelCore, KernelLifecycle, KernelPhase, panic_message};
use crate::kernel::component::Container;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::plugin_system::PluginTable;
use crate::storage::AppConfig;

/// What an HTTP kernel holds once booted. Immutable and shared by every request.
struct HttpRuntime {
    middleware: Vec<Arc<dyn Middleware>>,
    router: Box<dyn Router>,
}

/// Web entry point: boots once, then runs each request through the
/// middleware pipeline into the router.
///
/// Failures raised while handling a request never escape `handle`; they are
/// reported and rendered into a response.
pub struct HttpKernel {
    core: KernelCore,
    lifecycle: KernelLifecycle<HttpRuntime>,
    /// Router to populate at bootstrap; taken when the kernel boots
    router: Mutex<Option<Box<dyn Router>>>,
}

impl HttpKernel {
    pub fn new(config: AppConfig, plugins: Arc<PluginTable>) -> Self {
        Self {
            core: KernelCore::new(config, plugins),
            lifecycle: KernelLifecycle::new(),
            router: Mutex::new(None),
        }
    }

    pub fn with_container(mut self, container: Arc<dyn Container>) -> Self {
        self.core.set_container(container);
        self
    }

    pub fn with_exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.core.set_exception_handler(handler);
        self
    }

    pub fn with_registry(mut self, registry: Arc<ApplicationRegistry>) -> Self {
        self.core.set_registry(registry);
        self
    }

    /// Use `router` instead of the default [`SimpleRouter`].
    pub fn with_router(self, router: Box<dyn Router>) -> Self {
        Self { router: Mutex::new(Some(router)), ..self }
    }

    pub fn core(&self) -> &KernelCore {
        &self.core
    }

    pub fn container(&self) -> &Arc<dyn Container> {
        self.core.container()
    }

    pub fn registry(&self) -> &Arc<ApplicationRegistry> {
        self.core.registry()
    }

    pub async fn phase(&self) -> KernelPhase {
        self.lifecycle.phase().await
    }

    /// Boot the kernel. A second call is a no-op; after a failed boot every
    /// call returns [`Error::NotBootstrapped`].
    pub async fn bootstrap(&self) -> Result<()> {
        self.lifecycle.bootstrap_with(|| self.boot()).await
    }

    async fn boot(&self) -> Result<HttpRuntime> {
        log::info!("Bootstrapping HTTP kernel");
        self.core.register_foundation()?;
        self.core.register_providers().await?;

        let registry = self.core.registry();
        let middleware = self
            .core
            .resolve_all::<Arc<dyn Middleware>>(&registry.middleware()?, KernelLifecyclePhase::RegisterSurface)?
            .into_iter()
            .map(|(_, middleware)| middleware)
            .collect::<Vec<_>>();

        let controller_ids: Vec<String> = registry.controllers()?.into_iter().collect();
        let controllers = self
            .core
            .resolve_all::<Arc<dyn Controller>>(&controller_ids, KernelLifecyclePhase::RegisterSurface)?;
        let mut router = self
            .router
            .lock()
            .map_err(|_| Error::Other("HTTP kernel router lock poisoned".to_string()))?
            .take()
            .unwrap_or_else(|| Box::new(SimpleRouter::new()));
        for (id, controller) in controllers {
            router.register(&id, controller);
        }

        self.core.wire_events()?;
        log::info!(
            "HTTP kernel ready: {} middleware, {} route(s)",
            middleware.len(),
            router.routes().len()
        );
        self.core.emit(&KernelEvent::Booted { surface: Surface::Http }).await;
        Ok(HttpRuntime { middleware, router })
    }

    /// Handle one request.
    ///
    /// The only error is [`Error::NotBootstrapped`]; every failure inside the
    /// pipeline, panics included, comes back as a rendered response.
    pub async fn handle(&self, request: Request) -> Result<Response> {
        let runtime = self.lifecycle.runtime().await?;
        let method = request.method().clone();
        let uri = request.uri().clone();
        let headers = request.headers().clone();

        let endpoint = RouterEndpoint {
            router: runtime.router.as_ref(),
            container: self.core.container().as_ref(),
        };
        let next = Next::new(&runtime.middleware, &endpoint);
        let outcome = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Err(DispatchError::Panic(panic_message(payload.as_ref()))),
        };

        let response = match outcome {
            Ok(response) => response,
            Err(failure) => self.fail(&method, &uri, &headers, failure).await,
        };
        log::debug!("{} {} -> {}", method, uri.path(), response.status());

        self.core
            .emit(&KernelEvent::RequestHandled {
                method: method.to_string(),
                path: uri.path().to_string(),
                status: response.status().as_u16(),
            })
            .await;
        Ok(response)
    }

    /// Registered routes; empty before bootstrap.
    pub async fn routes(&self) -> Vec<Route> {
        match self.lifecycle.runtime().await {
            Ok(runtime) => runtime.router.routes(),
            Err(_) => Vec::new(),
        }
    }

    async fn fail(&self, method: &Method, uri: &Uri, headers: &HeaderMap, failure: DispatchError) -> Response {
        self.core.report_failure(Surface::Http, &failure).await;
        let context = DispatchContext::Http { method, uri, headers };
        match self.core.render(&context, &failure) {
            Some(Rendered::Http(response)) => response,
            Some(Rendered::Console { .. }) => {
                log::warn!("Exception handler rendered a console result for an HTTP request");
                fallback_response()
            }
            None => fallback_response(),
        }
    }
}

impl fmt::Debug for HttpKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpKernel")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

/// Bare 500 used when the exception handler itself could not render.
fn fallback_response() -> Response {
    let mut response = Response::new(r#"{"error":"internal_error","message":"Server Error"}"#.to_string());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

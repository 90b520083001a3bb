use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::http::error::HttpError;
use crate::http::{Controller, Request, Route};

/// Routing capability consumed by the HTTP kernel.
///
/// Controllers are registered once at bootstrap; `dispatch` runs per request.
pub trait Router: Send + Sync {
    fn register(&mut self, id: &str, controller: Arc<dyn Controller>);

    /// The controller serving `request`, or a 404/405 [`HttpError`].
    fn dispatch(&self, request: &Request) -> Result<Arc<dyn Controller>, HttpError>;

    /// Every registered route, sorted by path then method.
    fn routes(&self) -> Vec<Route>;
}

/// Exact method + path matching. The first controller to claim a route keeps it.
#[derive(Default)]
pub struct SimpleRouter {
    table: HashMap<String, Vec<(Method, String, Arc<dyn Controller>)>>,
}

impl SimpleRouter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for SimpleRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleRouter")
            .field("routes", &self.routes().len())
            .finish()
    }
}

impl Router for SimpleRouter {
    fn register(&mut self, id: &str, controller: Arc<dyn Controller>) {
        for route in controller.routes() {
            let entries = self.table.entry(route.path.clone()).or_default();
            if let Some((_, owner, _)) = entries.iter().find(|(method, _, _)| *method == route.method) {
                log::warn!("Route {} already claimed by '{}'; ignoring '{}'", route, owner, id);
                continue;
            }
            log::debug!("Route {} -> '{}'", route, id);
            entries.push((route.method, id.to_string(), controller.clone()));
        }
    }

    fn dispatch(&self, request: &Request) -> Result<Arc<dyn Controller>, HttpError> {
        let path = request.uri().path();
        let entries = self
            .table
            .get(path)
            .ok_or_else(|| HttpError::not_found(path))?;

        if let Some((_, _, controller)) = entries.iter().find(|(method, _, _)| method == request.method()) {
            return Ok(controller.clone());
        }
        let allowed: Vec<Method> = entries.iter().map(|(method, _, _)| method.clone()).collect();
        Err(HttpError::method_not_allowed(request.method(), &allowed))
    }

    fn routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self
            .table
            .iter()
            .flat_map(|(path, entries)| {
                entries.iter().map(move |(method, _, _)| Route::new(method.clone(), path.clone()))
            })
            .collect();
        routes.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.method.as_str().cmp(b.method.as_str())));
        routes
    }
}

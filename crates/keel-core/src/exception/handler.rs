use std::fmt;
use std::sync::Arc;

use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::{Map, Value};

use crate::exception::{DispatchContext, DispatchError, ExceptionHandler, Rendered, ReportError};
use crate::http::{Response, ViewRenderer};

pub(crate) const GENERIC_MESSAGE: &str = "Server Error";

/// Logs failures through the `log` facade and renders them as JSON (or an
/// `errors/<status>` HTML view when one exists and the client accepts HTML).
///
/// Unclassified failures render as a bare 500; their text is only exposed
/// under `detail` when `debug` is set.
pub struct DefaultExceptionHandler {
    debug: bool,
    views: Option<Arc<dyn ViewRenderer>>,
}

impl DefaultExceptionHandler {
    pub fn new(debug: bool) -> Self {
        Self { debug, views: None }
    }

    pub fn with_views(mut self, views: Arc<dyn ViewRenderer>) -> Self {
        self.views = Some(views);
        self
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    fn render_http(&self, headers: &HeaderMap, failure: &DispatchError) -> Response {
        let (status, message, extra_headers) = match failure {
            DispatchError::Http(e) => (e.status(), e.message().to_string(), Some(e.headers())),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE.to_string(), None),
        };

        let mut data = Map::new();
        data.insert("error".to_string(), Value::from(failure.kind()));
        data.insert("message".to_string(), Value::from(message));
        if self.debug && !failure.is_classified() {
            data.insert("detail".to_string(), Value::from(failure.to_string()));
        }

        let (body, content_type) = match self.render_view(headers, status, &data) {
            Some(html) => (html, "text/html; charset=utf-8"),
            None => (Value::Object(data).to_string(), "application/json"),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        if let Some(extra) = extra_headers {
            response.headers_mut().extend(extra.clone());
        }
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }

    fn render_view(&self, headers: &HeaderMap, status: StatusCode, data: &Map<String, Value>) -> Option<String> {
        let views = self.views.as_ref()?;
        let accepts_html = headers
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html"));
        if !accepts_html {
            return None;
        }

        let template = format!("errors/{}", status.as_u16());
        if !views.exists(&template) {
            return None;
        }
        match views.render(&template, data) {
            Ok(html) => Some(html),
            Err(e) => {
                log::warn!("Error view '{}' failed, falling back to JSON: {}", template, e);
                None
            }
        }
    }

    fn render_console(&self, command: &str, failure: &DispatchError) -> Rendered {
        let mut lines = Vec::new();
        match failure {
            DispatchError::Command(e) => lines.push(e.message().to_string()),
            _ => {
                lines.push(format!("Command '{}' failed: {}", command, GENERIC_MESSAGE));
                if self.debug {
                    lines.push(failure.to_string());
                }
            }
        }
        Rendered::Console { exit_code: failure.exit_code(), lines }
    }
}

impl fmt::Debug for DefaultExceptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultExceptionHandler")
            .field("debug", &self.debug)
            .field("views", &self.views.is_some())
            .finish()
    }
}

impl ExceptionHandler for DefaultExceptionHandler {
    fn report(&self, failure: &DispatchError) -> Result<(), ReportError> {
        match failure {
            DispatchError::Http(e) if e.status().is_client_error() => {
                log::info!("{}", e);
            }
            DispatchError::Http(e) => log::error!("{}", e),
            DispatchError::Command(e) => log::warn!("Command failed: {}", e),
            other => log::error!("Unhandled failure: {}", other),
        }
        Ok(())
    }

    fn render(&self, context: &DispatchContext<'_>, failure: &DispatchError) -> Rendered {
        match context {
            DispatchContext::Http { headers, .. } => Rendered::Http(self.render_http(headers, failure)),
            DispatchContext::Console { command } => self.render_console(command, failure),
        }
    }
}

impl Default for DefaultExceptionHandler {
    fn default() -> Self {
        Self::new(false)
    }
}

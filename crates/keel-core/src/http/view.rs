use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to render template '{template}': {message}")]
    Render { template: String, message: String },
}

/// Template engine capability. The default exception handler uses it for
/// HTML error pages named `errors/<status>`.
pub trait ViewRenderer: Send + Sync {
    fn render(&self, template: &str, data: &Map<String, Value>) -> Result<String, ViewError>;

    fn exists(&self, template: &str) -> bool;
}

use std::path::PathBuf;

use clap::Parser;
use http::Method;
use keel_core::http::Request;

/// Keel: a plugin-driven application kernel
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Print "pong" and exit without booting
    #[arg(long)]
    pub ping: bool,

    /// Application config file (json, toml or yaml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the storage directory holding the manifest cache
    #[arg(long, value_name = "DIR")]
    pub storage: Option<PathBuf>,

    /// Render failures with internal detail
    #[arg(long)]
    pub debug: bool,

    /// Send one request through the HTTP kernel instead of running a command
    #[arg(long, num_args = 2, value_names = ["METHOD", "PATH"])]
    pub http: Option<Vec<String>>,

    /// Request body used with --http
    #[arg(long, requires = "http", default_value = "")]
    pub body: String,

    /// Console command and its arguments; `list` when omitted
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Build the request `--http METHOD PATH` describes.
pub fn build_request(parts: &[String], body: &str) -> Result<Request, String> {
    let [method, path] = parts else {
        return Err("--http expects METHOD and PATH".to_string());
    };
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|e| format!("Invalid method '{}': {}", method, e))?;
    http::Request::builder()
        .method(method)
        .uri(path.as_str())
        .body(body.to_string())
        .map_err(|e| format!("Invalid request '{}': {}", path, e))
}

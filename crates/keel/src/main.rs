mod cli; // Declare the cli module

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use keel_core::kernel::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use keel_core::{AppConfig, ApplicationRegistry, ConsoleInput, ConsoleKernel, ConsoleOutput, HttpKernel, PluginTable};
use log::{debug, error};

// --- Plugins registered statically into the table ---
use core_logging::LoggingPlugin;
use greeter_plugin::GreeterPlugin;

use crate::cli::{CliArgs, build_request};

/// Every plugin this binary knows about, framework first.
fn plugin_table() -> Result<Arc<PluginTable>, Box<dyn Error>> {
    let mut table = PluginTable::with_framework()?;
    table.register(Arc::new(LoggingPlugin))?;
    table.register(Arc::new(GreeterPlugin))?;
    Ok(Arc::new(table))
}

/// Config from `--config` when given, otherwise every known plugin in
/// registration order. Command-line flags override the file.
fn load_config(args: &CliArgs, table: &PluginTable) -> Result<AppConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default().with_plugins(table.names()),
    };
    if let Some(storage) = &args.storage {
        config = config.with_storage_path(storage);
    }
    if args.debug {
        config = config.with_debug(true);
    }
    Ok(config)
}

async fn run(args: CliArgs) -> Result<i32, Box<dyn Error>> {
    let table = plugin_table()?;
    let config = load_config(&args, &table)?;
    let registry = Arc::new(ApplicationRegistry::from_config(&config, table.clone()));
    debug!("Booting with plugins {:?}", config.plugins);

    if let Some(parts) = &args.http {
        let request = build_request(parts, &args.body)?;
        let kernel = HttpKernel::new(config, table).with_registry(registry);
        kernel.bootstrap().await?;
        let response = kernel.handle(request).await?;

        let status = response.status();
        println!("HTTP/1.1 {}", status);
        for (name, value) in response.headers() {
            println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
        }
        println!();
        println!("{}", response.body());
        return Ok(if status.is_success() { EXIT_SUCCESS } else { EXIT_FAILURE });
    }

    let input = ConsoleInput::from_args(args.command).unwrap_or_default();
    let kernel = ConsoleKernel::new(config, table).with_registry(registry);
    kernel.bootstrap().await?;
    let mut output = ConsoleOutput::stdout();
    Ok(kernel.handle(input, &mut output).await?)
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return;
    }

    let code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal: {}", e);
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

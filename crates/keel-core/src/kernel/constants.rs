/// Application name
pub const APP_NAME: &str = "Keel";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current plugin API version
pub const API_VERSION: &str = "0.1.0";

/// Name of the built-in plugin contributing the framework commands
pub const FRAMEWORK_PLUGIN: &str = "keel/framework";

/// Default storage directory (relative to the working directory)
pub const DEFAULT_STORAGE_DIR: &str = "storage";

/// Cache directory, relative to the storage directory
pub const CACHE_DIR: &str = "cache";

/// Version of the on-disk cache envelope
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Container id of the shared `AppConfig`
pub const CONFIG_ID: &str = "keel.config";

/// Container id of the shared `ApplicationRegistry`
pub const APPLICATION_REGISTRY_ID: &str = "keel.registry";

/// Container id of the shared `EventDispatcher`
pub const EVENT_DISPATCHER_ID: &str = "keel.events";

/// Command run when the console kernel receives no command name
pub const DEFAULT_COMMAND: &str = "list";

/// Exit code of a successful command
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code of a failed command
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for unknown commands and invalid usage
pub const EXIT_INVALID: i32 = 2;

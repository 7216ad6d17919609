//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + command-line flags
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (apply flag overrides)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → shared via ArcSwap by the server
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs parses new config
//!     → cli.rs re-applies overrides
//!     → validation.rs validates
//!     → atomic swap of Arc<ServerConfig>
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use cli::CliArgs;
pub use loader::{load_config, parse_config, read_config, ConfigError};
pub use schema::{
    LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig, ResponseConfig, ServerConfig,
    StaticFilesConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;

#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{AssessArgs, BatchArgs, CliConfig, Command, ModelArgs};
pub use toml_config::{BatchConfig, LoggingConfig, ServiceConfig, TriageConfig};

//! Configuration for the splat atlas bake tool.
//!
//! Settings persist to disk as RON and can be overridden from the command
//! line via clap. Unknown or missing fields fall back to defaults.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BakeConfig, CONFIG_FILE_NAME, CatalogConfig, DebugConfig, OutputConfig, default_config_dir,
};
pub use error::ConfigError;

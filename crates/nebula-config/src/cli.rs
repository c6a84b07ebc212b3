//! Command-line argument parsing for the splat bake tool.

use std::path::PathBuf;

use clap::Parser;

use crate::BakeConfig;

/// Splat atlas bake command-line arguments.
///
/// CLI values override settings loaded from `bake.ron`.
#[derive(Parser, Debug)]
#[command(
    name = "nebula-splat-bake",
    about = "Bake a splat catalog into a texture atlas"
)]
pub struct CliArgs {
    /// Catalog document to bake.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write one PNG per array layer.
    #[arg(long)]
    pub write_layers: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl BakeConfig {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref path) = args.catalog {
            self.catalog.path = path.clone();
        }
        if let Some(ref dir) = args.output {
            self.output.dir = dir.clone();
        }
        if let Some(write) = args.write_layers {
            self.output.write_layers = write;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

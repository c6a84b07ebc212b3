//! The binary entry point for the splat atlas bake tool.

use std::process::ExitCode;

use clap::Parser;
use nebula_config::CliArgs;
use nebula_splat_bake::RunConfig;
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let run = match RunConfig::load(&args) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Failed to load bake config: {e}");
            return ExitCode::FAILURE;
        }
    };
    let config = &run.config;

    if let Err(e) = nebula_log::init_logging(
        Some(&run.log_dir()),
        config.debug.log_to_file,
        Some(config),
    ) {
        eprintln!("Failed to initialize logging: {e}");
    }
    run.log_origin();

    info!(
        catalog = %config.catalog.path.display(),
        output = %config.output.dir.display(),
        "Baking splat atlas"
    );

    match nebula_splat_bake::bake(config) {
        Ok(report) => {
            for path in &report.written {
                println!("{}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

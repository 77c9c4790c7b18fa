//! Slicekit CLI
//!
//! Command-line interface for the slicekit sample pipeline.

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use slicekit::cli::commands::{self, SliceOptions};
use slicekit::cli::{Cli, Commands};
use slicekit::Result;

fn main() {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Slicekit v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Slicekit v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("[{}] {}", err.error_code(), err);
        for suggestion in err.recovery_suggestions() {
            eprintln!("  hint: {}", suggestion);
        }
        std::process::exit(1);
    }
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Slice {
            input,
            output,
            equal,
            onsets,
            at,
            crossfade_ms,
            normalize,
            normalize_samples,
            notes,
            samples_dir,
            config,
        } => {
            let options = SliceOptions {
                equal,
                onsets,
                at,
                crossfade_ms,
                normalize,
                normalize_samples,
                notes: notes.map(Into::into),
                samples_dir,
                config,
            };
            commands::slice(&input, &output, &options)
        }
        Commands::Onsets { input, config } => commands::onsets(&input, config.as_deref()),
        Commands::Normalize {
            input,
            output,
            target,
        } => commands::normalize(&input, &output, target),
        Commands::Inspect { path } => commands::inspect(&path),
        Commands::Unpack { path, output } => commands::unpack(&path, &output),
    }
}

//! CLI entry point for nanosweep.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use nanosweep::BackendKind;
use nanosweep_cli::config::Config;
use nanosweep_cli::error::{Error, Result};
use nanosweep_cli::input;
use nanosweep_cli::report::Report;
use nanosweep_cli::sweep;

#[derive(Parser)]
#[command(name = "nanosweep")]
#[command(about = "Brute-force indicator sweeps: apply, stack, report")]
#[command(version)]
struct Cli {
    /// Path to sweep.toml
    #[arg(long, default_value = "sweep.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the configured sweep and write the report
    Run {
        /// Override the configured backend (sequential, compiled, distributed)
        #[arg(long)]
        backend: Option<BackendKind>,

        /// Run the sweep but do not write the report
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the config and input series
    Check,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run { backend, dry_run } => run(&config, backend, dry_run),
        Command::Check => check(&config),
    };

    if let Err(e) = result {
        match &e {
            Error::Engine(err) => {
                eprintln!("\nSweep failed: {err}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}

fn run(config: &Config, backend: Option<BackendKind>, dry_run: bool) -> Result<()> {
    let closes = input::load_closes(&config.input.path)?;
    let backend = backend.unwrap_or(config.engine.backend);
    let output = sweep::run(config, backend, closes)?;
    let (rows, cols) = output.buffer.shape();

    if dry_run {
        println!("Dry run: {rows} x {cols} {} result, report not written", output.buffer.dtype());
        return Ok(());
    }

    let report = Report::from_output(output);
    report.write(&config.output.path)?;
    log::info!("report written to {}", config.output.path.display());
    println!("Wrote {rows} x {cols} to {}", config.output.path.display());
    Ok(())
}

fn check(config: &Config) -> Result<()> {
    let closes = input::load_closes(&config.input.path)?;
    let longest = config.sweep.windows.iter().max().copied().unwrap_or(0);
    if longest > closes.len() {
        log::warn!(
            "longest window {longest} exceeds the {} bars of input; its columns will be all NaN",
            closes.len()
        );
    }
    println!(
        "OK: {} sweep, {} windows, {} bars, backend {}",
        config.sweep.kind,
        config.sweep.windows.len(),
        closes.len(),
        config.engine.backend
    );
    Ok(())
}

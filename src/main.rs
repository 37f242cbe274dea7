//! wallmountd CLI entry point

use std::process::ExitCode;

use clap::Parser;

use wallmount::commands::{init_tracing, run_serve, run_status, run_sweep};
use wallmount::{Cli, Commands};

fn main() -> ExitCode {
    match run() {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run() -> wallmount::Result<String> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_tracing(&config);

    match &cli.command {
        Commands::Serve(_) => run_serve(&config),
        Commands::Sweep => run_sweep(&config),
        Commands::Status => run_status(&config, cli.verbose),
    }
}

//! jet CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use jet_engine::commands::{run_build, run_serve};
use jet_engine::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
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

fn run(cli: &Cli) -> jet_engine::Result<String> {
    match &cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Serve(args) => run_serve(args),
    }
}

/// Logs go to stderr so build summaries on stdout stay clean
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "jet_engine=debug,tower_http=debug"
    } else {
        "jet_engine=info,tower_http=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

//! Securegen CLI entry point.

use clap::Parser;
use securegen::cli::{self, Cli, Commands, EXIT_ERROR};
use securegen::telemetry;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_json, telemetry::level_for_verbosity(cli.verbose));

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Run(args) => cli::run_generate(args, config).await,
        Commands::Scan(args) => cli::run_scan(args, config).await,
        Commands::Packs(args) => cli::run_packs(args, config),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}

use std::process::ExitCode;

use clap::Parser;
use sb_core::ErrorKind;
use sb_scrapers::{handle_command, init_logging, RegistryArgs, RegistryCommands};
use tracing::error;

/// Company data from the Belgian Official Gazette (Belgisch Staatsblad)
#[derive(Parser, Debug)]
#[command(name = "staatsblad", version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: RegistryCommands,
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Validation => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Network => 4,
        ErrorKind::Internal => 1,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match handle_command(RegistryArgs { command: cli.command }).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(exit_code(e.kind()))
        }
    }
}

mod cli;
mod commands;
mod error;
mod logging;
mod mock;
mod output;

use clap::Parser;
use std::process::ExitCode;

use crate::cli::Cli;
use crate::error::CliError;
use crate::logging::Verbosity;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(Verbosity::from_flags(cli.verbose, cli.quiet), cli.no_color);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::debug!(exit_code = error.exit_code(), ?error, "command failed");
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    if let Some(data) = commands::run(cli).await? {
        output::render(&data, cli.pretty)?;
    }
    Ok(())
}

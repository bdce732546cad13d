//! Host for the Okta Verify authenticator: logging, configuration and a
//! command line that drives the `okta-verify` core.

pub mod cli;
pub mod commands;
pub mod logging;

use std::process::ExitCode;

use clap::Parser;

use cli::Cli;

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref(), cli.log_json);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: cannot start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout();
    match runtime.block_on(commands::execute(&cli, &mut stdout)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

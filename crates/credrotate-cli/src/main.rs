//! credrotate - scheduled rotation of a shared service account password.
//!
//! Intended to be run from cron as the account being rotated; every run
//! ends with exactly one notification email describing the outcome.

mod app;
mod cli;
mod config;
mod constants;
mod errors;
mod logging;
mod mail;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::warn;

use crate::cli::Cli;
use crate::constants::exit_codes;
use crate::errors::CliError;

fn main() {
    logging::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => invalid_invocation(err),
    };

    if let Err(err) = app::run(&cli) {
        if let Some(cli_err) = err.downcast_ref::<CliError>() {
            cli_err.exit();
        }
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

/// Print the parse error, report it by email when possible, and exit.
fn invalid_invocation(err: clap::Error) -> ! {
    if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
        err.exit();
    }

    let no_arguments = std::env::args_os().len() <= 1;
    if no_arguments {
        let _ = Cli::command().print_help();
        println!();
    } else {
        let _ = err.print();
    }

    let config_path = cli::config_hint(std::env::args_os().filter_map(|a| a.into_string().ok()))
        .or_else(|| std::env::var("CREDROTATE_CONFIG").ok());
    if let Err(notify_err) =
        app::report_invalid_invocation(config_path.as_deref(), &err.render().to_string())
    {
        warn!(error = %format!("{:#}", notify_err), "invalid invocation could not be reported");
    }

    if no_arguments {
        std::process::exit(exit_codes::USAGE);
    }
    std::process::exit(err.exit_code());
}

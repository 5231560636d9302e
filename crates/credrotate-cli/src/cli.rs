use clap::{Parser, ValueEnum};

use credrotate_core::VERSION;

/// Rotate the password of a service account and schedule the next rotation.
///
/// Reads the stored password from the configuration database, changes the
/// system password with `passwd`, stores the new password, updates the
/// invoking user's crontab to run again after FREQUENCY days, and emails the
/// outcome. Must run as the account being rotated.
#[derive(Parser, Debug)]
#[command(name = "credrotate")]
#[command(author, version = VERSION, about, long_about)]
pub struct Cli {
    /// Account whose credentials are rotated
    #[arg(short, long, value_enum)]
    pub username: Account,

    /// Days until the next rotation
    #[arg(
        short,
        long,
        default_value_t = 60,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub frequency: u32,

    /// Path to the config file
    #[arg(short, long, env = "CREDROTATE_CONFIG")]
    pub config: Option<String>,
}

/// Accounts this tool is allowed to rotate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Account {
    Espa,
    Espadev,
    Espatst,
}

impl Account {
    pub fn as_str(&self) -> &'static str {
        match self {
            Account::Espa => "espa",
            Account::Espadev => "espadev",
            Account::Espatst => "espatst",
        }
    }
}

/// Config path named on a command line that failed to parse.
///
/// Only used to find where a failed invocation should be reported.
pub fn config_hint<I>(args: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        if arg == "-c" || arg == "--config" {
            return args.next();
        }
        if let Some(value) = arg.strip_prefix("--config=") {
            return Some(value.to_string());
        }
    }
    None
}

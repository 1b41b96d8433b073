mod builtins;
mod config;
mod control;
mod error;
mod job_control;
mod jobs;
mod launcher;
mod parser;
mod reaper;
mod redirect;
mod shell;
mod signals;
mod status;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use crossterm::tty::IsTty;
use tracing_subscriber::EnvFilter;

use crate::config::{Args, Config};
use crate::error::ShellError;
use crate::shell::Shell;

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SH33_LOG").unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = signals::ignore_in_shell() {
        eprintln!("{}", ShellError::SignalPolicy(e));
        return ExitCode::FAILURE;
    }

    let stdin = io::stdin();
    let config = Config::from_args(args, stdin.is_tty());
    tracing::debug!(?config, "starting");

    let mut shell = Shell::new(config);
    let result = shell.run(&mut stdin.lock(), &mut io::stdout(), &mut io::stderr());
    // Release the job table before leaving, whatever the outcome.
    drop(shell);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

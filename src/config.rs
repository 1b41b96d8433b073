use clap::Parser;

use crate::launcher::RedirectPolicy;

pub const DEFAULT_PROMPT: &str = "33sh> ";

#[derive(Parser, Debug)]
#[command(name = "sh33")]
#[command(version)]
#[command(about = "A line-oriented command interpreter with job control")]
pub struct Args {
    /// Never print a prompt, even on a terminal
    #[arg(long)]
    pub no_prompt: bool,

    /// Prompt text shown before each line when reading from a terminal
    #[arg(long, default_value = DEFAULT_PROMPT)]
    pub prompt: String,

    /// Run commands even when their redirections could not be opened
    #[arg(long)]
    pub permissive_redirects: bool,
}

/// Interpreter settings, resolved from [`Args`] and the environment.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// `None` when no prompt should be written.
    pub prompt: Option<String>,
    pub redirect_policy: RedirectPolicy,
}

impl Config {
    /// `interactive` is whether standard input is a terminal.
    pub fn from_args(args: Args, interactive: bool) -> Self {
        let prompt = (interactive && !args.no_prompt).then_some(args.prompt);
        let redirect_policy = if args.permissive_redirects {
            RedirectPolicy::Permissive
        } else {
            RedirectPolicy::Strict
        };
        Self {
            prompt,
            redirect_policy,
        }
    }
}

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::builtins::{self, BuiltinAction};
use crate::config::Config;
use crate::control::Context;
use crate::error::{Result, ShellError};
use crate::jobs::{JobIds, JobStore, JobTable};
use crate::launcher;
use crate::parser;
use crate::reaper::{self, OsChildEvents};

/// The interpreter: owns the job table, the job-id counter and the settings.
pub struct Shell<S: JobStore = JobTable> {
    jobs: S,
    ids: JobIds,
    config: Config,
}

impl Shell<JobTable> {
    pub fn new(config: Config) -> Self {
        Self::with_store(JobTable::new(), config)
    }
}

impl<S: JobStore> Shell<S> {
    pub fn with_store(jobs: S, config: Config) -> Self {
        Self {
            jobs,
            ids: JobIds::new(),
            config,
        }
    }

    /// Read and run lines until end of input or `exit`.
    ///
    /// Children are reaped before every read. An `Err` means the interpreter
    /// can no longer talk to its user and must stop.
    pub fn run(
        &mut self,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            reaper::sweep(&mut OsChildEvents, &mut self.jobs, out, err)?;

            if let Some(prompt) = &self.config.prompt {
                write!(out, "{prompt}")?;
                out.flush()?;
            }

            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                debug!("end of input");
                return Ok(());
            }
            if self.execute_line(&buf, out, err)? == BuiltinAction::Exit {
                debug!("exit requested");
                return Ok(());
            }
        }
    }

    /// Route one line to a builtin or the launcher.
    pub fn execute_line(
        &mut self,
        line: &[u8],
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> io::Result<BuiltinAction> {
        let tokens = parser::tokenize(line);
        let Some(program) = tokens.first() else {
            return Ok(BuiltinAction::Continue);
        };
        let builtin = program.to_str().filter(|name| builtins::is_builtin(name));

        let mut cx = Context {
            jobs: &mut self.jobs,
            ids: &mut self.ids,
            out,
            err,
        };

        if let Some(name) = builtin {
            return builtins::execute(name, &tokens[1..], &mut cx);
        }

        let parsed = parser::parse_command(&tokens);
        for message in parsed.errors {
            let _ = writeln!(cx.err, "{}", ShellError::Syntax(message));
        }
        if let Some(command) = parsed.command {
            launcher::launch(&mut cx, &command, self.config.redirect_policy)?;
        }
        Ok(BuiltinAction::Continue)
    }

    #[cfg(test)]
    pub fn jobs(&self) -> &S {
        &self.jobs
    }
}

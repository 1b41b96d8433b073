use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

/// Where standard output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// `>`: create or truncate.
    Truncate(OsString),
    /// `>>`: create or append.
    Append(OsString),
}

impl OutputTarget {
    pub fn path(&self) -> &OsStr {
        match self {
            OutputTarget::Truncate(path) | OutputTarget::Append(path) => path,
        }
    }
}

/// At most one input and one output redirection per command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirections {
    pub input: Option<OsString>,
    pub output: Option<OutputTarget>,
}

/// Arguments left after pulling out redirections, plus any syntax problems
/// found along the way. Problems do not stop the command from running.
#[derive(Debug, Default)]
pub struct Extraction {
    pub args: Vec<OsString>,
    pub redirections: Redirections,
    pub errors: Vec<String>,
}

fn is_operator(token: &OsStr) -> bool {
    matches!(token.as_bytes(), b"<" | b">" | b">>")
}

/// Separate `<`, `>` and `>>` (each followed by a path) from regular arguments.
///
/// A repeated redirection is reported and the later one wins. An operator with
/// no path, or followed directly by another operator, is reported and dropped.
pub fn extract_redirections(tokens: &[OsString]) -> Extraction {
    let mut out = Extraction::default();
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i].as_os_str();
        if !is_operator(token) {
            out.args.push(tokens[i].clone());
            i += 1;
            continue;
        }

        let is_input = token.as_bytes() == b"<";
        if is_input && out.redirections.input.is_some() {
            out.errors.push("more than one input file".to_string());
        }
        if !is_input && out.redirections.output.is_some() {
            out.errors.push("more than one output file".to_string());
        }

        let path = match tokens.get(i + 1) {
            None => {
                out.errors
                    .push(format!("no file after '{}'", token.to_string_lossy()));
                i += 1;
                continue;
            }
            Some(next) if is_operator(next) => {
                out.errors.push(format!(
                    "'{}' followed by redirection symbol '{}'",
                    token.to_string_lossy(),
                    next.to_string_lossy()
                ));
                i += 1;
                continue;
            }
            Some(next) => next.clone(),
        };

        match token.as_bytes() {
            b"<" => out.redirections.input = Some(path),
            b">" => out.redirections.output = Some(OutputTarget::Truncate(path)),
            _ => out.redirections.output = Some(OutputTarget::Append(path)),
        }
        i += 2;
    }

    out
}

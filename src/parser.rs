use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

use crate::redirect::{self, Redirections};

/// A command ready for the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Program followed by its arguments, as raw bytes; never empty.
    pub argv: Vec<OsString>,
    pub redirections: Redirections,
    /// The line ended in a literal `&`, already stripped from `argv`.
    pub background: bool,
}

impl Command {
    pub fn program(&self) -> &OsStr {
        &self.argv[0]
    }
}

/// Split a line on spaces, tabs and newlines. No quoting.
///
/// Works on bytes: file names need not be UTF-8.
pub fn tokenize(line: &[u8]) -> Vec<OsString> {
    line.split(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
        .filter(|token| !token.is_empty())
        .map(|token| OsStr::from_bytes(token).to_os_string())
        .collect()
}

/// What came out of parsing an external command line.
#[derive(Debug)]
pub struct Parsed {
    pub command: Option<Command>,
    /// Syntax problems to report, one per line. They do not necessarily
    /// prevent `command` from running.
    pub errors: Vec<String>,
}

/// Pull redirections and the trailing `&` out of `tokens`.
pub fn parse_command(tokens: &[OsString]) -> Parsed {
    let mut extraction = redirect::extract_redirections(tokens);
    let mut argv = std::mem::take(&mut extraction.args);

    let background = argv.last().is_some_and(|last| last == "&");
    if background {
        argv.pop();
    }

    let command = if argv.is_empty() {
        extraction.errors.push("no command given".to_string());
        None
    } else {
        Some(Command {
            argv,
            redirections: extraction.redirections,
            background,
        })
    };

    Parsed {
        command,
        errors: extraction.errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirect::OutputTarget;

    fn parse(line: &str) -> Parsed {
        parse_command(&tokenize(line.as_bytes()))
    }

    #[test]
    fn tokenize_splits_on_any_whitespace() {
        assert_eq!(
            tokenize(b"  /bin/ls\t-l   /tmp\n"),
            vec!["/bin/ls", "-l", "/tmp"]
        );
    }

    #[test]
    fn tokenize_empty_line() {
        assert!(tokenize(b"").is_empty());
        assert!(tokenize(b" \t \n").is_empty());
    }

    #[test]
    fn tokenize_keeps_non_utf8_bytes() {
        let tokens = tokenize(b"cat caf\xe9.txt\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].as_bytes(), b"caf\xe9.txt");
    }

    #[test]
    fn foreground_command() {
        let parsed = parse("sleep 5");
        let cmd = parsed.command.unwrap();
        assert_eq!(cmd.argv, vec!["sleep", "5"]);
        assert_eq!(cmd.program(), "sleep");
        assert!(!cmd.background);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn trailing_ampersand_means_background() {
        let cmd = parse("sleep 5 &").command.unwrap();
        assert_eq!(cmd.argv, vec!["sleep", "5"]);
        assert!(cmd.background);
    }

    #[test]
    fn ampersand_after_redirection_still_counts() {
        let cmd = parse("cat < in.txt >> log &").command.unwrap();
        assert_eq!(cmd.argv, vec!["cat"]);
        assert!(cmd.background);
        assert_eq!(cmd.redirections.input.as_deref(), Some(OsStr::new("in.txt")));
        assert_eq!(
            cmd.redirections.output,
            Some(OutputTarget::Append("log".into()))
        );
    }

    #[test]
    fn ampersand_mid_line_is_an_argument() {
        let cmd = parse("echo & done").command.unwrap();
        assert_eq!(cmd.argv, vec!["echo", "&", "done"]);
        assert!(!cmd.background);
    }

    #[test]
    fn redirection_only_is_an_error() {
        let parsed = parse("> out.txt");
        assert!(parsed.command.is_none());
        assert_eq!(parsed.errors, vec!["no command given".to_string()]);

        assert!(parse("&").command.is_none());
    }

    #[test]
    fn syntax_error_still_yields_a_command() {
        let parsed = parse("cat <");
        assert_eq!(parsed.command.unwrap().argv, vec!["cat"]);
        assert_eq!(parsed.errors.len(), 1);
    }
}

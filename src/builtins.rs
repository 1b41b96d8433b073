use std::ffi::OsString;
use std::io::{self, Write};

use crate::control::{self, Context};
use crate::error::ShellError;
use crate::jobs::{JobId, JobStore};

/// The list of all builtin command names.
const BUILTINS: &[&str] = &["cd", "ln", "rm", "exit", "jobs", "bg", "fg"];

#[derive(Debug, PartialEq, Eq)]
pub enum BuiltinAction {
    Continue,
    Exit,
}

/// Returns true if the command name is a shell builtin.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Run a builtin. Only a failed write to standard output is returned as an
/// error; everything else is reported on `cx.err`.
pub fn execute<S: JobStore>(
    program: &str,
    args: &[OsString],
    cx: &mut Context<'_, S>,
) -> io::Result<BuiltinAction> {
    match program {
        "cd" => builtin_cd(args, cx.err),
        "ln" => builtin_ln(args, cx.err),
        "rm" => builtin_rm(args, cx.err),
        "exit" => return Ok(BuiltinAction::Exit),
        "jobs" => builtin_jobs(cx)?,
        "bg" => {
            if let Some(id) = job_argument("bg", args, cx.err) {
                control::resume_in_background(cx, id);
            }
        }
        "fg" => {
            if let Some(id) = job_argument("fg", args, cx.err) {
                control::resume_in_foreground(cx, id)?;
            }
        }
        _ => {
            let _ = writeln!(cx.err, "unknown builtin: {program}");
        }
    }
    Ok(BuiltinAction::Continue)
}

fn syntax_error(err: &mut dyn Write, message: String) {
    let _ = writeln!(err, "{}", ShellError::Syntax(message));
}

fn builtin_cd(args: &[OsString], err: &mut dyn Write) {
    let Some(dir) = args.first() else {
        syntax_error(err, "cd: missing directory".to_string());
        return;
    };
    if let Err(e) = std::env::set_current_dir(dir) {
        let _ = writeln!(err, "cd: {}: {e}", dir.to_string_lossy());
    }
}

fn builtin_ln(args: &[OsString], err: &mut dyn Write) {
    let [src, dst, ..] = args else {
        syntax_error(err, "ln: expected <source> <destination>".to_string());
        return;
    };
    if let Err(e) = std::fs::hard_link(src, dst) {
        let _ = writeln!(err, "ln: {e}");
    }
}

fn builtin_rm(args: &[OsString], err: &mut dyn Write) {
    let Some(path) = args.first() else {
        syntax_error(err, "rm: missing path".to_string());
        return;
    };
    if let Err(e) = std::fs::remove_file(path) {
        let _ = writeln!(err, "rm: {}: {e}", path.to_string_lossy());
    }
}

// ── Job control builtins ──

/// List all tracked jobs.
fn builtin_jobs<S: JobStore>(cx: &mut Context<'_, S>) -> io::Result<()> {
    for job in cx.jobs.list() {
        writeln!(cx.out, "[{}] ({}) {} {}", job.id, job.pid, job.status, job.command)?;
    }
    cx.out.flush()
}

/// Parse the single `%N` argument of `bg` / `fg`.
fn job_argument(name: &str, args: &[OsString], err: &mut dyn Write) -> Option<JobId> {
    let Some(arg) = args.first() else {
        syntax_error(err, format!("{name}: usage: {name} %<job>"));
        return None;
    };
    let arg = arg.to_string_lossy();
    let Some(digits) = arg.strip_prefix('%') else {
        syntax_error(err, format!("{name}: job does not begin with %: {arg}"));
        return None;
    };
    // `usize::from_str` would also take a leading `+`.
    let parsed = digits
        .bytes()
        .all(|b| b.is_ascii_digit())
        .then(|| digits.parse::<JobId>().ok())
        .flatten();
    if parsed.is_none() {
        syntax_error(err, format!("{name}: invalid job id: {arg}"));
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobIds, JobStatus, JobTable};

    fn run(program: &str, args: &[&str], jobs: &mut JobTable) -> (BuiltinAction, String, String) {
        let args: Vec<OsString> = args.iter().map(|a| OsString::from(*a)).collect();
        let mut ids = JobIds::new();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let action = {
            let mut cx = Context {
                jobs,
                ids: &mut ids,
                out: &mut out,
                err: &mut err,
            };
            execute(program, &args, &mut cx).unwrap()
        };
        (
            action,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn recognises_builtins() {
        for name in ["cd", "ln", "rm", "exit", "jobs", "bg", "fg"] {
            assert!(is_builtin(name), "{name}");
        }
        assert!(!is_builtin("sleep"));
        assert!(!is_builtin("/bin/ls"));
    }

    #[test]
    fn exit_requests_shutdown() {
        let (action, _, _) = run("exit", &[], &mut JobTable::new());
        assert_eq!(action, BuiltinAction::Exit);
    }

    #[test]
    fn jobs_lists_in_id_order() {
        let mut table = JobTable::new();
        table.insert(2, 200, JobStatus::Stopped, "vim").unwrap();
        table.insert(1, 100, JobStatus::Running, "sleep").unwrap();

        let (_, out, err) = run("jobs", &[], &mut table);
        assert_eq!(out, "[1] (100) Running sleep\n[2] (200) Stopped vim\n");
        assert!(err.is_empty());
    }

    #[test]
    fn bg_and_fg_require_an_argument() {
        let mut table = JobTable::new();
        table.insert(1, 100, JobStatus::Stopped, "sleep").unwrap();

        for name in ["bg", "fg"] {
            let (action, out, err) = run(name, &[], &mut table);
            assert_eq!(action, BuiltinAction::Continue);
            assert!(out.is_empty());
            assert_eq!(err, format!("syntax error: {name}: usage: {name} %<job>\n"));
        }
        assert_eq!(table.lookup_job(1).unwrap().status, JobStatus::Stopped);
    }

    #[test]
    fn job_argument_must_start_with_percent() {
        let mut table = JobTable::new();
        table.insert(1, 100, JobStatus::Stopped, "sleep").unwrap();

        let (_, _, err) = run("bg", &["1"], &mut table);
        assert_eq!(err, "syntax error: bg: job does not begin with %: 1\n");

        let (_, _, err) = run("fg", &["%x"], &mut table);
        assert_eq!(err, "syntax error: fg: invalid job id: %x\n");

        for arg in ["%+1", "%", "%-1"] {
            let (_, _, err) = run("bg", &[arg], &mut table);
            assert_eq!(err, format!("syntax error: bg: invalid job id: {arg}\n"));
        }

        assert_eq!(table.lookup_job(1).unwrap().status, JobStatus::Stopped);
    }

    #[test]
    fn bg_on_missing_job_reports() {
        let (_, _, err) = run("bg", &["%4"], &mut JobTable::new());
        assert_eq!(err, "%4: no such job\n");
    }

    #[test]
    fn filesystem_builtins_report_missing_arguments() {
        let mut table = JobTable::new();
        let (_, _, err) = run("cd", &[], &mut table);
        assert_eq!(err, "syntax error: cd: missing directory\n");
        let (_, _, err) = run("ln", &["only-one"], &mut table);
        assert_eq!(err, "syntax error: ln: expected <source> <destination>\n");
        let (_, _, err) = run("rm", &[], &mut table);
        assert_eq!(err, "syntax error: rm: missing path\n");
    }

    #[test]
    fn cd_to_missing_directory_reports() {
        let (_, _, err) = run("cd", &["/no/such/dir/anywhere"], &mut JobTable::new());
        assert!(err.starts_with("cd: /no/such/dir/anywhere:"), "stderr was: {err}");
    }

    #[test]
    fn ln_then_rm() {
        let dir = std::env::temp_dir().join(format!("sh33_ln_rm_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let src = dir.join("src.txt");
        let dst = dir.join("dst.txt");
        std::fs::write(&src, "linked").unwrap();
        let src_arg = src.display().to_string();
        let dst_arg = dst.display().to_string();

        let mut table = JobTable::new();
        let (_, _, err) = run("ln", &[src_arg.as_str(), dst_arg.as_str()], &mut table);
        assert!(err.is_empty(), "stderr was: {err}");
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "linked");

        let (_, _, err) = run("rm", &[dst_arg.as_str()], &mut table);
        assert!(err.is_empty(), "stderr was: {err}");
        assert!(!dst.exists());

        let (_, _, err) = run("rm", &[dst_arg.as_str()], &mut table);
        assert!(err.starts_with("rm: "), "stderr was: {err}");

        let _ = std::fs::remove_dir_all(&dir);
    }
}

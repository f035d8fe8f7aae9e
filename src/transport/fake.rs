//! In-memory shell for tests: records invocations and replays canned output.

use super::{ExecOptions, OutputSink, Shell};
use crate::core::error::{Error, Result};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// One recorded process invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub working_dir: PathBuf,
    pub program: String,
    pub args: Vec<String>,
    pub env: IndexMap<String, String>,
}

impl Invocation {
    /// `program arg0 arg1 ...`
    pub fn line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
struct Response {
    program: String,
    first_arg: Option<String>,
    dir_contains: Option<String>,
    stdout: String,
    code: i32,
}

/// Records every call. `init` creates the `.terraform` marker and `git clone`
/// creates its target directory, like the real programs.
#[derive(Debug, Default)]
pub struct FakeShell {
    calls: Mutex<Vec<Invocation>>,
    responses: Mutex<Vec<Response>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `stdout` to `program first_arg ...` run in a directory containing `dir_contains`.
    pub fn respond(&self, program: &str, first_arg: Option<&str>, dir_contains: Option<&str>, stdout: &str) {
        self.push(program, first_arg, dir_contains, stdout, 0);
    }

    /// Make matching invocations exit with status 1.
    pub fn fail(&self, program: &str, first_arg: Option<&str>, dir_contains: Option<&str>) {
        self.push(program, first_arg, dir_contains, "", 1);
    }

    fn push(&self, program: &str, first_arg: Option<&str>, dir_contains: Option<&str>, stdout: &str, code: i32) {
        self.responses.lock().unwrap().push(Response {
            program: program.to_string(),
            first_arg: first_arg.map(str::to_string),
            dir_contains: dir_contains.map(str::to_string),
            stdout: stdout.to_string(),
            code,
        });
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Invocation lines for one program.
    pub fn lines_for(&self, program: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .map(|c| c.line())
            .collect()
    }
}

impl Shell for FakeShell {
    fn execute(
        &self,
        opts: &ExecOptions<'_>,
        program: &str,
        args: &[String],
        stdout: &mut dyn OutputSink,
        _stderr: &mut dyn OutputSink,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(Invocation {
            working_dir: opts.working_dir.to_path_buf(),
            program: program.to_string(),
            args: args.to_vec(),
            env: opts.env.clone(),
        });

        let dir = opts.working_dir.to_string_lossy().to_string();
        let response = self
            .responses
            .lock()
            .unwrap()
            .iter()
            .find(|r| {
                r.program == program
                    && r.first_arg
                        .as_deref()
                        .is_none_or(|a| args.first().map(String::as_str) == Some(a))
                    && r.dir_contains.as_deref().is_none_or(|d| dir.contains(d))
            })
            .cloned();

        let (output, code) = response
            .map(|r| (r.stdout, r.code))
            .unwrap_or_default();
        for line in output.lines() {
            stdout.write_line(line);
        }

        if code != 0 {
            return Err(Error::CommandFailed {
                program: program.to_string(),
                args: args.to_vec(),
                code,
            });
        }

        if args.first().map(String::as_str) == Some("init") {
            let _ = std::fs::create_dir_all(opts.working_dir.join(crate::core::types::INIT_MARKER));
        }
        if program == "git" && args.iter().any(|a| a == "clone") {
            if let Some(target) = args.last() {
                let _ = std::fs::create_dir_all(target);
            }
        }
        Ok(())
    }
}

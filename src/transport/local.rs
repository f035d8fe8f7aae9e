//! Local process execution.

use super::{ExecOptions, OutputSink, Shell};
use crate::core::error::{Error, Result};
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::process::{Command, Stdio};

/// Runs programs as local child processes.
///
/// stdout is streamed to its sink while the process runs; stderr is drained on
/// a helper thread and replayed once stdout closes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessShell;

impl Shell for ProcessShell {
    fn execute(
        &self,
        opts: &ExecOptions<'_>,
        program: &str,
        args: &[String],
        stdout: &mut dyn OutputSink,
        stderr: &mut dyn OutputSink,
    ) -> Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(opts.working_dir)
            .envs(opts.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Spawn {
                program: program.to_string(),
                source: e,
            })?;

        let stderr_reader = child.stderr.take().map(|pipe| {
            std::thread::spawn(move || {
                let mut lines = Vec::new();
                for_each_line(pipe, |line| lines.push(line.to_string()));
                lines
            })
        });

        if let Some(pipe) = child.stdout.take() {
            for_each_line(pipe, |line| stdout.write_line(line));
        }

        if let Some(handle) = stderr_reader {
            for line in handle.join().unwrap_or_default() {
                stderr.write_line(&line);
            }
        }

        let status = child.wait().map_err(|e| Error::Spawn {
            program: program.to_string(),
            source: e,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed {
                program: program.to_string(),
                args: args.to_vec(),
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

/// Feed every `\n`-terminated line of `pipe` to `f`, decoding lossily so a
/// non-UTF-8 line never stops the pipe from being drained.
fn for_each_line(pipe: impl Read, mut f: impl FnMut(&str)) {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                f(&*String::from_utf8_lossy(&buf));
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "stopped reading process output");
                break;
            }
        }
    }
}

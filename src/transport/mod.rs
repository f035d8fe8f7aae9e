//! Subprocess execution boundary.
//!
//! Everything strata runs (the provisioning engine, hook commands, git) goes
//! through [`Shell::execute`], with stdout and stderr routed line by line into
//! [`OutputSink`]s. Tests substitute an in-memory shell.

pub mod local;

#[cfg(test)]
pub mod fake;

use crate::core::error::Result;
use indexmap::IndexMap;
use std::path::Path;

/// Where and with which environment a process runs.
#[derive(Debug, Clone, Copy)]
pub struct ExecOptions<'a> {
    pub working_dir: &'a Path,
    pub env: &'a IndexMap<String, String>,
}

impl<'a> ExecOptions<'a> {
    pub fn new(working_dir: &'a Path, env: &'a IndexMap<String, String>) -> Self {
        Self { working_dir, env }
    }
}

/// Receives process output one line at a time.
pub trait OutputSink {
    fn write_line(&mut self, line: &str);
}

/// Runs external programs.
pub trait Shell: Send + Sync {
    /// Run `program args...`, streaming output into the sinks.
    /// A non-zero exit status is an error.
    fn execute(
        &self,
        opts: &ExecOptions<'_>,
        program: &str,
        args: &[String],
        stdout: &mut dyn OutputSink,
        stderr: &mut dyn OutputSink,
    ) -> Result<()>;
}

/// Log level a [`LogSink`] emits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Forwards each line to `tracing` at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    pub level: LogLevel,
}

impl LogSink {
    pub fn debug() -> Self {
        Self { level: LogLevel::Debug }
    }

    pub fn info() -> Self {
        Self { level: LogLevel::Info }
    }

    pub fn warn() -> Self {
        Self { level: LogLevel::Warn }
    }

    pub fn error() -> Self {
        Self { level: LogLevel::Error }
    }
}

impl OutputSink for LogSink {
    fn write_line(&mut self, line: &str) {
        match self.level {
            LogLevel::Debug => tracing::debug!(target: "strata::process", "{}", line),
            LogLevel::Info => tracing::info!(target: "strata::process", "{}", line),
            LogLevel::Warn => tracing::warn!(target: "strata::process", "{}", line),
            LogLevel::Error => tracing::error!(target: "strata::process", "{}", line),
        }
    }
}

/// Buffers output in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    buffer: String,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl OutputSink for BufferSink {
    fn write_line(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }
}

/// Sends every line to two sinks.
pub struct TeeSink<'a> {
    pub first: &'a mut dyn OutputSink,
    pub second: &'a mut dyn OutputSink,
}

impl OutputSink for TeeSink<'_> {
    fn write_line(&mut self, line: &str) {
        self.first.write_line(line);
        self.second.write_line(line);
    }
}

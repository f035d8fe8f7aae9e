//! Provisioning engine adapter.
//!
//! Wraps the engine binary (`terraform` by default): argument compatibility
//! filtering, execution in a module directory with the module's environment,
//! and typed output extraction.

pub mod compatibility;
pub mod output;

use crate::core::error::Result;
use crate::core::types::{Module, OutputValues};
use crate::transport::{BufferSink, ExecOptions, LogSink, OutputSink, Shell};
use compatibility::Compatibility;
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

/// The provisioning engine as seen by the orchestrator.
pub struct Engine {
    binary: String,
    shell: Arc<dyn Shell>,
    compatibility: Compatibility,
}

impl Engine {
    pub fn new(binary: impl Into<String>, shell: Arc<dyn Shell>, compatibility: Compatibility) -> Self {
        Self {
            binary: binary.into(),
            shell,
            compatibility,
        }
    }

    /// Build an engine and detect its version via `<binary> version -json`.
    /// Detection failure is a warning: argument filtering is then disabled.
    pub fn detect(binary: impl Into<String>, shell: Arc<dyn Shell>) -> Self {
        let binary = binary.into();
        let version = detect_version(&binary, shell.as_ref());
        match version {
            Some(ref v) => tracing::debug!(engine = %binary, version = %v, "detected engine version"),
            None => tracing::warn!(engine = %binary, "could not detect engine version, forwarding arguments unfiltered"),
        }
        Self::new(binary, shell, Compatibility::new(version))
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn compatibility(&self) -> &Compatibility {
        &self.compatibility
    }

    /// Run `<engine> <command> args...` with explicit sinks.
    pub fn execute(
        &self,
        working_dir: &Path,
        env: &IndexMap<String, String>,
        command: &str,
        args: &[String],
        stdout: &mut dyn OutputSink,
        stderr: &mut dyn OutputSink,
    ) -> Result<()> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(command.to_string());
        full.extend(args.iter().cloned());
        self.shell.execute(
            &ExecOptions::new(working_dir, env),
            &self.binary,
            &full,
            stdout,
            stderr,
        )
    }

    /// Run a command in a module directory, logging output at info/error.
    /// User-supplied `extra` arguments are filtered through the compatibility
    /// table; `fixed` arguments are always forwarded.
    pub fn run(&self, module: &Module, command: &str, fixed: &[&str], extra: &[String]) -> Result<()> {
        let mut args: Vec<String> = fixed.iter().map(|s| s.to_string()).collect();
        args.extend(self.compatibility.filter_args(command, extra));
        self.execute(
            &module.module_dir,
            &module.env,
            command,
            &args,
            &mut LogSink::info(),
            &mut LogSink::error(),
        )
    }

    /// Like [`Engine::run`] but only logs engine output at debug level.
    pub fn run_quiet(&self, module: &Module, command: &str, fixed: &[&str]) -> Result<()> {
        let args: Vec<String> = fixed.iter().map(|s| s.to_string()).collect();
        self.execute(
            &module.module_dir,
            &module.env,
            command,
            &args,
            &mut LogSink::debug(),
            &mut LogSink::error(),
        )
    }

    /// Run `output -json` and decode the captured stdout.
    pub fn outputs(&self, module: &Module) -> Result<OutputValues> {
        let mut buffer = BufferSink::new();
        self.execute(
            &module.module_dir,
            &module.env,
            "output",
            &["-json".to_string()],
            &mut buffer,
            &mut LogSink::error(),
        )?;
        output::parse_outputs(buffer.contents())
    }
}

fn detect_version(binary: &str, shell: &dyn Shell) -> Option<semver::Version> {
    let mut buffer = BufferSink::new();
    let cwd = std::env::current_dir().ok()?;
    shell
        .execute(
            &ExecOptions::new(&cwd, &IndexMap::new()),
            binary,
            &["version".to_string(), "-json".to_string()],
            &mut buffer,
            &mut LogSink::debug(),
        )
        .ok()?;
    parse_version(buffer.contents())
}

/// Extract the engine version from `version -json` output.
pub fn parse_version(raw: &str) -> Option<semver::Version> {
    let doc: serde_json::Value = serde_json::from_str(raw).ok()?;
    let text = doc.get("terraform_version")?.as_str()?;
    semver::Version::parse(text.trim_start_matches('v')).ok()
}

//! Command/script hook executor.

use super::{ExecutorCreator, HookExecutor};
use crate::core::error::Result;
use crate::core::types::HookDecl;
use crate::transport::{BufferSink, ExecOptions, LogSink, Shell, TeeSink};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Creates executors for hooks that declare a `command` or a `script`.
pub struct CommandCreator {
    shell: Arc<dyn Shell>,
}

impl CommandCreator {
    pub fn new(shell: Arc<dyn Shell>) -> Self {
        Self { shell }
    }
}

impl ExecutorCreator for CommandCreator {
    fn can_create(&self, decl: &HookDecl) -> bool {
        decl.hook.command.is_some() || decl.hook.script.is_some()
    }

    fn create(&self, decl: &HookDecl) -> Arc<dyn HookExecutor> {
        let working_dir = decl.working_dir();
        let program = match (&decl.hook.command, &decl.hook.script) {
            (Some(command), _) => command.clone(),
            (None, Some(script)) => working_dir.join(script).to_string_lossy().to_string(),
            (None, None) => String::new(),
        };
        Arc::new(CommandExecutor {
            shell: Arc::clone(&self.shell),
            working_dir,
            program,
            args: decl.hook.args.clone(),
            state: Mutex::new(ExecState::default()),
        })
    }
}

#[derive(Debug, Default)]
struct ExecState {
    has_run: bool,
    output: String,
}

/// Runs one program once, remembering its stdout.
pub struct CommandExecutor {
    shell: Arc<dyn Shell>,
    working_dir: PathBuf,
    program: String,
    args: Vec<String>,
    state: Mutex<ExecState>,
}

impl HookExecutor for CommandExecutor {
    fn has_run(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .has_run
    }

    fn run(&self, env: &IndexMap<String, String>) -> Result<()> {
        tracing::info!("- {} {}", self.program, self.args.join(" "));

        let mut buffer = BufferSink::new();
        let mut debug = LogSink::debug();
        self.shell.execute(
            &ExecOptions::new(&self.working_dir, env),
            &self.program,
            &self.args,
            &mut TeeSink {
                first: &mut buffer,
                second: &mut debug,
            },
            &mut LogSink::warn(),
        )?;

        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state.has_run = true;
        state.output = buffer.into_string();
        Ok(())
    }

    fn output(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .output
            .clone()
    }
}

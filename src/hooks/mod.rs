//! Lifecycle hooks.
//!
//! Hooks fire around `prepare` and `finish` events, optionally only for some
//! commands. Each distinct invocation (working dir, command, script, args)
//! maps to one cached executor, so a hook shared by many modules runs once per
//! process unless `disable_cache` is set.

pub mod command;

use crate::core::error::{Error, Result};
use crate::core::types::{HookDecl, HookEvent, Module};
use crate::transport::Shell;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A runnable hook with remembered state.
pub trait HookExecutor: Send + Sync {
    fn has_run(&self) -> bool;
    fn run(&self, env: &IndexMap<String, String>) -> Result<()>;
    fn output(&self) -> String;
}

/// One entry in the executor registry.
pub trait ExecutorCreator: Send + Sync {
    fn can_create(&self, decl: &HookDecl) -> bool;
    fn create(&self, decl: &HookDecl) -> Arc<dyn HookExecutor>;
}

/// Lock-guarded executor store: at most one executor is built per key.
#[derive(Default)]
pub struct ExecutorCache {
    entries: Mutex<HashMap<String, Arc<dyn HookExecutor>>>,
}

impl ExecutorCache {
    /// Return the executor for `key`, building it with `factory` if absent.
    pub fn get_or_create<F>(&self, key: &str, factory: F) -> Result<Arc<dyn HookExecutor>>
    where
        F: FnOnce() -> Result<Arc<dyn HookExecutor>>,
    {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(existing) = entries.get(key) {
            return Ok(Arc::clone(existing));
        }
        let created = factory()?;
        entries.insert(key.to_string(), Arc::clone(&created));
        Ok(created)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs hooks for modules.
pub struct HookRunner {
    cache: ExecutorCache,
    creators: Vec<Box<dyn ExecutorCreator>>,
}

impl HookRunner {
    /// Runner with the built-in command creator.
    pub fn new(shell: Arc<dyn Shell>) -> Self {
        Self::with_creators(vec![Box::new(command::CommandCreator::new(shell))])
    }

    /// Runner with an explicit creator registry, consulted in order.
    pub fn with_creators(creators: Vec<Box<dyn ExecutorCreator>>) -> Self {
        Self {
            cache: ExecutorCache::default(),
            creators,
        }
    }

    /// Number of cached executors.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Run every hook of `module` that subscribes to `event` for `command`.
    pub fn run(&self, module: &mut Module, event: HookEvent, command: &str) -> Result<()> {
        let event = event.to_string();
        for decl in &module.hooks {
            if !should_run(&decl.hook.trigger_on, &event, command) {
                tracing::debug!(hook = %decl.name, "{} should not run for command {}", decl.name, command);
                continue;
            }

            let exec = self.executor(decl)?;
            if !exec.has_run() || decl.hook.disable_cache {
                exec.run(&module.env)?;
            } else {
                tracing::debug!(hook = %decl.name, "hook already ran, using cached output");
            }

            if decl.hook.set_env {
                for (key, value) in parse_vars(&exec.output()) {
                    tracing::debug!(module = %module.name, "setting env {}", key);
                    module.env.insert(key, value);
                }
            }
        }
        Ok(())
    }

    /// Run `event` hooks for every module in order, stopping at the first failure.
    pub fn run_all(&self, modules: &mut [Module], event: HookEvent, command: &str) -> Result<()> {
        tracing::info!("Executing {} hooks...", event);
        for module in modules.iter_mut() {
            let name = module.name.clone();
            self.run(module, event, command)
                .map_err(|e| e.in_module(&name))?;
        }
        Ok(())
    }

    /// Cached executor for a declaration; `disable_cache` always builds a new one.
    fn executor(&self, decl: &HookDecl) -> Result<Arc<dyn HookExecutor>> {
        if decl.hook.disable_cache {
            return self.create(decl);
        }
        self.cache.get_or_create(&cache_key(decl), || self.create(decl))
    }

    fn create(&self, decl: &HookDecl) -> Result<Arc<dyn HookExecutor>> {
        self.creators
            .iter()
            .find(|c| c.can_create(decl))
            .map(|c| c.create(decl))
            .ok_or_else(|| Error::NoExecutorFound {
                hook: decl.name.clone(),
            })
    }
}

/// Whether a hook with trigger `trigger_on` fires for `event` + `command`.
pub fn should_run(trigger_on: &str, event: &str, command: &str) -> bool {
    let event = event.to_lowercase();
    let command = command.to_lowercase();

    let (hook_event, hook_commands) = match trigger_on.split_once(':') {
        Some((e, cmds)) => (e, Some(cmds)),
        None => (trigger_on, None),
    };

    if hook_event.trim().to_lowercase() != event {
        return false;
    }

    match hook_commands {
        None => true,
        Some(cmds) => cmds
            .split(',')
            .any(|c| c.trim().to_lowercase() == command),
    }
}

/// Cache key identifying an effective invocation: working dir, command,
/// resolved script path and args, joined with `_`.
pub fn cache_key(decl: &HookDecl) -> String {
    let working_dir = decl.working_dir();
    let mut parts = vec![working_dir.to_string_lossy().into_owned()];
    if let Some(ref command) = decl.hook.command {
        parts.push(command.clone());
    }
    if let Some(ref script) = decl.hook.script {
        parts.push(working_dir.join(script).to_string_lossy().into_owned());
    }
    parts.extend(decl.hook.args.iter().cloned());
    parts.join("_")
}

/// Parse `KEY=VALUE` lines. Blank lines, `#` comments and lines without `=`
/// are ignored; `export ` prefixes and matching surrounding quotes are stripped.
pub fn parse_vars(output: &str) -> IndexMap<String, String> {
    let mut vars = IndexMap::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = ['"', '\'']
            .iter()
            .find_map(|q| {
                value
                    .strip_prefix(*q)
                    .and_then(|v| v.strip_suffix(*q))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    vars
}

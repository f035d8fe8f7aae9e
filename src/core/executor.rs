//! Orchestration of the top-level commands.
//!
//! `init` walks modules in load order: prepare hooks, fetch source, backend
//! override, dependency resolution, variables file, engine `init`, finish
//! hooks. `destroy` walks the same modules in reverse. Passthrough commands
//! replay the engine over the modules recorded in the last checkpoint.

use super::dependency::{DependencyResolver, Resolution};
use super::error::{Error, ModuleContext, Result};
use super::loader::Loader;
use super::parser;
use super::resolver::{self, DependencyOutputs};
use super::state;
use super::types::*;
use crate::engine::Engine;
use crate::getter::{self, SourceGetter};
use crate::hooks::HookRunner;
use crate::provenance::eventlog;
use crate::transport::LogSink;
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Options for `init`.
pub struct InitConfig<'a> {
    pub source: &'a Path,
    pub max_depth: usize,
    pub purge: bool,
    pub source_override: Option<ModuleSource>,
    pub extra_args: &'a [String],
}

/// Options for `destroy`.
pub struct DestroyConfig<'a> {
    pub source: &'a Path,
    pub max_depth: usize,
    pub auto_approve: bool,
    pub auto_init: bool,
    pub extra_args: &'a [String],
}

/// What a command did.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub command: String,
    pub completed: Vec<String>,
    pub skipped: Vec<String>,
    pub total_seconds: f64,
}

/// Per-module result of destroy.
enum DestroyOutcome {
    Destroyed,
    Skipped(String),
}

/// Drives loader, engine, getter and hooks for one invocation.
pub struct Orchestrator {
    loader: Loader,
    engine: Engine,
    getter: Arc<dyn SourceGetter>,
    hooks: HookRunner,
}

impl Orchestrator {
    pub fn new(loader: Loader, engine: Engine, getter: Arc<dyn SourceGetter>, hooks: HookRunner) -> Self {
        Self {
            loader,
            engine,
            getter,
            hooks,
        }
    }

    fn temp_dir(&self) -> &Path {
        self.loader.temp_dir()
    }

    fn dependency_resolver(&self, max_depth: usize) -> DependencyResolver<'_> {
        DependencyResolver::new(
            &self.loader,
            &self.engine,
            self.getter.as_ref(),
            &self.hooks,
            max_depth,
        )
    }

    fn started(&self, command: &str, modules: usize) -> String {
        let run_id = eventlog::generate_run_id();
        eventlog::record(
            self.temp_dir(),
            RunEvent::CommandStarted {
                command: command.to_string(),
                run_id: run_id.clone(),
                modules,
                strata_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        );
        run_id
    }

    fn finished(&self, summary: &RunSummary, run_id: String) {
        eventlog::record(
            self.temp_dir(),
            RunEvent::CommandCompleted {
                command: summary.command.clone(),
                run_id,
                total_seconds: summary.total_seconds,
            },
        );
    }

    fn failed(&self, module: &str, command: &str, error: &Error) {
        eventlog::record(
            self.temp_dir(),
            RunEvent::ModuleFailed {
                module: module.to_string(),
                command: command.to_string(),
                error: error.to_string(),
            },
        );
    }

    // ------------------------------------------------------------------
    // init
    // ------------------------------------------------------------------

    /// Initialize every module under `cfg.source` and persist a checkpoint.
    pub fn init(&self, cfg: &InitConfig) -> Result<RunSummary> {
        let start = Instant::now();
        if cfg.source_override.is_some() && cfg.source.is_dir() {
            return Err(Error::SourceMustBeAFile(cfg.source.to_path_buf()));
        }

        if cfg.purge && self.temp_dir().exists() {
            tracing::debug!(dir = %self.temp_dir().display(), "purging temporary folder");
            std::fs::remove_dir_all(self.temp_dir()).map_err(|e| Error::io(self.temp_dir(), e))?;
        }

        let mut modules = self.loader.load(cfg.source)?;
        let mut summary = RunSummary {
            command: "init".to_string(),
            ..RunSummary::default()
        };
        if modules.is_empty() {
            tracing::warn!("No sources found in path {}", cfg.source.display());
            return Ok(summary);
        }

        let run_id = self.started("init", modules.len());
        let deps = self.dependency_resolver(cfg.max_depth);
        let mut checkpoint = state::new_checkpoint();

        for module in modules.iter_mut() {
            let module_start = Instant::now();
            tracing::info!("Initializing {}", module.name);
            match self.init_module(&deps, module, cfg) {
                Ok(inputs_hash) => {
                    checkpoint.modules.insert(
                        module.name.clone(),
                        state::checkpoint_entry(module, Some(inputs_hash)),
                    );
                    eventlog::record(
                        self.temp_dir(),
                        RunEvent::ModuleCompleted {
                            module: module.name.clone(),
                            command: "init".to_string(),
                            duration_seconds: module_start.elapsed().as_secs_f64(),
                        },
                    );
                    summary.completed.push(module.name.clone());
                }
                Err(e) => {
                    self.failed(&module.name, "init", &e);
                    return Err(e.in_module(&module.name));
                }
            }
        }

        state::save_checkpoint(self.temp_dir(), &checkpoint)?;
        summary.total_seconds = start.elapsed().as_secs_f64();
        self.finished(&summary, run_id);
        Ok(summary)
    }

    /// Returns the fingerprint of the variables file written for the module.
    fn init_module(&self, deps: &DependencyResolver<'_>, module: &mut Module, cfg: &InitConfig) -> Result<String> {
        self.hooks.run(module, HookEvent::Prepare, "init")?;

        getter::fetch_module(self.getter.as_ref(), module, cfg.source_override.as_ref())?;
        state::write_backend_override(module)?;

        let deps_dir = module.deps_dir.clone();
        let inputs = match deps.resolve_dependencies(module, &deps_dir)? {
            Resolution::Resolved(values) => values,
            Resolution::Skipped => resolver::resolve_inputs(module, &DependencyOutputs::new())?,
        };
        let inputs_hash = state::write_variables(module, &inputs)?;

        self.engine.run(module, "init", &[], cfg.extra_args)?;

        self.hooks.run(module, HookEvent::Finish, "init")?;
        Ok(inputs_hash)
    }

    // ------------------------------------------------------------------
    // destroy
    // ------------------------------------------------------------------

    /// Destroy every module under `cfg.source`, dependents first.
    pub fn destroy(&self, cfg: &DestroyConfig) -> Result<RunSummary> {
        let start = Instant::now();
        let modules = self.loader.load(cfg.source)?;
        let mut summary = RunSummary {
            command: "destroy".to_string(),
            ..RunSummary::default()
        };
        if modules.is_empty() {
            tracing::warn!("No sources found in path {}", cfg.source.display());
            return Ok(summary);
        }

        if !cfg.auto_init {
            if let Some(module) = modules.iter().find(|m| !m.is_initialized()) {
                return Err(Error::UninitializedModule(module.name.clone()));
            }
        }

        let mut checkpoint = state::load_checkpoint(self.temp_dir())?;
        let run_id = self.started("destroy", modules.len());
        let deps = self.dependency_resolver(cfg.max_depth);

        for mut module in modules.into_iter().rev() {
            let module_start = Instant::now();
            tracing::info!("Destroying {}", module.name);
            let outcome = self.destroy_module(&deps, &mut module, checkpoint.as_ref(), cfg);
            match outcome {
                Ok(DestroyOutcome::Destroyed) => {
                    if let Some(ref mut cp) = checkpoint {
                        cp.modules.shift_remove(&module.name);
                    }
                    eventlog::record(
                        self.temp_dir(),
                        RunEvent::ModuleCompleted {
                            module: module.name.clone(),
                            command: "destroy".to_string(),
                            duration_seconds: module_start.elapsed().as_secs_f64(),
                        },
                    );
                    summary.completed.push(module.name);
                }
                Ok(DestroyOutcome::Skipped(reason)) => {
                    tracing::warn!("{}: {}, nothing to destroy", module.name, reason);
                    eventlog::record(
                        self.temp_dir(),
                        RunEvent::ModuleSkipped {
                            module: module.name.clone(),
                            command: "destroy".to_string(),
                            reason,
                        },
                    );
                    summary.skipped.push(module.name);
                }
                Err(e) => {
                    self.failed(&module.name, "destroy", &e);
                    if let Some(ref cp) = checkpoint {
                        state::save_checkpoint(self.temp_dir(), cp)?;
                    }
                    return Err(e.in_module(&module.name));
                }
            }
        }

        if let Some(ref cp) = checkpoint {
            state::save_checkpoint(self.temp_dir(), cp)?;
        }
        summary.total_seconds = start.elapsed().as_secs_f64();
        self.finished(&summary, run_id);
        Ok(summary)
    }

    fn destroy_module(
        &self,
        deps: &DependencyResolver<'_>,
        module: &mut Module,
        checkpoint: Option<&Checkpoint>,
        cfg: &DestroyConfig,
    ) -> Result<DestroyOutcome> {
        self.hooks.run(module, HookEvent::Prepare, "destroy")?;

        if !module.is_initialized() {
            tracing::info!("{} is not initialized, running init", module.name);
            getter::fetch_module(self.getter.as_ref(), module, None)?;
            state::write_backend_override(module)?;
            self.engine.run(module, "init", &["-input=false"], &[])?;
        }

        if !state::variables_current(module, checkpoint)? {
            let stale = module.variable_file().exists();
            if stale {
                tracing::warn!("{}: variables file changed since init, resolving again", module.name);
                state::remove_variables(module)?;
            }

            let deps_dir = module.deps_dir.clone();
            match deps.resolve_dependencies(module, &deps_dir)? {
                Resolution::Resolved(values) => {
                    state::write_variables(module, &values)?;
                }
                Resolution::Skipped if stale => {
                    let values = resolver::resolve_inputs(module, &DependencyOutputs::new())?;
                    state::write_variables(module, &values)?;
                }
                Resolution::Skipped => {
                    return Ok(DestroyOutcome::Skipped("no variables file".to_string()));
                }
            }
        }

        let fixed: &[&str] = if cfg.auto_approve { &["-auto-approve"] } else { &[] };
        self.engine.run(module, "destroy", fixed, cfg.extra_args)?;
        state::remove_variables(module)?;

        self.hooks.run(module, HookEvent::Finish, "destroy")?;
        Ok(DestroyOutcome::Destroyed)
    }

    // ------------------------------------------------------------------
    // passthrough / validate
    // ------------------------------------------------------------------

    /// Run `command` in every module recorded by the last successful init.
    pub fn passthrough(&self, command: &str, extra_args: &[String]) -> Result<RunSummary> {
        let start = Instant::now();
        let checkpoint = state::load_checkpoint(self.temp_dir())?
            .ok_or_else(|| Error::NoCheckpoint(state::checkpoint_path(self.temp_dir())))?;

        let args = self.engine.compatibility().filter_args(command, extra_args);
        let env = IndexMap::new();
        let mut summary = RunSummary {
            command: command.to_string(),
            ..RunSummary::default()
        };

        for (name, entry) in &checkpoint.modules {
            tracing::info!("{}", name);
            self.engine
                .execute(
                    &entry.module_dir,
                    &env,
                    command,
                    &args,
                    &mut LogSink::info(),
                    &mut LogSink::error(),
                )
                .in_module(name)?;
            summary.completed.push(name.clone());
        }

        summary.total_seconds = start.elapsed().as_secs_f64();
        Ok(summary)
    }

    /// Load modules and report structural problems without running anything.
    pub fn validate(&self, source: &Path) -> Result<Vec<Module>> {
        let modules = self.loader.load(source)?;
        let errors = parser::validate_modules(&modules);
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }
        Ok(modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependency::tests::StubGetter;
    use crate::core::parser::DocumentParser;
    use crate::engine::compatibility::Compatibility;
    use crate::transport::fake::FakeShell;
    use serde_json::json;
    use std::path::PathBuf;

    struct Fixture {
        dir: tempfile::TempDir,
        shell: Arc<FakeShell>,
        getter: Arc<StubGetter>,
        orchestrator: Orchestrator,
    }

    impl Fixture {
        fn new(version: Option<semver::Version>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let shell = Arc::new(FakeShell::new());
            let getter = Arc::new(StubGetter::default());
            let orchestrator = Orchestrator::new(
                Loader::new(DocumentParser::new(), dir.path().join(".strata")),
                Engine::new("terraform", shell.clone(), Compatibility::new(version)),
                getter.clone(),
                HookRunner::new(shell.clone()),
            );
            Self {
                dir,
                shell,
                getter,
                orchestrator,
            }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn temp(&self) -> PathBuf {
            self.dir.path().join(".strata")
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            path
        }

        fn module_dir(&self, name: &str) -> PathBuf {
            self.temp().join(name).join("module")
        }

        fn engine_lines(&self, command: &str) -> Vec<(PathBuf, String)> {
            self.shell
                .calls()
                .into_iter()
                .filter(|c| c.program == "terraform" && c.args.first().map(String::as_str) == Some(command))
                .map(|c| (c.working_dir.clone(), c.line()))
                .collect()
        }

        fn init(&self, extra: &[String]) -> Result<RunSummary> {
            self.orchestrator.init(&InitConfig {
                source: self.path(),
                max_depth: 1,
                purge: false,
                source_override: None,
                extra_args: extra,
            })
        }

        fn destroy(&self, auto_init: bool) -> Result<RunSummary> {
            self.orchestrator.destroy(&DestroyConfig {
                source: self.path(),
                max_depth: 1,
                auto_approve: true,
                auto_init,
                extra_args: &[],
            })
        }

        fn three_independent(&self) {
            for name in ["a", "b", "c"] {
                self.write(
                    &format!("{}.yaml", name),
                    &format!("module:\n  source: ./m\ninputs:\n  name: {}\n", name),
                );
            }
        }
    }

    #[test]
    fn test_init_writes_files_and_checkpoint() {
        let fx = Fixture::new(Some(semver::Version::new(1, 5, 0)));
        fx.write("rg.yaml", "module:\n  source: ./m\ninputs:\n  location: westeurope\nbackend:\n  type: azurerm\n  config:\n    key: rg.tfstate\n");
        fx.write(
            "vnet.yaml",
            "module:\n  source: ./m\ndependencies:\n  rg:\n    source: ./rg.yaml\ninputs:\n  rg: \"{{ dependency.rg.outputs.name }}\"\n",
        );
        fx.shell.respond("terraform", Some("output"), Some("deps/rg/module"), r#"{"name": {"value": "rg-prod"}}"#);

        let extra = vec!["-upgrade".to_string(), "-get-plugins=false".to_string()];
        let summary = fx.init(&extra).unwrap();
        assert_eq!(summary.completed, vec!["rg", "vnet"]);

        let vars: TypedValue = serde_json::from_str(
            &std::fs::read_to_string(fx.module_dir("vnet").join(VARIABLE_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(vars, json!({"rg": "rg-prod"}));
        let literal: TypedValue = serde_json::from_str(
            &std::fs::read_to_string(fx.module_dir("rg").join(VARIABLE_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(literal, json!({"location": "westeurope"}));
        assert!(fx.module_dir("rg").join(OVERRIDE_FILE).is_file());

        let inits = fx.engine_lines("init");
        let top_level: Vec<_> = inits
            .iter()
            .filter(|(dir, _)| !dir.to_string_lossy().contains("/deps/"))
            .collect();
        assert_eq!(top_level.len(), 2);
        assert_eq!(top_level[0].0, fx.module_dir("rg"));
        assert_eq!(top_level[0].1, "terraform init -upgrade");

        let cp = state::load_checkpoint(&fx.temp()).unwrap().unwrap();
        let names: Vec<_> = cp.modules.keys().collect();
        assert_eq!(names, vec!["rg", "vnet"]);
        assert!(cp.modules["vnet"].inputs_hash.is_some());

        let log = std::fs::read_to_string(eventlog::event_log_path(&fx.temp())).unwrap();
        assert!(log.contains("command_started"));
        assert!(log.contains("dependency_resolved"));
        assert!(log.contains("command_completed"));
    }

    #[test]
    fn test_init_runs_hooks_in_stage_order() {
        let fx = Fixture::new(None);
        fx.write(
            "app.yaml",
            r#"
module:
  source: ./m
hooks:
  before:
    trigger_on: "prepare:init"
    command: before
  after:
    trigger_on: "finish:init"
    command: after
  never:
    trigger_on: "prepare:destroy"
    command: never
"#,
        );
        fx.init(&[]).unwrap();
        let order: Vec<_> = fx.shell.calls().into_iter().map(|c| c.program).collect();
        assert_eq!(order, vec!["before", "terraform", "after"]);
    }

    #[test]
    fn test_init_empty_source_warns() {
        let fx = Fixture::new(None);
        let summary = fx.init(&[]).unwrap();
        assert!(summary.completed.is_empty());
        assert!(state::load_checkpoint(&fx.temp()).unwrap().is_none());
        assert!(fx.shell.calls().is_empty());
    }

    #[test]
    fn test_source_override_requires_file() {
        let fx = Fixture::new(None);
        fx.three_independent();
        let err = fx
            .orchestrator
            .init(&InitConfig {
                source: fx.path(),
                max_depth: 1,
                purge: false,
                source_override: Some(ModuleSource {
                    source: "git::https://example.com/m.git".to_string(),
                    version: None,
                }),
                extra_args: &[],
            })
            .unwrap_err();
        assert!(matches!(err, Error::SourceMustBeAFile(_)));
        assert!(fx.shell.calls().is_empty());
    }

    #[test]
    fn test_init_purge_clears_temp_dir() {
        let fx = Fixture::new(None);
        fx.write("a.yaml", "module:\n  source: ./m\n");
        std::fs::create_dir_all(fx.temp().join("leftover")).unwrap();
        fx.orchestrator
            .init(&InitConfig {
                source: fx.path(),
                max_depth: 1,
                purge: true,
                source_override: None,
                extra_args: &[],
            })
            .unwrap();
        assert!(!fx.temp().join("leftover").exists());
        assert!(fx.module_dir("a").is_dir());
    }

    #[test]
    fn test_init_failure_names_module_and_skips_checkpoint() {
        let fx = Fixture::new(None);
        fx.three_independent();
        fx.shell.fail("terraform", Some("init"), Some("/b/module"));
        let err = fx.init(&[]).unwrap_err();
        assert!(err.to_string().starts_with("b:"));
        assert!(state::load_checkpoint(&fx.temp()).unwrap().is_none());
        assert!(fx.engine_lines("init").iter().all(|(dir, _)| *dir != fx.module_dir("c")));
    }

    #[test]
    fn test_destroy_runs_in_reverse_order() {
        let fx = Fixture::new(None);
        fx.three_independent();
        fx.init(&[]).unwrap();

        let summary = fx.destroy(true).unwrap();
        assert_eq!(summary.completed, vec!["c", "b", "a"]);
        let destroys = fx.engine_lines("destroy");
        let dirs: Vec<_> = destroys.iter().map(|(d, _)| d.clone()).collect();
        assert_eq!(
            dirs,
            vec![fx.module_dir("c"), fx.module_dir("b"), fx.module_dir("a")]
        );
        assert_eq!(destroys[0].1, "terraform destroy -auto-approve");
        assert!(!fx.module_dir("a").join(VARIABLE_FILE).exists());
        assert!(state::load_checkpoint(&fx.temp()).unwrap().unwrap().modules.is_empty());
    }

    #[test]
    fn test_destroy_without_variables_file_is_noop() {
        let fx = Fixture::new(None);
        fx.write("a.yaml", "module:\n  source: ./m\n");
        std::fs::create_dir_all(fx.module_dir("a").join(INIT_MARKER)).unwrap();

        let summary = fx.destroy(true).unwrap();
        assert_eq!(summary.skipped, vec!["a"]);
        assert!(fx.engine_lines("destroy").is_empty());
        let log = std::fs::read_to_string(eventlog::event_log_path(&fx.temp())).unwrap();
        assert!(log.contains("module_skipped"));
    }

    #[test]
    fn test_destroy_without_auto_init_requires_markers() {
        let fx = Fixture::new(None);
        fx.three_independent();
        std::fs::create_dir_all(fx.module_dir("a").join(INIT_MARKER)).unwrap();
        std::fs::create_dir_all(fx.module_dir("c").join(INIT_MARKER)).unwrap();

        let err = fx.destroy(false).unwrap_err();
        assert!(matches!(err, Error::UninitializedModule(ref name) if name == "b"));
        assert!(fx.shell.calls().is_empty());
    }

    #[test]
    fn test_destroy_auto_inits_missing_marker() {
        let fx = Fixture::new(None);
        fx.write("a.yaml", "module:\n  source: ./m\ninputs:\n  name: a\n");
        fx.init(&[]).unwrap();
        std::fs::remove_dir_all(fx.module_dir("a").join(INIT_MARKER)).unwrap();

        fx.destroy(true).unwrap();
        let lines: Vec<_> = fx.shell.lines_for("terraform");
        assert_eq!(
            lines,
            vec![
                "terraform init",
                "terraform init -input=false",
                "terraform destroy -auto-approve",
            ]
        );
        assert_eq!(fx.getter.fetched.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_destroy_reresolves_stale_variables() {
        let fx = Fixture::new(None);
        fx.write("rg.yaml", "module:\n  source: ./m\n");
        fx.write(
            "app.yaml",
            "module:\n  source: ./m\ndependencies:\n  rg:\n    source: ./rg.yaml\ninputs:\n  rg: \"{{ dependency.rg.outputs.name }}\"\n",
        );
        fx.shell.respond("terraform", Some("output"), None, r#"{"name": {"value": "fresh"}}"#);
        fx.init(&[]).unwrap();

        std::fs::write(fx.module_dir("app").join(VARIABLE_FILE), "{\"rg\": \"tampered\"}\n").unwrap();
        let applies_before = fx.engine_lines("apply").len();

        fx.destroy(true).unwrap();
        assert_eq!(fx.engine_lines("apply").len(), applies_before + 1);
        assert_eq!(fx.engine_lines("destroy").len(), 2);
    }

    #[test]
    fn test_passthrough_requires_checkpoint() {
        let fx = Fixture::new(None);
        let err = fx.orchestrator.passthrough("plan", &[]).unwrap_err();
        assert!(matches!(err, Error::NoCheckpoint(_)));
    }

    #[test]
    fn test_passthrough_uses_checkpoint_and_filters_args() {
        let fx = Fixture::new(Some(semver::Version::new(1, 2, 0)));
        fx.three_independent();
        fx.init(&[]).unwrap();
        // documents changed after init are not consulted
        std::fs::remove_file(fx.path().join("b.yaml")).unwrap();
        let calls_before = fx.shell.calls().len();

        let extra = vec!["-allow-missing-config".to_string(), "-refresh=false".to_string()];
        let summary = fx.orchestrator.passthrough("plan", &extra).unwrap();
        assert_eq!(summary.completed, vec!["a", "b", "c"]);

        let calls = fx.shell.calls();
        let plans = &calls[calls_before..];
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[1].working_dir, fx.module_dir("b"));
        assert_eq!(plans[1].line(), "terraform plan -refresh=false");
    }

    #[test]
    fn test_validate_reports_problems() {
        let fx = Fixture::new(None);
        fx.write(
            "bad.yaml",
            "dependencies:\n  ghost:\n    source: ./ghost.yaml\nhooks:\n  h:\n    trigger_on: later\n",
        );
        let err = fx.orchestrator.validate(fx.path()).unwrap_err();
        let Error::Validation(problems) = err else {
            panic!("expected validation error");
        };
        assert!(problems.len() >= 3);
        assert!(problems.iter().any(|p| p.contains("no module source")));
        assert!(problems.iter().any(|p| p.contains("ghost")));
    }

    #[test]
    fn test_validate_detects_cycle() {
        let fx = Fixture::new(None);
        fx.write("a.yaml", "module:\n  source: ./m\ndependencies:\n  b:\n    source: ./b.yaml\n");
        fx.write("b.yaml", "module:\n  source: ./m\ndependencies:\n  a:\n    source: ./a.yaml\n");
        assert!(matches!(
            fx.orchestrator.validate(fx.path()).unwrap_err(),
            Error::Validation(_)
        ));
    }
}

//! Bounded-depth dependency resolution.
//!
//! Resolving a dependency provisions it in its own workspace under the
//! dependent module's `deps/` directory (`init` then `apply`) and harvests
//! `output -json`. Outputs are memoized per dependency document for the rest
//! of the run, so a dependency shared by several modules is applied once.

use super::error::{Error, ModuleContext, Result};
use super::loader::Loader;
use super::merge;
use super::resolver::{self, DependencyOutputs};
use super::state;
use super::types::{Dependency, HookEvent, Module, OutputValues, RunEvent, TypedValue};
use crate::engine::Engine;
use crate::getter::{self, SourceGetter};
use crate::hooks::HookRunner;
use crate::provenance::eventlog;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Outcome of resolving a module's dependencies.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Inputs evaluated against dependency outputs.
    Resolved(IndexMap<String, TypedValue>),
    /// The module declares no dependencies; nothing was provisioned.
    Skipped,
}

/// Default `--max-dependency-depth`.
pub const DEFAULT_MAX_DEPTH: usize = 1;

/// Resolves dependencies for one command run.
pub struct DependencyResolver<'a> {
    loader: &'a Loader,
    engine: &'a Engine,
    getter: &'a dyn SourceGetter,
    hooks: &'a HookRunner,
    max_depth: usize,
    resolved: Mutex<HashMap<PathBuf, OutputValues>>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        loader: &'a Loader,
        engine: &'a Engine,
        getter: &'a dyn SourceGetter,
        hooks: &'a HookRunner,
        max_depth: usize,
    ) -> Self {
        Self {
            loader,
            engine,
            getter,
            hooks,
            max_depth,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Provision `module`'s dependencies under `dest` and evaluate its inputs.
    pub fn resolve_dependencies(&self, module: &Module, dest: &Path) -> Result<Resolution> {
        if module.dependencies.is_empty() {
            tracing::debug!(module = %module.name, "no dependencies to resolve");
            return Ok(Resolution::Skipped);
        }

        let mut outputs = DependencyOutputs::new();
        for dep in module.dependencies.values() {
            let values = self.dependency_outputs(module, dep, dest)?;
            outputs.insert(dep.name.clone(), values);
        }

        Ok(Resolution::Resolved(resolver::resolve_inputs(module, &outputs)?))
    }

    fn memoized(&self, key: &Path) -> Option<OutputValues> {
        self.resolved
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn dependency_outputs(&self, module: &Module, dep: &Dependency, dest: &Path) -> Result<OutputValues> {
        let depth = module.depth + 1;
        if depth > self.max_depth {
            return Err(Error::DependencyDepthExceeded {
                module: module.name.clone(),
                dependency: dep.name.clone(),
                depth,
                max: self.max_depth,
            });
        }

        let key = merge::normalize(&dep.document);
        if let Some(values) = self.memoized(&key) {
            tracing::debug!(module = %module.name, dependency = %dep.name, "dependency already resolved");
            return Ok(values);
        }

        let mut upstream = self.loader.load_dependency(&dep.document, depth)?;
        upstream.relocate(&dest.join(&dep.name));
        let values = self.provision(&mut upstream).in_module(&dep.name)?;

        eventlog::record(
            self.loader.temp_dir(),
            RunEvent::DependencyResolved {
                module: module.name.clone(),
                dependency: dep.name.clone(),
                outputs: values.len(),
            },
        );
        self.resolved
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key, values.clone());
        Ok(values)
    }

    /// Fetch, configure and apply one dependency, returning its outputs.
    fn provision(&self, upstream: &mut Module) -> Result<OutputValues> {
        getter::fetch_module(self.getter, upstream, None)?;
        state::write_backend_override(upstream)?;

        let deps_dir = upstream.deps_dir.clone();
        let inputs = match self.resolve_dependencies(upstream, &deps_dir)? {
            Resolution::Resolved(values) => values,
            Resolution::Skipped => resolver::resolve_inputs(upstream, &DependencyOutputs::new())?,
        };
        state::write_variables(upstream, &inputs)?;

        self.hooks.run(upstream, HookEvent::Prepare, "init")?;

        tracing::info!("- {}", upstream.name);
        tracing::debug!("running {} init on {}", self.engine.binary(), upstream.name);
        self.engine.run_quiet(upstream, "init", &["-input=false"])?;
        tracing::debug!("running {} apply on {}", self.engine.binary(), upstream.name);
        self.engine
            .run_quiet(upstream, "apply", &["-input=false", "-auto-approve"])?;
        tracing::debug!("reading output from {}", upstream.name);
        self.engine.outputs(upstream)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::parser::DocumentParser;
    use crate::engine::compatibility::Compatibility;
    use crate::transport::fake::FakeShell;
    use serde_json::json;
    use std::sync::Arc;

    /// Getter that only creates the destination directory.
    #[derive(Default)]
    pub(crate) struct StubGetter {
        pub fetched: Mutex<Vec<PathBuf>>,
    }

    impl SourceGetter for StubGetter {
        fn get(&self, _source: &str, dest: &Path, _version: Option<&str>) -> Result<()> {
            std::fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;
            self.fetched.lock().unwrap().push(dest.to_path_buf());
            Ok(())
        }
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// x depends on y, y depends on z.
    fn chain(dir: &Path) -> PathBuf {
        write(
            dir,
            "z.yaml",
            "module:\n  source: ./m\ninputs:\n  location: westeurope\n",
        );
        write(
            dir,
            "y.yaml",
            r#"
module:
  source: ./m
dependencies:
  z:
    source: ./z.yaml
inputs:
  rg: "{{ dependency.z.outputs.name }}"
"#,
        );
        write(
            dir,
            "x.yaml",
            r#"
module:
  source: ./m
dependencies:
  y:
    source: ./y.yaml
inputs:
  subnet: "{{ dependency.y.outputs.subnet }}"
  tags: {owner: "{{ dependency.y.outputs.owner }}"}
"#,
        )
    }

    fn engine(shell: &Arc<FakeShell>) -> Engine {
        Engine::new("terraform", shell.clone(), Compatibility::default())
    }

    fn load_x(loader: &Loader, dir: &Path) -> Module {
        loader
            .load(&dir.join("x.yaml"))
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn test_depth_one_rejects_grandchild() {
        let dir = tempfile::tempdir().unwrap();
        chain(dir.path());
        let shell = Arc::new(FakeShell::new());
        let loader = Loader::new(DocumentParser::new(), dir.path().join(".strata"));
        let engine = engine(&shell);
        let getter = StubGetter::default();
        let hooks = HookRunner::new(shell.clone());
        let resolver = DependencyResolver::new(&loader, &engine, &getter, &hooks, 1);

        let x = load_x(&loader, dir.path());
        let err = resolver.resolve_dependencies(&x, &x.deps_dir).unwrap_err();
        assert!(matches!(
            err.root(),
            Error::DependencyDepthExceeded { module, dependency, depth: 2, max: 1 }
                if module == "y" && dependency == "z"
        ));
        assert!(shell.lines_for("terraform").is_empty());
    }

    #[test]
    fn test_depth_two_resolves_chain() {
        let dir = tempfile::tempdir().unwrap();
        chain(dir.path());
        let shell = Arc::new(FakeShell::new());
        shell.respond(
            "terraform",
            Some("output"),
            Some("/z/module"),
            r#"{"name": {"type": "string", "value": "rg-prod"}}"#,
        );
        shell.respond(
            "terraform",
            Some("output"),
            Some("/y/module"),
            r#"{"subnet": {"value": "10.0.1.0/24"}, "owner": {"value": "net-team"}}"#,
        );
        let loader = Loader::new(DocumentParser::new(), dir.path().join(".strata"));
        let engine = engine(&shell);
        let getter = StubGetter::default();
        let hooks = HookRunner::new(shell.clone());
        let resolver = DependencyResolver::new(&loader, &engine, &getter, &hooks, 2);

        let x = load_x(&loader, dir.path());
        let resolution = resolver.resolve_dependencies(&x, &x.deps_dir).unwrap();
        let Resolution::Resolved(values) = resolution else {
            panic!("expected resolved inputs");
        };
        assert_eq!(values["subnet"], json!("10.0.1.0/24"));
        assert_eq!(values["tags"], json!({"owner": "net-team"}));

        // z provisioned first, inside y's deps dir
        let lines = shell.lines_for("terraform");
        assert_eq!(
            lines,
            vec![
                "terraform init -input=false",
                "terraform apply -input=false -auto-approve",
                "terraform output -json",
                "terraform init -input=false",
                "terraform apply -input=false -auto-approve",
                "terraform output -json",
            ]
        );
        let calls = shell.calls();
        let z_dir = x.deps_dir.join("y").join("deps").join("z").join("module");
        assert_eq!(calls[0].working_dir, z_dir);
        assert_eq!(calls[3].working_dir, x.deps_dir.join("y").join("module"));

        let y_vars: TypedValue = serde_json::from_str(
            &std::fs::read_to_string(x.deps_dir.join("y/module").join(crate::core::types::VARIABLE_FILE))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(y_vars, json!({"rg": "rg-prod"}));
        let z_vars: TypedValue = serde_json::from_str(
            &std::fs::read_to_string(z_dir.join(crate::core::types::VARIABLE_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(z_vars, json!({"location": "westeurope"}));
    }

    #[test]
    fn test_module_without_dependencies_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        chain(dir.path());
        let shell = Arc::new(FakeShell::new());
        let loader = Loader::new(DocumentParser::new(), dir.path().join(".strata"));
        let engine = engine(&shell);
        let getter = StubGetter::default();
        let hooks = HookRunner::new(shell.clone());
        let resolver = DependencyResolver::new(&loader, &engine, &getter, &hooks, 1);

        let z = loader.load(&dir.path().join("z.yaml")).unwrap().remove(0);
        assert_eq!(
            resolver.resolve_dependencies(&z, &z.deps_dir).unwrap(),
            Resolution::Skipped
        );
        assert!(shell.calls().is_empty());
    }

    #[test]
    fn test_shared_dependency_applied_once() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "rg.yaml", "module:\n  source: ./m\n");
        for name in ["a", "b"] {
            write(
                dir.path(),
                &format!("{}.yaml", name),
                "module:\n  source: ./m\ndependencies:\n  rg:\n    source: ./rg.yaml\ninputs:\n  rg: \"{{ dependency.rg.outputs.name }}\"\n",
            );
        }
        let shell = Arc::new(FakeShell::new());
        shell.respond("terraform", Some("output"), None, r#"{"name": {"value": "shared"}}"#);
        let loader = Loader::new(DocumentParser::new(), dir.path().join(".strata"));
        let engine = engine(&shell);
        let getter = StubGetter::default();
        let hooks = HookRunner::new(shell.clone());
        let resolver = DependencyResolver::new(&loader, &engine, &getter, &hooks, 1);

        let modules = loader.load(dir.path()).unwrap();
        for module in modules.iter().filter(|m| m.name != "rg") {
            let resolution = resolver
                .resolve_dependencies(module, &module.deps_dir)
                .unwrap();
            assert_eq!(
                resolution,
                Resolution::Resolved(IndexMap::from([("rg".to_string(), json!("shared"))]))
            );
        }
        let applies = shell
            .lines_for("terraform")
            .into_iter()
            .filter(|l| l.starts_with("terraform apply"))
            .count();
        assert_eq!(applies, 1);
        assert_eq!(getter.fetched.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_dependency_prepare_hooks_run_under_init() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "rg.yaml",
            r#"
module:
  source: ./m
hooks:
  login:
    trigger_on: "prepare:init"
    command: login
  cleanup:
    trigger_on: "finish"
    command: cleanup
"#,
        );
        write(
            dir.path(),
            "app.yaml",
            "module:\n  source: ./m\ndependencies:\n  rg:\n    source: ./rg.yaml\n",
        );
        let shell = Arc::new(FakeShell::new());
        shell.respond("terraform", Some("output"), None, "{}");
        let loader = Loader::new(DocumentParser::new(), dir.path().join(".strata"));
        let engine = engine(&shell);
        let getter = StubGetter::default();
        let hooks = HookRunner::new(shell.clone());
        let resolver = DependencyResolver::new(&loader, &engine, &getter, &hooks, 1);

        let app = loader.load(&dir.path().join("app.yaml")).unwrap().remove(0);
        resolver.resolve_dependencies(&app, &app.deps_dir).unwrap();
        assert_eq!(shell.lines_for("login"), vec!["login"]);
        assert!(shell.lines_for("cleanup").is_empty());
    }

    #[test]
    fn test_apply_failure_propagates_with_dependency_name() {
        let dir = tempfile::tempdir().unwrap();
        chain(dir.path());
        let shell = Arc::new(FakeShell::new());
        shell.fail("terraform", Some("apply"), None);
        let loader = Loader::new(DocumentParser::new(), dir.path().join(".strata"));
        let engine = engine(&shell);
        let getter = StubGetter::default();
        let hooks = HookRunner::new(shell.clone());
        let resolver = DependencyResolver::new(&loader, &engine, &getter, &hooks, 1);

        let y = loader.load(&dir.path().join("y.yaml")).unwrap().remove(0);
        let err = resolver.resolve_dependencies(&y, &y.deps_dir).unwrap_err();
        assert!(err.to_string().starts_with("z:"));
        assert!(matches!(err.root(), Error::CommandFailed { .. }));
        assert!(shell.lines_for("terraform").iter().all(|l| !l.contains("output")));
    }
}

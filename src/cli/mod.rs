//! CLI: global settings, subcommands, dispatch.

use crate::core::dependency::DEFAULT_MAX_DEPTH;
use crate::core::error::{Error, Result};
use crate::core::executor::{DestroyConfig, InitConfig, Orchestrator, RunSummary};
use crate::core::loader::Loader;
use crate::core::parser::DocumentParser;
use crate::core::types::ModuleSource;
use crate::engine::compatibility::Compatibility;
use crate::engine::Engine;
use crate::getter::DefaultGetter;
use crate::hooks::HookRunner;
use crate::transport::local::ProcessShell;
use crate::transport::Shell;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "strata",
    version,
    about = "Orchestrate Terraform modules: multi-file config, dependency outputs, hooks"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Module document or directory of documents
    #[arg(short, long, global = true, default_value = ".")]
    pub file: PathBuf,

    /// Temporary working directory
    #[arg(long, global = true, env = "STRATA_TEMP_DIR", default_value = ".strata")]
    pub temp_dir: PathBuf,

    /// Provisioning engine binary
    #[arg(long, global = true, env = "STRATA_ENGINE", default_value = "terraform")]
    pub engine: String,

    /// Timeout in seconds for fetching module sources
    #[arg(long, global = true, env = "STRATA_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,

    /// Never initialize modules implicitly during destroy
    #[arg(long, global = true, env = "STRATA_NO_AUTO_INIT")]
    pub no_auto_init: bool,

    /// More output (repeat for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch sources, resolve dependencies and initialize every module
    Init {
        /// Maximum depth when traversing dependencies
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_dependency_depth: usize,

        /// Remove the temporary directory before init
        #[arg(long)]
        purge: bool,

        /// Override module source location (requires --file to be a file)
        #[arg(long)]
        source: Option<String>,

        /// Override module source version (only with --source)
        #[arg(long, requires = "source")]
        source_version: Option<String>,

        /// Extra arguments for the engine's init (after `--`)
        #[arg(last = true)]
        extra: Vec<String>,
    },

    /// Destroy every module, dependents first
    Destroy {
        /// Skip interactive approval
        #[arg(long)]
        auto_approve: bool,

        /// Maximum depth when dependencies must be resolved again
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_dependency_depth: usize,

        /// Extra arguments for the engine's destroy (after `--`)
        #[arg(last = true)]
        extra: Vec<String>,
    },

    /// Run `plan` in every initialized module
    Plan(PassthroughArgs),

    /// Run `apply` in every initialized module
    Apply(PassthroughArgs),

    /// Run `output` in every initialized module
    Output(PassthroughArgs),

    /// Run `show` in every initialized module
    Show(PassthroughArgs),

    /// Run `refresh` in every initialized module
    Refresh(PassthroughArgs),

    /// Check module documents without running anything
    Validate,
}

/// Arguments forwarded to the engine.
#[derive(Args, Debug, Clone, Default)]
pub struct PassthroughArgs {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Resolved run-time settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub file: PathBuf,
    pub temp_dir: PathBuf,
    pub engine: String,
    pub timeout: u64,
    pub auto_init: bool,
}

impl Settings {
    /// Settings from parsed arguments; the temp dir is made absolute so
    /// subprocesses can run in any directory.
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        let temp_dir = if args.temp_dir.is_absolute() {
            args.temp_dir.clone()
        } else {
            let cwd = std::env::current_dir().map_err(|e| Error::io(Path::new("."), e))?;
            cwd.join(&args.temp_dir)
        };
        Ok(Self {
            file: args.file.clone(),
            temp_dir,
            engine: args.engine.clone(),
            timeout: args.timeout,
            auto_init: !args.no_auto_init,
        })
    }
}

/// Default log filter for the verbosity flags (overridden by `RUST_LOG`).
pub fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Wire up the real process shell, engine, getter and hooks.
fn orchestrator(settings: &Settings, detect_engine: bool) -> Orchestrator {
    let shell: Arc<dyn Shell> = Arc::new(ProcessShell);
    let engine = if detect_engine {
        Engine::detect(settings.engine.clone(), Arc::clone(&shell))
    } else {
        Engine::new(settings.engine.clone(), Arc::clone(&shell), Compatibility::default())
    };
    Orchestrator::new(
        Loader::new(DocumentParser::new(), settings.temp_dir.clone()),
        engine,
        Arc::new(DefaultGetter::new(Arc::clone(&shell), settings.timeout)),
        HookRunner::new(shell),
    )
}

/// Dispatch a CLI command.
pub fn dispatch(cli: Cli) -> Result<()> {
    let settings = Settings::from_args(&cli.global)?;
    match cli.command {
        Commands::Validate => cmd_validate(&orchestrator(&settings, false), &settings),
        command => {
            let orch = orchestrator(&settings, true);
            run(&orch, &settings, command)
        }
    }
}

/// Run one command against an orchestrator.
pub fn run(orch: &Orchestrator, settings: &Settings, command: Commands) -> Result<()> {
    let summary = match command {
        Commands::Init {
            max_dependency_depth,
            purge,
            source,
            source_version,
            extra,
        } => orch.init(&InitConfig {
            source: &settings.file,
            max_depth: max_dependency_depth,
            purge,
            source_override: source.map(|source| ModuleSource {
                source,
                version: source_version,
            }),
            extra_args: &extra,
        })?,
        Commands::Destroy {
            auto_approve,
            max_dependency_depth,
            extra,
        } => orch.destroy(&DestroyConfig {
            source: &settings.file,
            max_depth: max_dependency_depth,
            auto_approve,
            auto_init: settings.auto_init,
            extra_args: &extra,
        })?,
        Commands::Plan(p) => orch.passthrough("plan", &p.args)?,
        Commands::Apply(p) => orch.passthrough("apply", &p.args)?,
        Commands::Output(p) => orch.passthrough("output", &p.args)?,
        Commands::Show(p) => orch.passthrough("show", &p.args)?,
        Commands::Refresh(p) => orch.passthrough("refresh", &p.args)?,
        Commands::Validate => return cmd_validate(orch, settings),
    };
    print_summary(&summary);
    Ok(())
}

fn cmd_validate(orch: &Orchestrator, settings: &Settings) -> Result<()> {
    match orch.validate(&settings.file) {
        Ok(modules) => {
            println!(
                "OK: {} ({} modules)",
                settings.file.display(),
                modules.len()
            );
            Ok(())
        }
        Err(Error::Validation(errors)) => {
            for e in &errors {
                eprintln!("  ERROR: {}", e);
            }
            Err(Error::Validation(errors))
        }
        Err(e) => Err(e),
    }
}

fn print_summary(summary: &RunSummary) {
    if summary.completed.is_empty() && summary.skipped.is_empty() {
        return;
    }
    println!();
    if summary.skipped.is_empty() {
        println!(
            "{} complete: {} module(s) ({:.1}s)",
            summary.command,
            summary.completed.len(),
            summary.total_seconds
        );
    } else {
        println!(
            "{} complete: {} module(s), {} skipped: {} ({:.1}s)",
            summary.command,
            summary.completed.len(),
            summary.skipped.len(),
            summary.skipped.join(", "),
            summary.total_seconds
        );
    }
}

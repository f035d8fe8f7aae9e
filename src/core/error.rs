//! Error taxonomy for loading, resolution and orchestration.
//!
//! Every failure is terminal for the current command: errors bubble up to the
//! CLI unchanged, wrapped at most once in [`Error::Module`] so the failing
//! module's name is part of the message.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced by strata.
#[derive(Debug, Error)]
pub enum Error {
    /// Two files for the same module declare different backend types.
    #[error(
        "module '{module}': backend \"{found}\" in {file} conflicts with backend \"{expected}\" declared earlier"
    )]
    DifferentBackendTypes {
        module: String,
        expected: String,
        found: String,
        file: PathBuf,
    },

    /// No registered executor creator accepts the hook declaration.
    #[error("no available executor is found for hook '{hook}'")]
    NoExecutorFound { hook: String },

    /// Dependency traversal went deeper than `--max-dependency-depth`.
    #[error(
        "dependency '{dependency}' of '{module}' is at depth {depth}, exceeding max-dependency-depth {max}"
    )]
    DependencyDepthExceeded {
        module: String,
        dependency: String,
        depth: usize,
        max: usize,
    },

    /// `--source` override used together with a directory target.
    #[error("file cannot be a directory when source is overridden: {}", .0.display())]
    SourceMustBeAFile(PathBuf),

    /// Destroy pre-flight found a module without an initialized working directory.
    #[error("module '{0}' has not been initialized, run `strata init` first")]
    UninitializedModule(String),

    /// A subprocess exited unsuccessfully.
    #[error("`{program} {}` failed with exit code {code}", args.join(" "))]
    CommandFailed {
        program: String,
        args: Vec<String>,
        code: i32,
    },

    /// A subprocess could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem failure on a specific path.
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document or state file could not be decoded.
    #[error("parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    /// Engine `output -json` did not match the expected shape.
    #[error("invalid engine output: {0}")]
    OutputParse(String),

    /// An input expression references a dependency or output that does not exist.
    #[error("module '{module}': unknown reference '{reference}'")]
    UnknownReference { module: String, reference: String },

    /// Module source could not be fetched.
    #[error("cannot fetch {source_url}: {message}")]
    Fetch { source_url: String, message: String },

    /// Passthrough command run before any successful init.
    #[error("no checkpoint found at {}, run `strata init` first", .0.display())]
    NoCheckpoint(PathBuf),

    /// Structural problems reported by `validate`.
    #[error("{} validation error(s)", .0.len())]
    Validation(Vec<String>),

    /// Any error raised while processing a named module.
    #[error("{module}: {source}")]
    Module {
        module: String,
        #[source]
        source: Box<Error>,
    },
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Attach module context unless the error already carries it.
    pub fn in_module(self, module: &str) -> Self {
        match self {
            Self::Module { .. } => self,
            other => Self::Module {
                module: module.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping module context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Self::Module { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension for attaching module context to results.
pub trait ModuleContext<T> {
    fn in_module(self, module: &str) -> Result<T>;
}

impl<T> ModuleContext<T> for Result<T> {
    fn in_module(self, module: &str) -> Result<T> {
        self.map_err(|e| e.in_module(module))
    }
}

//! Module source fetching.
//!
//! Sources are either local directories or `git::<url>` references. Git
//! fetches run through the [`Shell`] with an HTTP low-speed timeout; local
//! sources are copied into the destination.

use crate::core::error::{Error, Result};
use crate::core::types::{Module, ModuleSource};
use crate::transport::{ExecOptions, LogSink, Shell};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fetches a module source into a destination directory.
pub trait SourceGetter: Send + Sync {
    fn get(&self, source: &str, dest: &Path, version: Option<&str>) -> Result<()>;
}

const GIT_PREFIX: &str = "git::";

/// Whether `source` points at a remote location rather than a local path.
pub fn is_remote(source: &str) -> bool {
    source.starts_with(GIT_PREFIX) || source.contains("://")
}

/// Resolve a local source against the directory of the declaring document.
pub fn resolve_source(source: &str, base: &Path) -> String {
    if is_remote(source) || Path::new(source).is_absolute() {
        return source.to_string();
    }
    base.join(source).to_string_lossy().to_string()
}

/// Fetch a module's code into its working directory.
///
/// `source_override` replaces the module's own `module:` block; relative
/// override paths are taken as given (relative to the current directory).
pub fn fetch_module(
    getter: &dyn SourceGetter,
    module: &Module,
    source_override: Option<&ModuleSource>,
) -> Result<()> {
    let (source, version) = match (source_override, module.source.as_ref()) {
        (Some(over), _) => (over.source.clone(), over.version.as_deref()),
        (None, Some(own)) => (
            resolve_source(&own.source, &module.source_base),
            own.version.as_deref(),
        ),
        (None, None) => {
            return Err(Error::Parse {
                file: module.files.first().cloned().unwrap_or_default(),
                message: format!("no module source defined for '{}'", module.name),
            })
        }
    };
    getter.get(&source, &module.module_dir, version)
}

/// Local copy plus git clone.
pub struct DefaultGetter {
    shell: Arc<dyn Shell>,
    timeout: u64,
}

impl DefaultGetter {
    /// `timeout` is the git HTTP low-speed time in seconds.
    pub fn new(shell: Arc<dyn Shell>, timeout: u64) -> Self {
        Self { shell, timeout }
    }

    fn clone_git(&self, url: &str, dest: &Path, version: Option<&str>) -> Result<()> {
        let (url, query_ref) = split_ref(url);
        let reference = version.filter(|v| !v.is_empty()).or(query_ref);
        let fetch_error = |message: String| Error::Fetch {
            source_url: url.to_string(),
            message,
        };

        // git refuses to clone into a non-empty directory, so check out into
        // a staging directory next to the destination and copy from there.
        let parent = dest.parent().unwrap_or(dest);
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        let staging = parent.join(".fetch");
        remove_dir_if_exists(&staging)?;

        let mut args = vec![
            "-c".to_string(),
            "http.lowSpeedLimit=1".to_string(),
            "-c".to_string(),
            format!("http.lowSpeedTime={}", self.timeout),
            "clone".to_string(),
            "--depth".to_string(),
            "1".to_string(),
        ];
        if let Some(r) = reference {
            args.push("--branch".to_string());
            args.push(r.to_string());
        }
        args.push(url.to_string());
        args.push(staging.to_string_lossy().to_string());

        self.shell
            .execute(
                &ExecOptions::new(parent, &IndexMap::new()),
                "git",
                &args,
                &mut LogSink::debug(),
                &mut LogSink::debug(),
            )
            .map_err(|e| fetch_error(e.to_string()))?;

        if !staging.is_dir() {
            return Err(fetch_error("clone produced no checkout".to_string()));
        }
        copy_dir(&staging, dest)?;
        remove_dir_if_exists(&staging)
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

impl SourceGetter for DefaultGetter {
    fn get(&self, source: &str, dest: &Path, version: Option<&str>) -> Result<()> {
        tracing::info!("- {}", source);
        clear_destination(dest)?;

        if let Some(url) = source.strip_prefix(GIT_PREFIX) {
            return self.clone_git(url, dest, version);
        }
        if is_remote(source) {
            return Err(Error::Fetch {
                source_url: source.to_string(),
                message: "unsupported source scheme, use git::<url>".to_string(),
            });
        }

        let from = PathBuf::from(source);
        if !from.is_dir() {
            return Err(Error::Fetch {
                source_url: source.to_string(),
                message: "source directory does not exist".to_string(),
            });
        }
        if version.is_some_and(|v| !v.is_empty()) {
            tracing::warn!(source = %source, "version is ignored for local sources");
        }
        copy_dir(&from, dest)
    }
}

/// Split `url?ref=v1` into the url and the ref.
fn split_ref(url: &str) -> (&str, Option<&str>) {
    match url.split_once("?ref=") {
        Some((base, reference)) if !reference.is_empty() => (base, Some(reference)),
        Some((base, _)) => (base, None),
        None => (url, None),
    }
}

/// Remove previously fetched code, keeping engine state (`.terraform`) and
/// strata-generated files so an initialized module stays initialized.
fn clear_destination(dest: &Path) -> Result<()> {
    if !dest.exists() {
        return Ok(());
    }
    let entries = std::fs::read_dir(dest).map_err(|e| Error::io(dest, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dest, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name == crate::core::types::INIT_MARKER
            || name == crate::core::types::VARIABLE_FILE
            || name == crate::core::types::OVERRIDE_FILE
            || name.ends_with(".tfstate")
        {
            continue;
        }
        let path = entry.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        result.map_err(|e| Error::io(&path, e))?;
    }
    Ok(())
}

/// Recursive copy that skips VCS metadata and engine state directories.
fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).map_err(|e| Error::io(to, e))?;
    let mut children: Vec<std::fs::DirEntry> = std::fs::read_dir(from)
        .map_err(|e| Error::io(from, e))?
        .filter_map(|e| e.ok())
        .collect();
    children.sort_by_key(|e| e.file_name());

    for entry in children {
        let name = entry.file_name();
        if name == ".git" || name == crate::core::types::INIT_MARKER {
            continue;
        }
        let ft = entry.file_type().map_err(|e| Error::io(&entry.path(), e))?;
        let target = to.join(&name);
        if ft.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else if ft.is_file() {
            std::fs::copy(entry.path(), &target).map_err(|e| Error::io(&target, e))?;
        }
    }
    Ok(())
}

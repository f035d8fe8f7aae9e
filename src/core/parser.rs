//! YAML document parsing, discovery and validation.
//!
//! The parser is an explicit instance owned by the loader, so tests can build
//! isolated parsers without shared global state.

use super::error::{Error, Result};
use super::types::*;
use std::path::{Path, PathBuf};

/// Parses module documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentParser;

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse document content. `filename` is only used for error reporting.
    pub fn parse(&self, content: &[u8], filename: &Path) -> Result<ModuleDocument> {
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(ModuleDocument::default());
        }
        let text = std::str::from_utf8(content).map_err(|e| Error::Parse {
            file: filename.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_yaml_ng::from_str(text).map_err(|e| Error::Parse {
            file: filename.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read and parse a document from disk.
    pub fn parse_file(&self, path: &Path) -> Result<ModuleDocument> {
        let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        self.parse(&content, path)
    }
}

/// Module name for a document: explicit `name`, else the file stem.
pub fn document_name(doc: &ModuleDocument, path: &Path) -> String {
    if let Some(name) = doc.name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// List documents for a source: the file itself, or every `*.yaml`/`*.yml`
/// directly in the directory, sorted by file name.
pub fn discover_files(source: &Path) -> Result<Vec<PathBuf>> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }
    if !source.is_dir() {
        return Err(Error::io(
            source,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        ));
    }

    let mut files = Vec::new();
    for ext in ["yaml", "yml"] {
        let pattern = source.join(format!("*.{}", ext));
        let pattern = pattern.to_string_lossy();
        let paths = glob::glob(&pattern).map_err(|e| Error::Parse {
            file: source.to_path_buf(),
            message: e.to_string(),
        })?;
        for path in paths.flatten() {
            if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Validate a trigger specification (`event[:cmd,...]`).
pub fn validate_trigger(trigger: &str) -> std::result::Result<(), String> {
    let mut parts = trigger.splitn(2, ':');
    let event = parts.next().unwrap_or_default().trim().to_lowercase();
    if event != "prepare" && event != "finish" {
        return Err(format!(
            "unknown hook event '{}' (expected prepare or finish)",
            event
        ));
    }
    if let Some(commands) = parts.next() {
        if commands.split(',').any(|c| c.trim().is_empty()) {
            return Err(format!("empty command in trigger '{}'", trigger));
        }
    }
    Ok(())
}

/// Validate loaded modules. Returns a list of problems (empty = valid).
pub fn validate_modules(modules: &[Module]) -> Vec<String> {
    let mut errors = Vec::new();

    for module in modules {
        if module.source.is_none() {
            errors.push(format!("module '{}' has no module source", module.name));
        }

        for (name, dep) in &module.dependencies {
            if !dep.document.is_file() {
                errors.push(format!(
                    "module '{}' dependency '{}' points to missing document {}",
                    module.name,
                    name,
                    dep.document.display()
                ));
            }
        }

        for decl in &module.hooks {
            if decl.hook.command.is_none() && decl.hook.script.is_none() {
                errors.push(format!(
                    "module '{}' hook '{}' has neither command nor script",
                    module.name, decl.name
                ));
            }
            if decl.hook.command.is_some() && decl.hook.script.is_some() {
                errors.push(format!(
                    "module '{}' hook '{}' has both command and script",
                    module.name, decl.name
                ));
            }
            if let Err(e) = validate_trigger(&decl.hook.trigger_on) {
                errors.push(format!("module '{}' hook '{}': {}", module.name, decl.name, e));
            }
        }
    }

    errors
}

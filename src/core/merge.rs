//! Multi-file configuration merge.
//!
//! Documents sharing a module name are folded into one [`Module`] in
//! discovery order. Backends merge per attribute; the backend type must be the
//! same in every file that declares one.

use super::error::{Error, Result};
use super::types::*;
use std::path::{Path, PathBuf};

/// A parsed document together with the file it came from.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub path: PathBuf,
    pub document: ModuleDocument,
}

impl ParsedDocument {
    pub fn new(path: impl Into<PathBuf>, document: ModuleDocument) -> Self {
        Self {
            path: path.into(),
            document,
        }
    }

    /// Directory relative paths in the document are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

/// Merge backend declarations from `sources` into `target`.
///
/// Stops at the first type conflict without touching `target` further.
pub fn merge_backends(target: &mut Module, sources: &[ParsedDocument]) -> Result<()> {
    for source in sources {
        let Some(declared) = source.document.backend.as_ref() else {
            continue;
        };

        match target.backend.as_mut() {
            None => target.backend = Some(declared.clone()),
            Some(current) if current.backend_type != declared.backend_type => {
                return Err(Error::DifferentBackendTypes {
                    module: target.name.clone(),
                    expected: current.backend_type.clone(),
                    found: declared.backend_type.clone(),
                    file: source.path.clone(),
                });
            }
            Some(current) => {
                for (key, value) in &declared.config {
                    current.config.insert(key.clone(), value.clone());
                }
            }
        }
    }
    Ok(())
}

/// Build a module named `name` from all of its documents.
pub fn merge_documents(name: &str, docs: &[ParsedDocument], temp_dir: &Path) -> Result<Module> {
    let mut module = Module::new(name, temp_dir);

    for doc in docs {
        let base = doc.base_dir();
        module.files.push(doc.path.clone());

        if let Some(ref source) = doc.document.module {
            match module.source {
                None => {
                    module.source = Some(source.clone());
                    module.source_base.clone_from(&base);
                }
                Some(ref existing) if existing != source => {
                    return Err(Error::Parse {
                        file: doc.path.clone(),
                        message: format!(
                            "module '{}' source declared more than once ({} and {})",
                            name, existing.source, source.source
                        ),
                    });
                }
                Some(_) => {}
            }
        }

        for (dep_name, decl) in &doc.document.dependencies {
            module.dependencies.insert(
                dep_name.clone(),
                Dependency {
                    name: dep_name.clone(),
                    document: normalize(&base.join(&decl.source)),
                },
            );
        }

        for (key, expr) in &doc.document.inputs {
            module.inputs.insert(key.clone(), expr.clone());
        }

        for (key, value) in &doc.document.environment_variables {
            module.env.insert(key.clone(), value.clone());
        }

        for (hook_name, hook) in &doc.document.hooks {
            let decl = HookDecl {
                name: hook_name.clone(),
                hook: hook.clone(),
                base_dir: base.clone(),
            };
            match module.hooks.iter_mut().find(|h| &h.name == hook_name) {
                Some(existing) => *existing = decl,
                None => module.hooks.push(decl),
            }
        }
    }

    merge_backends(&mut module, docs)?;
    Ok(module)
}

/// Canonicalize when possible so the same document is recognised from any referrer.
pub fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

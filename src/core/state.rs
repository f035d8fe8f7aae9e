//! Persisted state: checkpoint (atomic), variables file, backend override.

use super::error::{Error, Result};
use super::types::{Checkpoint, CheckpointEntry, Module, TypedValue};
use crate::provenance::hasher;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Checkpoint location inside the temp directory.
pub fn checkpoint_path(temp_dir: &Path) -> PathBuf {
    temp_dir.join("checkpoint.yaml")
}

/// Load the checkpoint. Returns None if it doesn't exist.
pub fn load_checkpoint(temp_dir: &Path) -> Result<Option<Checkpoint>> {
    let path = checkpoint_path(temp_dir);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let checkpoint = serde_yaml_ng::from_str(&content).map_err(|e| Error::Parse {
        file: path.clone(),
        message: e.to_string(),
    })?;
    Ok(Some(checkpoint))
}

/// Save the checkpoint atomically (write to temp, then rename).
pub fn save_checkpoint(temp_dir: &Path, checkpoint: &Checkpoint) -> Result<()> {
    let path = checkpoint_path(temp_dir);
    std::fs::create_dir_all(temp_dir).map_err(|e| Error::io(temp_dir, e))?;

    let yaml = serde_yaml_ng::to_string(checkpoint).map_err(|e| Error::Parse {
        file: path.clone(),
        message: e.to_string(),
    })?;

    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, &yaml).map_err(|e| Error::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| Error::io(&path, e))?;
    Ok(())
}

/// Create an empty checkpoint.
pub fn new_checkpoint() -> Checkpoint {
    use crate::provenance::eventlog::now_iso8601;
    Checkpoint {
        schema: "1.0".to_string(),
        generated_at: now_iso8601(),
        generator: format!("strata {}", env!("CARGO_PKG_VERSION")),
        modules: IndexMap::new(),
    }
}

/// Checkpoint entry for a module whose variables file has fingerprint `inputs_hash`.
pub fn checkpoint_entry(module: &Module, inputs_hash: Option<String>) -> CheckpointEntry {
    CheckpointEntry {
        module_dir: module.module_dir.clone(),
        files: module.files.clone(),
        inputs_hash,
    }
}

fn write_json(path: &Path, value: &TypedValue) -> Result<Vec<u8>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|e| Error::Parse {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;
    bytes.push(b'\n');
    std::fs::write(path, &bytes).map_err(|e| Error::io(path, e))?;
    Ok(bytes)
}

/// Write the module's input-variables file and return its fingerprint.
pub fn write_variables(module: &Module, values: &IndexMap<String, TypedValue>) -> Result<String> {
    let doc = TypedValue::Object(
        values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    );
    let path = module.variable_file();
    let bytes = write_json(&path, &doc)?;
    tracing::debug!(module = %module.name, path = %path.display(), "wrote variables file");
    Ok(hasher::hash_bytes(&bytes))
}

/// Delete the module's variables file if present.
pub fn remove_variables(module: &Module) -> Result<()> {
    let path = module.variable_file();
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(&path, e)),
    }
}

/// Whether the variables file on disk can be reused for `module`.
///
/// The file must exist; when the checkpoint recorded a fingerprint for the
/// module, the file must still match it.
pub fn variables_current(module: &Module, checkpoint: Option<&Checkpoint>) -> Result<bool> {
    let path = module.variable_file();
    if !path.is_file() {
        return Ok(false);
    }
    let expected = checkpoint
        .and_then(|cp| cp.modules.get(&module.name))
        .and_then(|entry| entry.inputs_hash.as_deref());
    match expected {
        None => Ok(true),
        Some(expected) => Ok(hasher::hash_file(&path)? == expected),
    }
}

/// Write the backend override file when the module declares a backend.
pub fn write_backend_override(module: &Module) -> Result<()> {
    let Some(ref backend) = module.backend else {
        return Ok(());
    };
    let config: serde_json::Map<String, TypedValue> = backend
        .config
        .iter()
        .map(|(k, v)| (k.clone(), super::types::yaml_to_typed(v)))
        .collect();
    let mut block = serde_json::Map::new();
    block.insert(backend.backend_type.clone(), TypedValue::Object(config));
    let doc = serde_json::json!({ "terraform": { "backend": block } });
    write_json(&module.override_file(), &doc)?;
    tracing::debug!(module = %module.name, backend = %backend.backend_type, "wrote backend override");
    Ok(())
}

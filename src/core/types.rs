//! Document model and run-time module types.
//!
//! A module document is one YAML file. Several documents may contribute to the
//! same logical module; the loader merges them into a [`Module`]. All document
//! types derive Serialize/Deserialize for YAML roundtripping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A typed value produced by the provisioning engine or by input evaluation.
pub type TypedValue = serde_json::Value;

/// Output name → typed value for one dependency.
pub type OutputValues = IndexMap<String, TypedValue>;

// ============================================================================
// Module documents
// ============================================================================

/// One parsed module file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDocument {
    /// Logical module name; defaults to the file stem
    #[serde(default)]
    pub name: Option<String>,

    /// Module source to fetch
    #[serde(default)]
    pub module: Option<ModuleSource>,

    /// Upstream modules whose outputs feed this module
    #[serde(default)]
    pub dependencies: IndexMap<String, DependencyDecl>,

    /// Input expressions (unresolved)
    #[serde(default)]
    pub inputs: IndexMap<String, serde_yaml_ng::Value>,

    /// Remote state backend fragment
    #[serde(default)]
    pub backend: Option<BackendDecl>,

    /// Static environment passed to hooks and the engine
    #[serde(default)]
    pub environment_variables: IndexMap<String, String>,

    /// Lifecycle hooks (order-preserving)
    #[serde(default)]
    pub hooks: IndexMap<String, Hook>,
}

/// Where a module's code comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleSource {
    /// Local path (relative to the document) or `git::` URL
    pub source: String,

    /// Version (git ref) to check out
    #[serde(default)]
    pub version: Option<String>,
}

/// Declared dependency on another module document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyDecl {
    /// Path to the upstream module document, relative to the declaring file
    pub source: String,
}

/// Backend block: type tag plus attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendDecl {
    /// Backend type (azurerm, s3, gcs, ...)
    #[serde(rename = "type")]
    pub backend_type: String,

    /// Backend attributes
    #[serde(default)]
    pub config: IndexMap<String, serde_yaml_ng::Value>,
}

/// A hook declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hook {
    /// `event[:command1,command2,...]`
    pub trigger_on: String,

    /// Program to run
    #[serde(default)]
    pub command: Option<String>,

    /// Script file to run
    #[serde(default)]
    pub script: Option<String>,

    /// Arguments passed to command or script
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory, relative to the declaring document
    #[serde(default)]
    pub working_dir: Option<String>,

    /// Run on every invocation instead of once per process
    #[serde(default)]
    pub disable_cache: bool,

    /// Merge `KEY=VALUE` output lines into the module environment
    #[serde(default)]
    pub set_env: bool,
}

/// A hook declaration bound to the directory of the document declaring it.
#[derive(Debug, Clone, PartialEq)]
pub struct HookDecl {
    pub name: String,
    pub hook: Hook,
    pub base_dir: PathBuf,
}

impl HookDecl {
    /// Effective working directory of the hook process.
    pub fn working_dir(&self) -> PathBuf {
        match self.hook.working_dir.as_deref() {
            Some(dir) if !dir.is_empty() => self.base_dir.join(dir),
            _ => self.base_dir.clone(),
        }
    }
}

// ============================================================================
// Merged modules
// ============================================================================

/// Lifecycle events hooks can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    Prepare,
    Finish,
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prepare => write!(f, "prepare"),
            Self::Finish => write!(f, "finish"),
        }
    }
}

/// Dependency declaration with its document path resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub document: PathBuf,
}

/// A logical module assembled from one or more documents.
#[derive(Debug, Clone)]
pub struct Module {
    /// Unique name within a run
    pub name: String,

    /// Contributing files in discovery order
    pub files: Vec<PathBuf>,

    /// Module source and version
    pub source: Option<ModuleSource>,

    /// Directory the source is relative to (first file declaring `module:`)
    pub source_base: PathBuf,

    /// Resolved dependency declarations
    pub dependencies: IndexMap<String, Dependency>,

    /// Unresolved input expressions
    pub inputs: IndexMap<String, serde_yaml_ng::Value>,

    /// Merged backend
    pub backend: Option<BackendDecl>,

    /// Hooks in declaration order
    pub hooks: Vec<HookDecl>,

    /// Environment overlay for hooks and the engine
    pub env: IndexMap<String, String>,

    /// Working directory the engine runs in
    pub module_dir: PathBuf,

    /// Directory dependency workspaces are created under
    pub deps_dir: PathBuf,

    /// Dependency depth this module was loaded at (0 = top level)
    pub depth: usize,
}

impl Module {
    /// Create an empty module rooted at `temp_dir/<name>`.
    pub fn new(name: &str, temp_dir: &Path) -> Self {
        let root = temp_dir.join(name);
        Self {
            name: name.to_string(),
            files: Vec::new(),
            source: None,
            source_base: PathBuf::new(),
            dependencies: IndexMap::new(),
            inputs: IndexMap::new(),
            backend: None,
            hooks: Vec::new(),
            env: IndexMap::new(),
            module_dir: root.join("module"),
            deps_dir: root.join("deps"),
            depth: 0,
        }
    }

    /// Re-root working directories (used for dependency workspaces).
    pub fn relocate(&mut self, root: &Path) {
        self.module_dir = root.join("module");
        self.deps_dir = root.join("deps");
    }

    /// Path of the input-variables file inside the module directory.
    pub fn variable_file(&self) -> PathBuf {
        self.module_dir.join(VARIABLE_FILE)
    }

    /// Path of the backend override file inside the module directory.
    pub fn override_file(&self) -> PathBuf {
        self.module_dir.join(OVERRIDE_FILE)
    }

    /// Whether the engine has initialized the working directory.
    pub fn is_initialized(&self) -> bool {
        self.module_dir.join(INIT_MARKER).is_dir()
    }
}

/// Input-variables file name (auto-loaded by the engine).
pub const VARIABLE_FILE: &str = "strata.auto.tfvars.json";

/// Backend override file name.
pub const OVERRIDE_FILE: &str = "strata_override.tf.json";

/// Directory created by `init` in the module directory.
pub const INIT_MARKER: &str = ".terraform";

// ============================================================================
// Checkpoint
// ============================================================================

/// Persisted record of the module set processed by the last successful init.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Schema version
    pub schema: String,

    /// When the checkpoint was written
    pub generated_at: String,

    /// Generator version
    pub generator: String,

    /// Modules in load order
    pub modules: IndexMap<String, CheckpointEntry>,
}

/// One module in the checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    /// Engine working directory
    pub module_dir: PathBuf,

    /// Documents the module was loaded from
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// BLAKE3 fingerprint of the variables file written by init
    #[serde(default)]
    pub inputs_hash: Option<String>,
}

// ============================================================================
// Run events
// ============================================================================

/// Lifecycle event for the JSONL run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    CommandStarted {
        command: String,
        run_id: String,
        modules: usize,
        strata_version: String,
    },
    DependencyResolved {
        module: String,
        dependency: String,
        outputs: usize,
    },
    ModuleCompleted {
        module: String,
        command: String,
        duration_seconds: f64,
    },
    ModuleSkipped {
        module: String,
        command: String,
        reason: String,
    },
    ModuleFailed {
        module: String,
        command: String,
        error: String,
    },
    CommandCompleted {
        command: String,
        run_id: String,
        total_seconds: f64,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: RunEvent,
}

// ============================================================================
// Value helpers
// ============================================================================

/// Convert a YAML value into a typed (JSON) value.
pub fn yaml_to_typed(val: &serde_yaml_ng::Value) -> TypedValue {
    use serde_yaml_ng::Value as Y;
    match val {
        Y::Null => TypedValue::Null,
        Y::Bool(b) => TypedValue::Bool(*b),
        Y::Number(n) => {
            if let Some(i) = n.as_i64() {
                TypedValue::from(i)
            } else if let Some(u) = n.as_u64() {
                TypedValue::from(u)
            } else {
                n.as_f64().map(TypedValue::from).unwrap_or(TypedValue::Null)
            }
        }
        Y::String(s) => TypedValue::String(s.clone()),
        Y::Sequence(seq) => TypedValue::Array(seq.iter().map(yaml_to_typed).collect()),
        Y::Mapping(map) => TypedValue::Object(
            map.iter()
                .map(|(k, v)| (yaml_key_to_string(k), yaml_to_typed(v)))
                .collect(),
        ),
        Y::Tagged(tagged) => yaml_to_typed(&tagged.value),
    }
}

fn yaml_key_to_string(key: &serde_yaml_ng::Value) -> String {
    match key {
        serde_yaml_ng::Value::String(s) => s.clone(),
        other => typed_to_string(&yaml_to_typed(other)),
    }
}

/// Textual form of a typed value for string interpolation.
pub fn typed_to_string(val: &TypedValue) -> String {
    match val {
        TypedValue::String(s) => s.clone(),
        TypedValue::Null => String::new(),
        TypedValue::Bool(b) => b.to_string(),
        TypedValue::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

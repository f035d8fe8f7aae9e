//! Module loading: discovery, grouping by module name, merge, ordering.

use super::error::{Error, Result};
use super::merge::{self, ParsedDocument};
use super::parser::{self, DocumentParser};
use super::resolver;
use super::types::Module;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Loads modules from documents on disk.
pub struct Loader {
    parser: DocumentParser,
    temp_dir: PathBuf,
    documents: Mutex<HashMap<PathBuf, ParsedDocument>>,
}

impl Loader {
    pub fn new(parser: DocumentParser, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            parser,
            temp_dir: temp_dir.into(),
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Temp directory module workspaces live under.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Parse a document, reusing an earlier parse of the same file.
    fn document(&self, path: &Path) -> Result<ParsedDocument> {
        let key = merge::normalize(path);
        let mut documents = self
            .documents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(doc) = documents.get(&key) {
            return Ok(doc.clone());
        }
        let parsed = ParsedDocument::new(key.clone(), self.parser.parse_file(&key)?);
        documents.insert(key, parsed.clone());
        Ok(parsed)
    }

    /// Parse every document in `files` and group them by module name,
    /// keeping first-appearance order.
    fn group(&self, files: &[PathBuf]) -> Result<IndexMap<String, Vec<ParsedDocument>>> {
        let mut groups: IndexMap<String, Vec<ParsedDocument>> = IndexMap::new();
        for file in files {
            let doc = self.document(file)?;
            let name = parser::document_name(&doc.document, &doc.path);
            if name.is_empty() {
                return Err(Error::Parse {
                    file: doc.path.clone(),
                    message: "cannot derive a module name".to_string(),
                });
            }
            groups.entry(name).or_default().push(doc);
        }
        Ok(groups)
    }

    /// Load every module under `source` (file or directory) in dependency order.
    pub fn load(&self, source: &Path) -> Result<Vec<Module>> {
        let files = parser::discover_files(source)?;
        tracing::debug!(files = files.len(), source = %source.display(), "discovered documents");

        let mut modules = Vec::new();
        for (name, docs) in self.group(&files)? {
            modules.push(merge::merge_documents(&name, &docs, &self.temp_dir)?);
        }

        let order = resolver::build_execution_order(&modules)?;
        let mut slots: Vec<Option<Module>> = modules.into_iter().map(Some).collect();
        Ok(order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect())
    }

    /// Load the module a dependency document belongs to, including sibling
    /// documents in the same directory that share its module name.
    pub fn load_dependency(&self, document: &Path, depth: usize) -> Result<Module> {
        let target = self.document(document)?;
        let name = parser::document_name(&target.document, &target.path);

        let dir = target
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let siblings = parser::discover_files(&dir)?;
        let mut docs = Vec::new();
        for file in &siblings {
            let doc = self.document(file)?;
            if parser::document_name(&doc.document, &doc.path) == name {
                docs.push(doc);
            }
        }
        if docs.is_empty() {
            docs.push(target);
        }

        let mut module = merge::merge_documents(&name, &docs, &self.temp_dir)?;
        module.depth = depth;
        Ok(module)
    }
}

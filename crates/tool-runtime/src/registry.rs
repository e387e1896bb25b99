use std::collections::BTreeMap;
use std::sync::Arc;

use krknai_core::LogArtifact;

use crate::tool::{Tool, ToolDefinition};
use crate::tools::ReadFileTool;

struct Entry {
    tool: Arc<dyn Tool>,
    definition: ToolDefinition,
}

/// Tools the model may call during one analysis, keyed by name.
///
/// Definitions are captured at registration and declared in name order, so
/// every request of an analysis carries identical declarations.
#[derive(Default)]
pub struct ToolRegistry {
    entries: BTreeMap<String, Entry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only `read_file`, limited to `artifacts`. An empty slice still
    /// declares the tool; every read is then refused.
    pub fn for_artifacts(artifacts: &[LogArtifact]) -> Self {
        let mut registry = Self::new();
        registry.insert(Arc::new(ReadFileTool::new(artifacts.to_vec())));
        registry
    }

    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let name = tool.definition().name;
        if self.entries.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.insert(Arc::new(tool));
        Ok(())
    }

    fn insert(&mut self, tool: Arc<dyn Tool>) {
        let definition = tool.definition();
        self.entries
            .insert(definition.name.clone(), Entry { tool, definition });
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.entries.get(name).map(|e| Arc::clone(&e.tool))
    }

    /// Declarations sent to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries.values().map(|e| e.definition.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("a tool named '{0}' is already registered")]
    DuplicateName(String),
}

/// Registry of the tools whose submissions are under test.
///
/// The registry is a JSON document of the form
/// `{"tools": [{"tool": "Camunda Modeler", "version": "5.0"}]}`. Every entry
/// names one candidate sub-folder, `"<tool> <version>"`.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The registry document could not be loaded.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The document is not valid JSON or has the wrong shape.
    #[error("invalid tool registry: {0}")]
    Json(#[from] serde_json::Error),

    /// An entry has an empty tool name.
    #[error("tool registry entry {index} has an empty tool name")]
    EmptyToolName {
        /// Zero-based index in the `tools` array.
        index: usize,
    },
}

/// One tool under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Tool name.
    pub tool: String,
    /// Tool version.
    pub version: String,
}

impl ToolEntry {
    /// Name of the candidate folder holding this tool's submission.
    pub fn folder_name(&self) -> String {
        if self.version.is_empty() {
            self.tool.clone()
        } else {
            format!("{} {}", self.tool, self.version)
        }
    }
}

/// The list of tools under test, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRegistry {
    /// Entries in registry order.
    pub tools: Vec<ToolEntry>,
}

impl ToolRegistry {
    /// Parses a registry document.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for malformed JSON or an entry without a
    /// tool name.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let registry: Self = serde_json::from_str(json)?;
        if let Some(index) = registry.tools.iter().position(|t| t.tool.trim().is_empty()) {
            return Err(RegistryError::EmptyToolName { index });
        }
        Ok(registry)
    }

    /// Folder names of all entries, in registry order.
    pub fn folder_names(&self) -> Vec<String> {
        self.tools.iter().map(ToolEntry::folder_name).collect()
    }
}

//! Tool catalog and the invocation seam used during task execution.
//!
//! Agents reference catalog entries by slug. Deactivating or removing an
//! entry never touches agent tool lists; a stale reference is simply skipped
//! at execution time. The actual invocation sits behind [`ToolInvoker`] so
//! the engine never depends on what a tool concretely does.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::storage;

/// Value type of a tool parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Number,
    Boolean,
}

/// A single declared tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
}

impl ToolParameter {
    fn required(name: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
        }
    }

    fn optional(name: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
        }
    }
}

/// Functional grouping shown in the dashboard tool picker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Web,
    Files,
    System,
}

/// A catalog entry an agent may reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Slug identifier referenced from agent tool lists.
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub parameters: Vec<ToolParameter>,
    pub active: bool,
}

/// The builtin tool inventory seeded on first run.
fn builtin_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            id: "web_search".to_string(),
            name: "Web Search".to_string(),
            description: "Search the web for information, returning titles and snippets."
                .to_string(),
            category: ToolCategory::Web,
            parameters: vec![
                ToolParameter::required("query", ParamKind::String),
                ToolParameter::optional("num_results", ParamKind::Number),
            ],
            active: true,
        },
        ToolSpec {
            id: "fetch_url".to_string(),
            name: "Fetch URL".to_string(),
            description: "Fetch the contents of a URL as text.".to_string(),
            category: ToolCategory::Web,
            parameters: vec![ToolParameter::required("url", ParamKind::String)],
            active: true,
        },
        ToolSpec {
            id: "read_file".to_string(),
            name: "Read File".to_string(),
            description: "Read a file from the workspace.".to_string(),
            category: ToolCategory::Files,
            parameters: vec![ToolParameter::required("path", ParamKind::String)],
            active: true,
        },
        ToolSpec {
            id: "write_file".to_string(),
            name: "Write File".to_string(),
            description: "Write content to a file in the workspace.".to_string(),
            category: ToolCategory::Files,
            parameters: vec![
                ToolParameter::required("path", ParamKind::String),
                ToolParameter::required("content", ParamKind::String),
                ToolParameter::optional("append", ParamKind::Boolean),
            ],
            active: true,
        },
        ToolSpec {
            id: "run_command".to_string(),
            name: "Run Command".to_string(),
            description: "Run a shell command and capture its output.".to_string(),
            category: ToolCategory::System,
            parameters: vec![
                ToolParameter::required("command", ParamKind::String),
                ToolParameter::optional("timeout_secs", ParamKind::Number),
            ],
            active: true,
        },
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Catalog
// ─────────────────────────────────────────────────────────────────────────────

/// Persistent tool catalog with JSON file backing.
pub struct ToolCatalog {
    tools: RwLock<HashMap<String, ToolSpec>>,
    storage_path: PathBuf,
}

/// Shared catalog for concurrent access.
pub type SharedCatalog = Arc<ToolCatalog>;

impl ToolCatalog {
    /// Create a catalog, loading from disk or seeding the builtin inventory.
    pub async fn load(data_dir: &Path) -> Self {
        let storage_path = data_dir.join("tools.json");
        let mut records: Vec<ToolSpec> = storage::load_or_default(&storage_path).await;

        if records.is_empty() {
            records = builtin_tools();
            if let Err(e) = storage::save_pretty(&storage_path, &records).await {
                tracing::warn!("Failed to seed tool catalog: {}", e);
            }
        }

        Self {
            tools: RwLock::new(records.into_iter().map(|t| (t.id.clone(), t)).collect()),
            storage_path,
        }
    }

    async fn save_to_disk(&self) -> Result<(), ApiError> {
        let tools = self.tools.read().await;
        let records: Vec<&ToolSpec> = tools.values().collect();
        storage::save_pretty(&self.storage_path, &records)
            .await
            .map_err(|e| ApiError::Internal(e.into()))
    }

    pub async fn get(&self, id: &str) -> Option<ToolSpec> {
        let tools = self.tools.read().await;
        tools.get(id).cloned()
    }

    /// All catalog entries, ordered by slug for a stable listing.
    pub async fn list(&self) -> Vec<ToolSpec> {
        let tools = self.tools.read().await;
        let mut entries: Vec<ToolSpec> = tools.values().cloned().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    /// Toggle an entry's active flag. Agent tool lists are left untouched.
    pub async fn set_active(&self, id: &str, active: bool) -> Result<ToolSpec, ApiError> {
        let updated = {
            let mut tools = self.tools.write().await;
            let tool = tools.get_mut(id).ok_or(ApiError::NotFound("Tool"))?;
            tool.active = active;
            tool.clone()
        };
        self.save_to_disk().await?;

        Ok(updated)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Invocation
// ─────────────────────────────────────────────────────────────────────────────

/// Failure raised by a tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool '{tool}' failed: {reason}")]
    Failed { tool: String, reason: String },
}

/// Capability to invoke a tool against a task description.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, tool: &ToolSpec, task: &str) -> Result<String, ToolError>;
}

/// Invoker that simulates work with a short delay and a canned result.
pub struct SimulatedInvoker {
    delay: Duration,
}

impl SimulatedInvoker {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedInvoker {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl ToolInvoker for SimulatedInvoker {
    async fn invoke(&self, tool: &ToolSpec, task: &str) -> Result<String, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok(format!("{} completed for task: {}", tool.name, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_catalog_seeds_builtins() {
        let temp = tempdir().unwrap();
        let catalog = ToolCatalog::load(temp.path()).await;

        let tools = catalog.list().await;
        assert_eq!(tools.len(), 5);
        assert!(tools.iter().all(|t| t.active));
        assert!(catalog.get("web_search").await.is_some());
        assert!(catalog.get("unknown_tool").await.is_none());
    }

    #[tokio::test]
    async fn test_set_active_persists() {
        let temp = tempdir().unwrap();
        {
            let catalog = ToolCatalog::load(temp.path()).await;
            let updated = catalog.set_active("run_command", false).await.unwrap();
            assert!(!updated.active);
        }

        let reloaded = ToolCatalog::load(temp.path()).await;
        assert!(!reloaded.get("run_command").await.unwrap().active);
    }

    #[tokio::test]
    async fn test_set_active_unknown_tool() {
        let temp = tempdir().unwrap();
        let catalog = ToolCatalog::load(temp.path()).await;

        let err = catalog.set_active("no_such_tool", false).await.unwrap_err();
        assert!(matches!(err, crate::error::ApiError::NotFound("Tool")));
    }

    #[tokio::test]
    async fn test_simulated_invoker_output() {
        let temp = tempdir().unwrap();
        let catalog = ToolCatalog::load(temp.path()).await;
        let tool = catalog.get("web_search").await.unwrap();

        let invoker = SimulatedInvoker::new(Duration::from_millis(1));
        let output = invoker.invoke(&tool, "summarize the news").await.unwrap();
        assert!(output.contains("Web Search"));
        assert!(output.contains("summarize the news"));
    }
}

//! Agent lifecycle engine.
//!
//! Drives an agent through `idle|paused -> active -> completed`, appending a
//! history entry and advancing progress after each tool invocation. Every
//! step is persisted as it happens: a crash mid-run leaves partial history
//! and partial progress behind, which the next run builds on.
//!
//! A tool failure is not an error of this operation. The agent falls back to
//! `idle`, everything already written stays written, and the failure message
//! is returned in the outcome for the caller to display.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::agents::{types, Agent, AgentStatus, HistoryEntry, SharedRegistry};
use crate::error::ApiError;
use crate::tools::{SharedCatalog, ToolInvoker, ToolSpec};

/// Result of one `execute_task` run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    pub agent: Agent,
    /// Number of tool invocations that ran (successfully or not).
    pub steps_run: usize,
    /// Failure message when the run stopped early. `None` means the agent
    /// reached `completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Executes tasks against agents, one run per agent at a time.
pub struct LifecycleEngine {
    registry: SharedRegistry,
    catalog: SharedCatalog,
    invoker: Arc<dyn ToolInvoker>,
    /// Per-agent run locks: concurrent runs against one agent serialize
    /// instead of interleaving their history writes.
    run_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

/// Shared engine for concurrent access.
pub type SharedEngine = Arc<LifecycleEngine>;

impl LifecycleEngine {
    pub fn new(
        registry: SharedRegistry,
        catalog: SharedCatalog,
        invoker: Arc<dyn ToolInvoker>,
    ) -> Self {
        Self {
            registry,
            catalog,
            invoker,
            run_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn run_lock_for(&self, agent_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.run_locks.lock().await;
        Arc::clone(locks.entry(agent_id).or_default())
    }

    /// Run `task` against an owned agent.
    pub async fn execute_task(
        &self,
        user_id: Uuid,
        agent_id: Uuid,
        task: &str,
    ) -> Result<TaskOutcome, ApiError> {
        types::validate_task(task)?;

        // Ownership before anything else; don't even take a run lock for an
        // agent the caller cannot see.
        self.registry.get(user_id, agent_id).await?;

        let lock = self.run_lock_for(agent_id).await;
        let _guard = lock.lock().await;

        // Re-read under the lock: a racing run may have finished meanwhile.
        let mut agent = self.registry.get(user_id, agent_id).await?;
        if !agent.status.is_runnable() {
            return Err(ApiError::validation(
                "status",
                format!("agent is '{}' and cannot start a task", agent.status.as_str()),
            ));
        }

        agent.status = AgentStatus::Active;
        agent.current_task = Some(task.to_string());
        agent.updated_at = Utc::now();
        self.registry.persist(agent.clone()).await?;

        // Inactive or unknown identifiers are skipped for this run only;
        // the agent's tool list keeps them for future runs.
        let mut resolved: Vec<ToolSpec> = Vec::new();
        for id in &agent.active_tools {
            match self.catalog.get(id).await {
                Some(tool) if tool.active => resolved.push(tool),
                Some(tool) => {
                    tracing::debug!("Skipping inactive tool '{}' for agent {}", tool.id, agent.id)
                }
                None => tracing::debug!("Skipping unknown tool '{}' for agent {}", id, agent.id),
            }
        }

        // With nothing to run there is nothing to step through.
        if resolved.is_empty() {
            agent.status = AgentStatus::Completed;
            agent.progress = 100;
            agent.updated_at = Utc::now();
            self.registry.persist(agent.clone()).await?;
            tracing::info!("Agent {} completed '{}' with no runnable tools", agent.id, task);
            return Ok(TaskOutcome {
                agent,
                steps_run: 0,
                error: None,
            });
        }

        let increment = (100 / resolved.len() as u32) as u8;
        let mut steps_run = 0;

        for tool in &resolved {
            steps_run += 1;
            match self.invoker.invoke(tool, task).await {
                Ok(result) => {
                    agent.history.push(HistoryEntry {
                        timestamp: Utc::now(),
                        action: task.to_string(),
                        result,
                        tool_used: tool.name.clone(),
                    });
                    agent.progress = agent.progress.saturating_add(increment).min(100);
                    agent.updated_at = Utc::now();
                    self.registry.persist(agent.clone()).await?;
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!("Agent {} run failed at step {}: {}", agent.id, steps_run, message);

                    agent.status = AgentStatus::Idle;
                    agent.updated_at = Utc::now();
                    self.registry.persist(agent.clone()).await?;

                    return Ok(TaskOutcome {
                        agent,
                        steps_run,
                        error: Some(message),
                    });
                }
            }
        }

        agent.status = AgentStatus::Completed;
        agent.progress = 100;
        agent.updated_at = Utc::now();
        self.registry.persist(agent.clone()).await?;

        tracing::info!("Agent {} completed '{}' in {} steps", agent.id, task, steps_run);
        Ok(TaskOutcome {
            agent,
            steps_run,
            error: None,
        })
    }
}

//! Owner-scoped agent registry.
//!
//! Quota and ownership are enforced here rather than at the HTTP boundary so
//! that every caller gets identical guarantees. Ownership checks run before
//! any mutation: a valid agent id under the wrong user is reported as not
//! found, never as a permission error, so existence is not leaked.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::ApiError;
use crate::storage;
use crate::subscription::SharedLedger;

use super::types::{self, Agent, AgentStatus};

/// Partial update applied through [`AgentRegistry::update`].
///
/// Status may only be set to a resting state (`idle` or `paused`); `active`
/// and `completed` are produced by the lifecycle engine alone.
#[derive(Debug, Default)]
pub struct AgentPatch {
    pub name: Option<String>,
    pub objective: Option<String>,
    pub status: Option<AgentStatus>,
    pub current_task: Option<String>,
    pub active_tools: Option<Vec<String>>,
}

/// Persistent agent registry with JSON file backing.
pub struct AgentRegistry {
    agents: RwLock<HashMap<Uuid, Agent>>,
    /// Serializes count-then-insert per user so concurrent creations cannot
    /// overshoot the quota.
    create_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    ledger: SharedLedger,
    storage_path: PathBuf,
}

/// Shared registry for concurrent access.
pub type SharedRegistry = Arc<AgentRegistry>;

impl AgentRegistry {
    /// Create a registry, loading existing agents from disk.
    pub async fn load(data_dir: &Path, ledger: SharedLedger) -> Self {
        let storage_path = data_dir.join("agents.json");
        let records: Vec<Agent> = storage::load_or_default(&storage_path).await;

        Self {
            agents: RwLock::new(records.into_iter().map(|a| (a.id, a)).collect()),
            create_locks: Mutex::new(HashMap::new()),
            ledger,
            storage_path,
        }
    }

    async fn save_to_disk(&self) -> Result<(), ApiError> {
        let agents = self.agents.read().await;
        let records: Vec<&Agent> = agents.values().collect();
        storage::save_pretty(&self.storage_path, &records)
            .await
            .map_err(|e| ApiError::Internal(e.into()))
    }

    async fn create_lock_for(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.create_locks.lock().await;
        Arc::clone(locks.entry(user_id).or_default())
    }

    /// Create an agent for `user_id`, enforcing entitlement and quota.
    pub async fn create(
        &self,
        user_id: Uuid,
        name: String,
        objective: String,
        active_tools: Vec<String>,
    ) -> Result<Agent, ApiError> {
        types::validate_name(&name)?;
        types::validate_objective(&objective)?;
        types::validate_tools(&active_tools)?;

        let lock = self.create_lock_for(user_id).await;
        let _guard = lock.lock().await;

        if !self.ledger.is_entitled(user_id).await {
            return Err(ApiError::SubscriptionRequired);
        }

        let quota = self.ledger.quota_for(user_id).await;
        let owned = {
            let agents = self.agents.read().await;
            agents.values().filter(|a| a.owner == user_id).count() as u32
        };
        if owned >= quota {
            return Err(ApiError::QuotaExceeded { limit: quota });
        }

        let agent = Agent::new(user_id, name, objective, active_tools);
        {
            let mut agents = self.agents.write().await;
            agents.insert(agent.id, agent.clone());
        }
        self.save_to_disk().await?;

        tracing::info!("Created agent {} ({}) for user {}", agent.name, agent.id, user_id);
        Ok(agent)
    }

    /// All agents owned by `user_id`, in creation order.
    pub async fn list(&self, user_id: Uuid) -> Vec<Agent> {
        let agents = self.agents.read().await;
        let mut owned: Vec<Agent> = agents
            .values()
            .filter(|a| a.owner == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        owned
    }

    /// Fetch an agent, requiring ownership.
    pub async fn get(&self, user_id: Uuid, agent_id: Uuid) -> Result<Agent, ApiError> {
        let agents = self.agents.read().await;
        agents
            .get(&agent_id)
            .filter(|a| a.owner == user_id)
            .cloned()
            .ok_or(ApiError::NotFound("Agent"))
    }

    /// Apply a patch to an owned agent. The ownership check runs before any
    /// field is touched.
    pub async fn update(
        &self,
        user_id: Uuid,
        agent_id: Uuid,
        patch: AgentPatch,
    ) -> Result<Agent, ApiError> {
        if let Some(name) = &patch.name {
            types::validate_name(name)?;
        }
        if let Some(objective) = &patch.objective {
            types::validate_objective(objective)?;
        }
        if let Some(task) = &patch.current_task {
            types::validate_task(task)?;
        }
        if let Some(tools) = &patch.active_tools {
            types::validate_tools(tools)?;
        }
        if let Some(status) = patch.status {
            if !status.is_runnable() {
                return Err(ApiError::validation(
                    "status",
                    format!("cannot be set to '{}' directly", status.as_str()),
                ));
            }
        }

        let updated = {
            let mut agents = self.agents.write().await;
            let agent = agents
                .get_mut(&agent_id)
                .filter(|a| a.owner == user_id)
                .ok_or(ApiError::NotFound("Agent"))?;

            if let Some(name) = patch.name {
                agent.name = name;
            }
            if let Some(objective) = patch.objective {
                agent.objective = objective;
            }
            if let Some(status) = patch.status {
                agent.status = status;
            }
            if let Some(task) = patch.current_task {
                agent.current_task = Some(task);
            }
            if let Some(tools) = patch.active_tools {
                agent.active_tools = tools;
            }
            agent.updated_at = Utc::now();
            agent.clone()
        };
        self.save_to_disk().await?;

        Ok(updated)
    }

    /// Delete an owned agent along with its history.
    pub async fn delete(&self, user_id: Uuid, agent_id: Uuid) -> Result<(), ApiError> {
        {
            let mut agents = self.agents.write().await;
            match agents.get(&agent_id) {
                Some(a) if a.owner == user_id => {
                    agents.remove(&agent_id);
                }
                _ => return Err(ApiError::NotFound("Agent")),
            }
        }
        self.save_to_disk().await?;

        tracing::info!("Deleted agent {} for user {}", agent_id, user_id);
        Ok(())
    }

    /// Overwrite an agent record and persist. Used by the lifecycle engine,
    /// which has already established ownership.
    pub(crate) async fn persist(&self, agent: Agent) -> Result<(), ApiError> {
        {
            let mut agents = self.agents.write().await;
            agents.insert(agent.id, agent);
        }
        self.save_to_disk().await
    }
}

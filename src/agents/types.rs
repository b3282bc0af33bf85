//! Agent record types and field validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

pub const NAME_MIN: usize = 3;
pub const NAME_MAX: usize = 50;
pub const OBJECTIVE_MIN: usize = 10;
pub const TASK_MAX: usize = 100;
pub const TOOL_ID_MAX: usize = 30;

/// Lifecycle state of an agent.
///
/// The engine drives `idle|paused -> active -> completed`, reverting to
/// `idle` on failure. `paused` is only ever set by an explicit update.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Active,
    Paused,
    Completed,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }

    /// Whether a task run may start from this state.
    pub fn is_runnable(&self) -> bool {
        matches!(self, Self::Idle | Self::Paused)
    }
}

/// Immutable log record of one tool invocation during a task run.
/// Appended in tool order, never mutated, removed only with the whole agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub result: String,
    pub tool_used: String,
}

/// A user-owned task-execution record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub objective: String,
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    /// 0..=100, strictly non-decreasing while the agent is active.
    pub progress: u8,
    /// Tool slugs in assignment order. Entries are kept even after the
    /// referenced catalog entry is deactivated or removed.
    pub active_tools: Vec<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(owner: Uuid, name: String, objective: String, active_tools: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner,
            name,
            objective,
            status: AgentStatus::Idle,
            current_task: None,
            progress: 0,
            active_tools,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field Validation
// ─────────────────────────────────────────────────────────────────────────────

pub fn validate_name(name: &str) -> Result<(), ApiError> {
    let len = name.chars().count();
    if len < NAME_MIN {
        return Err(ApiError::validation(
            "name",
            format!("must be at least {} characters long", NAME_MIN),
        ));
    }
    if len > NAME_MAX {
        return Err(ApiError::validation(
            "name",
            format!("cannot exceed {} characters", NAME_MAX),
        ));
    }
    Ok(())
}

pub fn validate_objective(objective: &str) -> Result<(), ApiError> {
    if objective.chars().count() < OBJECTIVE_MIN {
        return Err(ApiError::validation(
            "objective",
            format!("must be at least {} characters long", OBJECTIVE_MIN),
        ));
    }
    Ok(())
}

pub fn validate_task(task: &str) -> Result<(), ApiError> {
    if task.is_empty() {
        return Err(ApiError::validation("task", "cannot be empty"));
    }
    if task.chars().count() > TASK_MAX {
        return Err(ApiError::validation(
            "task",
            format!("cannot exceed {} characters", TASK_MAX),
        ));
    }
    Ok(())
}

pub fn validate_tools(tools: &[String]) -> Result<(), ApiError> {
    for tool in tools {
        if tool.is_empty() || tool.chars().count() > TOOL_ID_MAX {
            return Err(ApiError::validation(
                "activeTools",
                format!("tool identifiers must be 1-{} characters", TOOL_ID_MAX),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_bounds() {
        assert!(validate_name("ab").is_err());
        assert!(validate_name("abc").is_ok());
        assert!(validate_name(&"x".repeat(50)).is_ok());
        assert!(validate_name(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_objective_bounds() {
        assert!(validate_objective("too short").is_err());
        assert!(validate_objective("summarize the daily news").is_ok());
    }

    #[test]
    fn test_task_bounds() {
        assert!(validate_task("").is_err());
        assert!(validate_task("check the inbox").is_ok());
        assert!(validate_task(&"x".repeat(100)).is_ok());
        assert!(validate_task(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_tool_id_bounds() {
        assert!(validate_tools(&["web_search".to_string()]).is_ok());
        assert!(validate_tools(&["".to_string()]).is_err());
        assert!(validate_tools(&["x".repeat(31)]).is_err());
    }

    #[test]
    fn test_new_agent_initial_state() {
        let agent = Agent::new(
            Uuid::new_v4(),
            "Researcher".to_string(),
            "keep track of arxiv postings".to_string(),
            vec!["web_search".to_string()],
        );
        assert_eq!(agent.status, AgentStatus::Idle);
        assert_eq!(agent.progress, 0);
        assert!(agent.history.is_empty());
        assert!(agent.current_task.is_none());
    }

    #[test]
    fn test_runnable_states() {
        assert!(AgentStatus::Idle.is_runnable());
        assert!(AgentStatus::Paused.is_runnable());
        assert!(!AgentStatus::Active.is_runnable());
        assert!(!AgentStatus::Completed.is_runnable());
    }
}

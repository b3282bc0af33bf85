//! Subscription plans and the per-user entitlement ledger.
//!
//! A user has at most one *current* subscription at a time. Subscribing again
//! repoints the current reference to the new record; superseded records are
//! retained for history, never merged. Entitlement and quota are derived from
//! the current record at call time, so an `active` status on a record whose
//! validity window has elapsed grants nothing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;
use crate::storage;

/// Subscription plan tier. Each plan fixes a validity window and an agent
/// quota at creation time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Trial,
    Monthly,
    Yearly,
}

impl Plan {
    pub fn duration_days(&self) -> i64 {
        match self {
            Self::Trial => 14,
            Self::Monthly => 30,
            Self::Yearly => 365,
        }
    }

    /// Maximum number of agents a subscriber on this plan may own.
    pub fn max_agents(&self) -> u32 {
        match self {
            Self::Trial => 2,
            Self::Monthly => 5,
            Self::Yearly => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Parse a plan name, rejecting anything outside the enumerated set.
    pub fn parse(s: &str) -> Result<Self, ApiError> {
        match s {
            "trial" => Ok(Self::Trial),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(ApiError::validation(
                "plan",
                format!("unknown plan '{}'", other),
            )),
        }
    }
}

/// Status of a subscription record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A subscription record. `end_date` is always strictly after `start_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_agents: u32,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether this record grants entitlement right now.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.end_date > now
    }
}

/// Persisted ledger state: every record ever created, plus the per-user
/// current-subscription reference.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerState {
    subscriptions: HashMap<Uuid, Subscription>,
    current: HashMap<Uuid, Uuid>,
}

/// Persistent subscription ledger with JSON file backing.
pub struct SubscriptionLedger {
    state: RwLock<LedgerState>,
    storage_path: PathBuf,
}

/// Shared ledger for concurrent access.
pub type SharedLedger = Arc<SubscriptionLedger>;

impl SubscriptionLedger {
    /// Create a ledger, loading existing records from disk.
    pub async fn load(data_dir: &Path) -> Self {
        let storage_path = data_dir.join("subscriptions.json");
        let state = storage::load_or_default(&storage_path).await;

        Self {
            state: RwLock::new(state),
            storage_path,
        }
    }

    async fn save_to_disk(&self) -> Result<(), ApiError> {
        let state = self.state.read().await;
        storage::save_pretty(&self.storage_path, &*state)
            .await
            .map_err(|e| ApiError::Internal(e.into()))
    }

    /// Create a subscription for `user_id` and make it the user's current
    /// one. Any previous subscription is superseded but retained.
    pub async fn create(&self, user_id: Uuid, plan: Plan) -> Result<Subscription, ApiError> {
        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id,
            plan,
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date: now + Duration::days(plan.duration_days()),
            max_agents: plan.max_agents(),
            created_at: now,
        };

        {
            let mut state = self.state.write().await;
            state.subscriptions.insert(subscription.id, subscription.clone());
            state.current.insert(user_id, subscription.id);
        }
        self.save_to_disk().await?;

        tracing::info!(
            "User {} subscribed to {} plan (quota {})",
            user_id,
            plan.as_str(),
            subscription.max_agents
        );
        Ok(subscription)
    }

    /// The user's current subscription record, if any.
    pub async fn current_for(&self, user_id: Uuid) -> Option<Subscription> {
        let state = self.state.read().await;
        let id = state.current.get(&user_id)?;
        state.subscriptions.get(id).cloned()
    }

    /// Whether the user's current subscription is active and unexpired.
    pub async fn is_entitled(&self, user_id: Uuid) -> bool {
        match self.current_for(user_id).await {
            Some(sub) => sub.is_active_at(Utc::now()),
            None => false,
        }
    }

    /// The agent quota granted by the user's current subscription, or 0 when
    /// there is none or it no longer grants entitlement.
    pub async fn quota_for(&self, user_id: Uuid) -> u32 {
        match self.current_for(user_id).await {
            Some(sub) if sub.is_active_at(Utc::now()) => sub.max_agents,
            _ => 0,
        }
    }

    /// Cancel the user's current subscription.
    pub async fn cancel(&self, user_id: Uuid) -> Result<Subscription, ApiError> {
        let cancelled = {
            let mut state = self.state.write().await;
            let id = *state
                .current
                .get(&user_id)
                .ok_or(ApiError::NotFound("Subscription"))?;
            let sub = state
                .subscriptions
                .get_mut(&id)
                .ok_or(ApiError::NotFound("Subscription"))?;
            sub.status = SubscriptionStatus::Cancelled;
            sub.clone()
        };
        self.save_to_disk().await?;

        tracing::info!("User {} cancelled their subscription", user_id);
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_plan_parameters() {
        assert_eq!(Plan::Trial.duration_days(), 14);
        assert_eq!(Plan::Trial.max_agents(), 2);
        assert_eq!(Plan::Monthly.duration_days(), 30);
        assert_eq!(Plan::Monthly.max_agents(), 5);
        assert_eq!(Plan::Yearly.duration_days(), 365);
        assert_eq!(Plan::Yearly.max_agents(), 10);
    }

    #[test]
    fn test_plan_parse() {
        assert_eq!(Plan::parse("monthly").unwrap(), Plan::Monthly);
        let err = Plan::parse("lifetime").unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "plan", .. }));
    }

    #[tokio::test]
    async fn test_create_grants_entitlement() {
        let temp = tempdir().unwrap();
        let ledger = SubscriptionLedger::load(temp.path()).await;
        let user = Uuid::new_v4();

        assert!(!ledger.is_entitled(user).await);
        assert_eq!(ledger.quota_for(user).await, 0);

        let sub = ledger.create(user, Plan::Trial).await.unwrap();
        assert!(sub.end_date > sub.start_date);
        assert!(ledger.is_entitled(user).await);
        assert_eq!(ledger.quota_for(user).await, 2);
    }

    #[tokio::test]
    async fn test_new_subscription_supersedes_previous() {
        let temp = tempdir().unwrap();
        let ledger = SubscriptionLedger::load(temp.path()).await;
        let user = Uuid::new_v4();

        let trial = ledger.create(user, Plan::Trial).await.unwrap();
        let yearly = ledger.create(user, Plan::Yearly).await.unwrap();

        let current = ledger.current_for(user).await.unwrap();
        assert_eq!(current.id, yearly.id);
        assert_eq!(ledger.quota_for(user).await, 10);

        // The superseded record is retained, not merged away.
        let state = ledger.state.read().await;
        assert!(state.subscriptions.contains_key(&trial.id));
        assert_eq!(state.subscriptions.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_window_revokes_entitlement() {
        let temp = tempdir().unwrap();
        let ledger = SubscriptionLedger::load(temp.path()).await;
        let user = Uuid::new_v4();

        let sub = ledger.create(user, Plan::Monthly).await.unwrap();

        // Backdate the validity window; the status field still says active.
        {
            let mut state = ledger.state.write().await;
            let record = state.subscriptions.get_mut(&sub.id).unwrap();
            record.start_date = Utc::now() - Duration::days(40);
            record.end_date = Utc::now() - Duration::days(10);
        }

        assert!(!ledger.is_entitled(user).await);
        assert_eq!(ledger.quota_for(user).await, 0);
    }

    #[tokio::test]
    async fn test_cancel_revokes_entitlement() {
        let temp = tempdir().unwrap();
        let ledger = SubscriptionLedger::load(temp.path()).await;
        let user = Uuid::new_v4();

        ledger.create(user, Plan::Monthly).await.unwrap();
        let cancelled = ledger.cancel(user).await.unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        assert!(!ledger.is_entitled(user).await);
        assert_eq!(ledger.quota_for(user).await, 0);
    }

    #[tokio::test]
    async fn test_cancel_without_subscription() {
        let temp = tempdir().unwrap();
        let ledger = SubscriptionLedger::load(temp.path()).await;

        let err = ledger.cancel(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound("Subscription")));
    }

    #[tokio::test]
    async fn test_persistence_across_loads() {
        let temp = tempdir().unwrap();
        let user = Uuid::new_v4();
        {
            let ledger = SubscriptionLedger::load(temp.path()).await;
            ledger.create(user, Plan::Yearly).await.unwrap();
        }

        let reloaded = SubscriptionLedger::load(temp.path()).await;
        assert_eq!(reloaded.quota_for(user).await, 10);
    }
}

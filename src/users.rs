//! User records and credential verification.
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 digests with a per-user random
//! salt, encoded as `salt$hash` in hex. The stored hash never leaves this
//! module through the API: handlers serialize the [`PublicUser`] projection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;
use crate::storage;

const PBKDF2_ROUNDS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 8;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Outward-facing projection of a user, without the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            created_at: u.created_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Password Hashing
// ─────────────────────────────────────────────────────────────────────────────

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for i in 0..a.len() {
        diff |= a[i] ^ b[i];
    }
    diff == 0
}

/// Derive a `salt$hash` credential string from a plaintext password.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ROUNDS, &mut hash);

    format!("{}${}", hex::encode(salt), hex::encode(hash))
}

/// Check a plaintext password against a stored `salt$hash` credential.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ROUNDS, &mut hash);

    constant_time_eq(&hash, &expected)
}

// ─────────────────────────────────────────────────────────────────────────────
// User Store
// ─────────────────────────────────────────────────────────────────────────────

/// Persistent store for user accounts with JSON file backing.
pub struct UserStore {
    users: RwLock<HashMap<Uuid, User>>,
    storage_path: PathBuf,
}

/// Shared user store for concurrent access.
pub type SharedUserStore = Arc<UserStore>;

impl UserStore {
    /// Create a user store, loading existing accounts from disk.
    pub async fn load(data_dir: &Path) -> Self {
        let storage_path = data_dir.join("users.json");
        let records: Vec<User> = storage::load_or_default(&storage_path).await;

        Self {
            users: RwLock::new(records.into_iter().map(|u| (u.id, u)).collect()),
            storage_path,
        }
    }

    async fn save_to_disk(&self) -> Result<(), ApiError> {
        let users = self.users.read().await;
        let records: Vec<&User> = users.values().collect();
        storage::save_pretty(&self.storage_path, &records)
            .await
            .map_err(|e| ApiError::Internal(e.into()))
    }

    /// Register a new account. The email must be unused and contain an `@`;
    /// the password must be at least 8 characters.
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(ApiError::validation("email", "must be a valid email address"));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(
                "password",
                format!("must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }

        let user = {
            let mut users = self.users.write().await;
            if users.values().any(|u| u.email == email) {
                return Err(ApiError::validation("email", "Email already in use"));
            }

            let user = User {
                id: Uuid::new_v4(),
                email,
                name: name.trim().to_string(),
                password_hash: hash_password(password),
                created_at: Utc::now(),
            };
            users.insert(user.id, user.clone());
            user
        };

        self.save_to_disk().await?;
        tracing::info!("Registered user {} ({})", user.email, user.id);
        Ok(user)
    }

    /// Look up a user and verify the password, returning the user on match.
    ///
    /// An unknown email still performs a dummy verification so the response
    /// time does not reveal whether the account exists.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Option<User> {
        let email = email.trim().to_lowercase();
        let user = {
            let users = self.users.read().await;
            users.values().find(|u| u.email == email).cloned()
        };

        match user {
            Some(user) if verify_password(password, &user.password_hash) => Some(user),
            Some(_) => None,
            None => {
                let _ = verify_password(password, "00$00");
                None
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<User> {
        let users = self.users.read().await;
        users.get(&id).cloned()
    }

    pub async fn find_by_email(&self, email: &str) -> Option<User> {
        let email = email.trim().to_lowercase();
        let users = self.users.read().await;
        users.values().find(|u| u.email == email).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_password_round_trip() {
        let stored = hash_password("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &stored));
        assert!(!verify_password("wrong password", &stored));
    }

    #[test]
    fn test_distinct_salts() {
        let a = hash_password("same password");
        let b = hash_password("same password");
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_malformed_credential() {
        assert!(!verify_password("anything", "not-a-credential"));
        assert!(!verify_password("anything", "zz$zz"));
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let temp = tempdir().unwrap();
        let store = UserStore::load(temp.path()).await;

        let user = store
            .register("ada@example.com", "Ada", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");

        // Correct credentials
        let found = store
            .verify_credentials("ada@example.com", "hunter2hunter2")
            .await;
        assert_eq!(found.unwrap().id, user.id);

        // Wrong password, unknown email
        assert!(store
            .verify_credentials("ada@example.com", "nope-nope")
            .await
            .is_none());
        assert!(store
            .verify_credentials("ghost@example.com", "hunter2hunter2")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let temp = tempdir().unwrap();
        let store = UserStore::load(temp.path()).await;

        store
            .register("ada@example.com", "Ada", "hunter2hunter2")
            .await
            .unwrap();
        let err = store
            .register("ADA@example.com", "Imposter", "hunter2hunter2")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "email", .. }));
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let temp = tempdir().unwrap();
        let store = UserStore::load(temp.path()).await;

        let err = store
            .register("ada@example.com", "Ada", "short")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "password", .. }));
    }

    #[tokio::test]
    async fn test_persistence_across_loads() {
        let temp = tempdir().unwrap();
        let id = {
            let store = UserStore::load(temp.path()).await;
            store
                .register("ada@example.com", "Ada", "hunter2hunter2")
                .await
                .unwrap()
                .id
        };

        let reloaded = UserStore::load(temp.path()).await;
        assert_eq!(reloaded.get(id).await.unwrap().email, "ada@example.com");
    }
}

// ============================
// crates/backend-lib/src/store.rs
// ============================
//! Credential store abstraction with flat-file implementation.
//!
//! The store owns the single shared mutable point of truth for auth: the
//! `current_token` column on each user record. It is mutated only by
//! login/logout, last-write-wins; a reader holding a stale copy is
//! rejected by the auth gate on its next request.
use async_trait::async_trait;
use dashmap::DashMap;
use savour_common::{Role, UserId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokio::fs as tokio_fs;

use crate::error::AppError;

/// Persisted user record. Never hard-deleted; deactivation flips
/// `active` instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAccount {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub email: String,
    /// The only durable copy of "which token is valid" for this user.
    /// `None` exactly when the user is logged out.
    pub current_token: Option<String>,
    pub active: bool,
}

/// Fields supplied at registration; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub email: String,
}

/// Trait for credential store backends
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a user record, enforcing username and email uniqueness.
    async fn create_user(&self, new_user: NewUser) -> Result<UserAccount, AppError>;

    /// Look up an account by username
    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, AppError>;

    /// Look up an account by email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, AppError>;

    /// Look up an account by id
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserAccount>, AppError>;

    /// Overwrite the stored token. Last write wins; concurrent logins by
    /// the same user race and the loser's in-memory token goes stale.
    async fn set_current_token(
        &self,
        user_id: UserId,
        token: Option<String>,
    ) -> Result<(), AppError>;
}

/// Flat-file implementation of the `CredentialStore` trait. One JSON
/// document per user under `users/`, with in-memory username/email
/// indexes rebuilt on startup.
#[derive(Clone)]
pub struct FlatFileStore {
    root: PathBuf,
    usernames: Arc<DashMap<String, UserId>>,
    emails: Arc<DashMap<String, UserId>>,
    next_id: Arc<AtomicU64>,
}

impl FlatFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("users"))?;

        let usernames = Arc::new(DashMap::new());
        let emails = Arc::new(DashMap::new());
        let mut max_id = 0;

        for entry in fs::read_dir(root.join("users"))? {
            let entry = entry?;
            if entry.path().extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let content = fs::read_to_string(entry.path())?;
            let account: UserAccount = serde_json::from_str(&content)?;
            usernames.insert(account.username.clone(), account.user_id);
            emails.insert(account.email.clone(), account.user_id);
            max_id = max_id.max(account.user_id);
        }

        Ok(Self {
            root,
            usernames,
            emails,
            next_id: Arc::new(AtomicU64::new(max_id + 1)),
        })
    }

    fn user_path(&self, user_id: UserId) -> PathBuf {
        self.root.join("users").join(format!("{user_id}.json"))
    }

    async fn write_account(&self, account: &UserAccount) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(account)?;
        tokio_fs::write(self.user_path(account.user_id), json).await?;
        Ok(())
    }

    async fn read_account(&self, user_id: UserId) -> Result<Option<UserAccount>, AppError> {
        let path = self.user_path(user_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio_fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

#[async_trait]
impl CredentialStore for FlatFileStore {
    async fn create_user(&self, new_user: NewUser) -> Result<UserAccount, AppError> {
        if self.usernames.contains_key(&new_user.username) {
            return Err(AppError::InvalidInput("Username already taken".to_string()));
        }
        if self.emails.contains_key(&new_user.email) {
            return Err(AppError::InvalidInput("Email already taken".to_string()));
        }

        let user_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let account = UserAccount {
            user_id,
            username: new_user.username,
            password_hash: new_user.password_hash,
            role: new_user.role,
            email: new_user.email,
            current_token: None,
            active: true,
        };

        self.write_account(&account).await?;
        self.usernames
            .insert(account.username.clone(), account.user_id);
        self.emails.insert(account.email.clone(), account.user_id);

        tracing::info!(user_id, username = %account.username, "user registered");
        Ok(account)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, AppError> {
        match self.usernames.get(username) {
            Some(id) => self.read_account(*id).await,
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, AppError> {
        match self.emails.get(email) {
            Some(id) => self.read_account(*id).await,
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserAccount>, AppError> {
        self.read_account(user_id).await
    }

    async fn set_current_token(
        &self,
        user_id: UserId,
        token: Option<String>,
    ) -> Result<(), AppError> {
        let mut account = self
            .read_account(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;
        account.current_token = token;
        self.write_account(&account).await
    }
}

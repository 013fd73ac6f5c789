//! Account registration and lifecycle.
//!
//! Accounts are soft-deactivated, never deleted; an inactive account is
//! invisible everywhere except the privileged deactivate/reactivate
//! paths.

use chrono::Utc;
use store::{MarketStore, Role, User, UserId};
use thiserror::Error;

use crate::error::DomainError;

/// Input for [`UserService::register`]. The password arrives already
/// hashed; this layer never sees plaintext.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Profile fields a user may rewrite. Both are overwritten as given;
/// `None` clears.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Account rule violations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Email is already registered.
    #[error("Email is already registered")]
    EmailTaken,

    /// Username is already taken.
    #[error("Username is already taken")]
    UsernameTaken,

    /// Reactivation target is already active.
    #[error("Account is already active")]
    AlreadyActive,
}

/// Service for account registration and lifecycle.
pub struct UserService<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> UserService<S> {
    /// Creates a new user service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a new account. Email is checked before username, so a
    /// request clashing on both reports the email first.
    #[tracing::instrument(skip(self, new), fields(username = %new.username))]
    pub async fn register(&self, new: NewUser) -> Result<User, DomainError> {
        if self.store.user_by_email(&new.email).await?.is_some() {
            return Err(UserError::EmailTaken.into());
        }
        if self.store.user_by_username(&new.username).await?.is_some() {
            return Err(UserError::UsernameTaken.into());
        }

        let user = User {
            id: UserId::new(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            role: Role::User,
            active: true,
            first_name: None,
            last_name: None,
            created_at: Utc::now(),
        };
        self.store.insert_user(user.clone()).await?;
        tracing::info!(user_id = %user.id, "account registered");
        Ok(user)
    }

    /// Fetches an account. Inactive accounts resolve as not found.
    pub async fn user(&self, id: UserId) -> Result<User, DomainError> {
        self.store
            .user(id)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    /// Overwrites the caller's profile names.
    #[tracing::instrument(skip(self))]
    pub async fn update_profile(
        &self,
        caller: UserId,
        changes: ProfileChanges,
    ) -> Result<User, DomainError> {
        let mut user = self.user(caller).await?;
        user.first_name = changes.first_name;
        user.last_name = changes.last_name;
        self.store.update_user(user.clone()).await?;
        Ok(user)
    }

    /// Deactivates an account. Resolves rows that are already inactive,
    /// so the privileged path can act on any account.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&self, id: UserId) -> Result<(), DomainError> {
        let mut user = self
            .store
            .user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))?;
        user.active = false;
        self.store.update_user(user).await?;
        tracing::info!(user_id = %id, "account deactivated");
        Ok(())
    }

    /// Reactivates a deactivated account.
    #[tracing::instrument(skip(self))]
    pub async fn reactivate(&self, id: UserId) -> Result<User, DomainError> {
        let mut user = self
            .store
            .user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))?;
        if user.active {
            return Err(UserError::AlreadyActive.into());
        }
        user.active = true;
        self.store.update_user(user.clone()).await?;
        tracing::info!(user_id = %id, "account reactivated");
        Ok(user)
    }

    /// All active accounts, ordered by username.
    pub async fn active_users(&self) -> Result<Vec<User>, DomainError> {
        Ok(self.store.list_active_users().await?)
    }
}

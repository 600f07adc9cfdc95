//! Account service
//!
//! Account lifecycle and the follow graph.

use std::sync::Arc;

use chrono::Utc;
use validator::ValidateEmail;

use super::content::{require_active_account, window};
use crate::auth::{Session, create_session_token, hash_password, verify_password};
use crate::config::AuthConfig;
use crate::data::{
    Account, AccountPatch, AccountRepository, AccountStatus, AccountView, Database, EntityId,
    FollowEdge, FollowRepository, FollowState, NewAccount, Page,
};
use crate::error::{AppError, Result};
use crate::notification::{NotificationEvent, NotificationPublisher};

const USERNAME_MIN_CHARS: usize = 3;
const USERNAME_MAX_CHARS: usize = 30;
const PASSWORD_MIN_CHARS: usize = 8;

fn normalize_username(username: &str) -> Result<String> {
    let username = username.trim().to_lowercase();
    let length = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&length) {
        return Err(AppError::Validation(format!(
            "username must be {}-{} characters",
            USERNAME_MIN_CHARS, USERNAME_MAX_CHARS
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
    {
        return Err(AppError::Validation(
            "username may only contain a-z, 0-9, '_' and '.'".to_string(),
        ));
    }
    Ok(username)
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if !email.validate_email() {
        return Err(AppError::Validation("email address is invalid".to_string()));
    }
    Ok(email)
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            PASSWORD_MIN_CHARS
        )));
    }
    Ok(())
}

async fn hash_password_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}

/// Account lifecycle and follow graph service
pub struct AccountGraphService {
    accounts: Arc<dyn AccountRepository>,
    follows: Arc<dyn FollowRepository>,
    publisher: Arc<dyn NotificationPublisher>,
    auth: AuthConfig,
    page_size: u32,
}

impl AccountGraphService {
    pub fn new(
        db: Arc<Database>,
        publisher: Arc<dyn NotificationPublisher>,
        auth: AuthConfig,
        page_size: u32,
    ) -> Self {
        Self {
            accounts: db.clone(),
            follows: db,
            publisher,
            auth,
            page_size,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Register a new account
    ///
    /// # Errors
    /// `Validation` for malformed fields, `Conflict` if the username or
    /// email is held by another active account
    pub async fn register(&self, input: NewAccount) -> Result<AccountView> {
        let username = normalize_username(&input.username)?;
        let email = normalize_email(&input.email)?;
        validate_password(&input.password)?;

        if self.accounts.username_taken(&username, None).await? {
            return Err(AppError::Conflict("username already in use".to_string()));
        }
        if self.accounts.email_taken(&email, None).await? {
            return Err(AppError::Conflict("email already in use".to_string()));
        }

        let password_hash = hash_password_blocking(input.password).await?;
        let now = Utc::now();
        let account = Account {
            id: EntityId::new().0,
            username,
            email,
            password_hash,
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.accounts.insert_account(&account).await?;

        tracing::info!(account_id = %account.id, username = %account.username, "account registered");
        Ok(AccountView::from(&account))
    }

    pub async fn get(&self, account_id: &str) -> Result<AccountView> {
        let account = require_active_account(self.accounts.as_ref(), account_id).await?;
        Ok(AccountView::from(&account))
    }

    /// Apply a partial update to the caller's own account
    pub async fn update(&self, account_id: &str, patch: AccountPatch) -> Result<AccountView> {
        let mut account = require_active_account(self.accounts.as_ref(), account_id).await?;

        if let Some(username) = patch.username {
            let username = normalize_username(&username)?;
            if self
                .accounts
                .username_taken(&username, Some(account_id))
                .await?
            {
                return Err(AppError::Conflict("username already in use".to_string()));
            }
            account.username = username;
        }
        if let Some(email) = patch.email {
            let email = normalize_email(&email)?;
            if self.accounts.email_taken(&email, Some(account_id)).await? {
                return Err(AppError::Conflict("email already in use".to_string()));
            }
            account.email = email;
        }
        if let Some(password) = patch.password {
            validate_password(&password)?;
            account.password_hash = hash_password_blocking(password).await?;
        }
        if let Some(name) = patch.name {
            account.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            account.description = description.trim().to_string();
        }
        account.updated_at = Utc::now();

        if !self.accounts.update_account(&account).await? {
            return Err(AppError::NotFound("Account"));
        }

        tracing::info!(account_id, "account updated");
        Ok(AccountView::from(&account))
    }

    /// Soft-delete an account, returning its last view
    pub async fn delete(&self, account_id: &str) -> Result<AccountView> {
        let account = require_active_account(self.accounts.as_ref(), account_id).await?;
        if !self.accounts.delete_account(account_id, Utc::now()).await? {
            return Err(AppError::NotFound("Account"));
        }

        tracing::info!(account_id, "account deleted");
        Ok(AccountView::from(&account))
    }

    /// Exchange credentials for a signed session token
    ///
    /// # Errors
    /// `NotFound` for an unknown email, `Unauthorized` for a wrong password
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String> {
        let email = email.trim().to_lowercase();
        let account = self
            .accounts
            .find_active_account_by_email(&email)
            .await?
            .ok_or(AppError::NotFound("Account"))?;

        let password = password.to_string();
        let hash = account.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;
        if !matches {
            tracing::warn!(account_id = %account.id, "rejected login with wrong password");
            return Err(AppError::Unauthorized);
        }

        let session = Session::new(account.id, self.auth.session_max_age);
        create_session_token(&session, &self.auth.session_secret)
    }

    // =========================================================================
    // Follow graph
    // =========================================================================

    /// Start following `target_id`
    ///
    /// # Errors
    /// `NotFound` if either account is missing or deleted, `Conflict` if an
    /// active edge already exists
    pub async fn follow(&self, follower_id: &str, target_id: &str) -> Result<AccountView> {
        require_active_account(self.accounts.as_ref(), follower_id).await?;
        let target = require_active_account(self.accounts.as_ref(), target_id).await?;

        if self
            .follows
            .find_active_follow(follower_id, target_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "already following this account".to_string(),
            ));
        }

        let edge = FollowEdge {
            id: EntityId::new().0,
            follower_id: follower_id.to_string(),
            followed_id: target_id.to_string(),
            state: FollowState::Active,
            followed_at: Utc::now(),
            unfollowed_at: None,
        };
        self.follows.insert_follow(&edge).await?;

        tracing::info!(follower_id, followed_id = target_id, "account followed");
        self.publisher
            .publish(NotificationEvent::follow_account(target_id));

        Ok(AccountView::from(&target))
    }

    /// End the active edge from `follower_id` to `target_id`
    ///
    /// # Errors
    /// `NotFound` if the target is missing or deleted, `Conflict` if there is
    /// no active edge to end
    pub async fn unfollow(&self, follower_id: &str, target_id: &str) -> Result<AccountView> {
        let target = require_active_account(self.accounts.as_ref(), target_id).await?;

        let edge = self
            .follows
            .find_active_follow(follower_id, target_id)
            .await?
            .ok_or_else(|| AppError::Conflict("not following this account".to_string()))?;

        if !self.follows.end_follow(&edge.id, Utc::now()).await? {
            return Err(AppError::Conflict(
                "not following this account".to_string(),
            ));
        }

        tracing::info!(follower_id, followed_id = target_id, "account unfollowed");
        Ok(AccountView::from(&target))
    }

    /// Accounts `account_id` follows, oldest follow first
    pub async fn list_following(&self, account_id: &str, page: Page) -> Result<Vec<AccountView>> {
        require_active_account(self.accounts.as_ref(), account_id).await?;
        let (limit, offset) = window(page, self.page_size);
        let accounts = self
            .follows
            .list_following(account_id, limit, offset)
            .await?;
        Ok(accounts.iter().map(AccountView::from).collect())
    }

    /// Accounts following `account_id`, oldest follow first
    pub async fn list_followers(&self, account_id: &str, page: Page) -> Result<Vec<AccountView>> {
        require_active_account(self.accounts.as_ref(), account_id).await?;
        let (limit, offset) = window(page, self.page_size);
        let accounts = self
            .follows
            .list_followers(account_id, limit, offset)
            .await?;
        Ok(accounts.iter().map(AccountView::from).collect())
    }

    /// Every edge ever created from `follower_id` to `target_id`
    pub async fn follow_history(&self, follower_id: &str, target_id: &str) -> Result<Vec<FollowEdge>> {
        self.follows.follow_history(follower_id, target_id).await
    }
}

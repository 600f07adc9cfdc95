//! Persistence contracts
//!
//! Services depend on these traits rather than on `Database` directly.
//! `Database` implements every one of them against SQLite.
//!
//! "Active" lookups ignore soft-deleted rows. Mutations return `false` when
//! no active row matched, which callers report as `NotFound` or `Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{
    Account, Comment, FollowEdge, Interaction, InteractionKind, InteractionTarget, Post,
};
use crate::error::Result;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Fails with `Conflict` when the username or email is held by an active account
    async fn insert_account(&self, account: &Account) -> Result<()>;

    async fn find_active_account(&self, id: &str) -> Result<Option<Account>>;

    async fn find_active_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Whether an active account other than `excluding` holds the username
    async fn username_taken(&self, username: &str, excluding: Option<&str>) -> Result<bool>;

    /// Whether an active account other than `excluding` holds the email
    async fn email_taken(&self, email: &str, excluding: Option<&str>) -> Result<bool>;

    /// Persist mutable profile fields of an active account
    async fn update_account(&self, account: &Account) -> Result<bool>;

    async fn delete_account(&self, id: &str, at: DateTime<Utc>) -> Result<bool>;
}

#[async_trait]
pub trait FollowRepository: Send + Sync {
    async fn find_active_follow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<Option<FollowEdge>>;

    /// Fails with `Conflict` when an active edge already exists for the pair
    async fn insert_follow(&self, edge: &FollowEdge) -> Result<()>;

    async fn end_follow(&self, edge_id: &str, at: DateTime<Utc>) -> Result<bool>;

    /// Active accounts followed by `account_id`, oldest edge first
    async fn list_following(&self, account_id: &str, limit: i64, offset: i64)
    -> Result<Vec<Account>>;

    /// Active accounts following `account_id`, oldest edge first
    async fn list_followers(&self, account_id: &str, limit: i64, offset: i64)
    -> Result<Vec<Account>>;

    /// Every edge ever created for the ordered pair, oldest first
    async fn follow_history(&self, follower_id: &str, followed_id: &str)
    -> Result<Vec<FollowEdge>>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert_post(&self, post: &Post) -> Result<()>;

    async fn find_active_post(&self, id: &str) -> Result<Option<Post>>;

    async fn update_post_content(&self, id: &str, content: &str, at: DateTime<Utc>)
    -> Result<bool>;

    async fn remove_post(&self, id: &str, at: DateTime<Utc>) -> Result<bool>;

    /// Newest first
    async fn list_posts_by_account(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>>;

    /// Posts by accounts `follower_id` actively follows, newest first
    async fn list_feed(&self, follower_id: &str, limit: i64, offset: i64) -> Result<Vec<Post>>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert_comment(&self, comment: &Comment) -> Result<()>;

    async fn find_active_comment(&self, id: &str) -> Result<Option<Comment>>;

    async fn update_comment_content(
        &self,
        id: &str,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn remove_comment(&self, id: &str, at: DateTime<Utc>) -> Result<bool>;

    async fn list_comments_by_account(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>>;

    async fn list_comments_by_post(
        &self,
        post_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>>;

    async fn list_replies(
        &self,
        parent_comment_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>>;
}

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Fails with `Conflict` when the account already reacts to the target
    async fn insert_interaction(&self, interaction: &Interaction) -> Result<()>;

    async fn find_active_interaction(&self, id: &str) -> Result<Option<Interaction>>;

    async fn find_active_interaction_for(
        &self,
        account_id: &str,
        target: &InteractionTarget,
    ) -> Result<Option<Interaction>>;

    async fn update_interaction_kind(
        &self,
        id: &str,
        kind: InteractionKind,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn remove_interaction(&self, id: &str, at: DateTime<Utc>) -> Result<bool>;
}

/// Joins used by the notification consumer to find who to tell.
///
/// Every method only returns emails of active accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecipientRepository: Send + Sync {
    /// Followers of the author of `post_id`
    async fn post_author_follower_emails(&self, post_id: &str) -> Result<Vec<String>>;

    /// Owner of the commented post and, for replies, owner of the parent comment
    async fn comment_recipient_emails(&self, comment_id: &str) -> Result<Vec<String>>;

    /// Owner of the post or comment the interaction targets
    async fn interaction_recipient_email(&self, interaction_id: &str) -> Result<Option<String>>;

    async fn account_email(&self, account_id: &str) -> Result<Option<String>>;
}

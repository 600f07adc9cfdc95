//! Interaction service
//!
//! Likes and dislikes. An account holds at most one active reaction per
//! post or comment, whatever its kind.

use std::sync::Arc;

use chrono::Utc;

use super::content::{ensure_owner, require_active_account};
use crate::data::{
    AccountRepository, CommentRepository, ContentStatus, Database, EntityId, Interaction,
    InteractionKind, InteractionRepository, InteractionTarget, InteractionView, PostRepository,
};
use crate::error::{AppError, Result};
use crate::notification::{NotificationEvent, NotificationPublisher};

pub struct InteractionService {
    accounts: Arc<dyn AccountRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    interactions: Arc<dyn InteractionRepository>,
    publisher: Arc<dyn NotificationPublisher>,
}

impl InteractionService {
    pub fn new(db: Arc<Database>, publisher: Arc<dyn NotificationPublisher>) -> Self {
        Self {
            accounts: db.clone(),
            posts: db.clone(),
            comments: db.clone(),
            interactions: db,
            publisher,
        }
    }

    async fn require_target(&self, target: &InteractionTarget) -> Result<()> {
        match target {
            InteractionTarget::Post(post_id) => self
                .posts
                .find_active_post(post_id)
                .await?
                .map(|_| ())
                .ok_or(AppError::NotFound("Post")),
            InteractionTarget::Comment(comment_id) => self
                .comments
                .find_active_comment(comment_id)
                .await?
                .map(|_| ())
                .ok_or(AppError::NotFound("Comment")),
        }
    }

    async fn require_active_interaction(&self, interaction_id: &str) -> Result<Interaction> {
        self.interactions
            .find_active_interaction(interaction_id)
            .await?
            .ok_or(AppError::NotFound("Interaction"))
    }

    /// React to a post or comment
    ///
    /// `kind` is parsed case-insensitively before anything is read or written.
    ///
    /// # Errors
    /// `Validation` for an unknown kind, `NotFound` for a missing account or
    /// target, `Conflict` if the account already reacts to the target
    pub async fn create(
        &self,
        account_id: &str,
        target: InteractionTarget,
        kind: &str,
    ) -> Result<InteractionView> {
        let kind: InteractionKind = kind.parse()?;
        require_active_account(self.accounts.as_ref(), account_id).await?;
        self.require_target(&target).await?;

        if self
            .interactions
            .find_active_interaction_for(account_id, &target)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "already reacted to this target".to_string(),
            ));
        }

        let now = Utc::now();
        let interaction = Interaction {
            id: EntityId::new().0,
            account_id: account_id.to_string(),
            target,
            kind,
            status: ContentStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.interactions.insert_interaction(&interaction).await?;

        tracing::info!(interaction_id = %interaction.id, account_id, kind = %kind, "interaction created");
        self.publisher
            .publish(NotificationEvent::interaction(&interaction.id));

        Ok(InteractionView::from(&interaction))
    }

    pub async fn get(&self, interaction_id: &str) -> Result<InteractionView> {
        let interaction = self.require_active_interaction(interaction_id).await?;
        Ok(InteractionView::from(&interaction))
    }

    /// Switch the kind of the caller's own reaction
    pub async fn update(
        &self,
        interaction_id: &str,
        caller_id: &str,
        kind: &str,
    ) -> Result<InteractionView> {
        let kind: InteractionKind = kind.parse()?;
        require_active_account(self.accounts.as_ref(), caller_id).await?;
        let mut interaction = self.require_active_interaction(interaction_id).await?;
        ensure_owner(&interaction.account_id, caller_id)?;

        let now = Utc::now();
        if !self
            .interactions
            .update_interaction_kind(interaction_id, kind, now)
            .await?
        {
            return Err(AppError::NotFound("Interaction"));
        }

        interaction.kind = kind;
        interaction.updated_at = now;

        tracing::info!(interaction_id, kind = %kind, "interaction updated");
        Ok(InteractionView::from(&interaction))
    }

    /// Withdraw the caller's own reaction, returning its last view
    pub async fn remove(&self, interaction_id: &str, caller_id: &str) -> Result<InteractionView> {
        require_active_account(self.accounts.as_ref(), caller_id).await?;
        let interaction = self.require_active_interaction(interaction_id).await?;
        ensure_owner(&interaction.account_id, caller_id)?;

        if !self
            .interactions
            .remove_interaction(interaction_id, Utc::now())
            .await?
        {
            return Err(AppError::NotFound("Interaction"));
        }

        tracing::info!(interaction_id, "interaction removed");
        Ok(InteractionView::from(&interaction))
    }
}

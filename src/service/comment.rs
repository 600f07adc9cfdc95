//! Comment service
//!
//! Comments hang off a post and may reply to another comment on the same
//! post. Same ownership and removal rules as posts.

use std::sync::Arc;

use chrono::Utc;

use super::content::{
    cache_aside, ensure_owner, list_fingerprint, normalize_content, require_active_account, window,
};
use crate::data::{
    AccountRepository, Comment, CommentRepository, CommentView, ContentStatus, Database, EntityId,
    Page, PostRepository, ResponseCache,
};
use crate::error::{AppError, Result};
use crate::notification::{NotificationEvent, NotificationPublisher};

pub struct CommentService {
    accounts: Arc<dyn AccountRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    cache: Arc<ResponseCache>,
    publisher: Arc<dyn NotificationPublisher>,
    page_size: u32,
}

impl CommentService {
    pub fn new(
        db: Arc<Database>,
        cache: Arc<ResponseCache>,
        publisher: Arc<dyn NotificationPublisher>,
        page_size: u32,
    ) -> Self {
        Self {
            accounts: db.clone(),
            posts: db.clone(),
            comments: db,
            cache,
            publisher,
            page_size,
        }
    }

    async fn require_active_comment(&self, comment_id: &str) -> Result<Comment> {
        self.comments
            .find_active_comment(comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment"))
    }

    async fn require_active_post(&self, post_id: &str) -> Result<()> {
        self.posts
            .find_active_post(post_id)
            .await?
            .map(|_| ())
            .ok_or(AppError::NotFound("Post"))
    }

    /// Comment on a post, optionally as a reply to `parent_comment_id`
    ///
    /// # Errors
    /// `NotFound` if the author, post or parent is missing or removed;
    /// `Validation` if the parent belongs to another post
    pub async fn create(
        &self,
        author_id: &str,
        post_id: &str,
        parent_comment_id: Option<&str>,
        content: &str,
    ) -> Result<CommentView> {
        let content = normalize_content(content)?;
        require_active_account(self.accounts.as_ref(), author_id).await?;
        self.require_active_post(post_id).await?;

        let parent_comment_id = match parent_comment_id.map(str::trim) {
            Some(parent_id) if !parent_id.is_empty() => {
                let parent = self.require_active_comment(parent_id).await?;
                if parent.post_id != post_id {
                    return Err(AppError::Validation(
                        "parent comment belongs to a different post".to_string(),
                    ));
                }
                Some(parent.id)
            }
            _ => None,
        };

        let now = Utc::now();
        let comment = Comment {
            id: EntityId::new().0,
            account_id: author_id.to_string(),
            post_id: post_id.to_string(),
            parent_comment_id,
            content,
            status: ContentStatus::Active,
            created_at: now,
            updated_at: now,
            likes: 0,
            dislikes: 0,
        };
        self.comments.insert_comment(&comment).await?;

        tracing::info!(comment_id = %comment.id, post_id, account_id = author_id, "comment created");
        self.publisher
            .publish(NotificationEvent::comment(&comment.id));

        Ok(CommentView::from(comment))
    }

    pub async fn get(&self, comment_id: &str) -> Result<CommentView> {
        self.require_active_comment(comment_id)
            .await
            .map(CommentView::from)
    }

    pub async fn update(
        &self,
        comment_id: &str,
        caller_id: &str,
        content: &str,
    ) -> Result<CommentView> {
        let content = normalize_content(content)?;
        require_active_account(self.accounts.as_ref(), caller_id).await?;
        let comment = self.require_active_comment(comment_id).await?;
        ensure_owner(&comment.account_id, caller_id)?;

        if !self
            .comments
            .update_comment_content(comment_id, &content, Utc::now())
            .await?
        {
            return Err(AppError::NotFound("Comment"));
        }

        tracing::info!(comment_id, "comment updated");
        self.get(comment_id).await
    }

    pub async fn remove(&self, comment_id: &str, caller_id: &str) -> Result<CommentView> {
        require_active_account(self.accounts.as_ref(), caller_id).await?;
        let comment = self.require_active_comment(comment_id).await?;
        ensure_owner(&comment.account_id, caller_id)?;

        if !self.comments.remove_comment(comment_id, Utc::now()).await? {
            return Err(AppError::NotFound("Comment"));
        }

        tracing::info!(comment_id, "comment removed");
        Ok(CommentView::from(comment))
    }

    /// Comments written by `owner_id`, newest first
    pub async fn list_by_owner(
        &self,
        owner_id: &str,
        caller_id: &str,
        page: Page,
    ) -> Result<Vec<CommentView>> {
        let fingerprint = list_fingerprint(
            "/accounts/comments",
            &[("id", owner_id.to_string())],
            page,
            caller_id,
        );

        cache_aside(&self.cache, fingerprint, || async {
            require_active_account(self.accounts.as_ref(), caller_id).await?;
            require_active_account(self.accounts.as_ref(), owner_id).await?;

            let (limit, offset) = window(page, self.page_size);
            let comments = self
                .comments
                .list_comments_by_account(owner_id, limit, offset)
                .await?;
            Ok(comments.into_iter().map(CommentView::from).collect())
        })
        .await
    }

    /// Every comment on a post, replies included, newest first
    pub async fn list_by_post(
        &self,
        post_id: &str,
        caller_id: &str,
        page: Page,
    ) -> Result<Vec<CommentView>> {
        let fingerprint = list_fingerprint(
            &format!("/comments/{post_id}"),
            &[],
            page,
            caller_id,
        );

        cache_aside(&self.cache, fingerprint, || async {
            require_active_account(self.accounts.as_ref(), caller_id).await?;
            self.require_active_post(post_id).await?;

            let (limit, offset) = window(page, self.page_size);
            let comments = self
                .comments
                .list_comments_by_post(post_id, limit, offset)
                .await?;
            Ok(comments.into_iter().map(CommentView::from).collect())
        })
        .await
    }

    /// Direct replies to a comment on `post_id`, newest first
    ///
    /// # Errors
    /// `Validation` if the comment belongs to another post
    pub async fn list_replies(
        &self,
        post_id: &str,
        comment_id: &str,
        caller_id: &str,
        page: Page,
    ) -> Result<Vec<CommentView>> {
        let fingerprint = list_fingerprint(
            &format!("/comments/{post_id}"),
            &[("parent", comment_id.to_string())],
            page,
            caller_id,
        );

        cache_aside(&self.cache, fingerprint, || async {
            require_active_account(self.accounts.as_ref(), caller_id).await?;
            let parent = self.require_active_comment(comment_id).await?;
            if parent.post_id != post_id {
                return Err(AppError::Validation(
                    "parent comment belongs to a different post".to_string(),
                ));
            }

            let (limit, offset) = window(page, self.page_size);
            let replies = self
                .comments
                .list_replies(comment_id, limit, offset)
                .await?;
            Ok(replies.into_iter().map(CommentView::from).collect())
        })
        .await
    }
}

//! SQLite database operations
//!
//! All database access goes through this module. `Database` implements the
//! repository traits; status-guarded updates keep terminal rows frozen.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use super::models::*;
use super::repository::*;
use crate::error::AppError;

const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// Post columns plus like/dislike counts derived from active interactions
const POST_COLUMNS: &str = "p.id, p.account_id, p.content, p.status, p.created_at, p.updated_at, \
     (SELECT COUNT(*) FROM interactions i \
      WHERE i.post_id = p.id AND i.status = 'active' AND i.kind = 'LIKE') AS likes, \
     (SELECT COUNT(*) FROM interactions i \
      WHERE i.post_id = p.id AND i.status = 'active' AND i.kind = 'DISLIKE') AS dislikes";

const COMMENT_COLUMNS: &str = "c.id, c.account_id, c.post_id, c.parent_comment_id, c.content, \
     c.status, c.created_at, c.updated_at, \
     (SELECT COUNT(*) FROM interactions i \
      WHERE i.comment_id = c.id AND i.status = 'active' AND i.kind = 'LIKE') AS likes, \
     (SELECT COUNT(*) FROM interactions i \
      WHERE i.comment_id = c.id AND i.status = 'active' AND i.kind = 'DISLIKE') AS dislikes";

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to a SQLite file, creating it if needed, and run migrations
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        Self::connect_with(path, DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn connect_with(path: &Path, max_connections: u32) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }
}

// =========================================================================
// Accounts
// =========================================================================

#[async_trait]
impl AccountRepository for Database {
    async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO accounts
                (id, username, email, password_hash, name, description, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.name)
        .bind(&account.description)
        .bind(account.status)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "username or email already in use"))?;
        Ok(())
    }

    async fn find_active_account(&self, id: &str) -> Result<Option<Account>, AppError> {
        let account =
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ? AND status = 'active'")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(account)
    }

    async fn find_active_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE email = ? AND status = 'active'",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn username_taken(&self, username: &str, excluding: Option<&str>) -> Result<bool, AppError> {
        let taken: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM accounts
                WHERE username = ? AND status = 'active' AND id IS NOT ?
            )
            "#,
        )
        .bind(username)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken != 0)
    }

    async fn email_taken(&self, email: &str, excluding: Option<&str>) -> Result<bool, AppError> {
        let taken: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM accounts
                WHERE email = ? AND status = 'active' AND id IS NOT ?
            )
            "#,
        )
        .bind(email)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken != 0)
    }

    async fn update_account(&self, account: &Account) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET username = ?, email = ?, password_hash = ?, name = ?, description = ?, updated_at = ?
            WHERE id = ? AND status = 'active'
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.name)
        .bind(&account.description)
        .bind(account.updated_at)
        .bind(&account.id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "username or email already in use"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_account(&self, id: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE accounts SET status = 'deleted', updated_at = ? WHERE id = ? AND status = 'active'",
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// =========================================================================
// Follow graph
// =========================================================================

#[async_trait]
impl FollowRepository for Database {
    async fn find_active_follow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<Option<FollowEdge>, AppError> {
        let edge = sqlx::query_as::<_, FollowEdge>(
            "SELECT * FROM follows WHERE follower_id = ? AND followed_id = ? AND state = 'active'",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(edge)
    }

    async fn insert_follow(&self, edge: &FollowEdge) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO follows (id, follower_id, followed_id, state, followed_at, unfollowed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&edge.id)
        .bind(&edge.follower_id)
        .bind(&edge.followed_id)
        .bind(edge.state)
        .bind(edge.followed_at)
        .bind(edge.unfollowed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "already following this account"))?;
        Ok(())
    }

    async fn end_follow(&self, edge_id: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE follows SET state = 'unfollowed', unfollowed_at = ? WHERE id = ? AND state = 'active'",
        )
        .bind(at)
        .bind(edge_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_following(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Account>, AppError> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT a.* FROM follows f
            JOIN accounts a ON a.id = f.followed_id AND a.status = 'active'
            WHERE f.follower_id = ? AND f.state = 'active'
            ORDER BY f.followed_at ASC, f.id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(accounts)
    }

    async fn list_followers(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Account>, AppError> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT a.* FROM follows f
            JOIN accounts a ON a.id = f.follower_id AND a.status = 'active'
            WHERE f.followed_id = ? AND f.state = 'active'
            ORDER BY f.followed_at ASC, f.id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(accounts)
    }

    async fn follow_history(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<Vec<FollowEdge>, AppError> {
        let edges = sqlx::query_as::<_, FollowEdge>(
            r#"
            SELECT * FROM follows
            WHERE follower_id = ? AND followed_id = ?
            ORDER BY followed_at ASC, id ASC
            "#,
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(edges)
    }
}

// =========================================================================
// Posts
// =========================================================================

#[async_trait]
impl PostRepository for Database {
    async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, account_id, content, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.account_id)
        .bind(&post.content)
        .bind(post.status)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_active_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ? AND p.status = 'active'"
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn update_post_content(
        &self,
        id: &str,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE posts SET content = ?, updated_at = ? WHERE id = ? AND status = 'active'",
        )
        .bind(content)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_post(&self, id: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE posts SET status = 'removed', updated_at = ? WHERE id = ? AND status = 'active'",
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_posts_by_account(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, AppError> {
        let query = format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts p
            WHERE p.account_id = ? AND p.status = 'active'
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ? OFFSET ?
            "#
        );
        let posts = sqlx::query_as::<_, Post>(&query)
            .bind(account_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn list_feed(
        &self,
        follower_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, AppError> {
        let query = format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts p
            JOIN follows f ON f.followed_id = p.account_id AND f.state = 'active'
            JOIN accounts a ON a.id = p.account_id AND a.status = 'active'
            WHERE f.follower_id = ? AND p.status = 'active'
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ? OFFSET ?
            "#
        );
        let posts = sqlx::query_as::<_, Post>(&query)
            .bind(follower_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }
}

// =========================================================================
// Comments
// =========================================================================

impl Database {
    async fn list_comments_where(
        &self,
        column: &str,
        value: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>, AppError> {
        let query = format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments c
            WHERE c.{column} = ? AND c.status = 'active'
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT ? OFFSET ?
            "#
        );
        let comments = sqlx::query_as::<_, Comment>(&query)
            .bind(value)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }
}

#[async_trait]
impl CommentRepository for Database {
    async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO comments
                (id, account_id, post_id, parent_comment_id, content, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.account_id)
        .bind(&comment.post_id)
        .bind(&comment.parent_comment_id)
        .bind(&comment.content)
        .bind(comment.status)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_active_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = ? AND c.status = 'active'"
        );
        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn update_comment_content(
        &self,
        id: &str,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE comments SET content = ?, updated_at = ? WHERE id = ? AND status = 'active'",
        )
        .bind(content)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_comment(&self, id: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE comments SET status = 'removed', updated_at = ? WHERE id = ? AND status = 'active'",
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_comments_by_account(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>, AppError> {
        self.list_comments_where("account_id", account_id, limit, offset)
            .await
    }

    async fn list_comments_by_post(
        &self,
        post_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>, AppError> {
        self.list_comments_where("post_id", post_id, limit, offset)
            .await
    }

    async fn list_replies(
        &self,
        parent_comment_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>, AppError> {
        self.list_comments_where("parent_comment_id", parent_comment_id, limit, offset)
            .await
    }
}

// =========================================================================
// Interactions
// =========================================================================

#[async_trait]
impl InteractionRepository for Database {
    async fn insert_interaction(&self, interaction: &Interaction) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO interactions
                (id, account_id, post_id, comment_id, kind, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&interaction.id)
        .bind(&interaction.account_id)
        .bind(interaction.target.post_id())
        .bind(interaction.target.comment_id())
        .bind(interaction.kind)
        .bind(interaction.status)
        .bind(interaction.created_at)
        .bind(interaction.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "already reacted to this target"))?;
        Ok(())
    }

    async fn find_active_interaction(&self, id: &str) -> Result<Option<Interaction>, AppError> {
        let record = sqlx::query_as::<_, InteractionRecord>(
            "SELECT * FROM interactions WHERE id = ? AND status = 'active'",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        record.map(Interaction::try_from).transpose()
    }

    async fn find_active_interaction_for(
        &self,
        account_id: &str,
        target: &InteractionTarget,
    ) -> Result<Option<Interaction>, AppError> {
        let (column, target_id) = match target {
            InteractionTarget::Post(id) => ("post_id", id),
            InteractionTarget::Comment(id) => ("comment_id", id),
        };
        let query = format!(
            "SELECT * FROM interactions WHERE account_id = ? AND {column} = ? AND status = 'active'"
        );
        let record = sqlx::query_as::<_, InteractionRecord>(&query)
            .bind(account_id)
            .bind(target_id)
            .fetch_optional(&self.pool)
            .await?;
        record.map(Interaction::try_from).transpose()
    }

    async fn update_interaction_kind(
        &self,
        id: &str,
        kind: InteractionKind,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE interactions SET kind = ?, updated_at = ? WHERE id = ? AND status = 'active'",
        )
        .bind(kind)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_interaction(&self, id: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE interactions SET status = 'removed', updated_at = ? WHERE id = ? AND status = 'active'",
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// =========================================================================
// Notification recipients
// =========================================================================

#[async_trait]
impl RecipientRepository for Database {
    async fn post_author_follower_emails(&self, post_id: &str) -> Result<Vec<String>, AppError> {
        let emails = sqlx::query_scalar::<_, String>(
            r#"
            SELECT a.email FROM posts p
            JOIN follows f ON f.followed_id = p.account_id AND f.state = 'active'
            JOIN accounts a ON a.id = f.follower_id AND a.status = 'active'
            WHERE p.id = ? AND p.status = 'active'
            ORDER BY f.followed_at ASC, f.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(emails)
    }

    async fn comment_recipient_emails(&self, comment_id: &str) -> Result<Vec<String>, AppError> {
        // UNION drops the duplicate when one account owns both post and parent
        let emails = sqlx::query_scalar::<_, String>(
            r#"
            SELECT a.email FROM comments c
            JOIN posts p ON p.id = c.post_id
            JOIN accounts a ON a.id = p.account_id AND a.status = 'active'
            WHERE c.id = ?
            UNION
            SELECT a.email FROM comments c
            JOIN comments parent ON parent.id = c.parent_comment_id
            JOIN accounts a ON a.id = parent.account_id AND a.status = 'active'
            WHERE c.id = ?
            "#,
        )
        .bind(comment_id)
        .bind(comment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(emails)
    }

    async fn interaction_recipient_email(
        &self,
        interaction_id: &str,
    ) -> Result<Option<String>, AppError> {
        let email = sqlx::query_scalar::<_, String>(
            r#"
            SELECT a.email FROM interactions i
            LEFT JOIN posts p ON p.id = i.post_id
            LEFT JOIN comments c ON c.id = i.comment_id
            JOIN accounts a ON a.id = COALESCE(p.account_id, c.account_id) AND a.status = 'active'
            WHERE i.id = ?
            "#,
        )
        .bind(interaction_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(email)
    }

    async fn account_email(&self, account_id: &str) -> Result<Option<String>, AppError> {
        let email = sqlx::query_scalar::<_, String>(
            "SELECT email FROM accounts WHERE id = ? AND status = 'active'",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(email)
    }
}

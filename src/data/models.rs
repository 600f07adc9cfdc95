//! Data models
//!
//! Rust structs representing database entities and their public views.
//! All models use ULID for IDs and chrono for timestamps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Lifecycle states
// =============================================================================

/// Account lifecycle; `Deleted` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Deleted,
}

/// Post, comment and interaction lifecycle; `Removed` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Active,
    Removed,
}

/// Follow edge lifecycle; `Unfollowed` is terminal for that edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FollowState {
    Active,
    Unfollowed,
}

// =============================================================================
// Account
// =============================================================================

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub description: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of an account
///
/// Never carries the email or the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            name: account.name.clone(),
            description: account.description.clone(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Registration input
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Partial account update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// Follow graph
// =============================================================================

/// Directed follow edge. Re-following creates a new row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FollowEdge {
    pub id: String,
    pub follower_id: String,
    pub followed_id: String,
    pub state: FollowState,
    pub followed_at: DateTime<Utc>,
    pub unfollowed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Posts and comments
// =============================================================================

/// A post row together with its derived reaction counts
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub account_id: String,
    pub content: String,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Active LIKE interactions, computed at read time
    #[sqlx(default)]
    pub likes: i64,
    /// Active DISLIKE interactions, computed at read time
    #[sqlx(default)]
    pub dislikes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub account_id: String,
    pub content: String,
    #[serde(rename = "like")]
    pub likes: i64,
    #[serde(rename = "dislike")]
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            account_id: post.account_id,
            content: post.content,
            likes: post.likes,
            dislikes: post.dislikes,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// A comment row together with its derived reaction counts
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub account_id: String,
    pub post_id: String,
    /// Set when this comment replies to another comment on the same post
    pub parent_comment_id: Option<String>,
    pub content: String,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub likes: i64,
    #[sqlx(default)]
    pub dislikes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: String,
    pub account_id: String,
    pub post_id: String,
    pub parent_comment_id: Option<String>,
    pub content: String,
    #[serde(rename = "like")]
    pub likes: i64,
    #[serde(rename = "dislike")]
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            account_id: comment.account_id,
            post_id: comment.post_id,
            parent_comment_id: comment.parent_comment_id,
            content: comment.content,
            likes: comment.likes,
            dislikes: comment.dislikes,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

// =============================================================================
// Interactions
// =============================================================================

/// Reaction kind. Parsing is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InteractionKind {
    Like,
    Dislike,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "LIKE",
            Self::Dislike => "DISLIKE",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LIKE" => Ok(Self::Like),
            "DISLIKE" => Ok(Self::Dislike),
            _ => Err(AppError::Validation(format!(
                "interaction type must be LIKE or DISLIKE, got {:?}",
                value
            ))),
        }
    }
}

/// What an interaction reacts to: exactly one post or one comment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum InteractionTarget {
    Post(String),
    Comment(String),
}

impl InteractionTarget {
    /// Build a target from the two optional ids a client may send.
    ///
    /// Blank ids count as absent. Exactly one must remain.
    pub fn from_ids(
        post_id: Option<String>,
        comment_id: Option<String>,
    ) -> Result<Self, AppError> {
        let non_blank = |id: Option<String>| id.filter(|value| !value.trim().is_empty());

        match (non_blank(post_id), non_blank(comment_id)) {
            (Some(post_id), None) => Ok(Self::Post(post_id)),
            (None, Some(comment_id)) => Ok(Self::Comment(comment_id)),
            (Some(_), Some(_)) => Err(AppError::Validation(
                "interaction must target either a post or a comment, not both".to_string(),
            )),
            (None, None) => Err(AppError::Validation(
                "interaction must target a post or a comment".to_string(),
            )),
        }
    }

    pub fn post_id(&self) -> Option<&str> {
        match self {
            Self::Post(id) => Some(id),
            Self::Comment(_) => None,
        }
    }

    pub fn comment_id(&self) -> Option<&str> {
        match self {
            Self::Post(_) => None,
            Self::Comment(id) => Some(id),
        }
    }
}

/// Interaction row as stored: one of the two target columns is set
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InteractionRecord {
    pub id: String,
    pub account_id: String,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
    pub kind: InteractionKind,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A like or dislike by one account on one target
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub id: String,
    pub account_id: String,
    pub target: InteractionTarget,
    pub kind: InteractionKind,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<InteractionRecord> for Interaction {
    type Error = AppError;

    fn try_from(record: InteractionRecord) -> Result<Self, Self::Error> {
        let target = InteractionTarget::from_ids(record.post_id, record.comment_id).map_err(
            |_| {
                AppError::Internal(anyhow::anyhow!(
                    "interaction {} has an invalid target",
                    record.id
                ))
            },
        )?;

        Ok(Self {
            id: record.id,
            account_id: record.account_id,
            target,
            kind: record.kind,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionView {
    pub id: String,
    pub account_id: String,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Interaction> for InteractionView {
    fn from(interaction: &Interaction) -> Self {
        Self {
            id: interaction.id.clone(),
            account_id: interaction.account_id.clone(),
            post_id: interaction.target.post_id().map(str::to_string),
            comment_id: interaction.target.comment_id().map(str::to_string),
            kind: interaction.kind,
            created_at: interaction.created_at,
            updated_at: interaction.updated_at,
        }
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// 1-indexed page number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page(u32);

impl Page {
    pub const FIRST: Page = Page(1);

    pub fn new(number: u32) -> Result<Self, AppError> {
        if number == 0 {
            return Err(AppError::Validation("page must be >= 1".to_string()));
        }
        Ok(Self(number))
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    /// Row offset for the given page size
    pub fn offset(&self, page_size: u32) -> i64 {
        i64::from(self.0 - 1) * i64::from(page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_kind_parses_case_insensitively() {
        assert_eq!("like".parse::<InteractionKind>().unwrap(), InteractionKind::Like);
        assert_eq!(
            " DisLike ".parse::<InteractionKind>().unwrap(),
            InteractionKind::Dislike
        );
        assert!(matches!(
            "love".parse::<InteractionKind>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn target_requires_exactly_one_id() {
        assert_eq!(
            InteractionTarget::from_ids(Some("p1".into()), None).unwrap(),
            InteractionTarget::Post("p1".into())
        );
        assert_eq!(
            InteractionTarget::from_ids(Some("  ".into()), Some("c1".into())).unwrap(),
            InteractionTarget::Comment("c1".into())
        );
        assert!(InteractionTarget::from_ids(Some("p1".into()), Some("c1".into())).is_err());
        assert!(InteractionTarget::from_ids(None, Some(String::new())).is_err());
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(matches!(Page::new(0), Err(AppError::Validation(_))));
        assert_eq!(Page::new(3).unwrap().offset(10), 20);
        assert_eq!(Page::FIRST.offset(10), 0);
    }

    #[test]
    fn views_use_wire_names() {
        let now = Utc::now();
        let view = PostView {
            id: "p".into(),
            account_id: "a".into(),
            content: "hi".into(),
            likes: 2,
            dislikes: 1,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["like"], 2);
        assert_eq!(json["dislike"], 1);

        let interaction = Interaction {
            id: "i".into(),
            account_id: "a".into(),
            target: InteractionTarget::Comment("c".into()),
            kind: InteractionKind::Dislike,
            status: ContentStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(InteractionView::from(&interaction)).unwrap();
        assert_eq!(json["type"], "DISLIKE");
        assert_eq!(json["comment_id"], "c");
        assert!(json["post_id"].is_null());
    }
}

//! Request and response bodies for the HTTP API

use serde::{Deserialize, Serialize};

use crate::data::Page;
use crate::error::Result;

/// `?page=` and optional `?id=` on listing routes
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Account (or comment) the listing is about; defaults to the caller
    pub id: Option<String>,
    pub page: Option<u32>,
}

impl ListQuery {
    /// Requested page, first page when absent
    pub fn page(&self) -> Result<Page> {
        self.page.map_or(Ok(Page::FIRST), Page::new)
    }

    /// Subject id, falling back to the caller
    pub fn subject_or<'a>(&'a self, caller_id: &'a str) -> &'a str {
        self.id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(caller_id)
    }
}

/// `?parent=` narrows a post's comments to replies of one comment
#[derive(Debug, Default, Deserialize)]
pub struct CommentListQuery {
    pub parent: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    #[serde(default)]
    pub parent_comment_id: Option<String>,
}

/// Edit body shared by posts and comments
#[derive(Debug, Deserialize)]
pub struct UpdateContentRequest {
    pub id: String,
    pub content: String,
}

/// Body naming the entity to remove
#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateInteractionRequest {
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub comment_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInteractionRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

//! Comment endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use super::dto::{
    CommentListQuery, CreateCommentRequest, IdRequest, ListQuery, UpdateContentRequest,
};
use crate::AppState;
use crate::auth::CurrentAccount;
use crate::data::{CommentView, Page};
use crate::error::AppError;

pub fn comments_router() -> Router<AppState> {
    Router::new()
        .route("/comments", put(update_comment).delete(remove_comment))
        .route("/comments/:post_id", post(create_comment).get(list_post_comments))
        .route("/accounts/comments", get(list_account_comments))
}

async fn create_comment(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Path(post_id): Path<String>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = state
        .comments
        .create(
            caller.id(),
            &post_id,
            body.parent_comment_id.as_deref(),
            &body.content,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// `GET /comments/:post_id?parent=&page=`
async fn list_post_comments(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Path(post_id): Path<String>,
    Query(query): Query<CommentListQuery>,
) -> Result<Json<Vec<CommentView>>, AppError> {
    let page = query.page.map_or(Ok(Page::FIRST), Page::new)?;
    let comments = match query.parent.as_deref() {
        Some(parent_id) => {
            state
                .comments
                .list_replies(&post_id, parent_id, caller.id(), page)
                .await?
        }
        None => {
            state
                .comments
                .list_by_post(&post_id, caller.id(), page)
                .await?
        }
    };
    Ok(Json(comments))
}

async fn update_comment(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Json(body): Json<UpdateContentRequest>,
) -> Result<Json<CommentView>, AppError> {
    let comment = state
        .comments
        .update(&body.id, caller.id(), &body.content)
        .await?;
    Ok(Json(comment))
}

async fn remove_comment(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Json(body): Json<IdRequest>,
) -> Result<Json<CommentView>, AppError> {
    Ok(Json(state.comments.remove(&body.id, caller.id()).await?))
}

/// `GET /accounts/comments?id=&page=`
async fn list_account_comments(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CommentView>>, AppError> {
    let comments = state
        .comments
        .list_by_owner(query.subject_or(caller.id()), caller.id(), query.page()?)
        .await?;
    Ok(Json(comments))
}

//! Post endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use super::dto::{CreatePostRequest, IdRequest, ListQuery, UpdateContentRequest};
use crate::AppState;
use crate::auth::CurrentAccount;
use crate::data::PostView;
use crate::error::AppError;

pub fn posts_router() -> Router<AppState> {
    Router::new()
        .route(
            "/posts",
            post(create_post).put(update_post).delete(remove_post),
        )
        .route("/posts/:post_id", get(get_post))
        .route("/accounts/posts", get(list_account_posts))
}

async fn create_post(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Json(body): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let post = state.posts.create(caller.id(), &body.content).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(state): State<AppState>,
    _caller: CurrentAccount,
    Path(post_id): Path<String>,
) -> Result<Json<PostView>, AppError> {
    Ok(Json(state.posts.get(&post_id).await?))
}

async fn update_post(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Json(body): Json<UpdateContentRequest>,
) -> Result<Json<PostView>, AppError> {
    let post = state
        .posts
        .update(&body.id, caller.id(), &body.content)
        .await?;
    Ok(Json(post))
}

async fn remove_post(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Json(body): Json<IdRequest>,
) -> Result<Json<PostView>, AppError> {
    Ok(Json(state.posts.remove(&body.id, caller.id()).await?))
}

/// `GET /accounts/posts?id=&page=`
async fn list_account_posts(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let posts = state
        .posts
        .list_by_owner(query.subject_or(caller.id()), caller.id(), query.page()?)
        .await?;
    Ok(Json(posts))
}

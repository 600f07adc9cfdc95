//! Account, session and follow-graph endpoints

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::dto::{AuthRequest, FollowRequest, ListQuery, TokenResponse};
use crate::AppState;
use crate::auth::{CurrentAccount, SESSION_COOKIE};
use crate::data::{AccountPatch, AccountView, FollowEdge, NewAccount, PostView};
use crate::error::AppError;

pub fn accounts_router() -> Router<AppState> {
    Router::new()
        .route("/auth", post(authenticate))
        .route("/accounts/auth", post(authenticate))
        .route(
            "/accounts",
            post(register)
                .get(get_account)
                .put(update_account)
                .delete(delete_account),
        )
        .route("/accounts/follows", post(follow).delete(unfollow))
        .route("/accounts/follows/history", get(follow_history))
        .route("/accounts/follows/posts", get(following_feed))
        .route("/accounts/following", get(list_following))
        .route("/accounts/followers", get(list_followers))
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<NewAccount>,
) -> Result<impl IntoResponse, AppError> {
    let account = state.accounts.register(input).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Exchange email and password for a session token
///
/// The token is returned in the body and also set as the `session` cookie.
/// Expiry lives in the signed token, so the cookie itself is session-scoped.
async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<AuthRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = state
        .accounts
        .authenticate(&body.email, &body.password)
        .await?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), Json(TokenResponse { token })))
}

/// `GET /accounts?id=` shows any active account, the caller's by default
async fn get_account(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Query(query): Query<ListQuery>,
) -> Result<Json<AccountView>, AppError> {
    let account = state.accounts.get(query.subject_or(caller.id())).await?;
    Ok(Json(account))
}

async fn update_account(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Json(patch): Json<AccountPatch>,
) -> Result<Json<AccountView>, AppError> {
    let account = state.accounts.update(caller.id(), patch).await?;
    Ok(Json(account))
}

async fn delete_account(
    State(state): State<AppState>,
    caller: CurrentAccount,
) -> Result<Json<AccountView>, AppError> {
    let account = state.accounts.delete(caller.id()).await?;
    Ok(Json(account))
}

async fn follow(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Json(body): Json<FollowRequest>,
) -> Result<Json<AccountView>, AppError> {
    let account = state.accounts.follow(caller.id(), &body.account_id).await?;
    Ok(Json(account))
}

async fn unfollow(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Json(body): Json<FollowRequest>,
) -> Result<Json<AccountView>, AppError> {
    let account = state
        .accounts
        .unfollow(caller.id(), &body.account_id)
        .await?;
    Ok(Json(account))
}

/// Edges from the caller to `?id=`, oldest first
async fn follow_history(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<FollowEdge>>, AppError> {
    let target_id = query
        .id
        .as_deref()
        .ok_or_else(|| AppError::Validation("id is required".to_string()))?;
    let edges = state.accounts.follow_history(caller.id(), target_id).await?;
    Ok(Json(edges))
}

async fn following_feed(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let posts = state
        .posts
        .list_by_following_graph(caller.id(), query.page()?)
        .await?;
    Ok(Json(posts))
}

async fn list_following(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AccountView>>, AppError> {
    let accounts = state
        .accounts
        .list_following(query.subject_or(caller.id()), query.page()?)
        .await?;
    Ok(Json(accounts))
}

async fn list_followers(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AccountView>>, AppError> {
    let accounts = state
        .accounts
        .list_followers(query.subject_or(caller.id()), query.page()?)
        .await?;
    Ok(Json(accounts))
}

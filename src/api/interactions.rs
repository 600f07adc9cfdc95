//! Like/dislike endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use super::dto::{CreateInteractionRequest, IdRequest, UpdateInteractionRequest};
use crate::AppState;
use crate::auth::CurrentAccount;
use crate::data::{InteractionTarget, InteractionView};
use crate::error::AppError;

pub fn interactions_router() -> Router<AppState> {
    Router::new()
        .route(
            "/interaction",
            post(create_interaction)
                .put(update_interaction)
                .delete(remove_interaction),
        )
        .route("/interaction/:interaction_id", get(get_interaction))
}

async fn create_interaction(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Json(body): Json<CreateInteractionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let target = InteractionTarget::from_ids(body.post_id, body.comment_id)?;
    let interaction = state
        .interactions
        .create(caller.id(), target, &body.kind)
        .await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

async fn get_interaction(
    State(state): State<AppState>,
    _caller: CurrentAccount,
    Path(interaction_id): Path<String>,
) -> Result<Json<InteractionView>, AppError> {
    Ok(Json(state.interactions.get(&interaction_id).await?))
}

async fn update_interaction(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Json(body): Json<UpdateInteractionRequest>,
) -> Result<Json<InteractionView>, AppError> {
    let interaction = state
        .interactions
        .update(&body.id, caller.id(), &body.kind)
        .await?;
    Ok(Json(interaction))
}

async fn remove_interaction(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Json(body): Json<IdRequest>,
) -> Result<Json<InteractionView>, AppError> {
    Ok(Json(
        state.interactions.remove(&body.id, caller.id()).await?,
    ))
}

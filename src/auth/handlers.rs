use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

use super::dto::{LoginRequest, MessageResponse, RegisterRequest, TokenResponse, UserResponse};
use super::extractors::CurrentUser;
use super::jwt::JwtKeys;
use super::service;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/protected", get(protected))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    service::register(
        &state,
        &payload.username,
        &payload.password,
        payload.full_name.as_deref(),
    )
    .await?;

    Ok(Json(MessageResponse {
        message: "User registered successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = service::authenticate(&state, &payload.username, &payload.password).await?;

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign(&user.username)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".into(),
        expires_in: keys.ttl.as_secs() as i64,
    }))
}

#[instrument(skip_all)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

#[instrument(skip_all)]
pub async fn protected(CurrentUser(user): CurrentUser) -> Json<serde_json::Value> {
    Json(json!({
        "message": format!("Hello {}, this is a protected route!", user.username),
        "user_id": user.id,
    }))
}

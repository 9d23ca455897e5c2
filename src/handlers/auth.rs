// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RegisterRequest},
    services::authz::Principal,
    state::AppState,
    utils::jwt::sign_jwt,
};

/// Registers a student or faculty account.
///
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.accounts.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates by roll number / teacher id and returns a JWT token.
pub async fn login(
    State(state): State<AppState>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.accounts.authenticate(&payload).await?;

    let token = sign_jwt(
        user.id,
        payload.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": payload.role,
        "user": user,
    })))
}

/// Profile of the current principal.
pub async fn me(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let user = state.accounts.profile(principal.id).await?;
    Ok(Json(user))
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{material::CreateMaterialRequest, notification::CreateNotificationRequest},
    services::authz::Principal,
    state::AppState,
};

pub async fn upload_material(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateMaterialRequest>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = state.accounts.profile(principal.id).await?;
    let material = state.materials.upload(&teacher, payload).await?;
    Ok((StatusCode::CREATED, Json(material)))
}

/// Department materials for students, own uploads for faculty.
pub async fn list_materials(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let user = state.accounts.profile(principal.id).await?;
    Ok(Json(state.materials.list_for(&user).await?))
}

pub async fn delete_material(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.materials.delete(id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish_notification(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateNotificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let notification = state.notifications.publish(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

pub async fn list_notifications(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.notifications.list_for(&principal).await?))
}

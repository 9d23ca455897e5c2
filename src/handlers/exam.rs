// src/handlers/exam.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::exam::{
        CreateExamRequest, CreateQuestionRequest, UpdateExamRequest, UpdateQuestionRequest,
    },
    services::authz::Principal,
    state::AppState,
};

/// Creates an exam owned by the calling teacher.
pub async fn create_exam(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let exam = state.authoring.create_exam(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

pub async fn list_my_exams(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.authoring.list_my_exams(&principal).await?))
}

/// Exam with questions and answer key. Owner only.
pub async fn get_exam(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.authoring.get_exam(id, &principal).await?))
}

pub async fn update_exam(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.authoring.update_exam(id, &principal, payload).await?))
}

/// Deletes an exam together with its questions, options and results.
pub async fn delete_exam(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.authoring.delete_exam(id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Adds a question with its option set (exactly one correct option).
pub async fn add_question(
    State(state): State<AppState>,
    principal: Principal,
    Path(exam_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question = state
        .authoring
        .add_question(exam_id, &principal, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_question(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        state
            .authoring
            .update_question(id, &principal, payload)
            .await?,
    ))
}

pub async fn delete_question(
    State(state): State<AppState>,
    principal: Principal,
    Path((exam_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .authoring
        .delete_question(exam_id, question_id, &principal)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// All student summaries of an exam. Owner only.
pub async fn exam_results(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.grading.exam_results(id, &principal).await?))
}

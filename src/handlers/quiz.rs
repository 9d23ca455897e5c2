// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::result::SubmitExamRequest,
    services::authz::Principal,
    state::AppState,
};

/// Exams of the student's class that have not ended, with attempt flags.
pub async fn available_exams(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let student = state.accounts.profile(principal.id).await?;
    Ok(Json(
        state.grading.available_exams(&student, Utc::now()).await?,
    ))
}

/// Opens an attempt and returns the paper without the answer key.
pub async fn start_exam(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student = state.accounts.profile(principal.id).await?;
    Ok(Json(
        state.grading.start_exam(id, &student, Utc::now()).await?,
    ))
}

/// Submits a student's answers and grades them.
///
/// * Rejected with 403 outside the attempt window; nothing is written then.
/// * Unknown question or option ids count as unanswered.
/// * Resubmission overwrites the previous answers.
pub async fn submit_exam(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student = state.accounts.profile(principal.id).await?;
    let report = state
        .grading
        .grade_submission(id, &student, &req.answers, Utc::now())
        .await?;
    Ok(Json(report))
}

/// The student's own graded attempt with question-wise details.
pub async fn exam_report(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.grading.exam_report(id, principal.id).await?))
}

// src/handlers/attendance.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::attendance::{CreateLectureRequest, DateQuery, TakeAttendanceRequest},
    services::authz::Principal,
    state::AppState,
};

/// Adds a lecture to the timetable, taught by the calling teacher.
pub async fn create_lecture(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateLectureRequest>,
) -> Result<impl IntoResponse, AppError> {
    let lecture = state.timetable.create_lecture(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(lecture)))
}

/// The calling teacher's lectures grouped by weekday.
pub async fn my_lectures(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.timetable.my_lectures(&principal).await?))
}

/// Records attendance for a lecture; repeated calls overwrite per student and date.
pub async fn take_attendance(
    State(state): State<AppState>,
    principal: Principal,
    Path(lecture_id): Path<i64>,
    Json(payload): Json<TakeAttendanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let today = Utc::now().date_naive();
    Ok(Json(
        state
            .attendance
            .take_attendance(lecture_id, &principal, payload, today)
            .await?,
    ))
}

pub async fn lecture_attendance(
    State(state): State<AppState>,
    principal: Principal,
    Path(lecture_id): Path<i64>,
    Query(params): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        state
            .attendance
            .lecture_by_date(lecture_id, &principal, params.date)
            .await?,
    ))
}

/// Weekly timetable of the student's class.
pub async fn student_timetable(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let student = state.accounts.profile(principal.id).await?;
    Ok(Json(state.timetable.timetable_for_student(&student).await?))
}

pub async fn student_attendance(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        state
            .attendance
            .student_by_date(principal.id, params.date)
            .await?,
    ))
}

pub async fn student_percentage(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        state.attendance.student_percentages(principal.id).await?,
    ))
}

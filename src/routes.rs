// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attendance, auth, exam, material, quiz},
    state::AppState,
    utils::jwt::{auth_middleware, faculty_middleware, student_middleware},
};

/// Assembles the main application router.
///
/// * Public: register and login.
/// * Authenticated: profile and notifications, for either role.
/// * `/api/faculty` and `/api/student` additionally check the token's role.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let authenticate = middleware::from_fn_with_state(state.config.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let common_routes = Router::new()
        .route("/api/me", get(auth::me))
        .route("/api/notifications", get(material::list_notifications))
        .route_layer(authenticate.clone());

    let faculty_routes = Router::new()
        .route("/exams", post(exam::create_exam).get(exam::list_my_exams))
        .route(
            "/exams/{id}",
            get(exam::get_exam)
                .put(exam::update_exam)
                .delete(exam::delete_exam),
        )
        .route("/exams/{id}/results", get(exam::exam_results))
        .route("/exams/{id}/questions", post(exam::add_question))
        .route("/questions/{id}", put(exam::update_question))
        .route(
            "/exams/{exam_id}/questions/{question_id}",
            delete(exam::delete_question),
        )
        .route(
            "/lectures",
            post(attendance::create_lecture).get(attendance::my_lectures),
        )
        .route(
            "/lectures/{id}/attendance",
            post(attendance::take_attendance).get(attendance::lecture_attendance),
        )
        .route(
            "/materials",
            post(material::upload_material).get(material::list_materials),
        )
        .route("/materials/{id}", delete(material::delete_material))
        .route("/notifications", post(material::publish_notification))
        // Auth first, then the role check
        .layer(middleware::from_fn(faculty_middleware))
        .layer(authenticate.clone());

    let student_routes = Router::new()
        .route("/exams", get(quiz::available_exams))
        .route("/exams/{id}/start", post(quiz::start_exam))
        .route("/exams/{id}/submit", post(quiz::submit_exam))
        .route("/exams/{id}/report", get(quiz::exam_report))
        .route("/timetable", get(attendance::student_timetable))
        .route("/attendance", get(attendance::student_attendance))
        .route(
            "/attendance/percentage",
            get(attendance::student_percentage),
        )
        .route("/materials", get(material::list_materials))
        .layer(middleware::from_fn(student_middleware))
        .layer(authenticate);

    Router::new()
        .nest("/api/auth", auth_routes)
        .merge(common_routes)
        .nest("/api/faculty", faculty_routes)
        .nest("/api/student", student_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

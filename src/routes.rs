// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, exam},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, student_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, exams, analytics, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (database pool and configuration).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .layer(auth_layer.clone()),
        );

    // Auth first, then the student check.
    let exam_routes = Router::new()
        .route("/", post(exam::start_exam).get(exam::list_my_exams))
        .route("/{id}", get(exam::get_exam))
        .route("/{id}/answers", put(exam::submit_answer))
        .route("/{id}/submit", post(exam::submit_exam))
        .route("/{id}/results", get(exam::get_results))
        .route("/{id}/summary", get(exam::get_summary))
        .layer(middleware::from_fn(student_middleware))
        .layer(auth_layer.clone());

    let analytics_routes = Router::new()
        .route("/topics", get(exam::get_topic_analytics))
        .layer(middleware::from_fn(student_middleware))
        .layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route("/questions/import", post(admin::import_questions))
        .route(
            "/questions/{id}",
            get(admin::get_question)
                .put(admin::update_question)
                .delete(admin::delete_question),
        )
        .route("/audit-logs", get(admin::list_audit_logs))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth_layer);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/analytics", analytics_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

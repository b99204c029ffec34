// tests/auth_guard_tests.rs
//
// Drives the router in-process, without binding a socket.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use exam_server::{models::user::Role, routes, state::AppState, utils::jwt::sign_jwt};
use tower::ServiceExt;

use common::{JWT_SECRET, test_config, test_pool};

async fn router() -> axum::Router {
    let (pool, url) = test_pool().await;
    routes::create_router(AppState {
        pool,
        config: test_config(&url),
    })
}

async fn status_of(request: Request<Body>) -> StatusCode {
    router().await.oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let status = status_of(
        Request::builder()
            .uri("/api/exams")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_header_is_unauthorized() {
    let status = status_of(
        Request::builder()
            .uri("/api/admin/questions")
            .header(header::AUTHORIZATION, "Token abc")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_unauthorized() {
    let token = sign_jwt(1, Role::Admin, "not-the-server-secret", 60).unwrap();
    let status = status_of(
        Request::builder()
            .uri("/api/admin/questions")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn student_token_on_admin_route_is_forbidden() {
    let token = sign_jwt(1, Role::Student, JWT_SECRET, 60).unwrap();
    let status = status_of(
        Request::builder()
            .uri("/api/admin/audit-logs")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_token_reads_audit_logs() {
    let token = sign_jwt(1, Role::Admin, JWT_SECRET, 60).unwrap();
    let status = status_of(
        Request::builder()
            .uri("/api/admin/audit-logs?limit=5")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

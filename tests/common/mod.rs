// tests/common/mod.rs
#![allow(dead_code)]

use chrono::Utc;
use exam_server::{
    config::{Config, ExamSettings},
    db,
    models::question::CreateQuestionRequest,
    routes,
    services::{question_store, scorer::ScoringPolicy},
    state::AppState,
    utils::hash::hash_password,
};
use sqlx::SqlitePool;

pub const PASSWORD: &str = "password123";
pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Fresh database file per test, with migrations applied.
pub async fn test_pool() -> (SqlitePool, String) {
    let path = std::env::temp_dir().join(format!("exam_server_test_{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());

    let pool = db::connect(&url)
        .await
        .expect("Failed to open test database");
    db::migrate(&pool)
        .await
        .expect("Failed to migrate database");

    (pool, url)
}

pub fn settings() -> ExamSettings {
    ExamSettings {
        duration_minutes: 30,
        question_count: 50,
        scoring_policy: ScoringPolicy::Exact,
    }
}

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        log_dir: "logs".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        admin_username: None,
        admin_password: None,
        admin_fullname: None,
        exam: settings(),
    }
}

/// Inserts a user directly, bypassing registration. Returns its id.
pub async fn insert_user(pool: &SqlitePool, username: &str, role: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO users (fullname, username, password, role, created_at) VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(format!("{username} fullname"))
    .bind(username)
    .bind(hash_password(PASSWORD).unwrap())
    .bind(role)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .expect("Failed to insert user")
}

pub fn question(topic: &str, prompt: &str, model_answer: &str) -> CreateQuestionRequest {
    CreateQuestionRequest {
        topic: Some(topic.to_string()),
        prompt: prompt.to_string(),
        model_answer: model_answer.to_string(),
    }
}

/// Three questions over two topics.
pub async fn seed_questions(pool: &SqlitePool) {
    for q in [
        question("Geography", "Capital of France?", "Paris"),
        question("Geography", "Longest river in Africa?", "The Nile"),
        question("Biology", "Powerhouse of the cell?", "Mitochondria"),
    ] {
        question_store::add_question(pool, &q, Utc::now()).await.unwrap();
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
}

/// Spawns the app on a random port.
pub async fn spawn_app() -> TestApp {
    let (pool, url) = test_pool().await;

    let state = AppState {
        pool: pool.clone(),
        config: test_config(&url),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
    }
}

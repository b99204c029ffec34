// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{CreateQuestionRequest, ImportQuestionsRequest, UpdateQuestionRequest},
    services::{audit, question_store},
};

/// Adds a question at the end of the bank.
/// Admin only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let question = question_store::add_question(&pool, &payload, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Appends a batch of questions in the given order.
/// Admin only.
pub async fn import_questions(
    State(pool): State<SqlitePool>,
    Json(payload): Json<ImportQuestionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let questions = question_store::import_questions(&pool, &payload.questions, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(questions)))
}

/// Lists live questions in display order.
/// Admin only.
pub async fn list_questions(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let questions = question_store::list_questions(&pool).await?;
    Ok(Json(questions))
}

pub async fn get_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = question_store::get_question(&pool, id).await?;
    Ok(Json(question))
}

/// Updates topic, prompt or model answer. Display order never changes.
/// Admin only.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let question = question_store::update_question(&pool, id, &payload, Utc::now()).await?;

    Ok(Json(question))
}

/// Removes a question from the bank. Its order value is not reused.
/// Admin only.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    question_store::delete_question(&pool, id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AuditLogParams {
    pub limit: Option<i64>,
}

/// Recent audit entries, newest first.
/// Admin only.
pub async fn list_audit_logs(
    State(pool): State<SqlitePool>,
    Query(params): Query<AuditLogParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    let logs = audit::list(&pool, limit).await?;
    Ok(Json(logs))
}

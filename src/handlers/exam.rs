// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::ExamSettings,
    error::AppError,
    models::exam_session::{SubmitAnswerRequest, SubmitExamRequest},
    services::{analytics, session},
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

/// Starts a timed exam for the current student.
pub async fn start_exam(
    State(pool): State<SqlitePool>,
    State(settings): State<ExamSettings>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let now = Utc::now();

    let started = session::start_exam(&pool, &settings, student_id, now).await?;
    let view = session::get_session_view(&pool, &settings, started.id, student_id, now).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// Dashboard: the student's recent attempts (10 by default).
pub async fn list_my_exams(
    State(pool): State<SqlitePool>,
    State(settings): State<ExamSettings>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let limit = params.limit.unwrap_or(10).clamp(1, 100);

    let sessions =
        session::list_sessions(&pool, &settings, student_id, limit, Utc::now()).await?;

    Ok(Json(sessions))
}

/// Exam page: questions, saved answers and remaining time.
pub async fn get_exam(
    State(pool): State<SqlitePool>,
    State(settings): State<ExamSettings>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let view = session::get_session_view(&pool, &settings, id, student_id, Utc::now()).await?;
    Ok(Json(view))
}

/// Saves one answer while the exam is running.
pub async fn submit_answer(
    State(pool): State<SqlitePool>,
    State(settings): State<ExamSettings>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let student_id = claims.user_id()?;
    let saved = session::submit_answer(
        &pool,
        &settings,
        id,
        student_id,
        payload.question_id,
        &payload.answer,
        Utc::now(),
    )
    .await?;

    Ok(Json(saved))
}

/// Hands the exam in and returns the scored outcome. `{}` is a valid body;
/// `answers` carries an optional last batch.
pub async fn submit_exam(
    State(pool): State<SqlitePool>,
    State(settings): State<ExamSettings>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let student_id = claims.user_id()?;
    let outcome =
        session::submit_exam(&pool, &settings, id, student_id, &payload.answers, Utc::now())
            .await?;

    Ok(Json(outcome))
}

/// Per-question results: answer, correct answer and correctness flag.
pub async fn get_results(
    State(pool): State<SqlitePool>,
    State(settings): State<ExamSettings>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let results = session::get_results(&pool, &settings, id, student_id, Utc::now()).await?;
    Ok(Json(results))
}

/// Score totals and topic breakdown for one exam.
pub async fn get_summary(
    State(pool): State<SqlitePool>,
    State(settings): State<ExamSettings>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let results = session::get_results(&pool, &settings, id, student_id, Utc::now()).await?;
    Ok(Json(analytics::summarize(&results)))
}

/// Topic breakdown across every sealed exam of the student.
pub async fn get_topic_analytics(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let results = session::student_results(&pool, student_id).await?;
    Ok(Json(analytics::summarize(&results)))
}

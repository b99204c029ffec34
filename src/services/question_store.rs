// src/services/question_store.rs

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};

use crate::{
    error::AppError,
    models::question::{CreateQuestionRequest, DEFAULT_TOPIC, Question, UpdateQuestionRequest},
    utils::html::clean_html,
};

const QUESTION_COLUMNS: &str =
    "id, topic, prompt, model_answer, display_order, created_at, updated_at, deleted_at";

/// Topics are plain labels grouped on verbatim, so they are only trimmed.
fn clean_topic(topic: Option<&str>) -> String {
    match topic.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => DEFAULT_TOPIC.to_string(),
    }
}

fn clean_prompt(prompt: &str) -> Result<String, AppError> {
    non_blank("Prompt", clean_html(prompt.trim()))
}

fn clean_model_answer(model_answer: &str) -> Result<String, AppError> {
    non_blank("Model answer", model_answer.trim().to_string())
}

/// A blank model answer could never be scored correct.
fn non_blank(field: &str, text: String) -> Result<String, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be blank")));
    }
    Ok(text)
}

/// Inserts one question at the end of the bank.
///
/// The order is computed inside the INSERT itself, over every row including
/// deleted ones, so it is strictly increasing and never handed out twice.
async fn insert_question<'e>(
    executor: impl SqliteExecutor<'e>,
    req: &CreateQuestionRequest,
    now: DateTime<Utc>,
) -> Result<Question, AppError> {
    let sql = format!(
        r#"
        INSERT INTO questions (topic, prompt, model_answer, display_order, created_at)
        VALUES ($1, $2, $3, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM questions), $4)
        RETURNING {QUESTION_COLUMNS}
        "#
    );

    let prompt = clean_prompt(&req.prompt)?;
    let model_answer = clean_model_answer(&req.model_answer)?;

    let question = sqlx::query_as::<_, Question>(&sql)
        .bind(clean_topic(req.topic.as_deref()))
        .bind(prompt)
        .bind(model_answer)
        .bind(now)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create question: {:?}", e);
            AppError::from(e)
        })?;

    Ok(question)
}

pub async fn add_question(
    pool: &SqlitePool,
    req: &CreateQuestionRequest,
    now: DateTime<Utc>,
) -> Result<Question, AppError> {
    let question = insert_question(pool, req, now).await?;
    tracing::info!(
        "Question {} added with display order {}",
        question.id,
        question.display_order
    );
    Ok(question)
}

/// Appends a batch in the given order. Either every question lands or none does.
pub async fn import_questions(
    pool: &SqlitePool,
    reqs: &[CreateQuestionRequest],
    now: DateTime<Utc>,
) -> Result<Vec<Question>, AppError> {
    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(reqs.len());

    for req in reqs {
        created.push(insert_question(&mut *tx, req, now).await?);
    }

    tx.commit().await?;
    tracing::info!("Imported {} questions", created.len());
    Ok(created)
}

/// Live questions in display order.
pub async fn list_questions(pool: &SqlitePool) -> Result<Vec<Question>, AppError> {
    let sql = format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE deleted_at IS NULL ORDER BY display_order ASC"
    );

    let questions = sqlx::query_as::<_, Question>(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list questions: {:?}", e);
            AppError::from(e)
        })?;

    Ok(questions)
}

pub async fn get_question(pool: &SqlitePool, id: i64) -> Result<Question, AppError> {
    let sql =
        format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 AND deleted_at IS NULL");

    sqlx::query_as::<_, Question>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))
}

/// Applies the fields present in `req`. The display order is never touched.
pub async fn update_question(
    pool: &SqlitePool,
    id: i64,
    req: &UpdateQuestionRequest,
    now: DateTime<Utc>,
) -> Result<Question, AppError> {
    if req.is_empty() {
        return get_question(pool, id).await;
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(topic) = &req.topic {
        separated.push("topic = ");
        separated.push_bind_unseparated(clean_topic(Some(topic)));
    }

    if let Some(prompt) = &req.prompt {
        separated.push("prompt = ");
        separated.push_bind_unseparated(clean_prompt(prompt)?);
    }

    if let Some(model_answer) = &req.model_answer {
        separated.push("model_answer = ");
        separated.push_bind_unseparated(clean_model_answer(model_answer)?);
    }

    separated.push("updated_at = ");
    separated.push_bind_unseparated(now);

    builder.push(" WHERE deleted_at IS NULL AND id = ");
    builder.push_bind(id);

    let result = builder.build().execute(pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    get_question(pool, id).await
}

/// Soft delete. The order value stays taken, leaving a gap in the listing.
pub async fn delete_question(
    pool: &SqlitePool,
    id: i64,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let result =
        sqlx::query("UPDATE questions SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL")
            .bind(now)
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete question: {:?}", e);
                AppError::from(e)
            })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(())
}

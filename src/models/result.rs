// src/models/result.rs

use serde::Serialize;
use sqlx::FromRow;

/// Represents the 'results' table: one scored row per question per session.
/// Topic, prompt and model answer are copied at scoring time, so later edits
/// to the question bank never change a graded exam.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct ExamResult {
    pub session_id: i64,
    pub question_id: i64,
    pub position: i64,
    pub topic: String,
    pub prompt: String,
    pub submitted_answer: String,
    pub model_answer: String,
    pub is_correct: bool,
    pub score: f64,
    pub scored_at: chrono::DateTime<chrono::Utc>,
}

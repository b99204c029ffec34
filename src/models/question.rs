// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

pub const DEFAULT_TOPIC: &str = "General";

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// Label used to group questions in the analytics breakdown.
    pub topic: String,

    /// The text shown to the student, as a sanitized HTML fragment.
    pub prompt: String,

    /// Reference answer the scorer compares against.
    pub model_answer: String,

    /// Position in the bank. Assigned on insert, never changed or reused.
    pub display_order: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for sending a question to a student (no model answer).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PublicQuestion {
    pub question_id: i64,
    pub position: i64,
    pub topic: String,
    pub prompt: String,
}

/// DTO for creating a new question.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 100))]
    pub topic: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub prompt: String,
    #[validate(length(min = 1, max = 5000))]
    pub model_answer: String,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 100))]
    pub topic: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub prompt: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub model_answer: Option<String>,
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.topic.is_none() && self.prompt.is_none() && self.model_answer.is_none()
    }
}

/// DTO for appending several questions at once.
#[derive(Debug, Deserialize, Validate)]
pub struct ImportQuestionsRequest {
    #[validate(length(min = 1, max = 1000), nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

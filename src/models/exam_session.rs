// src/models/exam_session.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{question::PublicQuestion, result::ExamResult};

/// Lifecycle of an attempt. `Created` only exists inside the start
/// transaction; the only runtime transition is `InProgress -> Finalized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    InProgress,
    Finalized,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Created => "created",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Finalized => "finalized",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(SessionStatus::Created),
            "in_progress" => Some(SessionStatus::InProgress),
            "finalized" => Some(SessionStatus::Finalized),
            _ => None,
        }
    }
}

/// Why an attempt was sealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeReason {
    /// The student handed the exam in.
    Submitted,
    /// The deadline passed before a hand-in.
    Expired,
}

impl FinalizeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalizeReason::Submitted => "submitted",
            FinalizeReason::Expired => "expired",
        }
    }
}

/// Represents the 'exam_sessions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExamSession {
    pub id: i64,
    pub student_id: i64,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub status: String,
    pub finalize_reason: Option<String>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub total_score: f64,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    /// Saturates at the latest representable instant instead of overflowing.
    pub fn deadline(&self) -> DateTime<Utc> {
        Duration::try_minutes(self.duration_minutes)
            .and_then(|d| self.started_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Unknown text is treated as sealed so a corrupt row is never writable.
    pub fn status(&self) -> SessionStatus {
        SessionStatus::parse(&self.status).unwrap_or(SessionStatus::Finalized)
    }

    /// True once `now` is past the deadline. The deadline instant itself
    /// still accepts writes.
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline()
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        if self.status() == SessionStatus::Finalized {
            return 0;
        }
        (self.deadline() - now).num_seconds().max(0)
    }
}

/// One row in the student dashboard.
#[derive(Debug, Serialize)]
pub struct SessionListItem {
    #[serde(flatten)]
    pub session: ExamSession,
    pub deadline: DateTime<Utc>,
}

/// A saved (not yet scored) answer.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SavedAnswer {
    pub question_id: i64,
    pub answer_text: String,
    pub answered_at: DateTime<Utc>,
}

/// Everything the exam page needs.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: ExamSession,
    pub deadline: DateTime<Utc>,
    pub remaining_seconds: i64,
    pub questions: Vec<PublicQuestion>,
    pub answers: Vec<SavedAnswer>,
}

/// DTO for saving one answer.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    #[validate(length(max = 10000))]
    pub answer: String,
}

/// One entry of a batch hand-in. A missing question id is rejected.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnswerEntry {
    pub question_id: Option<i64>,
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub answer: String,
}

/// DTO for handing in an exam, optionally with a final batch of answers.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SubmitExamRequest {
    #[serde(default)]
    #[validate(nested)]
    pub answers: Vec<AnswerEntry>,
}

/// Returned by every path that seals a session.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizeOutcome {
    pub session_id: i64,
    pub finalize_reason: Option<String>,
    pub total_score: f64,
    pub max_score: usize,
    /// False when another caller had already sealed the session.
    pub newly_finalized: bool,
    pub results: Vec<ExamResult>,
}

// src/services/session.rs
//
// Exam attempts: start, answer, seal, read back.
//
// Deadlines are enforced lazily: every access compares `now` with the
// deadline and seals an overdue attempt on the spot. Write transactions open
// with a write statement so SQLite queues them on the busy timeout instead of
// failing on a stale read snapshot.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    config::ExamSettings,
    error::{AppError, is_unique_violation},
    models::{
        exam_session::{
            AnswerEntry, ExamSession, FinalizeOutcome, FinalizeReason, SavedAnswer,
            SessionListItem, SessionStatus, SessionView,
        },
        question::PublicQuestion,
        result::ExamResult,
    },
    services::{
        audit,
        scorer::{self, ScoringPolicy},
    },
};

const SESSION_COLUMNS: &str = "id, student_id, started_at, duration_minutes, status, \
     finalize_reason, finalized_at, total_score, last_activity_at";

/// Question joined with whatever the student saved for it.
#[derive(sqlx::FromRow)]
struct GradingRow {
    question_id: i64,
    position: i64,
    topic: String,
    prompt: String,
    model_answer: String,
    submitted_answer: String,
}

pub async fn load_session(pool: &SqlitePool, session_id: i64) -> Result<ExamSession, AppError> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM exam_sessions WHERE id = $1");

    sqlx::query_as::<_, ExamSession>(&sql)
        .bind(session_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Exam session not found".to_string()))
}

/// Loads a session and checks it belongs to `student_id`.
pub async fn load_owned_session(
    pool: &SqlitePool,
    session_id: i64,
    student_id: i64,
) -> Result<ExamSession, AppError> {
    let session = load_session(pool, session_id).await?;
    if session.student_id != student_id {
        tracing::warn!(
            "Student {} tried to access exam session {} owned by {}",
            student_id,
            session_id,
            session.student_id
        );
        return Err(AppError::Forbidden(
            "This exam belongs to another student".to_string(),
        ));
    }
    Ok(session)
}

async fn find_active_session(
    pool: &SqlitePool,
    student_id: i64,
) -> Result<Option<ExamSession>, AppError> {
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM exam_sessions \
         WHERE student_id = $1 AND status IN ('created', 'in_progress')"
    );

    let session = sqlx::query_as::<_, ExamSession>(&sql)
        .bind(student_id)
        .fetch_optional(pool)
        .await?;

    Ok(session)
}

/// Seals `session` if it is still open but past its deadline.
/// Returns the up-to-date row.
async fn expire_if_overdue(
    pool: &SqlitePool,
    policy: ScoringPolicy,
    session: ExamSession,
    now: DateTime<Utc>,
) -> Result<ExamSession, AppError> {
    if session.status() == SessionStatus::InProgress && session.is_past_deadline(now) {
        tracing::info!("Exam session {} passed its deadline, sealing", session.id);
        finalize(pool, policy, session.id, FinalizeReason::Expired, now).await?;
        return load_session(pool, session.id).await;
    }
    Ok(session)
}

/// Starts a new attempt for `student_id`.
///
/// Fails with `DuplicateSession` while another attempt is open. An open
/// attempt that is already past its deadline is sealed first and does not
/// block the new one.
pub async fn start_exam(
    pool: &SqlitePool,
    settings: &ExamSettings,
    student_id: i64,
    now: DateTime<Utc>,
) -> Result<ExamSession, AppError> {
    if let Some(active) = find_active_session(pool, student_id).await? {
        let active = expire_if_overdue(pool, settings.scoring_policy, active, now).await?;
        if active.status() != SessionStatus::Finalized {
            return Err(AppError::DuplicateSession(format!(
                "Exam {} is still in progress",
                active.id
            )));
        }
    }

    let mut tx = pool.begin().await?;

    // The partial unique index on open sessions settles concurrent starts.
    let session_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO exam_sessions (student_id, started_at, duration_minutes, status, last_activity_at)
        VALUES ($1, $2, $3, 'created', $2)
        RETURNING id
        "#,
    )
    .bind(student_id)
    .bind(now)
    .bind(settings.duration_minutes)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::DuplicateSession("An exam is already in progress".to_string())
        } else {
            tracing::error!("Failed to create exam session: {:?}", e);
            AppError::from(e)
        }
    })?;

    let question_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM questions WHERE deleted_at IS NULL ORDER BY RANDOM() LIMIT $1",
    )
    .bind(settings.question_count)
    .fetch_all(&mut *tx)
    .await?;

    if question_ids.is_empty() {
        tx.rollback().await?;
        return Err(AppError::BadRequest("No questions available".to_string()));
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO exam_questions (session_id, question_id, position) ");
    builder.push_values(question_ids.iter().enumerate(), |mut b, (idx, question_id)| {
        b.push_bind(session_id)
            .push_bind(*question_id)
            .push_bind(idx as i64 + 1);
    });
    builder.build().execute(&mut *tx).await?;

    sqlx::query("UPDATE exam_sessions SET status = 'in_progress' WHERE id = $1 AND status = 'created'")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    audit::record(
        &mut *tx,
        Some(student_id),
        &format!("Started exam {} with {} questions", session_id, question_ids.len()),
        now,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Student {} started exam {} ({} questions, {} minutes)",
        student_id,
        session_id,
        question_ids.len(),
        settings.duration_minutes
    );

    load_session(pool, session_id).await
}

/// Saves (or overwrites) one answer.
///
/// Past the deadline the session is sealed and the answer rejected with
/// `SessionExpired`.
pub async fn submit_answer(
    pool: &SqlitePool,
    settings: &ExamSettings,
    session_id: i64,
    student_id: i64,
    question_id: i64,
    answer: &str,
    now: DateTime<Utc>,
) -> Result<SavedAnswer, AppError> {
    let session = load_owned_session(pool, session_id, student_id).await?;
    ensure_writable(pool, settings.scoring_policy, &session, now).await?;

    let mut tx = pool.begin().await?;
    claim_for_write(&mut tx, session_id, now).await?;
    ensure_questions_in_session(&mut tx, session_id, &[question_id]).await?;
    let saved = upsert_answer(&mut tx, session_id, question_id, answer, now).await?;
    tx.commit().await?;

    Ok(saved)
}

/// Hands the exam in: saves the final batch of answers, then seals and scores.
///
/// If the deadline has already passed the batch is discarded and the session
/// is sealed as expired; a non-empty batch is then reported as
/// `SessionExpired`. Handing in an already sealed exam without answers
/// returns the stored outcome.
pub async fn submit_exam(
    pool: &SqlitePool,
    settings: &ExamSettings,
    session_id: i64,
    student_id: i64,
    answers: &[AnswerEntry],
    now: DateTime<Utc>,
) -> Result<FinalizeOutcome, AppError> {
    let session = load_owned_session(pool, session_id, student_id).await?;

    let mut entries = Vec::with_capacity(answers.len());
    for entry in answers {
        let question_id = entry
            .question_id
            .ok_or(AppError::BadRequest("Every answer needs a question_id".to_string()))?;
        entries.push((question_id, entry.answer.as_str()));
    }

    if session.status() == SessionStatus::Finalized {
        if entries.is_empty() {
            return finalize(pool, settings.scoring_policy, session_id, FinalizeReason::Submitted, now)
                .await;
        }
        return Err(AppError::SessionFinalized(
            "This exam has already been submitted".to_string(),
        ));
    }

    if session.is_past_deadline(now) {
        let outcome =
            finalize(pool, settings.scoring_policy, session_id, FinalizeReason::Expired, now)
                .await?;
        if entries.is_empty() {
            return Ok(outcome);
        }
        return Err(AppError::SessionExpired(
            "Time expired; the exam was submitted automatically".to_string(),
        ));
    }

    if !entries.is_empty() {
        let mut tx = pool.begin().await?;
        claim_for_write(&mut tx, session_id, now).await?;
        let ids: Vec<i64> = entries.iter().map(|(id, _)| *id).collect();
        ensure_questions_in_session(&mut tx, session_id, &ids).await?;
        for (question_id, text) in &entries {
            upsert_answer(&mut tx, session_id, *question_id, text, now).await?;
        }
        tx.commit().await?;
    }

    finalize(pool, settings.scoring_policy, session_id, FinalizeReason::Submitted, now).await
}

/// Seals a session and scores it. Idempotent.
///
/// The `in_progress -> finalized` compare-and-set decides who scores: only
/// the caller whose update hits the row writes Results, in the same
/// transaction. Everybody else reads back what that caller stored.
pub async fn finalize(
    pool: &SqlitePool,
    policy: ScoringPolicy,
    session_id: i64,
    reason: FinalizeReason,
    now: DateTime<Utc>,
) -> Result<FinalizeOutcome, AppError> {
    let mut tx = pool.begin().await?;

    let won: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE exam_sessions
        SET status = 'finalized', finalize_reason = $1, finalized_at = $2
        WHERE id = $3 AND status = 'in_progress'
        RETURNING student_id
        "#,
    )
    .bind(reason.as_str())
    .bind(now)
    .bind(session_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(student_id) = won else {
        tx.rollback().await?;
        let session = load_session(pool, session_id).await?;
        if session.status() != SessionStatus::Finalized {
            return Err(AppError::Conflict("Exam has not started yet".to_string()));
        }
        let results = load_results(pool, session_id).await?;
        return Ok(outcome(session, results, false));
    };

    let rows = sqlx::query_as::<_, GradingRow>(
        r#"
        SELECT
            eq.question_id,
            eq.position,
            q.topic,
            q.prompt,
            q.model_answer,
            COALESCE(a.answer_text, '') AS submitted_answer
        FROM exam_questions eq
        JOIN questions q ON q.id = eq.question_id
        LEFT JOIN exam_answers a
            ON a.session_id = eq.session_id AND a.question_id = eq.question_id
        WHERE eq.session_id = $1
        ORDER BY eq.position
        "#,
    )
    .bind(session_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut total_score = 0.0;
    for row in &rows {
        let grade = scorer::grade(policy, &row.submitted_answer, &row.model_answer);
        total_score += grade.score;

        sqlx::query(
            r#"
            INSERT INTO results
            (session_id, question_id, position, topic, prompt, submitted_answer,
             model_answer, is_correct, score, scored_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(session_id)
        .bind(row.question_id)
        .bind(row.position)
        .bind(&row.topic)
        .bind(&row.prompt)
        .bind(&row.submitted_answer)
        .bind(&row.model_answer)
        .bind(grade.is_correct)
        .bind(grade.score)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store result for session {}: {:?}", session_id, e);
            AppError::from(e)
        })?;
    }

    sqlx::query("UPDATE exam_sessions SET total_score = $1 WHERE id = $2")
        .bind(total_score)
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    audit::record(
        &mut *tx,
        Some(student_id),
        &format!(
            "Exam {} {} with score {}",
            session_id,
            reason.as_str(),
            total_score
        ),
        now,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Exam {} finalized ({}): {}/{}",
        session_id,
        reason.as_str(),
        total_score,
        rows.len()
    );

    let session = load_session(pool, session_id).await?;
    let results = load_results(pool, session_id).await?;
    Ok(outcome(session, results, true))
}

fn outcome(session: ExamSession, results: Vec<ExamResult>, newly_finalized: bool) -> FinalizeOutcome {
    FinalizeOutcome {
        session_id: session.id,
        finalize_reason: session.finalize_reason,
        total_score: session.total_score,
        max_score: results.len(),
        newly_finalized,
        results,
    }
}

/// The exam page: questions without model answers plus saved answers.
pub async fn get_session_view(
    pool: &SqlitePool,
    settings: &ExamSettings,
    session_id: i64,
    student_id: i64,
    now: DateTime<Utc>,
) -> Result<SessionView, AppError> {
    let session = load_owned_session(pool, session_id, student_id).await?;
    let session = expire_if_overdue(pool, settings.scoring_policy, session, now).await?;

    let questions = sqlx::query_as::<_, PublicQuestion>(
        r#"
        SELECT eq.question_id, eq.position, q.topic, q.prompt
        FROM exam_questions eq
        JOIN questions q ON q.id = eq.question_id
        WHERE eq.session_id = $1
        ORDER BY eq.position
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    let answers = sqlx::query_as::<_, SavedAnswer>(
        "SELECT question_id, answer_text, answered_at FROM exam_answers WHERE session_id = $1 ORDER BY question_id",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(SessionView {
        deadline: session.deadline(),
        remaining_seconds: session.remaining_seconds(now),
        session,
        questions,
        answers,
    })
}

/// Most recent attempts first.
pub async fn list_sessions(
    pool: &SqlitePool,
    settings: &ExamSettings,
    student_id: i64,
    limit: i64,
    now: DateTime<Utc>,
) -> Result<Vec<SessionListItem>, AppError> {
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM exam_sessions WHERE student_id = $1 \
         ORDER BY started_at DESC, id DESC LIMIT $2"
    );

    let sessions = sqlx::query_as::<_, ExamSession>(&sql)
        .bind(student_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    let mut items = Vec::with_capacity(sessions.len());
    for session in sessions {
        let session = expire_if_overdue(pool, settings.scoring_policy, session, now).await?;
        items.push(SessionListItem {
            deadline: session.deadline(),
            session,
        });
    }

    Ok(items)
}

/// Scored rows of a sealed session. An overdue session is sealed first; a
/// session still running yields `ExamInProgress`.
pub async fn get_results(
    pool: &SqlitePool,
    settings: &ExamSettings,
    session_id: i64,
    student_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<ExamResult>, AppError> {
    let session = load_owned_session(pool, session_id, student_id).await?;
    let session = expire_if_overdue(pool, settings.scoring_policy, session, now).await?;

    if session.status() != SessionStatus::Finalized {
        return Err(AppError::ExamInProgress(
            "Results are available once the exam is submitted".to_string(),
        ));
    }

    load_results(pool, session_id).await
}

pub async fn load_results(pool: &SqlitePool, session_id: i64) -> Result<Vec<ExamResult>, AppError> {
    let results = sqlx::query_as::<_, ExamResult>(
        r#"
        SELECT session_id, question_id, position, topic, prompt, submitted_answer,
               model_answer, is_correct, score, scored_at
        FROM results
        WHERE session_id = $1
        ORDER BY position
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(results)
}

/// Every scored row across a student's sealed sessions.
pub async fn student_results(
    pool: &SqlitePool,
    student_id: i64,
) -> Result<Vec<ExamResult>, AppError> {
    let results = sqlx::query_as::<_, ExamResult>(
        r#"
        SELECT r.session_id, r.question_id, r.position, r.topic, r.prompt, r.submitted_answer,
               r.model_answer, r.is_correct, r.score, r.scored_at
        FROM results r
        JOIN exam_sessions s ON s.id = r.session_id
        WHERE s.student_id = $1
        ORDER BY r.session_id, r.position
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(results)
}

async fn ensure_writable(
    pool: &SqlitePool,
    policy: ScoringPolicy,
    session: &ExamSession,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if session.status() == SessionStatus::Finalized {
        return Err(AppError::SessionFinalized(
            "This exam has already been submitted".to_string(),
        ));
    }

    if session.is_past_deadline(now) {
        finalize(pool, policy, session.id, FinalizeReason::Expired, now).await?;
        return Err(AppError::SessionExpired(
            "Time expired; the exam was submitted automatically".to_string(),
        ));
    }

    Ok(())
}

/// First statement of every answer transaction: takes the write lock and
/// fails if the session was sealed in the meantime.
async fn claim_for_write(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    session_id: i64,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE exam_sessions SET last_activity_at = $1 WHERE id = $2 AND status = 'in_progress'",
    )
    .bind(now)
    .bind(session_id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::SessionFinalized(
            "This exam has already been submitted".to_string(),
        ));
    }

    Ok(())
}

async fn ensure_questions_in_session(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    session_id: i64,
    question_ids: &[i64],
) -> Result<(), AppError> {
    let mut unique = question_ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM exam_questions WHERE session_id = ");
    builder.push_bind(session_id);
    builder.push(" AND question_id IN (");
    let mut separated = builder.separated(",");
    for id in &unique {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let found: i64 = builder
        .build_query_scalar()
        .fetch_one(&mut **tx)
        .await?;

    if found as usize != unique.len() {
        return Err(AppError::NotFound(
            "Question is not part of this exam".to_string(),
        ));
    }

    Ok(())
}

async fn upsert_answer(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    session_id: i64,
    question_id: i64,
    answer: &str,
    now: DateTime<Utc>,
) -> Result<SavedAnswer, AppError> {
    let saved = sqlx::query_as::<_, SavedAnswer>(
        r#"
        INSERT INTO exam_answers (session_id, question_id, answer_text, answered_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT(session_id, question_id) DO UPDATE SET
            answer_text = excluded.answer_text,
            answered_at = excluded.answered_at
        RETURNING question_id, answer_text, answered_at
        "#,
    )
    .bind(session_id)
    .bind(question_id)
    .bind(answer)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save answer: {:?}", e);
        AppError::from(e)
    })?;

    Ok(saved)
}

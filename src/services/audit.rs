// src/services/audit.rs

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::{error::AppError, models::audit_log::AuditLog};

/// Appends an audit entry. Accepts a pool or an open transaction so the
/// entry commits together with the change it describes.
pub async fn record<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: Option<i64>,
    action: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO audit_logs (user_id, action, timestamp) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(action)
        .bind(now)
        .execute(executor)
        .await
        .map_err(|e| {
            tracing::error!("Failed to write audit log: {:?}", e);
            AppError::from(e)
        })?;

    Ok(())
}

/// Newest entries first.
pub async fn list(pool: &SqlitePool, limit: i64) -> Result<Vec<AuditLog>, AppError> {
    let logs = sqlx::query_as::<_, AuditLog>(
        "SELECT id, user_id, action, timestamp FROM audit_logs ORDER BY id DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(logs)
}

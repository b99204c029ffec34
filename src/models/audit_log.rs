// src/models/audit_log.rs

use serde::Serialize;
use sqlx::FromRow;

/// Represents the 'audit_logs' table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: i32,
    pub created_at: DateTime<Utc>,
    pub level: String,
    pub logger_name: String,
    pub message: String,
    pub context: Option<String>,
}

/// A log record on its way to the `log_entries` table.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub created_at: DateTime<Utc>,
    pub level: String,
    pub logger_name: String,
    pub message: String,
    pub context: Option<String>,
}

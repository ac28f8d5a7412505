//! Notification log — records every dispatch attempt.

use intouch_core::error::IntouchError;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

/// An entry to write to the notification log.
pub struct NotificationRecord {
    pub notification_id: i64,
    /// `None` for the group summary.
    pub contact_name: Option<String>,
    pub target_uri: String,
    pub is_summary: bool,
    pub status: DispatchStatus,
    pub error: Option<String>,
}

/// Outcome of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    Ok,
    Error,
}

impl DispatchStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// A row read back from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedNotification {
    pub notification_id: i64,
    pub contact_name: Option<String>,
    pub target_uri: String,
    pub is_summary: bool,
    pub status: String,
    pub error: Option<String>,
    pub created_at: String,
}

/// Notification log backed by SQLite.
#[derive(Clone)]
pub struct NotificationLog {
    pool: SqlitePool,
}

impl NotificationLog {
    /// Create a new log sharing the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write an entry to the log.
    pub async fn log(&self, entry: &NotificationRecord) -> Result<(), IntouchError> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO notification_log \
             (id, notification_id, contact_name, target_uri, is_summary, status, error) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(entry.notification_id)
        .bind(&entry.contact_name)
        .bind(&entry.target_uri)
        .bind(entry.is_summary)
        .bind(entry.status.as_str())
        .bind(&entry.error)
        .execute(&self.pool)
        .await
        .map_err(|e| IntouchError::Storage(format!("notification log write failed: {e}")))?;

        debug!(
            "notification log: #{} {} [{}]",
            entry.notification_id,
            entry.contact_name.as_deref().unwrap_or("summary"),
            entry.status.as_str(),
        );

        Ok(())
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<LoggedNotification>, IntouchError> {
        #[allow(clippy::type_complexity)]
        let rows: Vec<(i64, Option<String>, String, bool, String, Option<String>, String)> =
            sqlx::query_as(
                "SELECT notification_id, contact_name, target_uri, is_summary, status, error, created_at \
                 FROM notification_log ORDER BY created_at DESC, rowid DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IntouchError::Storage(format!("notification log read failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(
                |(notification_id, contact_name, target_uri, is_summary, status, error, created_at)| {
                    LoggedNotification {
                        notification_id,
                        contact_name,
                        target_uri,
                        is_summary,
                        status,
                        error,
                        created_at,
                    }
                },
            )
            .collect())
    }
}

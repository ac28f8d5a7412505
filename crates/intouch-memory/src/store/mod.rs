//! SQLite-backed address book and message history.
//!
//! Split into focused submodules:
//! - `sources` — the [`AddressBook`](intouch_core::traits::AddressBook) and
//!   [`MessageHistory`](intouch_core::traits::MessageHistory) implementations

mod sources;

use chrono::{DateTime, Utc};
use intouch_core::{config::StoreConfig, error::IntouchError, shellexpand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

/// Persistent store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the database, running migrations on first use.
    pub async fn new(config: &StoreConfig) -> Result<Self, IntouchError> {
        let db_path = shellexpand(&config.db_path);

        // Ensure parent directory exists.
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| IntouchError::Storage(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| IntouchError::Storage(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| IntouchError::Storage(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Store initialized at {db_path}");

        Ok(Self { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Add an address-book entry with its numbers. Returns the new entry id.
    pub async fn add_contact(
        &self,
        display_name: &str,
        numbers: &[String],
    ) -> Result<String, IntouchError> {
        let id = Uuid::new_v4().to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IntouchError::Storage(format!("begin failed: {e}")))?;

        sqlx::query("INSERT INTO contacts (id, display_name) VALUES (?, ?)")
            .bind(&id)
            .bind(display_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| IntouchError::Storage(format!("add contact failed: {e}")))?;

        for number in numbers {
            sqlx::query("INSERT INTO phones (contact_id, number) VALUES (?, ?)")
                .bind(&id)
                .bind(number)
                .execute(&mut *tx)
                .await
                .map_err(|e| IntouchError::Storage(format!("add number failed: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| IntouchError::Storage(format!("commit failed: {e}")))?;
        Ok(id)
    }

    /// Record an outgoing message to `address` sent at `at`.
    pub async fn record_sent(&self, address: &str, at: DateTime<Utc>) -> Result<(), IntouchError> {
        sqlx::query("INSERT INTO sent_messages (address, sent_at_ms) VALUES (?, ?)")
            .bind(address)
            .bind(at.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| IntouchError::Storage(format!("record sent failed: {e}")))?;
        Ok(())
    }

    /// Run SQL migrations, tracking which have already been applied.
    pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<(), IntouchError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| IntouchError::Storage(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] = &[
            ("001_init", include_str!("../../migrations/001_init.sql")),
            (
                "002_notification_log",
                include_str!("../../migrations/002_notification_log.sql"),
            ),
        ];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        IntouchError::Storage(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| IntouchError::Storage(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    IntouchError::Storage(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }
}

//! SQLite-backed persistent store.
//!
//! Split into focused submodules:
//! - `users` — account rows
//! - `tasks` — task CRUD and recurrence rule rows
//! - `time_blocks` — calendar blocks, task links, and the overlap query
//! - `friendships` — friendship rows keyed by unordered user pair
//! - `notifications` — notification rows and unread counts
//! - `focus` — focus session rows and aggregates

mod focus;
mod friendships;
mod notifications;
mod tasks;
mod time_blocks;
mod users;

use kanso_core::config::{shellexpand, StoreConfig};
use kanso_core::error::KansoError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Persistent store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

/// Row counts per table, for the status surface.
#[derive(Debug, Clone, Copy)]
pub struct StoreCounts {
    pub users: i64,
    pub tasks: i64,
    pub time_blocks: i64,
    pub friendships: i64,
    pub notifications: i64,
    pub focus_sessions: i64,
}

impl Store {
    /// Create a new store, running migrations on first use.
    pub async fn new(config: &StoreConfig) -> Result<Self, KansoError> {
        let db_path = shellexpand(&config.db_path);

        // Ensure parent directory exists.
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| KansoError::Storage(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| KansoError::Storage(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(opts)
            .await
            .map_err(|e| KansoError::Storage(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Store initialized at {db_path}");

        Ok(Self { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the database file size in bytes.
    pub async fn db_size(&self) -> Result<u64, KansoError> {
        let (page_count,): (i64,) = sqlx::query_as("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("pragma failed: {e}")))?;

        let (page_size,): (i64,) = sqlx::query_as("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("pragma failed: {e}")))?;

        Ok((page_count * page_size) as u64)
    }

    pub async fn row_counts(&self) -> Result<StoreCounts, KansoError> {
        Ok(StoreCounts {
            users: self.count_rows("users").await?,
            tasks: self.count_rows("tasks").await?,
            time_blocks: self.count_rows("time_blocks").await?,
            friendships: self.count_rows("friendships").await?,
            notifications: self.count_rows("notifications").await?,
            focus_sessions: self.count_rows("focus_sessions").await?,
        })
    }

    async fn count_rows(&self, table: &str) -> Result<i64, KansoError> {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("count {table} failed: {e}")))?;
        Ok(count)
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), KansoError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| KansoError::Storage(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] = &[
            ("001_init", include_str!("../../migrations/001_init.sql")),
            ("002_social", include_str!("../../migrations/002_social.sql")),
            ("003_focus", include_str!("../../migrations/003_focus.sql")),
        ];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        KansoError::Storage(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| KansoError::Storage(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    KansoError::Storage(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }
}

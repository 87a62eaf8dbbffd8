//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data. Uniqueness and
//! referential invariants are declared in the schema so that concurrent
//! writers racing past the service-level checks are still serialized.

mod assignments;
mod brigades;
mod members;
mod repository;

pub use assignments::*;
pub use brigades::*;
pub use members::*;
pub use repository::*;

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Current time as a fixed-width RFC 3339 string, so stored timestamps sort lexically.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id TEXT PRIMARY KEY,
            external_user_id TEXT NOT NULL UNIQUE,
            locality TEXT NOT NULL,
            credentials TEXT NOT NULL DEFAULT '[]',
            work_history TEXT NOT NULL DEFAULT '[]',
            role TEXT NOT NULL
                CHECK (role IN ('lead', 'botanist', 'technician', 'co-researcher')),
            availability TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS brigades (
            id TEXT PRIMARY KEY,
            cluster_id TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'formation'
                CHECK (status IN ('formation', 'active', 'completed', 'cancelled')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assignments (
            id TEXT PRIMARY KEY,
            brigade_id TEXT NOT NULL REFERENCES brigades(id) ON DELETE CASCADE,
            member_id TEXT NOT NULL REFERENCES members(id) ON DELETE CASCADE,
            invitation_status TEXT NOT NULL DEFAULT 'pending'
                CHECK (invitation_status IN ('pending', 'accepted', 'rejected')),
            invited_at TEXT NOT NULL,
            responded_at TEXT,
            rejection_reason TEXT,
            work_start_date TEXT,
            work_end_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (brigade_id, member_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_members_locality ON members(locality);
        CREATE INDEX IF NOT EXISTS idx_members_role ON members(role);
        CREATE INDEX IF NOT EXISTS idx_brigades_status ON brigades(status);
        CREATE INDEX IF NOT EXISTS idx_assignments_member ON assignments(member_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_sort_lexically() {
        let first = now_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = now_timestamp();
        assert_eq!(first.len(), second.len());
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("db.sqlite");

        let pool = init_database(&path).await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool.close().await;

        let pool = init_database(&path).await.unwrap();
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
             AND name IN ('members', 'brigades', 'assignments')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(row.0, 3);
    }
}

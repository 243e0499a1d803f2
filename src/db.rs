use std::str::FromStr;

use anyhow::Result;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::debug;

pub type DB = SqlitePool;

/// Collections the app reads and writes. Exercises and summaries are stored
/// as JSON documents inside their parent row.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE,
    role        TEXT NOT NULL,
    trainer_id  TEXT,
    age         INTEGER,
    height      REAL,
    goal        TEXT,
    is_active   BOOLEAN NOT NULL DEFAULT TRUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS workouts (
    id          TEXT PRIMARY KEY,
    trainee_id  TEXT NOT NULL,
    trainer_id  TEXT,
    title       TEXT NOT NULL,
    goal        TEXT,
    start_date  TEXT NOT NULL,
    is_active   BOOLEAN NOT NULL DEFAULT TRUE,
    exercises   TEXT NOT NULL DEFAULT '[]',
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS workouts_by_trainee ON workouts (trainee_id);

CREATE TABLE IF NOT EXISTS history (
    id            TEXT PRIMARY KEY,
    trainee_id    TEXT NOT NULL,
    workout_id    TEXT NOT NULL,
    title         TEXT NOT NULL,
    completed_at  TEXT NOT NULL,
    summary       TEXT NOT NULL DEFAULT '[]'
);
CREATE INDEX IF NOT EXISTS history_by_trainee ON history (trainee_id, completed_at);

CREATE TABLE IF NOT EXISTS measurements (
    id          TEXT PRIMARY KEY,
    trainee_id  TEXT NOT NULL,
    weight      REAL NOT NULL,
    body_fat    REAL NOT NULL,
    waist       REAL NOT NULL,
    timestamp   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS measurements_by_trainee ON measurements (trainee_id, timestamp);
"#;

pub async fn open(path: &str) -> Result<DB> {
    let opts = SqliteConnectOptions::from_str(path)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;
    migrate(&pool).await?;
    debug!(path, "database ready");
    Ok(pool)
}

/// A private database for tests. One connection, since every in-memory
/// connection is its own database.
#[cfg(test)]
pub async fn open_in_memory() -> Result<DB> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &DB) -> Result<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

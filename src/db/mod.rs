//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for users, regions, crews and memberships.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Seoul districts available out of the box.
const SEED_REGIONS: &[(&str, &str)] = &[
    ("서울", "강남구"),
    ("서울", "강동구"),
    ("서울", "강북구"),
    ("서울", "강서구"),
    ("서울", "관악구"),
    ("서울", "광진구"),
    ("서울", "구로구"),
    ("서울", "금천구"),
    ("서울", "노원구"),
    ("서울", "도봉구"),
    ("서울", "동대문구"),
    ("서울", "동작구"),
    ("서울", "마포구"),
    ("서울", "서대문구"),
    ("서울", "서초구"),
    ("서울", "성동구"),
    ("서울", "성북구"),
    ("서울", "송파구"),
    ("서울", "양천구"),
    ("서울", "영등포구"),
    ("서울", "용산구"),
    ("서울", "은평구"),
    ("서울", "종로구"),
    ("서울", "중구"),
    ("서울", "중랑구"),
];

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
    seed_regions(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS regions (
            id TEXT PRIMARY KEY,
            city TEXT NOT NULL,
            district TEXT NOT NULL,
            UNIQUE (city, district)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            nickname TEXT NOT NULL,
            region_id TEXT REFERENCES regions(id),
            preferred_level TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS crews (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            host_id TEXT NOT NULL REFERENCES users(id),
            region_id TEXT NOT NULL REFERENCES regions(id),
            meeting_time TEXT NOT NULL,
            place TEXT NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            max_participants INTEGER NOT NULL CHECK (max_participants > 0),
            level TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS crew_members (
            id TEXT PRIMARY KEY,
            crew_id TEXT NOT NULL REFERENCES crews(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id),
            role TEXT NOT NULL,
            joined_at TEXT NOT NULL,
            UNIQUE (crew_id, user_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_crews_region_meeting_time ON crews(region_id, meeting_time);
        CREATE INDEX IF NOT EXISTS idx_crews_meeting_time ON crews(meeting_time);
        CREATE INDEX IF NOT EXISTS idx_crews_lat_lng ON crews(latitude, longitude);
        CREATE INDEX IF NOT EXISTS idx_crew_members_user ON crew_members(user_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert the built-in regions. Existing rows are left alone.
async fn seed_regions(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for (city, district) in SEED_REGIONS {
        sqlx::query("INSERT OR IGNORE INTO regions (id, city, district) VALUES (?, ?, ?)")
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(city)
            .bind(district)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::debug!("Seeded {} regions", SEED_REGIONS.len());
    Ok(())
}

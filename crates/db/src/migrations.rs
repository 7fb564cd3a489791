use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Tables the recommendation API expects to find.
pub const REQUIRED_TABLES: &[&str] =
    &["users", "friends", "products", "friend_events", "event_vectors"];

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Whether every one of `REQUIRED_TABLES` exists.
pub async fn required_tables_present(pool: &DbPool) -> Result<bool, sqlx::Error> {
    let placeholders = vec!["?"; REQUIRED_TABLES.len()].join(", ");
    let sql = format!(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ({placeholders})"
    );

    let mut query = sqlx::query_scalar(&sql);
    for table in REQUIRED_TABLES {
        query = query.bind(*table);
    }
    let count: i64 = query.fetch_one(pool).await?;

    Ok(count == REQUIRED_TABLES.len() as i64)
}

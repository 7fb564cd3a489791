use circle_core::config::{AppConfig, ConfigError, LoadOptions};
use circle_db::{
    connect_with_settings, ensure_seeded, ensure_vectors_ready, migrations, DbPool,
    VectorRebuildError,
};
use circle_embeddings::{select_provider, EmbeddingError};
use thiserror::Error;
use tracing::info;

use crate::api::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("embedding provider setup failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("demo data preparation failed: {0}")]
    Seed(#[from] VectorRebuildError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let embedder = select_provider(&config.embedding)?;

    let seed = ensure_seeded(&db_pool, embedder.as_ref()).await?;
    let rebuilt = ensure_vectors_ready(&db_pool, embedder.as_ref()).await?;
    info!(
        event_name = "system.bootstrap.data_ready",
        correlation_id = "bootstrap",
        seeded_now = seed.seeded,
        friends = seed.friends,
        events = seed.events,
        vectors_rebuilt = rebuilt,
        "demo data and vectors ready"
    );

    let state = AppState::new(db_pool.clone(), embedder, &config);
    Ok(Application { config, db_pool, state })
}

#[cfg(test)]
mod tests {
    use circle_core::config::{ConfigOverrides, LoadOptions};
    use circle_db::repositories::{SqlVectorStore, VectorStore};

    use crate::bootstrap::bootstrap;

    fn overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_non_sqlite_database_url() {
        let result = bootstrap(overrides("postgres://localhost/circle")).await;

        let message = result.err().map(|error| error.to_string()).unwrap_or_default();
        assert!(message.contains("database.url"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrap_migrates_seeds_and_embeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("circle.db").display());

        let app = bootstrap(overrides(&url)).await.expect("bootstrap should succeed");

        let (friends,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM friends")
            .fetch_one(&app.db_pool)
            .await
            .expect("friend count");
        assert_eq!(friends, 20);

        let (events,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM friend_events")
            .fetch_one(&app.db_pool)
            .await
            .expect("event count");
        let vectors = SqlVectorStore::new(app.db_pool.clone()).count().await.expect("vectors");
        assert_eq!(vectors, events);

        app.db_pool.close().await;

        let again = bootstrap(overrides(&url)).await.expect("second bootstrap");
        let (friends_after,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM friends")
            .fetch_one(&again.db_pool)
            .await
            .expect("friend count");
        assert_eq!(friends_after, 20, "restart must not reseed");
        again.db_pool.close().await;
    }
}

pub mod config;
pub mod doctor;
pub mod migrate;
pub mod recommend;
pub mod seed;

use std::future::Future;

use circle_core::config::{AppConfig, LoadOptions};
use circle_db::{connect_with_settings, migrations, DbPool};
use serde::Serialize;
use tokio::runtime::Runtime;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DB_CONNECTIVITY: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_SEED: u8 = 6;
pub const EXIT_EMBEDDING: u8 = 7;
pub const EXIT_INVALID_REQUEST: u8 = 8;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

/// `(error_class, message, exit_code)` carried out of an async command body.
pub(crate) type StepFailure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub(crate) fn from_step(command: &str, (error_class, message, exit_code): StepFailure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

/// Connect and bring the schema up to date.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, StepFailure> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;

    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

    Ok(pool)
}

/// Runs `body` on an open pool and closes the pool whether or not the body succeeded.
pub(crate) async fn with_pool<T, F, Fut>(pool: DbPool, body: F) -> Result<T, StepFailure>
where
    F: FnOnce(DbPool) -> Fut,
    Fut: Future<Output = Result<T, StepFailure>>,
{
    let result = body(pool.clone()).await;
    pool.close().await;
    result
}

#[cfg(test)]
mod tests {
    use circle_db::connect_with_settings;

    use super::{with_pool, CommandResult, StepFailure, EXIT_SEED};

    #[tokio::test]
    async fn pool_is_closed_when_a_step_fails() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");

        let result: Result<(), StepFailure> = with_pool(pool.clone(), |_pool| async {
            Err(("seed_execution", "friends missing".to_owned(), EXIT_SEED))
        })
        .await;

        assert_eq!(result, Err(("seed_execution", "friends missing".to_owned(), EXIT_SEED)));
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn pool_is_closed_after_success() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");

        let value = with_pool(pool.clone(), |pool| async move {
            circle_db::ping(&pool).await.expect("ping");
            Ok::<_, StepFailure>(7)
        })
        .await;

        assert_eq!(value, Ok(7));
        assert!(pool.is_closed());
    }

    #[test]
    fn failure_payload_carries_error_class() {
        let result = CommandResult::failure("seed", "seed_verification", "friends missing", 6);

        let payload: serde_json::Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(result.exit_code, 6);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "seed_verification");
        assert_eq!(payload["message"], "friends missing");
    }

    #[test]
    fn success_payload_has_null_error_class() {
        let result = CommandResult::success("migrate", "applied pending migrations");

        let payload: serde_json::Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["status"], "ok");
        assert!(payload["error_class"].is_null());
    }
}

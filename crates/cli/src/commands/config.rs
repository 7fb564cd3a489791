use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use circle_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let voyage_api_key = config
        .embedding
        .voyage_api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let fields = vec![
        field("database.url", config.database.url.clone(), &["CIRCLE_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["CIRCLE_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["CIRCLE_DATABASE_TIMEOUT_SECS"],
        ),
        field("server.bind_address", config.server.bind_address.clone(), &["CIRCLE_SERVER_BIND_ADDRESS"]),
        field("server.port", config.server.port.to_string(), &["CIRCLE_SERVER_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["CIRCLE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "embedding.voyage_api_key",
            voyage_api_key,
            &["CIRCLE_EMBEDDING_VOYAGE_API_KEY", "VOYAGE_API_KEY"],
        ),
        field(
            "embedding.voyage_model",
            config.embedding.voyage_model.clone(),
            &["CIRCLE_EMBEDDING_VOYAGE_MODEL"],
        ),
        field("embedding.base_url", config.embedding.base_url.clone(), &["CIRCLE_EMBEDDING_BASE_URL"]),
        field(
            "embedding.timeout_secs",
            config.embedding.timeout_secs.to_string(),
            &["CIRCLE_EMBEDDING_TIMEOUT_SECS"],
        ),
        field(
            "embedding.dimension",
            config.embedding.dimension.to_string(),
            &["CIRCLE_EMBEDDING_DIMENSION"],
        ),
        field(
            "ranking.confidence_distance_high",
            config.ranking.confidence_distance_high.to_string(),
            &["CIRCLE_RANKING_CONFIDENCE_DISTANCE_HIGH"],
        ),
        field(
            "ranking.confidence_distance_med",
            config.ranking.confidence_distance_med.to_string(),
            &["CIRCLE_RANKING_CONFIDENCE_DISTANCE_MED"],
        ),
        field(
            "ranking.default_limit",
            config.ranking.default_limit.to_string(),
            &["CIRCLE_RANKING_DEFAULT_LIMIT"],
        ),
        field(
            "ranking.neighbor_count",
            config.ranking.neighbor_count.to_string(),
            &["CIRCLE_RANKING_NEIGHBOR_COUNT"],
        ),
        field(
            "ranking.social_event_window",
            config.ranking.social_event_window.to_string(),
            &["CIRCLE_RANKING_SOCIAL_EVENT_WINDOW"],
        ),
        field("logging.level", config.logging.level.clone(), &["CIRCLE_LOGGING_LEVEL", "CIRCLE_LOG_LEVEL"]),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["CIRCLE_LOGGING_FORMAT", "CIRCLE_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for Field { key, value, env_keys } in fields {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Field {
    Field { key, value, env_keys }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("circle.toml"), PathBuf::from("config/circle.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps only the provider prefix of a key: `pa-abc123` -> `pa-***`.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

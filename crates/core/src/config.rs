use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recommend::{ConfidenceThresholds, ServiceSettings, MAX_LIMIT, MIN_LIMIT};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub ranking: RankingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    /// Absent means the deterministic hash embedder is used.
    pub voyage_api_key: Option<SecretString>,
    pub voyage_model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Dimension of the hash fallback vectors.
    pub dimension: usize,
}

impl EmbeddingConfig {
    pub fn voyage_enabled(&self) -> bool {
        self.voyage_api_key
            .as_ref()
            .map(|key| !key.expose_secret().trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RankingConfig {
    pub confidence_distance_high: f64,
    pub confidence_distance_med: f64,
    pub default_limit: usize,
    pub neighbor_count: usize,
    pub social_event_window: usize,
}

impl RankingConfig {
    pub fn thresholds(&self) -> ConfidenceThresholds {
        ConfidenceThresholds {
            high: self.confidence_distance_high,
            medium: self.confidence_distance_med,
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            neighbor_count: self.neighbor_count,
            social_event_window: self.social_event_window,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub voyage_api_key: Option<String>,
    pub voyage_model: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://circle.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            embedding: EmbeddingConfig {
                voyage_api_key: None,
                voyage_model: "voyage-2".to_string(),
                base_url: "https://api.voyageai.com/v1".to_string(),
                timeout_secs: 30,
                dimension: crate::embedding::DEFAULT_DIMENSION,
            },
            ranking: RankingConfig {
                confidence_distance_high: crate::recommend::DEFAULT_CONFIDENCE_THRESHOLDS.high,
                confidence_distance_med: crate::recommend::DEFAULT_CONFIDENCE_THRESHOLDS.medium,
                default_limit: crate::recommend::DEFAULT_LIMIT,
                neighbor_count: 50,
                social_event_window: 200,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("circle.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(embedding) = patch.embedding {
            if let Some(voyage_api_key) = embedding.voyage_api_key {
                self.embedding.voyage_api_key = Some(secret_value(voyage_api_key));
            }
            if let Some(voyage_model) = embedding.voyage_model {
                self.embedding.voyage_model = voyage_model;
            }
            if let Some(base_url) = embedding.base_url {
                self.embedding.base_url = base_url;
            }
            if let Some(timeout_secs) = embedding.timeout_secs {
                self.embedding.timeout_secs = timeout_secs;
            }
            if let Some(dimension) = embedding.dimension {
                self.embedding.dimension = dimension;
            }
        }

        if let Some(ranking) = patch.ranking {
            if let Some(high) = ranking.confidence_distance_high {
                self.ranking.confidence_distance_high = high;
            }
            if let Some(med) = ranking.confidence_distance_med {
                self.ranking.confidence_distance_med = med;
            }
            if let Some(default_limit) = ranking.default_limit {
                self.ranking.default_limit = default_limit;
            }
            if let Some(neighbor_count) = ranking.neighbor_count {
                self.ranking.neighbor_count = neighbor_count;
            }
            if let Some(social_event_window) = ranking.social_event_window {
                self.ranking.social_event_window = social_event_window;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CIRCLE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CIRCLE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("CIRCLE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CIRCLE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("CIRCLE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CIRCLE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CIRCLE_SERVER_PORT") {
            self.server.port = parse_env("CIRCLE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("CIRCLE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("CIRCLE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let voyage_api_key =
            read_env("CIRCLE_EMBEDDING_VOYAGE_API_KEY").or_else(|| read_env("VOYAGE_API_KEY"));
        if let Some(value) = voyage_api_key {
            self.embedding.voyage_api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CIRCLE_EMBEDDING_VOYAGE_MODEL") {
            self.embedding.voyage_model = value;
        }
        if let Some(value) = read_env("CIRCLE_EMBEDDING_BASE_URL") {
            self.embedding.base_url = value;
        }
        if let Some(value) = read_env("CIRCLE_EMBEDDING_TIMEOUT_SECS") {
            self.embedding.timeout_secs = parse_env("CIRCLE_EMBEDDING_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CIRCLE_EMBEDDING_DIMENSION") {
            self.embedding.dimension = parse_env("CIRCLE_EMBEDDING_DIMENSION", &value)?;
        }

        if let Some(value) = read_env("CIRCLE_RANKING_CONFIDENCE_DISTANCE_HIGH") {
            self.ranking.confidence_distance_high =
                parse_env("CIRCLE_RANKING_CONFIDENCE_DISTANCE_HIGH", &value)?;
        }
        if let Some(value) = read_env("CIRCLE_RANKING_CONFIDENCE_DISTANCE_MED") {
            self.ranking.confidence_distance_med =
                parse_env("CIRCLE_RANKING_CONFIDENCE_DISTANCE_MED", &value)?;
        }
        if let Some(value) = read_env("CIRCLE_RANKING_DEFAULT_LIMIT") {
            self.ranking.default_limit = parse_env("CIRCLE_RANKING_DEFAULT_LIMIT", &value)?;
        }
        if let Some(value) = read_env("CIRCLE_RANKING_NEIGHBOR_COUNT") {
            self.ranking.neighbor_count = parse_env("CIRCLE_RANKING_NEIGHBOR_COUNT", &value)?;
        }
        if let Some(value) = read_env("CIRCLE_RANKING_SOCIAL_EVENT_WINDOW") {
            self.ranking.social_event_window =
                parse_env("CIRCLE_RANKING_SOCIAL_EVENT_WINDOW", &value)?;
        }

        let log_level = read_env("CIRCLE_LOGGING_LEVEL").or_else(|| read_env("CIRCLE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CIRCLE_LOGGING_FORMAT").or_else(|| read_env("CIRCLE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(voyage_api_key) = overrides.voyage_api_key {
            self.embedding.voyage_api_key = Some(secret_value(voyage_api_key));
        }
        if let Some(voyage_model) = overrides.voyage_model {
            self.embedding.voyage_model = voyage_model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_embedding(&self.embedding)?;
        validate_ranking(&self.ranking)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("circle.toml"), PathBuf::from("config/circle.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_embedding(embedding: &EmbeddingConfig) -> Result<(), ConfigError> {
    if embedding.timeout_secs == 0 || embedding.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "embedding.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if embedding.dimension == 0 {
        return Err(ConfigError::Validation(
            "embedding.dimension must be greater than zero".to_string(),
        ));
    }

    if embedding.voyage_enabled() {
        let base_url = embedding.base_url.trim();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "embedding.base_url must start with http:// or https://".to_string(),
            ));
        }
        if embedding.voyage_model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "embedding.voyage_model is required when a Voyage API key is configured"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_ranking(ranking: &RankingConfig) -> Result<(), ConfigError> {
    let high = ranking.confidence_distance_high;
    let med = ranking.confidence_distance_med;
    if !(high.is_finite() && med.is_finite() && 0.0 <= high && high <= med) {
        return Err(ConfigError::Validation(
            "ranking confidence distances must satisfy 0 <= confidence_distance_high <= confidence_distance_med"
                .to_string(),
        ));
    }

    if !(MIN_LIMIT..=MAX_LIMIT).contains(&ranking.default_limit) {
        return Err(ConfigError::Validation(format!(
            "ranking.default_limit must be in range {MIN_LIMIT}..={MAX_LIMIT}"
        )));
    }

    if ranking.neighbor_count == 0 || ranking.social_event_window == 0 {
        return Err(ConfigError::Validation(
            "ranking.neighbor_count and ranking.social_event_window must be greater than zero"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    embedding: Option<EmbeddingPatch>,
    ranking: Option<RankingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingPatch {
    voyage_api_key: Option<String>,
    voyage_model: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    dimension: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RankingPatch {
    confidence_distance_high: Option<f64>,
    confidence_distance_med: Option<f64>,
    default_limit: Option<usize>,
    neighbor_count: Option<usize>,
    social_event_window: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

use circle_core::config::{AppConfig, LoadOptions};
use circle_db::repositories::{FriendRepository, SqlFriendRepository, SqlVectorStore, VectorStore};
use circle_db::{connect_with_settings, migrations, ping};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.push(check_embedding_readiness(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            let reason = "configuration did not load";
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.push(DoctorCheck::skipped("embedding_readiness", reason));
            checks.push(DoctorCheck::skipped("database_connectivity", reason));
            checks.push(DoctorCheck::skipped("database_schema", reason));
            checks.push(DoctorCheck::skipped("demo_data", reason));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_embedding_readiness(config: &AppConfig) -> DoctorCheck {
    match circle_embeddings::select_provider(&config.embedding) {
        Ok(provider) if config.embedding.voyage_enabled() => DoctorCheck::pass(
            "embedding_readiness",
            format!("{} provider with model `{}`", provider.name(), config.embedding.voyage_model),
        ),
        Ok(provider) => DoctorCheck::pass(
            "embedding_readiness",
            format!(
                "{} provider (hash embeddings, dimension {}); set VOYAGE_API_KEY for Voyage",
                provider.name(),
                config.embedding.dimension
            ),
        ),
        Err(error) => DoctorCheck::fail("embedding_readiness", error.to_string()),
    }
}

/// Connectivity, schema and demo-data checks; later checks are skipped once one fails.
fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to initialize async runtime: {error}"),
                ),
                DoctorCheck::skipped("database_schema", "the runtime did not start"),
                DoctorCheck::skipped("demo_data", "the runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck::fail(
                        "database_connectivity",
                        format!("failed to connect to database: {error}"),
                    ),
                    DoctorCheck::skipped("database_schema", "the database is unreachable"),
                    DoctorCheck::skipped("demo_data", "the database is unreachable"),
                ];
            }
        };

        let mut checks = Vec::new();
        match ping(&pool).await {
            Ok(()) => checks.push(DoctorCheck::pass(
                "database_connectivity",
                format!("connected using `{}`", config.database.url),
            )),
            Err(error) => {
                checks.push(DoctorCheck::fail("database_connectivity", error.to_string()));
                checks.push(DoctorCheck::skipped("database_schema", "the database is unreachable"));
                checks.push(DoctorCheck::skipped("demo_data", "the database is unreachable"));
                pool.close().await;
                return checks;
            }
        }

        let schema_ready = matches!(migrations::required_tables_present(&pool).await, Ok(true));
        if schema_ready {
            checks.push(DoctorCheck::pass("database_schema", "required tables present"));
        } else {
            checks.push(DoctorCheck::fail(
                "database_schema",
                "required tables missing; run `circle migrate`",
            ));
            checks.push(DoctorCheck::skipped("demo_data", "the schema is not migrated"));
            pool.close().await;
            return checks;
        }

        let friends = SqlFriendRepository::new(pool.clone()).count().await;
        let vectors = SqlVectorStore::new(pool.clone()).count().await;
        checks.push(match (friends, vectors) {
            (Ok(friends), Ok(vectors)) if friends > 0 && vectors > 0 => DoctorCheck::pass(
                "demo_data",
                format!("{friends} friends seeded, {vectors} event vectors"),
            ),
            (Ok(friends), Ok(vectors)) => DoctorCheck::fail(
                "demo_data",
                format!("{friends} friends, {vectors} event vectors; run `circle seed`"),
            ),
            (Err(error), _) | (_, Err(error)) => DoctorCheck::fail("demo_data", error.to_string()),
        });

        pool.close().await;
        checks
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

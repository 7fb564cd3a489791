use circle_core::recommend::checked_limit;
use circle_core::{ApplicationError, RecommendationRequest};
use circle_db::{ensure_seeded, ensure_vectors_ready, recommendation_service};
use circle_embeddings::select_provider;
use tracing::info;

use crate::commands::{
    build_runtime, load_config, open_database, with_pool, CommandResult, StepFailure,
    EXIT_DB_CONNECTIVITY, EXIT_EMBEDDING, EXIT_INVALID_REQUEST, EXIT_RUNTIME, EXIT_SEED,
};

#[derive(Debug, Clone, Default)]
pub struct RecommendArgs {
    pub query: Option<String>,
    pub category: Option<String>,
    pub limit: Option<usize>,
}

/// Prints the recommendation payload itself on success, a command outcome on failure.
pub fn run(args: RecommendArgs) -> CommandResult {
    let config = match load_config("recommend") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let limit = match checked_limit(args.limit.unwrap_or(config.ranking.default_limit)) {
        Ok(limit) => limit,
        Err(error) => {
            return CommandResult::failure(
                "recommend",
                "invalid_request",
                error.to_string(),
                EXIT_INVALID_REQUEST,
            )
        }
    };
    let mut request = RecommendationRequest::new();
    request.query = args.query;
    request.category = args.category;
    request.limit = limit;

    let runtime = match build_runtime("recommend") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let (config, request) = (&config, &request);
        with_pool(pool, |pool| async move {
            let embedder = select_provider(&config.embedding)
                .map_err(|error| ("embedding_setup", error.to_string(), EXIT_EMBEDDING))?;

            ensure_seeded(&pool, embedder.as_ref())
                .await
                .map_err(|error| ("seed_execution", error.to_string(), EXIT_SEED))?;
            ensure_vectors_ready(&pool, embedder.as_ref())
                .await
                .map_err(|error| ("vector_rebuild", error.to_string(), EXIT_EMBEDDING))?;

            let service = recommendation_service(&pool, embedder, &config.ranking);
            let response = service.recommend(request).await.map_err(recommend_failure)?;
            info!(
                event_name = "cli.recommend.completed",
                mode = ?response.mode,
                items = response.items.len(),
                "recommendations ranked"
            );
            Ok(response)
        })
        .await
    });

    match result {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::failure(
                "recommend",
                "serialization",
                error.to_string(),
                EXIT_RUNTIME,
            ),
        },
        Err(failure) => CommandResult::from_step("recommend", failure),
    }
}

fn recommend_failure(error: ApplicationError) -> StepFailure {
    match error {
        ApplicationError::Domain(error) => {
            ("invalid_request", error.to_string(), EXIT_INVALID_REQUEST)
        }
        ApplicationError::Integration(message) => ("embedding", message, EXIT_EMBEDDING),
        other => ("recommendation", other.to_string(), EXIT_DB_CONNECTIVITY),
    }
}

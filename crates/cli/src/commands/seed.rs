use chrono::Utc;
use circle_db::{rebuild_vectors, DemoDataset, SeedResult};
use circle_embeddings::select_provider;
use tracing::info;

use crate::commands::{
    build_runtime, load_config, open_database, with_pool, CommandResult, EXIT_EMBEDDING, EXIT_SEED,
};

struct SeedOutput {
    seed: SeedResult,
    vectors: usize,
    provider: String,
}

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let config = &config;
        with_pool(pool, |pool| async move {
            let embedder = select_provider(&config.embedding)
                .map_err(|error| ("embedding_setup", error.to_string(), EXIT_EMBEDDING))?;

            let seed = DemoDataset::load(&pool, Utc::now())
                .await
                .map_err(|error| ("seed_execution", error.to_string(), EXIT_SEED))?;
            let vectors = rebuild_vectors(&pool, embedder.as_ref())
                .await
                .map_err(|error| ("vector_rebuild", error.to_string(), EXIT_EMBEDDING))?;
            info!(
                event_name = "cli.seed.vectors_rebuilt",
                seeded = seed.seeded,
                vectors,
                provider = embedder.name(),
                "event vectors rebuilt"
            );

            let verification = DemoDataset::verify(&pool)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), EXIT_SEED))?;
            if !verification.all_present {
                return Err((
                    "seed_verification",
                    verification_message(&verification.checks),
                    EXIT_SEED,
                ));
            }

            Ok(SeedOutput { seed, vectors, provider: embedder.name().to_owned() })
        })
        .await
    });

    match result {
        Ok(output) => {
            let state = if output.seed.seeded { "seeded" } else { "already present" };
            let message = format!(
                "demo dataset {state}: {} friends, {} products, {} events; embedded {} event vectors with `{}`",
                output.seed.friends,
                output.seed.products,
                output.seed.events,
                output.vectors,
                output.provider
            );
            CommandResult::success("seed", message)
        }
        Err(failure) => CommandResult::from_step("seed", failure),
    }
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::verification_message;

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = [("users", true), ("friend-strength-range", false), ("core-products", false)];

        assert_eq!(
            verification_message(&checks),
            "Seed verification failed for checks: friend-strength-range, core-products"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let checks = [("friends", true), ("products", true)];

        assert_eq!(verification_message(&checks), "Some seed data failed to load");
    }
}

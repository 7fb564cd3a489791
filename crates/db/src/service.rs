use std::sync::Arc;

use circle_core::config::RankingConfig;
use circle_core::recommend::ScoreCalculator;
use circle_core::{EmbeddingProvider, RankingPipeline, RecommendationService};

use crate::repositories::{SqlEventRepository, SqlVectorStore};
use crate::DbPool;

/// A recommendation service reading candidates from this database.
pub fn recommendation_service(
    pool: &DbPool,
    embedder: Arc<dyn EmbeddingProvider>,
    ranking: &RankingConfig,
) -> RecommendationService {
    let pipeline = RankingPipeline::new(ScoreCalculator::with_thresholds(ranking.thresholds()));

    RecommendationService::new(
        embedder,
        Arc::new(SqlVectorStore::new(pool.clone())),
        Arc::new(SqlEventRepository::new(pool.clone())),
    )
    .with_pipeline(pipeline)
    .with_settings(ranking.service_settings())
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::pipeline::RankingPipeline;
use super::sources::{EmbeddingProvider, SemanticCandidateSource, SocialCandidateSource};
use super::types::{RankMode, RecommendationRequest, RecommendationResponse};
use crate::errors::ApplicationError;

/// How many candidates to pull from each source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub neighbor_count: usize,
    pub social_event_window: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { neighbor_count: 50, social_event_window: 200 }
    }
}

/// Resolves candidates for a request and runs them through the ranking pipeline.
#[derive(Clone)]
pub struct RecommendationService {
    embedder: Arc<dyn EmbeddingProvider>,
    semantic: Arc<dyn SemanticCandidateSource>,
    social: Arc<dyn SocialCandidateSource>,
    pipeline: RankingPipeline,
    settings: ServiceSettings,
}

impl RecommendationService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        semantic: Arc<dyn SemanticCandidateSource>,
        social: Arc<dyn SocialCandidateSource>,
    ) -> Self {
        Self {
            embedder,
            semantic,
            social,
            pipeline: RankingPipeline::default(),
            settings: ServiceSettings::default(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: RankingPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_settings(mut self, settings: ServiceSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn embedding_provider(&self) -> &str {
        self.embedder.name()
    }

    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, ApplicationError> {
        self.recommend_at(request, Utc::now()).await
    }

    /// Same as [`recommend`](Self::recommend) with an explicit clock.
    pub async fn recommend_at(
        &self,
        request: &RecommendationRequest,
        now: DateTime<Utc>,
    ) -> Result<RecommendationResponse, ApplicationError> {
        request.validate()?;

        let mode = request.mode();
        let events = match request.query_text() {
            Some(query) => {
                let embedding = self.embedder.embed_query(query).await?;
                self.semantic.nearest(&embedding, self.settings.neighbor_count).await?
            }
            None => self.social.recent(self.settings.social_event_window).await?,
        };

        if mode == RankMode::Semantic && events.iter().any(|event| event.distance.is_none()) {
            warn!(
                event_name = "recommend.semantic.missing_distance",
                "semantic source returned events without a distance"
            );
        }

        let candidates = events.len();
        let mut response = self.pipeline.rank(request, events, now);
        if mode == RankMode::Semantic {
            response.embedding_provider = Some(self.embedder.name().to_owned());
        }

        info!(
            event_name = "recommend.completed",
            mode = mode.as_str(),
            candidates,
            returned = response.items.len(),
            embedding_provider = self.embedder.name(),
            "recommendations ranked"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::domain::event::Event;
    use crate::errors::DomainError;
    use crate::recommend::test_support::{event, fixed_now, EventFixture};

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        fn name(&self) -> &str {
            "fallback"
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, ApplicationError> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_documents(
            &self,
            texts: &[String],
        ) -> Result<Vec<Vec<f32>>, ApplicationError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[derive(Default)]
    struct RecordingSource {
        events: Vec<Event>,
        requested: Mutex<Vec<usize>>,
    }

    impl RecordingSource {
        fn with(events: Vec<Event>) -> Self {
            Self { events, requested: Mutex::new(Vec::new()) }
        }

        fn requested(&self) -> Vec<usize> {
            self.requested.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl SemanticCandidateSource for RecordingSource {
        async fn nearest(
            &self,
            _embedding: &[f32],
            count: usize,
        ) -> Result<Vec<Event>, ApplicationError> {
            self.requested.lock().expect("lock").push(count);
            Ok(self.events.clone())
        }
    }

    #[async_trait]
    impl SocialCandidateSource for RecordingSource {
        async fn recent(&self, count: usize) -> Result<Vec<Event>, ApplicationError> {
            self.requested.lock().expect("lock").push(count);
            Ok(self.events.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl SocialCandidateSource for FailingSource {
        async fn recent(&self, _count: usize) -> Result<Vec<Event>, ApplicationError> {
            Err(ApplicationError::Persistence("database is locked".to_owned()))
        }
    }

    fn semantic_events() -> Vec<Event> {
        vec![
            event(EventFixture { event_id: 1, product_id: 1, distance: Some(0.2), ..EventFixture::default() }),
            event(EventFixture { event_id: 2, product_id: 2, distance: Some(0.6), ..EventFixture::default() }),
        ]
    }

    fn social_events() -> Vec<Event> {
        vec![event(EventFixture {
            event_id: 7,
            product_id: 9,
            occurred_at: fixed_now() - Duration::days(3),
            ..EventFixture::default()
        })]
    }

    #[tokio::test]
    async fn query_routes_to_semantic_source() {
        let semantic = Arc::new(RecordingSource::with(semantic_events()));
        let social = Arc::new(RecordingSource::with(social_events()));
        let service = RecommendationService::new(Arc::new(FixedEmbedder), semantic.clone(), social.clone());

        let response = service
            .recommend_at(&RecommendationRequest::new().with_query("headphones"), fixed_now())
            .await
            .expect("recommendations");

        assert_eq!(response.mode, RankMode::Semantic);
        assert_eq!(response.embedding_provider.as_deref(), Some("fallback"));
        assert_eq!(response.items.len(), 2);
        assert_eq!(semantic.requested(), vec![50]);
        assert!(social.requested().is_empty());
    }

    #[tokio::test]
    async fn missing_query_routes_to_social_source() {
        let semantic = Arc::new(RecordingSource::with(semantic_events()));
        let social = Arc::new(RecordingSource::with(social_events()));
        let service = RecommendationService::new(Arc::new(FixedEmbedder), semantic.clone(), social.clone())
            .with_settings(ServiceSettings { neighbor_count: 10, social_event_window: 25 });

        let response = service
            .recommend_at(&RecommendationRequest::new().with_query("  "), fixed_now())
            .await
            .expect("recommendations");

        assert_eq!(response.mode, RankMode::Social);
        assert_eq!(response.embedding_provider, None);
        assert_eq!(response.items[0].id.0, 9);
        assert_eq!(social.requested(), vec![25]);
        assert!(semantic.requested().is_empty());
    }

    #[tokio::test]
    async fn invalid_limit_is_rejected_before_touching_sources() {
        let social = Arc::new(RecordingSource::with(social_events()));
        let service = RecommendationService::new(
            Arc::new(FixedEmbedder),
            Arc::new(RecordingSource::default()),
            social.clone(),
        );
        let request = RecommendationRequest { limit: 0, ..RecommendationRequest::new() };

        let error = service.recommend_at(&request, fixed_now()).await.expect_err("limit 0");

        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::InvalidLimit { limit: 0, min: 1, max: 50 })
        );
        assert!(social.requested().is_empty());
    }

    #[tokio::test]
    async fn source_failures_propagate() {
        let service = RecommendationService::new(
            Arc::new(FixedEmbedder),
            Arc::new(RecordingSource::default()),
            Arc::new(FailingSource),
        );

        let error = service
            .recommend_at(&RecommendationRequest::new(), fixed_now())
            .await
            .expect_err("failing source");

        assert!(matches!(error, ApplicationError::Persistence(_)));
    }

    #[tokio::test]
    async fn empty_store_yields_empty_response() {
        let service = RecommendationService::new(
            Arc::new(FixedEmbedder),
            Arc::new(RecordingSource::default()),
            Arc::new(RecordingSource::default()),
        );

        let response = service
            .recommend_at(&RecommendationRequest::new().with_query("lamp"), fixed_now())
            .await
            .expect("recommendations");

        assert_eq!(response.mode, RankMode::Semantic);
        assert!(response.items.is_empty());
    }
}

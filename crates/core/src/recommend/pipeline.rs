//! Ranking pipeline
//!
//! `Start -> ModeSelect -> Aggregate -> Score -> Sort -> Truncate -> Done`, strictly linear.

use chrono::{DateTime, Utc};

use super::aggregate::{aggregate, Candidate};
use super::explanation::ExplanationBuilder;
use super::features::{similarity_raw, DistanceWindow};
use super::scoring::{ComponentScores, ScoreCalculator};
use super::types::{RankMode, RecommendationRequest, RecommendationResponse, ScoredItem};
use super::{MAX_LIMIT, MIN_LIMIT};
use crate::domain::event::Event;

#[derive(Debug, Clone, Default)]
pub struct RankingPipeline {
    calculator: ScoreCalculator,
    explanations: ExplanationBuilder,
}

impl RankingPipeline {
    pub fn new(calculator: ScoreCalculator) -> Self {
        Self { calculator, explanations: ExplanationBuilder }
    }

    pub fn calculator(&self) -> &ScoreCalculator {
        &self.calculator
    }

    /// Rank `events` for `request` as of `now`.
    ///
    /// Semantic mode expects every event to carry its search distance. The normalization
    /// window is taken over all events before the category filter is applied.
    pub fn rank(
        &self,
        request: &RecommendationRequest,
        events: Vec<Event>,
        now: DateTime<Utc>,
    ) -> RecommendationResponse {
        let mode = request.mode();
        let limit = request.limit.clamp(MIN_LIMIT, MAX_LIMIT);
        let category = request.category_filter();

        let window = match mode {
            RankMode::Semantic => DistanceWindow::from_distances(events.iter().filter_map(|e| e.distance)),
            RankMode::Social => None,
        };

        let candidates = aggregate(events, category, mode);
        if candidates.is_empty() {
            return RecommendationResponse::empty(mode);
        }

        let items = candidates
            .iter()
            .map(|candidate| {
                let components = match (mode, window) {
                    (RankMode::Semantic, Some(window)) => self.calculator.semantic_components(
                        candidate,
                        window,
                        request.query_text().unwrap_or_default(),
                        now,
                    ),
                    _ => self.calculator.social_components(candidate, now),
                };
                self.score(candidate, mode, &components)
            })
            .collect();

        let items = self.calculator.rank_and_truncate(items, limit);
        tracing::debug!(
            event_name = "recommend.pipeline.ranked",
            mode = mode.as_str(),
            returned = items.len(),
            limit,
            "ranking pipeline completed"
        );

        RecommendationResponse { mode, embedding_provider: None, items }
    }

    fn score(&self, candidate: &Candidate, mode: RankMode, components: &ComponentScores) -> ScoredItem {
        let product = candidate.product();
        let best = candidate.best_event();
        let distance = match mode {
            RankMode::Semantic => candidate.best_distance(),
            RankMode::Social => None,
        };

        ScoredItem {
            id: product.id,
            title: product.title.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            price: product.display_price(),
            description: product.description.clone(),
            friend_name: best.friend.name.clone(),
            friend_avatar: best.friend.avatar_url.clone(),
            event_type: best.event_type,
            distance,
            similarity: distance.map(similarity_raw),
            confidence: self.calculator.confidence(mode, distance),
            score: self.calculator.calculate_total_score(mode, components),
            explanation: self.explanations.build(candidate, mode, components),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::event::EventType;
    use crate::recommend::test_support::{event, fixed_now, EventFixture};
    use crate::recommend::types::Confidence;

    fn headphones_search() -> Vec<Event> {
        [(1, 0.1), (2, 0.3), (3, 0.5)]
            .into_iter()
            .map(|(id, distance)| {
                event(EventFixture {
                    event_id: id,
                    product_id: id,
                    title: ["Aura Speaker", "Pulse Earbuds", "Echo Camera"][id as usize - 1],
                    description: "Portable audio for everyday listening.",
                    strength: 0.8,
                    distance: Some(distance),
                    ..EventFixture::default()
                })
            })
            .collect()
    }

    #[test]
    fn semantic_scenario_orders_by_distance_with_confidence_labels() {
        let pipeline = RankingPipeline::default();
        let request = RecommendationRequest::new().with_query("headphones");

        let response = pipeline.rank(&request, headphones_search(), fixed_now());

        assert_eq!(response.mode, RankMode::Semantic);
        let ids: Vec<i64> = response.items.iter().map(|item| item.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let labels: Vec<Confidence> = response.items.iter().map(|item| item.confidence).collect();
        assert_eq!(labels, vec![Confidence::High, Confidence::Medium, Confidence::Low]);

        // 0.75 * {1, 0.5, 0} + 0.08 * 0.8 + 0.07 + 0.05, no lexical matches
        let expected = [0.934, 0.559, 0.184];
        for (item, expected) in response.items.iter().zip(expected) {
            assert!((item.score - expected).abs() < 1e-9, "{} vs {expected}", item.score);
        }

        assert_eq!(response.items[0].distance, Some(0.1));
        assert!((response.items[0].similarity.unwrap_or_default() - 0.9).abs() < 1e-12);
        assert_eq!(response.items[1].explanation.semantic_score, Some(0.5));
    }

    #[test]
    fn social_scenario_prefers_fresh_activity_over_strong_but_stale() {
        let now = fixed_now();
        let events = vec![
            event(EventFixture {
                event_id: 1,
                product_id: 10,
                strength: 0.9,
                occurred_at: now - Duration::days(40),
                ..EventFixture::default()
            }),
            event(EventFixture {
                event_id: 2,
                product_id: 20,
                strength: 0.5,
                occurred_at: now,
                ..EventFixture::default()
            }),
        ];

        let response = RankingPipeline::default().rank(&RecommendationRequest::new(), events, now);

        assert_eq!(response.mode, RankMode::Social);
        assert_eq!(response.items[0].id.0, 20);
        assert_eq!(response.items[1].id.0, 10);
        // 0.45 * 0.5 + 0.35 * 1.0 + 0.2 * 1.0 = 0.775
        assert!((response.items[0].score - 0.775).abs() < 1e-9);
        // 0.45 * 0.9 + 0.35 * 0.0 + 0.2 * 1.0 = 0.605
        assert!((response.items[1].score - 0.605).abs() < 1e-9);
        assert!(response.items.iter().all(|item| item.confidence == Confidence::Social));
        assert!(response.items.iter().all(|item| item.distance.is_none()));
        assert_eq!(response.items[0].explanation.semantic_score, None);
        assert_eq!(response.items[0].explanation.lexical_boost, 0.0);
    }

    #[test]
    fn filtered_candidates_still_shape_the_normalization_window() {
        let mut events = headphones_search();
        events.push(event(EventFixture {
            event_id: 4,
            product_id: 4,
            title: "Glow Serum",
            category: "Beauty",
            distance: Some(0.9),
            ..EventFixture::default()
        }));
        events.push(event(EventFixture {
            event_id: 5,
            product_id: 5,
            title: "Echo Cleanser",
            category: "beauty",
            distance: Some(0.5),
            ..EventFixture::default()
        }));

        let request = RecommendationRequest::new().with_query("headphones").with_category("Beauty");
        let response = RankingPipeline::default().rank(&request, events, fixed_now());

        let ids: Vec<i64> = response.items.iter().map(|item| item.id.0).collect();
        assert_eq!(ids, vec![5, 4]);
        assert!(response.items.iter().all(|item| item.category.to_lowercase() == "beauty"));

        // window is [0.1, 0.9] from the unfiltered result, not [0.5, 0.9]
        assert_eq!(response.items[0].explanation.semantic_score, Some(0.5));
        assert_eq!(response.items[1].explanation.semantic_score, Some(0.0));
    }

    #[test]
    fn lexical_boost_can_reorder_close_candidates() {
        let events = vec![
            event(EventFixture {
                event_id: 1,
                product_id: 1,
                title: "Lumen Smart Desk Lamp",
                description: "Adaptive desk lamp with circadian presets.",
                distance: Some(0.30),
                ..EventFixture::default()
            }),
            event(EventFixture {
                event_id: 2,
                product_id: 2,
                title: "Aura Throw",
                description: "Soft-touch finish.",
                distance: Some(0.28),
                ..EventFixture::default()
            }),
            event(EventFixture {
                event_id: 3,
                product_id: 3,
                title: "Summit Diffuser",
                description: "Calming aesthetic.",
                distance: Some(0.60),
                ..EventFixture::default()
            }),
        ];

        let request = RecommendationRequest::new().with_query("desk lamp");
        let response = RankingPipeline::default().rank(&request, events, fixed_now());

        assert_eq!(response.items[0].id.0, 1);
        assert_eq!(response.items[0].explanation.lexical_boost, 0.1);
    }

    #[test]
    fn equal_scores_keep_first_seen_order() {
        let events: Vec<Event> = [30, 10, 20]
            .into_iter()
            .map(|id| event(EventFixture { event_id: id, product_id: id, ..EventFixture::default() }))
            .collect();

        let response = RankingPipeline::default().rank(&RecommendationRequest::new(), events, fixed_now());

        let ids: Vec<i64> = response.items.iter().map(|item| item.id.0).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[test]
    fn ranking_is_deterministic() {
        let pipeline = RankingPipeline::default();
        let request = RecommendationRequest::new().with_query("portable audio");

        let first = pipeline.rank(&request, headphones_search(), fixed_now());
        let second = pipeline.rank(&request, headphones_search(), fixed_now());

        assert_eq!(first, second);
    }

    #[test]
    fn results_are_truncated_to_limit() {
        let events: Vec<Event> = (1..=20)
            .map(|id| {
                event(EventFixture {
                    event_id: id,
                    product_id: id,
                    event_type: if id % 2 == 0 { EventType::View } else { EventType::Purchase },
                    ..EventFixture::default()
                })
            })
            .collect();

        let request = RecommendationRequest::new().with_limit(5).expect("valid limit");
        let response = RankingPipeline::default().rank(&request, events, fixed_now());

        assert_eq!(response.items.len(), 5);
        assert!(response.items.iter().all(|item| item.event_type == EventType::Purchase));
    }

    #[test]
    fn empty_input_keeps_mode() {
        let pipeline = RankingPipeline::default();

        let semantic =
            pipeline.rank(&RecommendationRequest::new().with_query("lamp"), Vec::new(), fixed_now());
        assert_eq!(semantic.mode, RankMode::Semantic);
        assert!(semantic.items.is_empty());

        let social = pipeline.rank(&RecommendationRequest::new(), Vec::new(), fixed_now());
        assert_eq!(social.mode, RankMode::Social);
        assert!(social.items.is_empty());
    }

    #[test]
    fn scored_item_serializes_price_and_nulls() {
        let response =
            RankingPipeline::default().rank(&RecommendationRequest::new(), vec![event(EventFixture::default())], fixed_now());

        let json = serde_json::to_value(&response).expect("serialize response");
        let item = &json["items"][0];
        assert_eq!(json["mode"], "social");
        assert_eq!(item["price"], "249.00");
        assert_eq!(item["friendName"], "Ava Patel");
        assert_eq!(item["eventType"], "purchase");
        assert_eq!(item["confidence"], "Social");
        assert!(item["distance"].is_null());
        assert!(item["similarity"].is_null());
        assert!(item["explanation"]["semanticScore"].is_null());
    }
}

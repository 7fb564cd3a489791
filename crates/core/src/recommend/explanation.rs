//! Explanation builder

use super::aggregate::Candidate;
use super::scoring::ComponentScores;
use super::types::{Explanation, RankMode, SupportingMatch};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExplanationBuilder;

impl ExplanationBuilder {
    pub fn build(
        &self,
        candidate: &Candidate,
        mode: RankMode,
        components: &ComponentScores,
    ) -> Explanation {
        Explanation {
            summary: self.summary(candidate),
            semantic_score: components.similarity.map(round3),
            friend_strength: round3(components.friend_strength),
            recency_score: round3(components.recency),
            event_weight: components.event_weight,
            lexical_boost: round3(components.lexical_boost),
            matches: candidate
                .supporting_matches(mode)
                .into_iter()
                .map(|event| SupportingMatch {
                    friend_name: event.friend.name.clone(),
                    event_type: event.event_type,
                    distance: event.distance,
                    timestamp: event.occurred_at,
                    product_title: event.product.title.clone(),
                })
                .collect(),
        }
    }

    /// "Because Ava Patel bought Eden Skin Serum"
    pub fn summary(&self, candidate: &Candidate) -> String {
        let best = candidate.best_event();
        format!(
            "Because {} {} {}",
            best.friend.name,
            best.event_type.verb(),
            candidate.product().title
        )
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::EventType;
    use crate::recommend::aggregate::aggregate;
    use crate::recommend::test_support::{event, EventFixture};

    #[test]
    fn summary_names_best_friend_and_verb() {
        let candidates = aggregate(
            vec![
                event(EventFixture {
                    event_id: 1,
                    friend: "Maya Chen",
                    event_type: EventType::View,
                    distance: Some(0.12),
                    ..EventFixture::default()
                }),
                event(EventFixture {
                    event_id: 2,
                    friend: "Liam Ortega",
                    distance: Some(0.3),
                    ..EventFixture::default()
                }),
            ],
            None,
            RankMode::Semantic,
        );

        assert_eq!(
            ExplanationBuilder.summary(&candidates[0]),
            "Because Maya Chen viewed Nimbus Noise-Canceling Headphones"
        );
    }

    #[test]
    fn sub_scores_are_rounded_except_event_weight() {
        let candidates =
            aggregate(vec![event(EventFixture::default())], None, RankMode::Social);
        let components = ComponentScores {
            similarity: None,
            friend_strength: 0.87654,
            recency: 0.466666,
            event_weight: 0.6,
            lexical_boost: 0.0,
        };

        let explanation = ExplanationBuilder.build(&candidates[0], RankMode::Social, &components);

        assert_eq!(explanation.semantic_score, None);
        assert_eq!(explanation.friend_strength, 0.877);
        assert_eq!(explanation.recency_score, 0.467);
        assert_eq!(explanation.event_weight, 0.6);
        assert_eq!(explanation.summary, "Because Ava Patel bought Nimbus Noise-Canceling Headphones");
        assert_eq!(explanation.matches.len(), 1);
        assert_eq!(explanation.matches[0].distance, None);
    }

    #[test]
    fn serialized_explanation_uses_camel_case() {
        let candidates = aggregate(
            vec![event(EventFixture { distance: Some(0.2), ..EventFixture::default() })],
            None,
            RankMode::Semantic,
        );
        let components = ComponentScores {
            similarity: Some(1.0),
            friend_strength: 0.8,
            recency: 1.0,
            event_weight: 1.0,
            lexical_boost: 0.05,
        };

        let json = serde_json::to_value(ExplanationBuilder.build(
            &candidates[0],
            RankMode::Semantic,
            &components,
        ))
        .expect("serialize explanation");

        assert_eq!(json["semanticScore"], 1.0);
        assert_eq!(json["lexicalBoost"], 0.05);
        assert_eq!(json["matches"][0]["friendName"], "Ava Patel");
        assert_eq!(json["matches"][0]["eventType"], "purchase");
        assert_eq!(json["matches"][0]["productTitle"], "Nimbus Noise-Canceling Headphones");
        assert_eq!(json["matches"][0]["timestamp"], "2026-03-01T12:00:00Z");
    }
}

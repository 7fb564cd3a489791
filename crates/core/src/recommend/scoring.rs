//! Composite scoring for recommendations

use chrono::{DateTime, Utc};

use super::aggregate::Candidate;
use super::features::{
    event_weight_score, friend_strength_score, lexical_boost, recency_score,
    similarity_normalized, DistanceWindow,
};
use super::types::{Confidence, RankMode, ScoredItem};

/// Weights for semantic mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticWeights {
    /// Weight for normalized similarity (default: 0.75)
    pub similarity: f64,
    /// Weight for the strongest friend tie (default: 0.08)
    pub friend_strength: f64,
    /// Weight for recency (default: 0.07)
    pub recency: f64,
    /// Weight for purchase/view weight (default: 0.05)
    pub event_weight: f64,
}

impl Default for SemanticWeights {
    fn default() -> Self {
        super::DEFAULT_SEMANTIC_WEIGHTS
    }
}

/// Weights for social mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SocialWeights {
    /// Weight for the strongest friend tie (default: 0.45)
    pub friend_strength: f64,
    /// Weight for recency (default: 0.35)
    pub recency: f64,
    /// Weight for purchase/view weight (default: 0.2)
    pub event_weight: f64,
}

impl Default for SocialWeights {
    fn default() -> Self {
        super::DEFAULT_SOCIAL_WEIGHTS
    }
}

/// Distance cut-offs for the confidence label (inclusive upper bounds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        super::DEFAULT_CONFIDENCE_THRESHOLDS
    }
}

impl ConfidenceThresholds {
    pub fn label(&self, distance: f64) -> Confidence {
        if distance <= self.high {
            Confidence::High
        } else if distance <= self.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Unrounded sub-scores for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComponentScores {
    /// Normalized similarity; `None` in social mode
    pub similarity: Option<f64>,
    pub friend_strength: f64,
    pub recency: f64,
    pub event_weight: f64,
    pub lexical_boost: f64,
}

/// Score calculator for recommendations
#[derive(Debug, Clone, Default)]
pub struct ScoreCalculator {
    semantic: SemanticWeights,
    social: SocialWeights,
    thresholds: ConfidenceThresholds,
}

impl ScoreCalculator {
    /// Create a calculator with default weights and thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the confidence thresholds, keeping default weights
    pub fn with_thresholds(thresholds: ConfidenceThresholds) -> Self {
        Self { thresholds, ..Self::default() }
    }

    /// Create with custom weights
    pub fn with_weights(semantic: SemanticWeights, social: SocialWeights) -> Self {
        Self { semantic, social, thresholds: ConfidenceThresholds::default() }
    }

    pub fn thresholds(&self) -> ConfidenceThresholds {
        self.thresholds
    }

    /// Sub-scores for a semantic-mode candidate. `window` spans the whole search result.
    pub fn semantic_components(
        &self,
        candidate: &Candidate,
        window: DistanceWindow,
        query: &str,
        now: DateTime<Utc>,
    ) -> ComponentScores {
        let product = candidate.product();
        let best_distance = candidate.best_distance().unwrap_or(window.max);

        ComponentScores {
            similarity: Some(similarity_normalized(best_distance, window)),
            friend_strength: friend_strength_score(candidate),
            recency: recency_score(candidate, now),
            event_weight: event_weight_score(candidate),
            lexical_boost: lexical_boost(query, &product.title, &product.description),
        }
    }

    /// Sub-scores for a social-mode candidate.
    pub fn social_components(&self, candidate: &Candidate, now: DateTime<Utc>) -> ComponentScores {
        ComponentScores {
            similarity: None,
            friend_strength: friend_strength_score(candidate),
            recency: recency_score(candidate, now),
            event_weight: event_weight_score(candidate),
            lexical_boost: 0.0,
        }
    }

    /// Weighted total for the given mode
    pub fn calculate_total_score(&self, mode: RankMode, components: &ComponentScores) -> f64 {
        match mode {
            RankMode::Semantic => {
                self.semantic.similarity * components.similarity.unwrap_or(0.0)
                    + self.semantic.friend_strength * components.friend_strength
                    + self.semantic.recency * components.recency
                    + self.semantic.event_weight * components.event_weight
                    + components.lexical_boost
            }
            RankMode::Social => {
                self.social.friend_strength * components.friend_strength
                    + self.social.recency * components.recency
                    + self.social.event_weight * components.event_weight
            }
        }
    }

    /// Confidence label from the candidate's best raw distance
    pub fn confidence(&self, mode: RankMode, best_distance: Option<f64>) -> Confidence {
        match (mode, best_distance) {
            (RankMode::Semantic, Some(distance)) => self.thresholds.label(distance),
            (RankMode::Semantic, None) => Confidence::Low,
            (RankMode::Social, _) => Confidence::Social,
        }
    }

    /// Sort by score descending and keep the first `limit` items.
    ///
    /// The sort is stable, so equal scores keep aggregation order.
    pub fn rank_and_truncate(&self, mut items: Vec<ScoredItem>, limit: usize) -> Vec<ScoredItem> {
        items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        items.truncate(limit);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let semantic = SemanticWeights::default();
        let semantic_sum =
            semantic.similarity + semantic.friend_strength + semantic.recency + semantic.event_weight;
        assert!((semantic_sum - 0.95).abs() < 1e-12);

        let social = SocialWeights::default();
        assert!((social.friend_strength + social.recency + social.event_weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_semantic_total_score_calculation() {
        let calculator = ScoreCalculator::new();
        let components = ComponentScores {
            similarity: Some(0.5),
            friend_strength: 0.8,
            recency: 1.0,
            event_weight: 1.0,
            lexical_boost: 0.05,
        };

        let total = calculator.calculate_total_score(RankMode::Semantic, &components);
        // 0.375 + 0.064 + 0.07 + 0.05 + 0.05
        assert!((total - 0.609).abs() < 1e-9);
    }

    #[test]
    fn test_social_total_score_ignores_similarity_and_lexical() {
        let calculator = ScoreCalculator::new();
        let components = ComponentScores {
            similarity: Some(1.0),
            friend_strength: 0.5,
            recency: 1.0,
            event_weight: 0.6,
            lexical_boost: 0.15,
        };

        let total = calculator.calculate_total_score(RankMode::Social, &components);
        // 0.225 + 0.35 + 0.12
        assert!((total - 0.695).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_thresholds_are_inclusive() {
        let calculator = ScoreCalculator::new();
        let label = |distance| calculator.confidence(RankMode::Semantic, Some(distance));

        assert_eq!(label(0.05), Confidence::High);
        assert_eq!(label(0.25), Confidence::High);
        assert_eq!(label(0.35), Confidence::Medium);
        assert_eq!(label(0.45), Confidence::Medium);
        assert_eq!(label(0.46), Confidence::Low);
        assert_eq!(calculator.confidence(RankMode::Social, Some(0.01)), Confidence::Social);
    }

    #[test]
    fn test_custom_thresholds() {
        let calculator =
            ScoreCalculator::with_thresholds(ConfidenceThresholds { high: 0.1, medium: 0.2 });
        assert_eq!(calculator.confidence(RankMode::Semantic, Some(0.15)), Confidence::Medium);
        assert_eq!(calculator.confidence(RankMode::Semantic, Some(0.25)), Confidence::Low);
    }
}

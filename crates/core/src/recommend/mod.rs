//! Recommendation scoring engine
//!
//! Turns nearest-neighbor matches (semantic mode) or recent friend activity (social mode)
//! into a ranked, explained list of products. Everything in here except `service` is pure:
//! callers hand over already-resolved events and get a value back.

mod aggregate;
mod explanation;
pub mod features;
mod pipeline;
mod scoring;
mod service;
pub mod sources;
#[cfg(test)]
mod test_support;
mod types;

pub use aggregate::{aggregate, Candidate};
pub use explanation::ExplanationBuilder;
pub use pipeline::RankingPipeline;
pub use scoring::{
    ComponentScores, ConfidenceThresholds, ScoreCalculator, SemanticWeights, SocialWeights,
};
pub use service::{RecommendationService, ServiceSettings};
pub use types::*;

/// Default semantic weights; similarity dominates, lexical boost is added on top.
pub const DEFAULT_SEMANTIC_WEIGHTS: SemanticWeights = SemanticWeights {
    similarity: 0.75,
    friend_strength: 0.08,
    recency: 0.07,
    event_weight: 0.05,
};

/// Default social weights (sum to exactly 1.0).
pub const DEFAULT_SOCIAL_WEIGHTS: SocialWeights =
    SocialWeights { friend_strength: 0.45, recency: 0.35, event_weight: 0.2 };

pub const DEFAULT_CONFIDENCE_THRESHOLDS: ConfidenceThresholds =
    ConfidenceThresholds { high: 0.25, medium: 0.45 };

/// Items returned when the caller does not ask for a specific count.
pub const DEFAULT_LIMIT: usize = 12;

pub const MIN_LIMIT: usize = 1;

pub const MAX_LIMIT: usize = 50;

/// Supporting matches attached to each explanation.
pub const MAX_SUPPORTING_MATCHES: usize = 3;

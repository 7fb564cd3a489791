//! Types for the recommendation engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::event::EventType;
use crate::domain::product::ProductId;
use crate::errors::DomainError;

use super::{DEFAULT_LIMIT, MAX_LIMIT, MIN_LIMIT};

/// Which scoring scheme a request runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMode {
    /// Free-text query present; similarity to the query dominates.
    Semantic,
    /// No query; ranking is driven purely by friend activity.
    Social,
}

impl RankMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankMode::Semantic => "semantic",
            RankMode::Social => "social",
        }
    }
}

/// Request for product recommendations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationRequest {
    /// Free-text query; whitespace-only counts as absent
    pub query: Option<String>,
    /// Optional category filter, matched case-insensitively
    pub category: Option<String>,
    /// Maximum number of items to return
    pub limit: usize,
}

impl Default for RecommendationRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationRequest {
    /// Create a social-mode request with the default limit
    pub fn new() -> Self {
        Self { query: None, category: None, limit: DEFAULT_LIMIT }
    }

    /// Set the free-text query
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Restrict results to a single category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the result limit, rejecting values outside `MIN_LIMIT..=MAX_LIMIT`
    pub fn with_limit(mut self, limit: usize) -> Result<Self, DomainError> {
        self.limit = checked_limit(limit)?;
        Ok(self)
    }

    /// Trimmed query text, `None` when there is nothing to search for.
    pub fn query_text(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|query| !query.is_empty())
    }

    /// Trimmed category filter, `None` when empty.
    pub fn category_filter(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|category| !category.is_empty())
    }

    pub fn mode(&self) -> RankMode {
        if self.query_text().is_some() {
            RankMode::Semantic
        } else {
            RankMode::Social
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        checked_limit(self.limit).map(|_| ())
    }
}

pub fn checked_limit(limit: usize) -> Result<usize, DomainError> {
    if (MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(DomainError::InvalidLimit { limit, min: MIN_LIMIT, max: MAX_LIMIT })
    }
}

/// Confidence label attached to each recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    /// Best distance at or below the high threshold
    High,
    /// Best distance at or below the medium threshold
    Medium,
    /// Everything further away
    Low,
    /// Social-mode items carry no distance
    Social,
}

/// One event backing a recommendation, as shown in its explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportingMatch {
    pub friend_name: String,
    pub event_type: EventType,
    pub distance: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub product_title: String,
}

/// Human-readable justification for a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub summary: String,
    /// Normalized similarity, rounded; `None` in social mode
    pub semantic_score: Option<f64>,
    pub friend_strength: f64,
    pub recency_score: f64,
    /// Always exactly 1.0 or 0.6
    pub event_weight: f64,
    pub lexical_boost: f64,
    pub matches: Vec<SupportingMatch>,
}

/// A ranked recommendation as delivered to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredItem {
    pub id: ProductId,
    pub title: String,
    pub brand: String,
    pub category: String,
    /// Two decimal places
    pub price: String,
    pub description: String,
    pub friend_name: String,
    pub friend_avatar: String,
    pub event_type: EventType,
    /// Best raw distance; `None` in social mode
    pub distance: Option<f64>,
    /// `1 - distance` clamped at zero; `None` in social mode
    pub similarity: Option<f64>,
    pub confidence: Confidence,
    pub score: f64,
    pub explanation: Explanation,
}

/// Response payload for a recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub mode: RankMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_provider: Option<String>,
    pub items: Vec<ScoredItem>,
}

impl RecommendationResponse {
    pub fn empty(mode: RankMode) -> Self {
        Self { mode, embedding_provider: None, items: Vec::new() }
    }
}

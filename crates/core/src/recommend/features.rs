//! Feature extractors
//!
//! Pure, total functions turning a candidate's evidence into sub-scores in `[0, 1]`
//! (the lexical boost is capped at `LEXICAL_CAP`).

use chrono::{DateTime, Utc};

use super::aggregate::Candidate;

/// Distance spans at or below this carry no discriminating signal.
pub const NORMALIZATION_EPSILON: f64 = 1e-6;

/// Recency decays linearly to zero over this many days.
pub const RECENCY_WINDOW_DAYS: f64 = 30.0;

pub const PURCHASE_WEIGHT: f64 = 1.0;
pub const VIEW_WEIGHT: f64 = 0.6;

pub const LEXICAL_STEP: f64 = 0.05;
pub const LEXICAL_CAP: f64 = 0.15;

/// Similarity implied by a single distance, `max(0, 1 - d)`.
pub fn similarity_raw(distance: f64) -> f64 {
    (1.0 - distance).max(0.0)
}

/// Min/max distance over one search result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceWindow {
    pub min: f64,
    pub max: f64,
}

impl DistanceWindow {
    /// `None` when there are no distances at all.
    pub fn from_distances<I>(distances: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        distances.into_iter().fold(None, |window, distance| {
            Some(match window {
                None => Self { min: distance, max: distance },
                Some(Self { min, max }) => Self { min: min.min(distance), max: max.max(distance) },
            })
        })
    }

    /// Position of `distance` in the window, 0.0 when the window is degenerate.
    pub fn normalize(&self, distance: f64) -> f64 {
        let span = self.max - self.min;
        if span <= NORMALIZATION_EPSILON {
            return 0.0;
        }
        (distance - self.min) / span
    }
}

/// Min-max normalized distance, inverted so the closest match scores 1.0.
pub fn similarity_normalized(distance: f64, window: DistanceWindow) -> f64 {
    1.0 - window.normalize(distance)
}

/// Strongest friend tie among the supporting events.
pub fn friend_strength_score(candidate: &Candidate) -> f64 {
    candidate.events().iter().map(|event| event.friend.strength).fold(0.0, f64::max)
}

/// Linear decay over `RECENCY_WINDOW_DAYS` from the latest supporting event.
pub fn recency_score(candidate: &Candidate, now: DateTime<Utc>) -> f64 {
    let latest = candidate
        .events()
        .iter()
        .map(|event| event.occurred_at)
        .max()
        .unwrap_or(now);
    let days = (now - latest).num_days().max(0) as f64;

    (1.0 - (days / RECENCY_WINDOW_DAYS).min(1.0)).max(0.0)
}

/// Full weight as soon as any supporting event is a purchase.
pub fn event_weight_score(candidate: &Candidate) -> f64 {
    if candidate.events().iter().any(|event| event.is_purchase()) {
        PURCHASE_WEIGHT
    } else {
        VIEW_WEIGHT
    }
}

/// Small additive bonus for query tokens appearing verbatim in the product text.
pub fn lexical_boost(query: &str, title: &str, description: &str) -> f64 {
    let query = query.to_lowercase();
    let haystack = format!("{title} {description}").to_lowercase();

    let matches = query.split_whitespace().filter(|token| haystack.contains(token)).count();

    (matches as f64 * LEXICAL_STEP).min(LEXICAL_CAP)
}

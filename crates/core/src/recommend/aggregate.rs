//! Evidence aggregation: groups events by product

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::event::Event;
use crate::domain::product::{Product, ProductId};

use super::types::RankMode;
use super::MAX_SUPPORTING_MATCHES;

/// A product together with the events supporting it.
///
/// Always holds at least one event, and every event refers to `product`.
#[derive(Debug, Clone)]
pub struct Candidate {
    product: Product,
    events: Vec<Event>,
    best: usize,
}

impl Candidate {
    fn open(event: Event) -> Self {
        Self { product: event.product.clone(), events: vec![event], best: 0 }
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Representative event: closest match in semantic mode, first seen in social mode.
    pub fn best_event(&self) -> &Event {
        &self.events[self.best]
    }

    /// Distance of the best match, if the events carry distances.
    pub fn best_distance(&self) -> Option<f64> {
        self.best_event().distance
    }

    /// Up to three events for the explanation: nearest first in semantic mode,
    /// newest first in social mode.
    pub fn supporting_matches(&self, mode: RankMode) -> Vec<&Event> {
        let mut matches: Vec<&Event> = self.events.iter().collect();
        match mode {
            RankMode::Semantic => matches.sort_by(|a, b| compare_distance(a, b)),
            RankMode::Social => matches.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at)),
        }
        matches.truncate(MAX_SUPPORTING_MATCHES);
        matches
    }
}

/// Group `events` into candidates, in first-seen product order.
///
/// Events outside `category` (case-insensitive) are dropped first. The returned order only
/// matters as the tie-break for the stable score sort.
pub fn aggregate<I>(events: I, category: Option<&str>, mode: RankMode) -> Vec<Candidate>
where
    I: IntoIterator<Item = Event>,
{
    let mut index: HashMap<ProductId, usize> = HashMap::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for event in events {
        if let Some(category) = category {
            if !event.product.in_category(category) {
                continue;
            }
        }

        match index.get(&event.product.id) {
            Some(&slot) => candidates[slot].events.push(event),
            None => {
                index.insert(event.product.id, candidates.len());
                candidates.push(Candidate::open(event));
            }
        }
    }

    if mode == RankMode::Semantic {
        for candidate in &mut candidates {
            candidate.best = nearest_index(&candidate.events);
        }
    }

    candidates
}

/// Index of the minimum-distance event; the first one wins ties.
fn nearest_index(events: &[Event]) -> usize {
    events
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(best, best_distance), (idx, event)| match event.distance {
            Some(distance) if distance < best_distance => (idx, distance),
            _ => (best, best_distance),
        })
        .0
}

fn compare_distance(a: &Event, b: &Event) -> Ordering {
    let a = a.distance.unwrap_or(f64::INFINITY);
    let b = b.distance.unwrap_or(f64::INFINITY);
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::recommend::test_support::{event, fixed_now, EventFixture};

    #[test]
    fn groups_events_by_product_in_first_seen_order() {
        let events = vec![
            event(EventFixture { event_id: 1, product_id: 7, ..EventFixture::default() }),
            event(EventFixture { event_id: 2, product_id: 3, ..EventFixture::default() }),
            event(EventFixture { event_id: 3, product_id: 7, ..EventFixture::default() }),
        ];

        let candidates = aggregate(events, None, RankMode::Social);

        let ids: Vec<i64> = candidates.iter().map(|c| c.product().id.0).collect();
        assert_eq!(ids, vec![7, 3]);
        assert_eq!(candidates[0].events().len(), 2);
        assert!(candidates
            .iter()
            .all(|c| c.events().iter().all(|e| e.product.id == c.product().id)));
    }

    #[test]
    fn category_filter_is_case_insensitive() {
        let events = vec![
            event(EventFixture { product_id: 1, category: "Beauty", ..EventFixture::default() }),
            event(EventFixture { product_id: 2, category: "Home", ..EventFixture::default() }),
            event(EventFixture { product_id: 3, category: "BEAUTY", ..EventFixture::default() }),
        ];

        let candidates = aggregate(events, Some("beauty"), RankMode::Social);

        let ids: Vec<i64> = candidates.iter().map(|c| c.product().id.0).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn semantic_best_match_is_minimum_distance_first_seen_on_ties() {
        let events = vec![
            event(EventFixture { event_id: 1, friend: "Ava", distance: Some(0.4), ..EventFixture::default() }),
            event(EventFixture { event_id: 2, friend: "Liam", distance: Some(0.2), ..EventFixture::default() }),
            event(EventFixture { event_id: 3, friend: "Maya", distance: Some(0.2), ..EventFixture::default() }),
        ];

        let candidates = aggregate(events, None, RankMode::Semantic);

        assert_eq!(candidates[0].best_event().friend.name, "Liam");
        assert_eq!(candidates[0].best_distance(), Some(0.2));
    }

    #[test]
    fn social_best_event_is_first_seen() {
        let now = fixed_now();
        let events = vec![
            event(EventFixture {
                friend: "Ava",
                occurred_at: now - Duration::days(5),
                ..EventFixture::default()
            }),
            event(EventFixture { friend: "Liam", occurred_at: now, ..EventFixture::default() }),
        ];

        let candidates = aggregate(events, None, RankMode::Social);

        assert_eq!(candidates[0].best_event().friend.name, "Ava");
    }

    #[test]
    fn supporting_matches_are_capped_and_ordered_per_mode() {
        let now = fixed_now();
        let events: Vec<Event> = (0..5)
            .map(|n| {
                event(EventFixture {
                    event_id: n,
                    distance: Some(0.5 - n as f64 * 0.1),
                    occurred_at: now - Duration::days(n),
                    ..EventFixture::default()
                })
            })
            .collect();

        let semantic = aggregate(events.clone(), None, RankMode::Semantic);
        let nearest: Vec<i64> =
            semantic[0].supporting_matches(RankMode::Semantic).iter().map(|e| e.id.0).collect();
        assert_eq!(nearest, vec![4, 3, 2]);

        let social = aggregate(events, None, RankMode::Social);
        let newest: Vec<i64> =
            social[0].supporting_matches(RankMode::Social).iter().map(|e| e.id.0).collect();
        assert_eq!(newest, vec![0, 1, 2]);
    }

    #[test]
    fn empty_input_produces_no_candidates() {
        assert!(aggregate(Vec::new(), Some("Home"), RankMode::Semantic).is_empty());
    }
}

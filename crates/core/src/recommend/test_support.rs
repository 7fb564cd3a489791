use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::event::{Event, EventId, EventType};
use crate::domain::friend::{Friend, FriendId};
use crate::domain::product::{Product, ProductId};

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid fixture timestamp")
}

#[derive(Debug, Clone)]
pub struct EventFixture {
    pub event_id: i64,
    pub product_id: i64,
    pub title: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub friend: &'static str,
    pub strength: f64,
    pub event_type: EventType,
    pub occurred_at: DateTime<Utc>,
    pub distance: Option<f64>,
}

impl Default for EventFixture {
    fn default() -> Self {
        Self {
            event_id: 1,
            product_id: 1,
            title: "Nimbus Noise-Canceling Headphones",
            description: "Immersive over-ear headphones with adaptive ANC.",
            category: "Electronics",
            friend: "Ava Patel",
            strength: 0.8,
            event_type: EventType::Purchase,
            occurred_at: fixed_now(),
            distance: None,
        }
    }
}

pub fn event(fixture: EventFixture) -> Event {
    Event {
        id: EventId(fixture.event_id),
        friend: Friend {
            id: FriendId(fixture.event_id),
            name: fixture.friend.to_string(),
            avatar_url: format!("https://i.pravatar.cc/100?img={}", fixture.event_id),
            strength: fixture.strength,
        },
        product: Product {
            id: ProductId(fixture.product_id),
            title: fixture.title.to_string(),
            brand: "Aurora Audio".to_string(),
            category: fixture.category.to_string(),
            price: Decimal::new(24900, 2),
            description: fixture.description.to_string(),
        },
        event_type: fixture.event_type,
        occurred_at: fixture.occurred_at,
        distance: fixture.distance,
    }
}

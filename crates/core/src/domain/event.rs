use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::friend::Friend;
use crate::domain::product::Product;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Purchase,
    View,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::View => "view",
        }
    }

    /// Past-tense verb used in recommendation summaries.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Purchase => "bought",
            Self::View => "viewed",
        }
    }

    /// Parses an ingest payload value; anything unrecognised is recorded as a purchase.
    pub fn parse_or_purchase(value: Option<&str>) -> Self {
        value.and_then(|value| value.parse().ok()).unwrap_or(Self::Purchase)
    }
}

impl FromStr for EventType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "purchase" => Ok(Self::Purchase),
            "view" => Ok(Self::View),
            other => Err(DomainError::UnknownEventType(other.to_string())),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A friend interacting with a product, with product and friend fields already resolved.
///
/// `distance` is only present for records coming out of a nearest-neighbor search.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub friend: Friend,
    pub product: Product,
    pub event_type: EventType,
    pub occurred_at: DateTime<Utc>,
    pub distance: Option<f64>,
}

impl Event {
    pub fn is_purchase(&self) -> bool {
        self.event_type == EventType::Purchase
    }
}

#[cfg(test)]
mod tests {
    use super::EventType;
    use crate::errors::DomainError;

    #[test]
    fn event_type_parses_case_insensitively() {
        assert_eq!("Purchase".parse::<EventType>(), Ok(EventType::Purchase));
        assert_eq!(" view ".parse::<EventType>(), Ok(EventType::View));
        assert_eq!(
            "wishlist".parse::<EventType>(),
            Err(DomainError::UnknownEventType("wishlist".to_string()))
        );
    }

    #[test]
    fn unknown_ingest_event_type_becomes_purchase() {
        assert_eq!(EventType::parse_or_purchase(Some("view")), EventType::View);
        assert_eq!(EventType::parse_or_purchase(Some("like")), EventType::Purchase);
        assert_eq!(EventType::parse_or_purchase(None), EventType::Purchase);
    }

    #[test]
    fn verbs_match_event_type() {
        assert_eq!(EventType::Purchase.verb(), "bought");
        assert_eq!(EventType::View.verb(), "viewed");
    }
}

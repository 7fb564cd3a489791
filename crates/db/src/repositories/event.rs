use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use circle_core::domain::event::{Event, EventId, EventType};
use circle_core::domain::friend::{Friend, FriendId};
use circle_core::domain::product::{Product, ProductId};
use circle_core::{ApplicationError, SocialCandidateSource};

use super::product::parse_price;
use super::{decode_err, EventRepository, RepositoryError};
use crate::DbPool;

/// Event columns joined with their friend and product, shared with the vector store.
pub(crate) const EVENT_SELECT: &str = "SELECT
        friend_events.id AS event_id,
        friend_events.event_type,
        friend_events.created_at,
        friends.id AS friend_id,
        friends.name AS friend_name,
        friends.avatar_url,
        friends.strength,
        products.id AS product_id,
        products.title,
        products.brand,
        products.category,
        products.price,
        products.description
    FROM friend_events
    JOIN friends ON friends.id = friend_events.friend_id
    JOIN products ON products.id = friend_events.product_id";

pub struct SqlEventRepository {
    pool: DbPool,
}

impl SqlEventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fixed-width UTC timestamps so `ORDER BY created_at` is chronological.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {error}")))
}

pub(crate) fn row_to_event(
    row: &sqlx::sqlite::SqliteRow,
    distance: Option<f64>,
) -> Result<Event, RepositoryError> {
    let event_type: String = row.try_get("event_type").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let price: String = row.try_get("price").map_err(decode_err)?;

    Ok(Event {
        id: EventId(row.try_get("event_id").map_err(decode_err)?),
        friend: Friend {
            id: FriendId(row.try_get("friend_id").map_err(decode_err)?),
            name: row.try_get("friend_name").map_err(decode_err)?,
            avatar_url: row.try_get("avatar_url").map_err(decode_err)?,
            strength: row.try_get("strength").map_err(decode_err)?,
        },
        product: Product {
            id: ProductId(row.try_get("product_id").map_err(decode_err)?),
            title: row.try_get("title").map_err(decode_err)?,
            brand: row.try_get("brand").map_err(decode_err)?,
            category: row.try_get("category").map_err(decode_err)?,
            price: parse_price(&price)?,
            description: row.try_get("description").map_err(decode_err)?,
        },
        event_type: event_type
            .parse::<EventType>()
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
        occurred_at: parse_timestamp(&created_at)?,
        distance,
    })
}

#[async_trait]
impl EventRepository for SqlEventRepository {
    async fn recent(&self, limit: usize) -> Result<Vec<Event>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{EVENT_SELECT} ORDER BY friend_events.created_at DESC, friend_events.id DESC LIMIT ?1"
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| row_to_event(row, None)).collect()
    }

    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, RepositoryError> {
        let row = sqlx::query(&format!("{EVENT_SELECT} WHERE friend_events.id = ?1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(|row| row_to_event(row, None)).transpose()
    }

    async fn insert(
        &self,
        friend_id: FriendId,
        product_id: ProductId,
        event_type: EventType,
        occurred_at: DateTime<Utc>,
    ) -> Result<EventId, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO friend_events (friend_id, product_id, event_type, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(friend_id.0)
        .bind(product_id.0)
        .bind(event_type.as_str())
        .bind(format_timestamp(occurred_at))
        .execute(&self.pool)
        .await?;

        Ok(EventId(result.last_insert_rowid()))
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM friend_events").fetch_one(&self.pool).await?)
    }
}

#[async_trait]
impl SocialCandidateSource for SqlEventRepository {
    async fn recent(&self, count: usize) -> Result<Vec<Event>, ApplicationError> {
        Ok(EventRepository::recent(self, count).await?)
    }
}

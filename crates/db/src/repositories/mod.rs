use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use circle_core::domain::event::{Event, EventId, EventType};
use circle_core::domain::friend::{Friend, FriendId};
use circle_core::domain::product::{Product, ProductId};
use circle_core::ApplicationError;

pub mod event;
pub mod friend;
pub mod product;
pub mod vector_store;

pub use event::SqlEventRepository;
pub use friend::SqlFriendRepository;
pub use product::SqlProductRepository;
pub use vector_store::{SqlVectorStore, VectorRecord};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(message) => ApplicationError::NotFound(message),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

#[async_trait]
pub trait FriendRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Friend>, RepositoryError>;
    async fn find_by_id(&self, id: FriendId) -> Result<Option<Friend>, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Newest first, resolved against friends and products.
    async fn recent(&self, limit: usize) -> Result<Vec<Event>, RepositoryError>;

    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, RepositoryError>;

    async fn insert(
        &self,
        friend_id: FriendId,
        product_id: ProductId,
        event_type: EventType,
        occurred_at: DateTime<Utc>,
    ) -> Result<EventId, RepositoryError>;

    async fn count(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, record: VectorRecord) -> Result<(), RepositoryError>;

    async fn upsert_many(&self, records: Vec<VectorRecord>) -> Result<(), RepositoryError>;

    async fn count(&self) -> Result<i64, RepositoryError>;

    async fn clear(&self) -> Result<(), RepositoryError>;

    /// Closest events to `embedding` by cosine distance, ascending, each carrying its distance.
    async fn nearest(&self, embedding: &[f32], limit: usize) -> Result<Vec<Event>, RepositoryError>;
}

pub(crate) fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

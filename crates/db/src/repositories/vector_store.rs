use std::cmp::Ordering;

use async_trait::async_trait;
use sqlx::Row;
use tracing::debug;

use circle_core::domain::event::{Event, EventId};
use circle_core::{cosine_distance, ApplicationError, SemanticCandidateSource};

use super::event::{row_to_event, EVENT_SELECT};
use super::{decode_err, RepositoryError, VectorStore};
use crate::DbPool;

/// One embedded event document.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub event_id: EventId,
    pub embedding: Vec<f32>,
    pub document: String,
}

/// Event embeddings kept as JSON arrays beside the relational data.
///
/// `nearest` is an exhaustive cosine scan, which is fine for the few thousand events a
/// seeded database holds.
pub struct SqlVectorStore {
    pool: DbPool,
}

impl SqlVectorStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn encode_embedding(embedding: &[f32]) -> Result<String, RepositoryError> {
    serde_json::to_string(embedding)
        .map_err(|error| RepositoryError::Decode(format!("could not encode embedding: {error}")))
}

fn decode_embedding(raw: &str) -> Result<Vec<f32>, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("could not decode embedding: {error}")))
}

const UPSERT_SQL: &str = "INSERT INTO event_vectors (event_id, embedding, document)
     VALUES (?1, ?2, ?3)
     ON CONFLICT(event_id) DO UPDATE SET
         embedding = excluded.embedding,
         document = excluded.document";

#[async_trait]
impl VectorStore for SqlVectorStore {
    async fn upsert(&self, record: VectorRecord) -> Result<(), RepositoryError> {
        sqlx::query(UPSERT_SQL)
            .bind(record.event_id.0)
            .bind(encode_embedding(&record.embedding)?)
            .bind(&record.document)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_many(&self, records: Vec<VectorRecord>) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for record in &records {
            sqlx::query(UPSERT_SQL)
                .bind(record.event_id.0)
                .bind(encode_embedding(&record.embedding)?)
                .bind(&record.document)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM event_vectors").fetch_one(&self.pool).await?)
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM event_vectors").execute(&self.pool).await?;
        Ok(())
    }

    async fn nearest(&self, embedding: &[f32], limit: usize) -> Result<Vec<Event>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!(
            "{EVENT_SELECT}
             JOIN event_vectors ON event_vectors.event_id = friend_events.id
             ORDER BY friend_events.id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            let raw: String = row.try_get("embedding").map_err(decode_err)?;
            scored.push((idx, cosine_distance(embedding, &decode_embedding(&raw)?)));
        }
        // stable, so equal distances stay in event id order
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.truncate(limit);

        debug!(
            event_name = "vector_store.nearest",
            scanned = rows.len(),
            returned = scored.len(),
            "nearest-neighbor scan completed"
        );

        scored.into_iter().map(|(idx, distance)| row_to_event(&rows[idx], Some(distance))).collect()
    }
}

#[async_trait]
impl SemanticCandidateSource for SqlVectorStore {
    async fn nearest(&self, embedding: &[f32], count: usize) -> Result<Vec<Event>, ApplicationError> {
        Ok(VectorStore::nearest(self, embedding, count).await?)
    }
}

//! Collaborator seams for the recommendation service.
//!
//! Implementations live in `circle-db` (storage) and `circle-embeddings` (remote provider);
//! the hash embedder in `crate::embedding` is the in-process fallback.

use async_trait::async_trait;

use crate::domain::event::Event;
use crate::errors::ApplicationError;

/// Turns text into fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short identifier reported to clients, e.g. `voyage` or `fallback`.
    fn name(&self) -> &str;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApplicationError>;

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApplicationError>;
}

/// Nearest stored events to a query embedding, closest first, each carrying its distance.
#[async_trait]
pub trait SemanticCandidateSource: Send + Sync {
    async fn nearest(&self, embedding: &[f32], count: usize) -> Result<Vec<Event>, ApplicationError>;
}

/// Most recent friend events, newest first, without distances.
#[async_trait]
pub trait SocialCandidateSource: Send + Sync {
    async fn recent(&self, count: usize) -> Result<Vec<Event>, ApplicationError>;
}

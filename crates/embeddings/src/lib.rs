//! Embedding providers: the Voyage HTTP client and provider selection.

pub mod voyage;

use std::sync::Arc;

use circle_core::config::EmbeddingConfig;
use circle_core::{ApplicationError, EmbeddingProvider, HashEmbedder};
use thiserror::Error;

pub use voyage::{VoyageEmbeddingProvider, VOYAGE_PROVIDER};

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("embedding provider is rate limited")]
    RateLimited,
    #[error("embedding provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("embedding response was malformed: {0}")]
    Malformed(String),
    #[error("embedding provider is not configured: {0}")]
    NotConfigured(String),
}

impl From<EmbeddingError> for ApplicationError {
    fn from(error: EmbeddingError) -> Self {
        match error {
            EmbeddingError::NotConfigured(message) => ApplicationError::Configuration(message),
            other => ApplicationError::Integration(other.to_string()),
        }
    }
}

/// Voyage when an API key is configured, the hash embedder otherwise.
pub fn select_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    let fallback = HashEmbedder::new(config.dimension);
    if !config.voyage_enabled() {
        tracing::info!(
            event_name = "embedding.provider.selected",
            provider = circle_core::embedding::FALLBACK_PROVIDER,
            dimension = config.dimension,
            "no Voyage API key configured, using hash embeddings"
        );
        return Ok(Arc::new(fallback));
    }

    let provider = VoyageEmbeddingProvider::from_config(config, fallback)?;
    tracing::info!(
        event_name = "embedding.provider.selected",
        provider = VOYAGE_PROVIDER,
        model = %config.voyage_model,
        "using Voyage embeddings"
    );
    Ok(Arc::new(provider))
}

use std::time::Duration;

use async_trait::async_trait;
use circle_core::config::EmbeddingConfig;
use circle_core::{ApplicationError, EmbeddingProvider, HashEmbedder};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::EmbeddingError;

pub const VOYAGE_PROVIDER: &str = "voyage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum InputType {
    Query,
    Document,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
    input_type: InputType,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Voyage AI embeddings over HTTP, degrading to hash embeddings when rate limited.
pub struct VoyageEmbeddingProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    endpoint: String,
    fallback: HashEmbedder,
}

impl VoyageEmbeddingProvider {
    pub fn from_config(
        config: &EmbeddingConfig,
        fallback: HashEmbedder,
    ) -> Result<Self, EmbeddingError> {
        let api_key = config
            .voyage_api_key
            .clone()
            .ok_or_else(|| EmbeddingError::NotConfigured("embedding.voyage_api_key".to_owned()))?;
        let client =
            Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self {
            client,
            api_key,
            model: config.voyage_model.clone(),
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            fallback,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match self.request(texts, input_type).await {
            Err(EmbeddingError::RateLimited) => {
                warn!(
                    event_name = "embedding.voyage.rate_limited",
                    inputs = texts.len(),
                    "Voyage rate limit hit, falling back to hash embeddings"
                );
                Ok(texts.iter().map(|text| self.fallback.embed(text)).collect())
            }
            other => other,
        }
    }

    async fn request(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = EmbeddingRequest { input: texts, model: &self.model, input_type };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EmbeddingError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status: status.as_u16(), body });
        }

        let mut payload: EmbeddingResponse = response.json().await?;
        if payload.data.len() != texts.len() {
            return Err(EmbeddingError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                payload.data.len()
            )));
        }
        payload.data.sort_by_key(|item| item.index);

        debug!(
            event_name = "embedding.voyage.completed",
            inputs = texts.len(),
            model = %self.model,
            "Voyage embeddings received"
        );
        Ok(payload.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for VoyageEmbeddingProvider {
    fn name(&self) -> &str {
        VOYAGE_PROVIDER
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApplicationError> {
        let mut vectors = self.embed(&[text.to_owned()], InputType::Query).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Malformed("empty embedding response".to_owned()).into())
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApplicationError> {
        Ok(self.embed(texts, InputType::Document).await?)
    }
}

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::application::ports::embedding_provider::{EmbeddingProvider, EmbeddingProviderError};
use crate::config::EmbeddingConfig;

/// HuggingFace Inference API feature-extraction client.
pub struct HuggingFaceEmbeddings {
    client: Client,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl HuggingFaceEmbeddings {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
        let url = format!(
            "https://api-inference.huggingface.co/pipeline/feature-extraction/{}",
            self.model
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "inputs": [text] }))
            .send()
            .await
            .map_err(|e| EmbeddingProviderError::NetworkError(e.without_url().to_string()))?;

        if response.status().as_u16() == 429 {
            return Err(EmbeddingProviderError::RateLimitExceeded);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingProviderError::ApiError(format!(
                "{}: {}",
                status, body
            )));
        }

        let vectors = response
            .json::<Vec<Vec<f32>>>()
            .await
            .map_err(|e| EmbeddingProviderError::ApiError(e.to_string()))?;

        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingProviderError::ApiError("No embedding returned".to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
        self.embed(text).await
    }

    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
        self.embed(text).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimensions
    }
}

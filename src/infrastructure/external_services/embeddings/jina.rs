use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::embedding_provider::{EmbeddingProvider, EmbeddingProviderError};
use crate::config::EmbeddingConfig;

const JINA_EMBED_URL: &str = "https://api.jina.ai/v1/embeddings";

#[derive(Serialize)]
#[serde(untagged)]
enum JinaInput<'a> {
    Text { text: &'a str },
    Image { image: &'a str },
}

#[derive(Serialize)]
struct JinaEmbedRequest<'a> {
    model: &'a str,
    input: Vec<JinaInput<'a>>,
    dimensions: usize,
}

#[derive(Deserialize)]
struct JinaEmbedResponse {
    data: Vec<JinaEmbeddingRow>,
}

#[derive(Deserialize)]
struct JinaEmbeddingRow {
    embedding: Vec<f32>,
}

/// Jina CLIP-family client; text and image inputs share one vector space,
/// which is what makes image-only retrieval queries possible.
pub struct JinaEmbeddings {
    client: Client,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl JinaEmbeddings {
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

    async fn send(&self, input: Vec<JinaInput<'_>>) -> Result<Vec<f32>, EmbeddingProviderError> {
        let request = JinaEmbedRequest {
            model: &self.model,
            input,
            dimensions: self.dimensions,
        };

        let response = self
            .client
            .post(JINA_EMBED_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
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

        let payload = response
            .json::<JinaEmbedResponse>()
            .await
            .map_err(|e| EmbeddingProviderError::ApiError(e.to_string()))?;

        payload
            .data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .ok_or_else(|| EmbeddingProviderError::ApiError("No embedding returned".to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for JinaEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
        self.send(vec![JinaInput::Text { text }]).await
    }

    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
        self.send(vec![JinaInput::Text { text }]).await
    }

    async fn embed_images(
        &self,
        image_urls: &[String],
    ) -> Result<Vec<f32>, EmbeddingProviderError> {
        if image_urls.is_empty() {
            return Err(EmbeddingProviderError::InvalidInput(
                "No image URLs provided for image-only embedding".to_string(),
            ));
        }

        let input = image_urls
            .iter()
            .map(|url| JinaInput::Image { image: url })
            .collect();
        self.send(input).await
    }

    fn supports_image_input(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_input_serialization() {
        let request = JinaEmbedRequest {
            model: "jina-clip-v2",
            input: vec![
                JinaInput::Text { text: "a bracket" },
                JinaInput::Image {
                    image: "https://cdn.example.com/a.png",
                },
            ],
            dimensions: 512,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input"][0]["text"], "a bracket");
        assert_eq!(json["input"][1]["image"], "https://cdn.example.com/a.png");
    }
}

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::embedding_provider::{EmbeddingProvider, EmbeddingProviderError};
use crate::config::EmbeddingConfig;

const COHERE_EMBED_URL: &str = "https://api.cohere.com/v2/embed";

#[derive(Serialize)]
struct CohereEmbedRequest<'a> {
    model: &'a str,
    input_type: &'a str,
    embedding_types: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    texts: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
    output_dimension: usize,
}

#[derive(Deserialize)]
struct CohereEmbedResponse {
    embeddings: CohereEmbedVectors,
}

#[derive(Deserialize)]
struct CohereEmbedVectors {
    float: Vec<Vec<f32>>,
}

/// Cohere embed-v4 client. v4 embeds text OR images, never both in one
/// call; image inputs go up as base64 data URLs.
pub struct CohereEmbeddings {
    client: Client,
    api_key: String,
    model: String,
    dimensions: usize,
    max_retries: u32,
    backoff_factor: f64,
}

impl CohereEmbeddings {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_retries: 3,
            backoff_factor: 1.5,
        })
    }

    async fn embed_texts(
        &self,
        text: &str,
        input_type: &str,
    ) -> Result<Vec<f32>, EmbeddingProviderError> {
        let request = CohereEmbedRequest {
            model: &self.model,
            input_type,
            embedding_types: ["float"],
            texts: Some(vec![text]),
            images: None,
            output_dimension: self.dimensions,
        };
        self.send_with_retries(&request).await
    }

    async fn send_with_retries(
        &self,
        request: &CohereEmbedRequest<'_>,
    ) -> Result<Vec<f32>, EmbeddingProviderError> {
        let mut attempts = 0;
        let mut last_error = None;

        loop {
            attempts += 1;

            match self.execute(request).await {
                Ok(embedding) => return Ok(embedding),
                Err(error) => {
                    let retryable = matches!(
                        error,
                        EmbeddingProviderError::NetworkError(_)
                            | EmbeddingProviderError::RateLimitExceeded
                            | EmbeddingProviderError::ServiceUnavailable
                    );
                    last_error = Some(error);

                    if !retryable || attempts > self.max_retries {
                        break;
                    }

                    let backoff = Duration::from_millis(
                        (self.backoff_factor.powi(attempts as i32 - 1) * 1000.0) as u64,
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Err(last_error.unwrap_or(EmbeddingProviderError::ServiceUnavailable))
    }

    async fn execute(
        &self,
        request: &CohereEmbedRequest<'_>,
    ) -> Result<Vec<f32>, EmbeddingProviderError> {
        let response = self
            .client
            .post(COHERE_EMBED_URL)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| EmbeddingProviderError::NetworkError(e.without_url().to_string()))?;

        match response.status().as_u16() {
            status if (200..300).contains(&status) => {}
            429 => return Err(EmbeddingProviderError::RateLimitExceeded),
            status if status >= 500 => return Err(EmbeddingProviderError::ServiceUnavailable),
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(EmbeddingProviderError::ApiError(format!(
                    "{}: {}",
                    status, body
                )));
            }
        }

        let payload = response
            .json::<CohereEmbedResponse>()
            .await
            .map_err(|e| EmbeddingProviderError::ApiError(e.to_string()))?;

        payload
            .embeddings
            .float
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingProviderError::ApiError("No embedding returned".to_string()))
    }

    async fn image_data_url(&self, image_url: &str) -> Result<String, EmbeddingProviderError> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .map_err(|e| EmbeddingProviderError::NetworkError(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingProviderError::ApiError(format!(
                "Image fetch failed: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| EmbeddingProviderError::NetworkError(e.to_string()))?;

        Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(&bytes)))
    }
}

#[async_trait]
impl EmbeddingProvider for CohereEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
        self.embed_texts(text, "search_query").await
    }

    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
        self.embed_texts(text, "search_document").await
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

        let mut data_urls = Vec::with_capacity(image_urls.len());
        for url in image_urls {
            data_urls.push(self.image_data_url(url).await?);
        }

        let request = CohereEmbedRequest {
            model: &self.model,
            input_type: "image",
            embedding_types: ["float"],
            texts: None,
            images: Some(data_urls),
            output_dimension: self.dimensions,
        };
        self.send_with_retries(&request).await
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
    fn test_text_request_shape() {
        let request = CohereEmbedRequest {
            model: "embed-v4.0",
            input_type: "search_query",
            embedding_types: ["float"],
            texts: Some(vec!["pocket milling"]),
            images: None,
            output_dimension: 512,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input_type"], "search_query");
        assert_eq!(json["output_dimension"], 512);
        assert!(json.get("images").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"embeddings":{"float":[[0.1,0.2,0.3]]}}"#;
        let parsed: CohereEmbedResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.embeddings.float[0].len(), 3);
    }
}

use async_trait::async_trait;

#[derive(Debug)]
pub enum EmbeddingProviderError {
    NetworkError(String),
    ApiError(String),
    InvalidInput(String),
    RateLimitExceeded,
    ServiceUnavailable,
}

impl std::fmt::Display for EmbeddingProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProviderError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            EmbeddingProviderError::ApiError(msg) => write!(f, "API error: {}", msg),
            EmbeddingProviderError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            EmbeddingProviderError::RateLimitExceeded => write!(f, "Rate limit exceeded"),
            EmbeddingProviderError::ServiceUnavailable => write!(f, "Service unavailable"),
        }
    }
}

impl std::error::Error for EmbeddingProviderError {}

/// Vendor-neutral embedding interface. Query and document embeddings are
/// distinct operations because some vendors use asymmetric input types.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError>;

    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError>;

    /// One embedding over image content only. Providers without multimodal
    /// support reject the call.
    async fn embed_images(
        &self,
        image_urls: &[String],
    ) -> Result<Vec<f32>, EmbeddingProviderError> {
        let _ = image_urls;
        Err(EmbeddingProviderError::InvalidInput(format!(
            "{} does not support image embeddings",
            self.model_name()
        )))
    }

    fn supports_image_input(&self) -> bool {
        false
    }

    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;
}

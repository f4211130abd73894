use async_trait::async_trait;

#[derive(Debug)]
pub enum ImageFetchError {
    NetworkError(String),
    InvalidPayload(String),
}

impl std::fmt::Display for ImageFetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageFetchError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ImageFetchError::InvalidPayload(msg) => write!(f, "Invalid payload: {}", msg),
        }
    }
}

impl std::error::Error for ImageFetchError {}

/// Downloads an image and returns its base64 payload. Keeps retrieval
/// embedding and vision transport decoupled: a failure on one side must
/// not block the other.
#[async_trait]
pub trait ImageContentFetcher: Send + Sync {
    async fn fetch_base64(&self, url: &str) -> Result<String, ImageFetchError>;
}

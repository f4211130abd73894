use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use std::time::Duration;

use crate::application::ports::image_fetcher::{ImageContentFetcher, ImageFetchError};

/// Plain HTTP download + base64 encode for vision transport.
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageContentFetcher for HttpImageFetcher {
    async fn fetch_base64(&self, url: &str) -> Result<String, ImageFetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageFetchError::NetworkError(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(ImageFetchError::NetworkError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageFetchError::InvalidPayload(e.to_string()))?;

        Ok(BASE64.encode(&bytes))
    }
}

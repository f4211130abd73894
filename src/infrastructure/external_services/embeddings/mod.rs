pub mod cohere;
pub mod huggingface;
pub mod image_fetch;
pub mod jina;
pub mod openai;

use std::sync::Arc;

use crate::application::ports::embedding_provider::EmbeddingProvider;
use crate::config::{EmbeddingConfig, EmbeddingProviderKind};

pub use cohere::CohereEmbeddings;
pub use huggingface::HuggingFaceEmbeddings;
pub use image_fetch::HttpImageFetcher;
pub use jina::JinaEmbeddings;
pub use openai::OpenAiEmbeddings;

/// Construct the embedding provider selected by configuration. Dimension
/// compatibility with the stored index is the operator's responsibility;
/// a mismatch surfaces as a fatal error on first search.
pub fn create_embedding_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, reqwest::Error> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingProviderKind::OpenAi => Arc::new(OpenAiEmbeddings::new(config)?),
        EmbeddingProviderKind::Cohere => Arc::new(CohereEmbeddings::new(config)?),
        EmbeddingProviderKind::HuggingFace => Arc::new(HuggingFaceEmbeddings::new(config)?),
        EmbeddingProviderKind::Jina => Arc::new(JinaEmbeddings::new(config)?),
    };
    Ok(provider)
}

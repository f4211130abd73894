use std::sync::Arc;

use crate::application::services::retriever::{Retriever, RetrieverError};
use crate::config::ChainSettings;
use crate::domain::entities::RetrievedDocument;
use crate::domain::value_objects::DocumentType;

/// Types unioned by the sources search, two hits each.
const SOURCE_TYPES: [DocumentType; 3] = [
    DocumentType::Pdf,
    DocumentType::Youtube,
    DocumentType::Sentinel,
];
const HITS_PER_TYPE: i64 = 2;

#[derive(Debug)]
pub enum SearchSourcesError {
    ValidationError(String),
    RetrieverError(String),
}

impl std::fmt::Display for SearchSourcesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchSourcesError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            SearchSourcesError::RetrieverError(msg) => write!(f, "Retriever error: {}", msg),
        }
    }
}

impl std::error::Error for SearchSourcesError {}

#[derive(Debug, Clone)]
pub struct SearchSourcesRequest {
    pub query: String,
    /// Non-English callers get a lower inclusion threshold.
    pub language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchSourcesResponse {
    pub results: Vec<RetrievedDocument>,
}

/// Union of type-scoped searches over the reference content types. A
/// single unavailable segment degrades to fewer results, not a failure.
pub struct SearchSourcesUseCase {
    retriever: Arc<Retriever>,
    settings: ChainSettings,
}

impl SearchSourcesUseCase {
    pub fn new(retriever: Arc<Retriever>, settings: ChainSettings) -> Self {
        Self {
            retriever,
            settings,
        }
    }

    pub async fn execute(
        &self,
        request: SearchSourcesRequest,
    ) -> Result<SearchSourcesResponse, SearchSourcesError> {
        if request.query.trim().is_empty() {
            return Err(SearchSourcesError::ValidationError(
                "Query cannot be empty".to_string(),
            ));
        }

        let is_english = request
            .language
            .as_deref()
            .map(|language| language == "English")
            .unwrap_or(true);
        let min_score = if is_english {
            self.settings.sources_min_score
        } else {
            self.settings.sources_min_score_non_english
        };

        let embedding = self
            .retriever
            .query_embedding(&request.query)
            .await
            .map_err(|err: RetrieverError| SearchSourcesError::RetrieverError(err.to_string()))?;

        let mut results = Vec::new();
        for doc_type in SOURCE_TYPES {
            let hits = self
                .retriever
                .scoped_search(&embedding, doc_type, HITS_PER_TYPE, min_score)
                .await;
            for (mut doc, score) in hits {
                doc.metadata.score = score;
                results.push(doc);
            }
        }

        results.sort_by(|a, b| {
            b.score()
                .partial_cmp(&a.score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(SearchSourcesResponse { results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::embedding_provider::{
        EmbeddingProvider, EmbeddingProviderError,
    };
    use crate::application::ports::image_fetcher::{ImageContentFetcher, ImageFetchError};
    use crate::config::RetrieverSettings;
    use crate::domain::entities::retrieved_document::DocumentMetadata;
    use crate::domain::repositories::vector_repository::{
        SearchFilter, VectorRecord, VectorRepository, VectorRepositoryError,
    };
    use async_trait::async_trait;

    /// Store that answers scoped searches with one doc per type at a fixed
    /// score.
    struct TypedStore;

    #[async_trait]
    impl VectorRepository for TypedStore {
        async fn similarity_search(
            &self,
            _embedding: &[f32],
            _limit: i64,
            filter: &SearchFilter,
        ) -> Result<Vec<(RetrievedDocument, f32)>, VectorRepositoryError> {
            let Some(doc_type) = filter.doc_type else {
                return Ok(Vec::new());
            };
            let score = match doc_type {
                DocumentType::Pdf => 0.9,
                DocumentType::Youtube => 0.5,
                DocumentType::Sentinel => 0.8,
                _ => 0.1,
            };
            let metadata = DocumentMetadata::new(doc_type, 0.0);
            Ok(vec![(RetrievedDocument::new("content", metadata), score)])
        }

        async fn upsert(&self, _record: &VectorRecord) -> Result<(), VectorRepositoryError> {
            Ok(())
        }
    }

    struct FakeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
            Ok(vec![0.5])
        }

        async fn embed_document(&self, _text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
            Ok(vec![0.5])
        }

        fn model_name(&self) -> &str {
            "fake"
        }

        fn dimension(&self) -> usize {
            1
        }
    }

    struct FakeFetcher;

    #[async_trait]
    impl ImageContentFetcher for FakeFetcher {
        async fn fetch_base64(&self, _url: &str) -> Result<String, ImageFetchError> {
            Ok(String::new())
        }
    }

    fn use_case() -> SearchSourcesUseCase {
        let retriever = Arc::new(Retriever::new(
            Arc::new(TypedStore),
            Arc::new(FakeEmbedder),
            Arc::new(FakeFetcher),
            RetrieverSettings::default(),
        ));
        SearchSourcesUseCase::new(retriever, ChainSettings::default())
    }

    #[tokio::test]
    async fn test_english_threshold_drops_low_scores() {
        let response = use_case()
            .execute(SearchSourcesRequest {
                query: "pocket milling".to_string(),
                language: None,
            })
            .await
            .unwrap();

        // Threshold 0.78: only pdf (0.9) and sentinel (0.8) survive,
        // sorted by score.
        let types: Vec<DocumentType> = response
            .results
            .iter()
            .map(|d| d.metadata.doc_type)
            .collect();
        assert_eq!(types, vec![DocumentType::Pdf, DocumentType::Sentinel]);
    }

    #[tokio::test]
    async fn test_non_english_threshold_is_lower() {
        let response = use_case()
            .execute(SearchSourcesRequest {
                query: "fresado de cavidades".to_string(),
                language: Some("Spanish".to_string()),
            })
            .await
            .unwrap();

        // Threshold 0.45 also admits youtube at 0.5.
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.results[0].metadata.doc_type, DocumentType::Pdf);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let result = use_case()
            .execute(SearchSourcesRequest {
                query: "  ".to_string(),
                language: None,
            })
            .await;
        assert!(matches!(result, Err(SearchSourcesError::ValidationError(_))));
    }
}

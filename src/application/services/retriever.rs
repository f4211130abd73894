use std::sync::Arc;

use crate::application::ports::embedding_provider::EmbeddingProvider;
use crate::application::ports::image_fetcher::ImageContentFetcher;
use crate::config::RetrieverSettings;
use crate::domain::entities::RetrievedDocument;
use crate::domain::repositories::vector_repository::{SearchFilter, VectorRepository};
use crate::domain::value_objects::DocumentType;

/// Candidates fetched beyond `k` so score filtering still leaves variety
/// without a second round-trip.
const MIN_CANDIDATE_FETCH: i64 = 15;

#[derive(Debug)]
pub enum RetrieverError {
    EmbeddingError(String),
    VectorStoreError(String),
}

impl std::fmt::Display for RetrieverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrieverError::EmbeddingError(msg) => write!(f, "Embedding error: {}", msg),
            RetrieverError::VectorStoreError(msg) => write!(f, "Vector store error: {}", msg),
        }
    }
}

impl std::error::Error for RetrieverError {}

/// Embeds the query (by text, or by image content for multimodal
/// providers), runs one visibility-filtered similarity search, and returns
/// the top hits above the relevance threshold with vision payloads
/// attached.
pub struct Retriever {
    vector_store: Arc<dyn VectorRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    image_fetcher: Arc<dyn ImageContentFetcher>,
    settings: RetrieverSettings,
}

impl Retriever {
    pub fn new(
        vector_store: Arc<dyn VectorRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        image_fetcher: Arc<dyn ImageContentFetcher>,
        settings: RetrieverSettings,
    ) -> Self {
        Self {
            vector_store,
            embedder,
            image_fetcher,
            settings,
        }
    }

    pub fn supports_image_input(&self) -> bool {
        self.embedder.supports_image_input()
    }

    /// Embedding for an externally driven search (the sources endpoint).
    pub async fn query_embedding(&self, query: &str) -> Result<Vec<f32>, RetrieverError> {
        self.embedder
            .embed_query(query)
            .await
            .map_err(|e| RetrieverError::EmbeddingError(e.to_string()))
    }

    /// Primary retrieval. Embedding failures propagate: answering with
    /// silently empty context is worse than failing loudly.
    pub async fn retrieve(
        &self,
        query: &str,
        image_urls: &[String],
    ) -> Result<Vec<RetrievedDocument>, RetrieverError> {
        let query_embedding = if !image_urls.is_empty() && self.embedder.supports_image_input() {
            self.embedder
                .embed_images(image_urls)
                .await
                .map_err(|e| RetrieverError::EmbeddingError(e.to_string()))?
        } else {
            self.embedder
                .embed_query(query)
                .await
                .map_err(|e| RetrieverError::EmbeddingError(e.to_string()))?
        };

        // Vision transport is prepared independently of the retrieval
        // embedding; a fetch failure only costs that one payload.
        let mut user_image_base64 = Vec::new();
        for url in image_urls {
            match self.image_fetcher.fetch_base64(url).await {
                Ok(payload) => user_image_base64.push(payload),
                Err(err) => {
                    tracing::warn!("Failed to fetch image payload for {}: {}", url, err);
                }
            }
        }

        let candidate_count = (self.settings.k as i64).max(MIN_CANDIDATE_FETCH);
        let results = self
            .vector_store
            .similarity_search(
                &query_embedding,
                candidate_count,
                &SearchFilter::public_knowledge(),
            )
            .await
            .map_err(|e| RetrieverError::VectorStoreError(e.to_string()))?;

        tracing::debug!("Similarity search returned {} candidates", results.len());

        let mut documents: Vec<RetrievedDocument> = results
            .into_iter()
            .filter(|(doc, score)| {
                *score >= self.settings.similarity_threshold && doc.metadata.is_visible_to_public()
            })
            .take(self.settings.k)
            .map(|(mut doc, score)| {
                doc.metadata.score = score;
                doc
            })
            .collect();

        for doc in &mut documents {
            doc.metadata.user_image_base64 = user_image_base64.clone();
        }

        Ok(documents)
    }

    /// Search restricted to one document type. Errors degrade to an empty
    /// list so a union over types stays usable when one segment is down.
    pub async fn scoped_search(
        &self,
        query_embedding: &[f32],
        doc_type: DocumentType,
        limit: i64,
        min_score: f32,
    ) -> Vec<(RetrievedDocument, f32)> {
        let filter = SearchFilter::public_of_type(doc_type);
        match self
            .vector_store
            .similarity_search(query_embedding, limit, &filter)
            .await
        {
            Ok(results) => results
                .into_iter()
                .filter(|(_, score)| *score >= min_score)
                .collect(),
            Err(err) => {
                tracing::error!("Scoped search for {} failed: {}", doc_type, err);
                Vec::new()
            }
        }
    }

    /// Pure image-to-image similarity search. Only meaningful for
    /// multimodal providers; otherwise empty.
    pub async fn search_by_image_similarity(
        &self,
        image_urls: &[String],
        limit: i64,
        min_score: f32,
    ) -> Vec<(RetrievedDocument, f32)> {
        if !self.embedder.supports_image_input() || image_urls.is_empty() {
            return Vec::new();
        }

        let embedding = match self.embedder.embed_images(image_urls).await {
            Ok(embedding) => embedding,
            Err(err) => {
                tracing::error!("Image embedding for similarity search failed: {}", err);
                return Vec::new();
            }
        };

        match self
            .vector_store
            .similarity_search(&embedding, limit, &SearchFilter::public())
            .await
        {
            Ok(results) => results
                .into_iter()
                .filter(|(_, score)| *score >= min_score)
                .collect(),
            Err(err) => {
                tracing::error!("Image similarity search failed: {}", err);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::embedding_provider::EmbeddingProviderError;
    use crate::application::ports::image_fetcher::ImageFetchError;
    use crate::domain::entities::retrieved_document::DocumentMetadata;
    use crate::domain::repositories::vector_repository::{VectorRecord, VectorRepositoryError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeStore {
        results: Vec<(RetrievedDocument, f32)>,
        fail: bool,
        search_calls: AtomicUsize,
        last_filter: Mutex<Option<SearchFilter>>,
    }

    impl FakeStore {
        fn with_results(results: Vec<(RetrievedDocument, f32)>) -> Self {
            Self {
                results,
                fail: false,
                search_calls: AtomicUsize::new(0),
                last_filter: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                results: Vec::new(),
                fail: true,
                search_calls: AtomicUsize::new(0),
                last_filter: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl VectorRepository for FakeStore {
        async fn similarity_search(
            &self,
            _embedding: &[f32],
            _limit: i64,
            filter: &SearchFilter,
        ) -> Result<Vec<(RetrievedDocument, f32)>, VectorRepositoryError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_filter.lock().unwrap() = Some(filter.clone());
            if self.fail {
                return Err(VectorRepositoryError::DatabaseError("down".to_string()));
            }
            Ok(self.results.clone())
        }

        async fn upsert(&self, _record: &VectorRecord) -> Result<(), VectorRepositoryError> {
            Ok(())
        }
    }

    struct FakeEmbedder {
        multimodal: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
            Ok(vec![0.1, 0.2, 0.3])
        }

        async fn embed_document(&self, _text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
            Ok(vec![0.1, 0.2, 0.3])
        }

        async fn embed_images(
            &self,
            _image_urls: &[String],
        ) -> Result<Vec<f32>, EmbeddingProviderError> {
            if self.multimodal {
                Ok(vec![0.9, 0.8, 0.7])
            } else {
                Err(EmbeddingProviderError::InvalidInput("text only".to_string()))
            }
        }

        fn supports_image_input(&self) -> bool {
            self.multimodal
        }

        fn model_name(&self) -> &str {
            "fake"
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    struct FakeFetcher;

    #[async_trait]
    impl ImageContentFetcher for FakeFetcher {
        async fn fetch_base64(&self, url: &str) -> Result<String, ImageFetchError> {
            if url.contains("broken") {
                Err(ImageFetchError::NetworkError("404".to_string()))
            } else {
                Ok(format!("b64:{}", url))
            }
        }
    }

    fn doc(doc_type: DocumentType, is_public: Option<bool>) -> RetrievedDocument {
        let mut metadata = DocumentMetadata::new(doc_type, 0.0);
        metadata.is_public = is_public;
        RetrievedDocument::new("content", metadata)
    }

    fn retriever(store: Arc<FakeStore>, multimodal: bool) -> Retriever {
        Retriever::new(
            store,
            Arc::new(FakeEmbedder { multimodal }),
            Arc::new(FakeFetcher),
            RetrieverSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_threshold_and_truncation() {
        let results: Vec<_> = (0..20)
            .map(|i| (doc(DocumentType::Pdf, None), 0.9 - (i as f32) * 0.05))
            .collect();
        let store = Arc::new(FakeStore::with_results(results));
        let documents = retriever(store, false).retrieve("query", &[]).await.unwrap();

        // 0.9 down to 0.35 inclusive is 12 candidates, capped at k = 8.
        assert_eq!(documents.len(), 8);
        assert!(documents.iter().all(|d| d.score() >= 0.35));
    }

    #[tokio::test]
    async fn test_non_public_documents_never_returned() {
        let store = Arc::new(FakeStore::with_results(vec![
            (doc(DocumentType::Pdf, Some(false)), 0.9),
            (doc(DocumentType::Pdf, Some(true)), 0.8),
            (doc(DocumentType::Pdf, None), 0.7),
        ]));
        let documents = retriever(store.clone(), false)
            .retrieve("query", &[])
            .await
            .unwrap();

        assert_eq!(documents.len(), 2);
        assert!(documents.iter().all(|d| d.metadata.is_visible_to_public()));

        let filter = store.last_filter.lock().unwrap().clone().unwrap();
        assert!(filter.public_only);
        assert!(filter.exclude_conversation_uploads);
    }

    #[tokio::test]
    async fn test_base64_attached_and_fetch_failures_skipped() {
        let store = Arc::new(FakeStore::with_results(vec![(
            doc(DocumentType::Pdf, None),
            0.8,
        )]));
        let documents = retriever(store, false)
            .retrieve("query", &["ok.png".to_string(), "broken.png".to_string()])
            .await
            .unwrap();

        assert_eq!(documents[0].metadata.user_image_base64, vec!["b64:ok.png"]);
    }

    #[tokio::test]
    async fn test_store_error_propagates_on_primary_path() {
        let store = Arc::new(FakeStore::failing());
        let result = retriever(store, false).retrieve("query", &[]).await;
        assert!(matches!(result, Err(RetrieverError::VectorStoreError(_))));
    }

    #[tokio::test]
    async fn test_scoped_search_degrades_to_empty() {
        let store = Arc::new(FakeStore::failing());
        let results = retriever(store, false)
            .scoped_search(&[0.1, 0.2, 0.3], DocumentType::Pdf, 2, 0.78)
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_scoped_search_applies_type_filter_and_min_score() {
        let store = Arc::new(FakeStore::with_results(vec![
            (doc(DocumentType::Pdf, None), 0.9),
            (doc(DocumentType::Pdf, None), 0.5),
        ]));
        let results = retriever(store.clone(), false)
            .scoped_search(&[0.1, 0.2, 0.3], DocumentType::Pdf, 2, 0.78)
            .await;

        assert_eq!(results.len(), 1);
        let filter = store.last_filter.lock().unwrap().clone().unwrap();
        assert_eq!(filter.doc_type, Some(DocumentType::Pdf));
        assert!(filter.public_only);
    }

    #[tokio::test]
    async fn test_image_search_requires_multimodal_provider() {
        let store = Arc::new(FakeStore::with_results(vec![(
            doc(DocumentType::Image, None),
            0.9,
        )]));
        let results = retriever(store.clone(), false)
            .search_by_image_similarity(&["a.png".to_string()], 10, 0.5)
            .await;
        assert!(results.is_empty());
        assert_eq!(store.search_calls.load(Ordering::SeqCst), 0);

        let results = retriever(store, true)
            .search_by_image_similarity(&["a.png".to_string()], 10, 0.5)
            .await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_multimodal_provider_embeds_by_image() {
        let store = Arc::new(FakeStore::with_results(vec![(
            doc(DocumentType::Pdf, None),
            0.8,
        )]));
        // Multimodal + images: retrieval succeeds even though the query
        // text is irrelevant to the image embedding.
        let documents = retriever(store, true)
            .retrieve("ignored", &["a.png".to_string()])
            .await
            .unwrap();
        assert_eq!(documents.len(), 1);
    }
}

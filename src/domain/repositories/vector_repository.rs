use async_trait::async_trait;
use serde_json::Value;

use crate::domain::entities::RetrievedDocument;
use crate::domain::value_objects::DocumentType;

#[derive(Debug)]
pub enum VectorRepositoryError {
    DatabaseError(String),
    DimensionMismatch { expected: usize, actual: usize },
    ValidationError(String),
}

impl std::fmt::Display for VectorRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorRepositoryError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            VectorRepositoryError::DimensionMismatch { expected, actual } => write!(
                f,
                "Embedding dimension mismatch: expected {}, got {}",
                expected, actual
            ),
            VectorRepositoryError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for VectorRepositoryError {}

/// Predicates a similarity search can apply server-side.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Require `is_public = true OR is_public IS NULL`.
    pub public_only: bool,
    /// Exact-match on the document type.
    pub doc_type: Option<DocumentType>,
    /// Drop vectors created on-demand from user conversation uploads.
    pub exclude_conversation_uploads: bool,
}

impl SearchFilter {
    pub fn public() -> Self {
        Self {
            public_only: true,
            doc_type: None,
            exclude_conversation_uploads: false,
        }
    }

    pub fn public_knowledge() -> Self {
        Self {
            public_only: true,
            doc_type: None,
            exclude_conversation_uploads: true,
        }
    }

    pub fn public_of_type(doc_type: DocumentType) -> Self {
        Self {
            public_only: true,
            doc_type: Some(doc_type),
            exclude_conversation_uploads: false,
        }
    }
}

/// A vector to upsert into the index.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub content: String,
    pub doc_type: DocumentType,
    pub source: Option<String>,
    pub is_public: Option<bool>,
    pub metadata: Value,
    pub embedding: Vec<f32>,
}

#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Nearest-neighbour search returning documents with their cosine
    /// similarity scores, best first.
    async fn similarity_search(
        &self,
        embedding: &[f32],
        limit: i64,
        filter: &SearchFilter,
    ) -> Result<Vec<(RetrievedDocument, f32)>, VectorRepositoryError>;

    async fn upsert(&self, record: &VectorRecord) -> Result<(), VectorRepositoryError>;
}

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::QaRecord;

#[derive(Debug)]
pub enum QaRepositoryError {
    DatabaseError(String),
    NotFound(Uuid),
    ValidationError(String),
}

impl std::fmt::Display for QaRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QaRepositoryError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            QaRepositoryError::NotFound(qa_id) => write!(f, "QA record not found: {}", qa_id),
            QaRepositoryError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for QaRepositoryError {}

#[async_trait]
pub trait QaRepository: Send + Sync {
    async fn insert(&self, record: &QaRecord) -> Result<(), QaRepositoryError>;

    async fn find_by_id(&self, qa_id: Uuid) -> Result<Option<QaRecord>, QaRepositoryError>;

    async fn find_by_room_id(&self, room_id: &str) -> Result<Vec<QaRecord>, QaRepositoryError>;

    /// Feedback arrives out-of-band after the answer was shown; it is the
    /// only mutation a stored record ever sees.
    async fn update_feedback(
        &self,
        qa_id: Uuid,
        thumb: Option<i16>,
        comment: Option<String>,
    ) -> Result<(), QaRepositoryError>;
}

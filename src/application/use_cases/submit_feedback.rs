use std::sync::Arc;
use uuid::Uuid;

use crate::domain::repositories::qa_repository::{QaRepository, QaRepositoryError};

#[derive(Debug)]
pub enum SubmitFeedbackError {
    ValidationError(String),
    RepositoryError(String),
    NotFound(Uuid),
}

impl std::fmt::Display for SubmitFeedbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitFeedbackError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            SubmitFeedbackError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
            SubmitFeedbackError::NotFound(qa_id) => write!(f, "QA record not found: {}", qa_id),
        }
    }
}

impl std::error::Error for SubmitFeedbackError {}

#[derive(Debug, Clone)]
pub struct SubmitFeedbackRequest {
    pub qa_id: Uuid,
    pub thumb: Option<i16>,
    pub comment: Option<String>,
}

/// Attaches a thumb rating and/or comment to an already-answered question.
pub struct SubmitFeedbackUseCase {
    qa_repo: Arc<dyn QaRepository>,
}

impl SubmitFeedbackUseCase {
    pub fn new(qa_repo: Arc<dyn QaRepository>) -> Self {
        Self { qa_repo }
    }

    pub async fn execute(&self, request: SubmitFeedbackRequest) -> Result<(), SubmitFeedbackError> {
        if let Some(thumb) = request.thumb {
            if thumb != -1 && thumb != 1 {
                return Err(SubmitFeedbackError::ValidationError(
                    "thumb must be -1 or 1".to_string(),
                ));
            }
        }
        if request.thumb.is_none() && request.comment.is_none() {
            return Err(SubmitFeedbackError::ValidationError(
                "feedback must carry a thumb or a comment".to_string(),
            ));
        }

        self.qa_repo
            .update_feedback(request.qa_id, request.thumb, request.comment)
            .await
            .map_err(|err| match err {
                QaRepositoryError::NotFound(qa_id) => SubmitFeedbackError::NotFound(qa_id),
                other => SubmitFeedbackError::RepositoryError(other.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::domain::entities::QaRecord;
    use std::sync::Mutex;

    struct FakeQaRepo {
        updates: Mutex<Vec<(Uuid, Option<i16>, Option<String>)>>,
        missing: bool,
    }

    #[async_trait]
    impl QaRepository for FakeQaRepo {
        async fn insert(&self, _record: &QaRecord) -> Result<(), QaRepositoryError> {
            Ok(())
        }

        async fn find_by_id(&self, _qa_id: Uuid) -> Result<Option<QaRecord>, QaRepositoryError> {
            Ok(None)
        }

        async fn find_by_room_id(
            &self,
            _room_id: &str,
        ) -> Result<Vec<QaRecord>, QaRepositoryError> {
            Ok(Vec::new())
        }

        async fn update_feedback(
            &self,
            qa_id: Uuid,
            thumb: Option<i16>,
            comment: Option<String>,
        ) -> Result<(), QaRepositoryError> {
            if self.missing {
                return Err(QaRepositoryError::NotFound(qa_id));
            }
            self.updates.lock().unwrap().push((qa_id, thumb, comment));
            Ok(())
        }
    }

    fn use_case(missing: bool) -> SubmitFeedbackUseCase {
        SubmitFeedbackUseCase::new(Arc::new(FakeQaRepo {
            updates: Mutex::new(Vec::new()),
            missing,
        }))
    }

    #[tokio::test]
    async fn test_valid_feedback_applies() {
        let result = use_case(false)
            .execute(SubmitFeedbackRequest {
                qa_id: Uuid::new_v4(),
                thumb: Some(1),
                comment: Some("helpful".to_string()),
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_thumb_rejected() {
        let result = use_case(false)
            .execute(SubmitFeedbackRequest {
                qa_id: Uuid::new_v4(),
                thumb: Some(3),
                comment: None,
            })
            .await;
        assert!(matches!(result, Err(SubmitFeedbackError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_empty_feedback_rejected() {
        let result = use_case(false)
            .execute(SubmitFeedbackRequest {
                qa_id: Uuid::new_v4(),
                thumb: None,
                comment: None,
            })
            .await;
        assert!(matches!(result, Err(SubmitFeedbackError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_unknown_record_maps_to_not_found() {
        let result = use_case(true)
            .execute(SubmitFeedbackRequest {
                qa_id: Uuid::new_v4(),
                thumb: Some(-1),
                comment: None,
            })
            .await;
        assert!(matches!(result, Err(SubmitFeedbackError::NotFound(_))));
    }
}

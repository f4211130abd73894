use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::application::services::answer_chain::{
    AnswerChain, AnswerChainError, AnswerOutcome, AnswerRequest,
};
use crate::application::services::memory::MemoryService;
use crate::application::services::room_locks::RoomLocks;

#[derive(Debug)]
pub enum AskQuestionError {
    ValidationError(String),
    ChainError(AnswerChainError),
}

impl std::fmt::Display for AskQuestionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AskQuestionError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AskQuestionError::ChainError(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AskQuestionError {}

#[derive(Debug, Clone)]
pub struct AskQuestionRequest {
    pub question: String,
    pub history: Vec<(String, String)>,
    pub room_id: String,
    pub user_email: String,
    pub image_urls: Vec<String>,
}

/// Validates the inbound ask, reconciles client-held history, and runs the
/// answer chain with the caller's token sink.
pub struct AskQuestionUseCase {
    chain: Arc<AnswerChain>,
    memory: Arc<MemoryService>,
    room_locks: Arc<RoomLocks>,
}

impl AskQuestionUseCase {
    pub fn new(
        chain: Arc<AnswerChain>,
        memory: Arc<MemoryService>,
        room_locks: Arc<RoomLocks>,
    ) -> Self {
        Self {
            chain,
            memory,
            room_locks,
        }
    }

    pub async fn execute(
        &self,
        request: AskQuestionRequest,
        token_tx: UnboundedSender<String>,
    ) -> Result<AnswerOutcome, AskQuestionError> {
        if request.room_id.trim().is_empty() {
            return Err(AskQuestionError::ValidationError(
                "No roomId in the request".to_string(),
            ));
        }
        if request.question.trim().is_empty() {
            return Err(AskQuestionError::ValidationError(
                "No question in the request".to_string(),
            ));
        }

        // Turns within one room land in submission order.
        let _room_guard = self.room_locks.acquire(&request.room_id).await;

        if let Err(err) = self
            .memory
            .sync_from_client(&request.room_id, &request.history, &request.user_email)
            .await
        {
            tracing::warn!("Client history sync failed: {}", err);
        }

        let answer_request = AnswerRequest {
            question: request.question.trim().replace('\n', " "),
            image_urls: request.image_urls,
            room_id: request.room_id,
            user_email: request.user_email,
        };

        self.chain
            .answer(&answer_request, token_tx)
            .await
            .map_err(AskQuestionError::ChainError)
    }
}

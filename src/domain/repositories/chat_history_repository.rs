use async_trait::async_trait;

use crate::domain::entities::ConversationTurn;

#[derive(Debug)]
pub enum ChatHistoryRepositoryError {
    DatabaseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ChatHistoryRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatHistoryRepositoryError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ChatHistoryRepositoryError::ValidationError(msg) => {
                write!(f, "Validation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ChatHistoryRepositoryError {}

/// A room's stored conversation plus its resolved title.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredConversation {
    pub title: Option<String>,
    pub turns: Vec<ConversationTurn>,
}

#[async_trait]
pub trait ChatHistoryRepository: Send + Sync {
    async fn find_by_room_id(
        &self,
        room_id: &str,
    ) -> Result<Option<StoredConversation>, ChatHistoryRepositoryError>;

    async fn save(
        &self,
        room_id: &str,
        user_email: Option<&str>,
        title: &str,
        turns: &[ConversationTurn],
    ) -> Result<(), ChatHistoryRepositoryError>;

    async fn title_by_room_id(
        &self,
        room_id: &str,
    ) -> Result<Option<String>, ChatHistoryRepositoryError>;

    async fn clear(&self, room_id: &str) -> Result<(), ChatHistoryRepositoryError>;
}

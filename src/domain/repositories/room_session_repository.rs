use async_trait::async_trait;

use crate::domain::entities::RoomSession;

#[derive(Debug)]
pub enum RoomSessionRepositoryError {
    DatabaseError(String),
    ValidationError(String),
}

impl std::fmt::Display for RoomSessionRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomSessionRepositoryError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            RoomSessionRepositoryError::ValidationError(msg) => {
                write!(f, "Validation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for RoomSessionRepositoryError {}

/// Durable per-room embedding-session storage. The serving environment
/// does not preserve process memory between requests, so sessions must
/// round-trip through here on every step.
#[async_trait]
pub trait RoomSessionRepository: Send + Sync {
    async fn find_by_room_id(
        &self,
        room_id: &str,
    ) -> Result<Option<RoomSession>, RoomSessionRepositoryError>;

    async fn create(&self, session: &RoomSession) -> Result<(), RoomSessionRepositoryError>;

    async fn update(&self, session: &RoomSession) -> Result<(), RoomSessionRepositoryError>;

    async fn delete(&self, room_id: &str) -> Result<(), RoomSessionRepositoryError>;
}

use async_trait::async_trait;
use diesel::prelude::*;

use crate::config::TenantContext;
use crate::domain::entities::ConversationTurn;
use crate::domain::repositories::chat_history_repository::{
    ChatHistoryRepository, ChatHistoryRepositoryError, StoredConversation,
};
use crate::infrastructure::database::models::{ChatHistoryModel, NewChatHistoryModel};
use crate::infrastructure::database::schema::chat_histories::dsl::*;
use crate::infrastructure::database::{DbConnection, DbPool, tenant_connection};

pub struct PostgresChatHistoryRepository {
    pool: DbPool,
    tenant: TenantContext,
}

impl PostgresChatHistoryRepository {
    pub fn new(pool: DbPool, tenant: TenantContext) -> Self {
        Self { pool, tenant }
    }

    fn conn(&self) -> Result<DbConnection, ChatHistoryRepositoryError> {
        tenant_connection(&self.pool, &self.tenant)
            .map_err(|e| ChatHistoryRepositoryError::DatabaseError(e.to_string()))
    }
}

#[async_trait]
impl ChatHistoryRepository for PostgresChatHistoryRepository {
    async fn find_by_room_id(
        &self,
        room: &str,
    ) -> Result<Option<StoredConversation>, ChatHistoryRepositoryError> {
        let mut conn = self.conn()?;

        let result = chat_histories
            .filter(room_id.eq(room))
            .filter(chatbot_id.eq(&self.tenant.chatbot_id))
            .select(ChatHistoryModel::as_select())
            .first::<ChatHistoryModel>(&mut conn)
            .optional()
            .map_err(|e| ChatHistoryRepositoryError::DatabaseError(e.to_string()))?;

        match result {
            Some(model) => model
                .into_stored_conversation()
                .map(Some)
                .map_err(ChatHistoryRepositoryError::ValidationError),
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        room: &str,
        email: Option<&str>,
        title: &str,
        turns: &[ConversationTurn],
    ) -> Result<(), ChatHistoryRepositoryError> {
        let mut conn = self.conn()?;

        let new_history =
            NewChatHistoryModel::build(room, &self.tenant.chatbot_id, email, title, turns)
                .map_err(ChatHistoryRepositoryError::ValidationError)?;

        diesel::insert_into(chat_histories)
            .values(&new_history)
            .on_conflict(room_id)
            .do_update()
            .set(&new_history)
            .execute(&mut conn)
            .map_err(|e| ChatHistoryRepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn title_by_room_id(
        &self,
        room: &str,
    ) -> Result<Option<String>, ChatHistoryRepositoryError> {
        let mut conn = self.conn()?;

        let title = chat_histories
            .filter(room_id.eq(room))
            .filter(chatbot_id.eq(&self.tenant.chatbot_id))
            .select(conversation_title)
            .first::<Option<String>>(&mut conn)
            .optional()
            .map_err(|e| ChatHistoryRepositoryError::DatabaseError(e.to_string()))?;

        Ok(title.flatten().filter(|t| !t.trim().is_empty()))
    }

    async fn clear(&self, room: &str) -> Result<(), ChatHistoryRepositoryError> {
        let mut conn = self.conn()?;

        diesel::delete(
            chat_histories
                .filter(room_id.eq(room))
                .filter(chatbot_id.eq(&self.tenant.chatbot_id)),
        )
        .execute(&mut conn)
        .map_err(|e| ChatHistoryRepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

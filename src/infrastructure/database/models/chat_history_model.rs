use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use crate::domain::entities::ConversationTurn;
use crate::domain::repositories::chat_history_repository::StoredConversation;
use crate::infrastructure::database::schema::chat_histories;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chat_histories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatHistoryModel {
    pub room_id: String,
    pub chatbot_id: String,
    pub user_email: Option<String>,
    pub conversation_title: Option<String>,
    pub conversation_json: Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = chat_histories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewChatHistoryModel {
    pub room_id: String,
    pub chatbot_id: String,
    pub user_email: Option<String>,
    pub conversation_title: Option<String>,
    pub conversation_json: Value,
    pub updated_at: DateTime<Utc>,
}

impl ChatHistoryModel {
    pub fn into_stored_conversation(self) -> Result<StoredConversation, String> {
        let turns: Vec<ConversationTurn> = serde_json::from_value(self.conversation_json)
            .map_err(|e| format!("Malformed conversation payload: {}", e))?;
        Ok(StoredConversation {
            title: self
                .conversation_title
                .filter(|title| !title.trim().is_empty()),
            turns,
        })
    }
}

impl NewChatHistoryModel {
    pub fn build(
        room_id: &str,
        chatbot_id: &str,
        user_email: Option<&str>,
        title: &str,
        turns: &[ConversationTurn],
    ) -> Result<Self, String> {
        let conversation_json = serde_json::to_value(turns)
            .map_err(|e| format!("Failed to serialize conversation: {}", e))?;
        Ok(Self {
            room_id: room_id.to_string(),
            chatbot_id: chatbot_id.to_string(),
            user_email: user_email.map(str::to_string),
            conversation_title: Some(title.to_string()),
            conversation_json,
            updated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_round_trip() {
        let turns = vec![
            ConversationTurn::user_with_images("look", vec!["a.png".to_string()]),
            ConversationTurn::assistant("ok", None),
        ];
        let new_model =
            NewChatHistoryModel::build("room-1", "bot-1", Some("u@example.com"), "Title", &turns)
                .unwrap();

        let model = ChatHistoryModel {
            room_id: new_model.room_id,
            chatbot_id: new_model.chatbot_id,
            user_email: new_model.user_email,
            conversation_title: new_model.conversation_title,
            conversation_json: new_model.conversation_json,
            updated_at: new_model.updated_at,
        };

        let stored = model.into_stored_conversation().unwrap();
        assert_eq!(stored.title, Some("Title".to_string()));
        assert_eq!(stored.turns, turns);
    }

    #[test]
    fn test_blank_title_maps_to_none() {
        let model = ChatHistoryModel {
            room_id: "room-1".to_string(),
            chatbot_id: "bot-1".to_string(),
            user_email: None,
            conversation_title: Some("  ".to_string()),
            conversation_json: serde_json::json!([]),
            updated_at: Utc::now(),
        };
        assert_eq!(model.into_stored_conversation().unwrap().title, None);
    }
}

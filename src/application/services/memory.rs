use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::conversation::collect_image_urls;
use crate::domain::entities::ConversationTurn;
use crate::domain::repositories::chat_history_repository::{
    ChatHistoryRepository, ChatHistoryRepositoryError,
};

/// Conversation memory over the chat-history store: greeting seeding,
/// turn appends, title resolution, and client-side history sync.
pub struct MemoryService {
    chat_repo: Arc<dyn ChatHistoryRepository>,
}

impl MemoryService {
    pub fn new(chat_repo: Arc<dyn ChatHistoryRepository>) -> Self {
        Self { chat_repo }
    }

    pub async fn history(
        &self,
        room_id: &str,
    ) -> Result<Vec<ConversationTurn>, ChatHistoryRepositoryError> {
        Ok(self
            .chat_repo
            .find_by_room_id(room_id)
            .await?
            .map(|stored| stored.turns)
            .unwrap_or_default())
    }

    /// Idempotent: a room with no history gets a single seed greeting so
    /// downstream title logic has something to look at.
    pub async fn ensure_session(
        &self,
        room_id: &str,
        user_email: &str,
    ) -> Result<(), ChatHistoryRepositoryError> {
        let existing = self.history(room_id).await?;
        if existing.is_empty() {
            self.chat_repo
                .save(room_id, Some(user_email), "", &[ConversationTurn::user("Hi")])
                .await?;
        }
        Ok(())
    }

    /// Zero stored messages, or exactly one bare seed greeting, counts as
    /// a first message for title-generation purposes.
    pub fn is_first_message(turns: &[ConversationTurn]) -> bool {
        match turns {
            [] => true,
            [only] => only.is_seed_greeting(),
            _ => false,
        }
    }

    /// Append the finished Q&A to the room, filtering the seed greeting
    /// back out and resolving the conversation title (existing title wins,
    /// then the freshly generated one, then a plain fallback).
    #[allow(clippy::too_many_arguments)]
    pub async fn update_memory(
        &self,
        room_id: &str,
        question: &str,
        answer: &str,
        image_urls: &[String],
        user_email: &str,
        qa_id: Uuid,
        new_title: Option<&str>,
    ) -> Result<(), ChatHistoryRepositoryError> {
        let stored = self.chat_repo.find_by_room_id(room_id).await?;

        let existing_title = stored
            .as_ref()
            .and_then(|s| s.title.clone())
            .filter(|t| !t.trim().is_empty());
        let title = existing_title
            .or_else(|| {
                new_title
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
            })
            .unwrap_or_else(|| "Conversation".to_string());

        let mut turns: Vec<ConversationTurn> = stored
            .map(|s| s.turns)
            .unwrap_or_default()
            .into_iter()
            .filter(|turn| !turn.is_seed_greeting())
            .collect();

        turns.push(if image_urls.is_empty() {
            ConversationTurn::user(question)
        } else {
            ConversationTurn::user_with_images(question, image_urls.to_vec())
        });
        turns.push(ConversationTurn::assistant(answer, Some(qa_id)));

        self.chat_repo
            .save(room_id, Some(user_email), &title, &turns)
            .await
    }

    /// The client may hold turns the server never saw (e.g. answers from
    /// before a data wipe); when its history is longer, rebuild from it.
    pub async fn sync_from_client(
        &self,
        room_id: &str,
        client_pairs: &[(String, String)],
        user_email: &str,
    ) -> Result<(), ChatHistoryRepositoryError> {
        let server_turns = self.history(room_id).await?;
        if client_pairs.len() * 2 <= server_turns.len() {
            return Ok(());
        }

        self.chat_repo.clear(room_id).await?;
        let mut turns = Vec::with_capacity(client_pairs.len() * 2);
        for (question, answer) in client_pairs {
            turns.push(ConversationTurn::user(question));
            turns.push(ConversationTurn::assistant(answer, None));
        }
        self.chat_repo
            .save(room_id, Some(user_email), "", &turns)
            .await
    }

    pub async fn image_urls_from_history(
        &self,
        room_id: &str,
    ) -> Result<Vec<String>, ChatHistoryRepositoryError> {
        Ok(collect_image_urls(&self.history(room_id).await?))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::InMemoryChatHistory;
    use super::*;

    fn service() -> (MemoryService, Arc<InMemoryChatHistory>) {
        let repo = Arc::new(InMemoryChatHistory::default());
        (MemoryService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_ensure_session_seeds_once() {
        let (service, _) = service();
        service.ensure_session("room-1", "u@example.com").await.unwrap();
        service.ensure_session("room-1", "u@example.com").await.unwrap();

        let turns = service.history("room-1").await.unwrap();
        assert_eq!(turns.len(), 1);
        assert!(turns[0].is_seed_greeting());
    }

    #[test]
    fn test_first_message_detection() {
        assert!(MemoryService::is_first_message(&[]));
        assert!(MemoryService::is_first_message(&[ConversationTurn::user("Hi")]));
        assert!(!MemoryService::is_first_message(&[ConversationTurn::user(
            "How do I mill a pocket?"
        )]));
        assert!(!MemoryService::is_first_message(&[
            ConversationTurn::user("Hi"),
            ConversationTurn::assistant("Hello!", None),
        ]));
    }

    #[tokio::test]
    async fn test_update_memory_filters_seed_and_appends() {
        let (service, _) = service();
        service.ensure_session("room-1", "u@example.com").await.unwrap();

        let qa_id = Uuid::new_v4();
        service
            .update_memory(
                "room-1",
                "How do I mill a pocket?",
                "Use the pocket operation.",
                &[],
                "u@example.com",
                qa_id,
                Some("Pocket milling"),
            )
            .await
            .unwrap();

        let turns = service.history("room-1").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content(), "How do I mill a pocket?");
        assert_eq!(turns[1].qa_id(), Some(qa_id));
    }

    #[tokio::test]
    async fn test_existing_title_wins() {
        let (service, repo) = service();
        service
            .update_memory("room-1", "q1", "a1", &[], "u", Uuid::new_v4(), Some("First title"))
            .await
            .unwrap();
        service
            .update_memory("room-1", "q2", "a2", &[], "u", Uuid::new_v4(), Some("Second title"))
            .await
            .unwrap();

        let stored = repo.rooms.lock().unwrap().get("room-1").cloned().unwrap();
        assert_eq!(stored.title, Some("First title".to_string()));
    }

    #[tokio::test]
    async fn test_title_falls_back_to_conversation() {
        let (service, repo) = service();
        service
            .update_memory("room-1", "q", "a", &[], "u", Uuid::new_v4(), None)
            .await
            .unwrap();
        let stored = repo.rooms.lock().unwrap().get("room-1").cloned().unwrap();
        assert_eq!(stored.title, Some("Conversation".to_string()));
    }

    #[tokio::test]
    async fn test_sync_rebuilds_only_when_client_is_longer() {
        let (service, _) = service();
        service
            .update_memory("room-1", "q1", "a1", &[], "u", Uuid::new_v4(), None)
            .await
            .unwrap();

        // Client shorter: no change.
        service
            .sync_from_client("room-1", &[], "u")
            .await
            .unwrap();
        assert_eq!(service.history("room-1").await.unwrap().len(), 2);

        // Client longer: rebuilt from pairs.
        let pairs = vec![
            ("q1".to_string(), "a1".to_string()),
            ("q2".to_string(), "a2".to_string()),
        ];
        service.sync_from_client("room-1", &pairs, "u").await.unwrap();
        let turns = service.history("room-1").await.unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[2].content(), "q2");
    }

    #[tokio::test]
    async fn test_image_urls_from_history() {
        let (service, _) = service();
        service
            .update_memory(
                "room-1",
                "look",
                "ok",
                &["a.png".to_string()],
                "u",
                Uuid::new_v4(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            service.image_urls_from_history("room-1").await.unwrap(),
            vec!["a.png"]
        );
    }
}

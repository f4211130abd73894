use std::sync::{Arc, OnceLock};

use regex::Regex;
use uuid::Uuid;

use crate::application::ports::chat_model::{ChatMessage, ChatModel};
use crate::application::ports::embedding_provider::EmbeddingProvider;
use crate::application::ports::room_notifier::{RoomEvent, RoomNotifier};
use crate::application::prompts;
use crate::application::services::room_locks::RoomLocks;
use crate::config::SessionSettings;
use crate::domain::entities::RoomSession;
use crate::domain::repositories::room_session_repository::RoomSessionRepository;
use crate::domain::repositories::vector_repository::{VectorRecord, VectorRepository};
use crate::domain::value_objects::{DocumentType, SessionStage};

const HEADER_PROMPT: &str =
    "You have entered embedding mode. Please provide a **header** (and link if relevant).";
const TEXT_PROMPT: &str =
    "Thank you! Now, please provide the **text** associated with that header.";
const IMAGE_PROMPT: &str =
    "If you have an **image** to upload, do so now. Or click submit to finalize embedding.";
const EMBEDDED_MESSAGE: &str =
    "\n\n**Your text and images (if provided) have been successfully embedded.**";
const EMBED_FAILED_MESSAGE: &str =
    "Embedding process encountered an error. Please try again.";

#[derive(Debug)]
pub enum EmbedSessionError {
    InvalidFlow(String),
    RepositoryError(String),
    EmbeddingError(String),
}

impl std::fmt::Display for EmbedSessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbedSessionError::InvalidFlow(msg) => write!(f, "Invalid request flow: {}", msg),
            EmbedSessionError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
            EmbedSessionError::EmbeddingError(msg) => write!(f, "Embedding error: {}", msg),
        }
    }
}

impl std::error::Error for EmbedSessionError {}

#[derive(Debug, Clone)]
pub struct EmbedSessionRequest {
    pub question: String,
    pub room_id: String,
    pub image_urls: Vec<String>,
    pub user_email: String,
}

#[derive(Debug, Clone)]
pub struct EmbedSessionResponse {
    pub message: String,
    pub stage: i32,
}

/// Walks an operator through header -> text -> images -> embed, persisting
/// every step so the flow survives stateless request handling.
pub struct EmbedSessionUseCase {
    sessions: Arc<dyn RoomSessionRepository>,
    vector_store: Arc<dyn VectorRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    vision_model: Arc<dyn ChatModel>,
    notifier: Arc<dyn RoomNotifier>,
    room_locks: Arc<RoomLocks>,
    settings: SessionSettings,
}

impl EmbedSessionUseCase {
    pub fn new(
        sessions: Arc<dyn RoomSessionRepository>,
        vector_store: Arc<dyn VectorRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        vision_model: Arc<dyn ChatModel>,
        notifier: Arc<dyn RoomNotifier>,
        room_locks: Arc<RoomLocks>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            sessions,
            vector_store,
            embedder,
            vision_model,
            notifier,
            room_locks,
            settings,
        }
    }

    pub fn is_trigger(&self, question: &str) -> bool {
        question.trim().starts_with(&self.settings.keyword)
    }

    /// Whether this room is currently in embedding mode. Routing uses this
    /// to pre-empt normal chat handling.
    pub async fn has_open_session(&self, room_id: &str) -> Result<bool, EmbedSessionError> {
        Ok(self.load_live_session(room_id).await?.is_some())
    }

    pub async fn handle(
        &self,
        request: &EmbedSessionRequest,
    ) -> Result<EmbedSessionResponse, EmbedSessionError> {
        if request.room_id.trim().is_empty() {
            return Err(EmbedSessionError::InvalidFlow(
                "No roomId in the request".to_string(),
            ));
        }

        // Stage transitions for one room are strictly serialized.
        let _room_guard = self.room_locks.acquire(&request.room_id).await;

        let sanitized = request.question.trim().replace('\n', " ");
        let session = self.load_live_session(&request.room_id).await?;

        if sanitized.starts_with(&self.settings.keyword) {
            return self.enter_or_reset(&request.room_id, session).await;
        }

        let Some(mut session) = session else {
            return Err(EmbedSessionError::InvalidFlow(
                "no session found or created".to_string(),
            ));
        };

        if !request.image_urls.is_empty() {
            return self.attach_and_finalize(&mut session, request).await;
        }

        match session.stage() {
            SessionStage::AwaitingImages => self.embed_and_finalize(&session, request).await,
            SessionStage::AwaitingHeader => {
                session
                    .capture_header(sanitized)
                    .map_err(EmbedSessionError::InvalidFlow)?;
                self.update(&session).await?;
                self.notify(&request.room_id, RoomEvent::Token {
                    text: TEXT_PROMPT.to_string(),
                })
                .await;
                Ok(EmbedSessionResponse {
                    message: TEXT_PROMPT.to_string(),
                    stage: session.stage().as_i32(),
                })
            }
            SessionStage::AwaitingText => {
                session
                    .capture_body_text(sanitized)
                    .map_err(EmbedSessionError::InvalidFlow)?;
                self.update(&session).await?;
                self.notify(&request.room_id, RoomEvent::Token {
                    text: IMAGE_PROMPT.to_string(),
                })
                .await;
                self.notify(&request.room_id, RoomEvent::StageUpdate {
                    stage: session.stage().as_i32(),
                })
                .await;
                Ok(EmbedSessionResponse {
                    message: IMAGE_PROMPT.to_string(),
                    stage: session.stage().as_i32(),
                })
            }
            SessionStage::Created => Err(EmbedSessionError::InvalidFlow(
                "session has not consumed its trigger".to_string(),
            )),
        }
    }

    /// Expired rows are treated as absent and cleaned up on the way.
    async fn load_live_session(
        &self,
        room_id: &str,
    ) -> Result<Option<RoomSession>, EmbedSessionError> {
        let session = self
            .sessions
            .find_by_room_id(room_id)
            .await
            .map_err(|e| EmbedSessionError::RepositoryError(e.to_string()))?;

        match session {
            Some(session)
                if session.is_expired(chrono::Duration::hours(self.settings.ttl_hours)) =>
            {
                tracing::info!(room_id, "Dropping expired embedding session");
                self.sessions
                    .delete(room_id)
                    .await
                    .map_err(|e| EmbedSessionError::RepositoryError(e.to_string()))?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Keyword with no session opens one; keyword over an open session
    /// resets it to a fresh start.
    async fn enter_or_reset(
        &self,
        room_id: &str,
        existing: Option<RoomSession>,
    ) -> Result<EmbedSessionResponse, EmbedSessionError> {
        let session = match existing {
            Some(mut session) => {
                session.reset();
                session
                    .begin_header_capture()
                    .map_err(EmbedSessionError::InvalidFlow)?;
                self.update(&session).await?;
                session
            }
            None => {
                let mut session = RoomSession::new(room_id);
                session
                    .begin_header_capture()
                    .map_err(EmbedSessionError::InvalidFlow)?;
                self.sessions
                    .create(&session)
                    .await
                    .map_err(|e| EmbedSessionError::RepositoryError(e.to_string()))?;
                session
            }
        };

        self.notify(room_id, RoomEvent::Token {
            text: HEADER_PROMPT.to_string(),
        })
        .await;

        Ok(EmbedSessionResponse {
            message: HEADER_PROMPT.to_string(),
            stage: session.stage().as_i32(),
        })
    }

    /// Images arriving at any stage: attach, describe what lacks a
    /// description, then embed immediately.
    async fn attach_and_finalize(
        &self,
        session: &mut RoomSession,
        request: &EmbedSessionRequest,
    ) -> Result<EmbedSessionResponse, EmbedSessionError> {
        session.attach_images(&request.image_urls);

        for url in session.images_without_description() {
            let description = if is_opaque_image_url(&url) {
                "Third-party image URL, no description fetched.".to_string()
            } else {
                self.describe_image(&url, &request.room_id).await
            };
            session.set_image_description(&url, description);
        }

        self.update(session).await?;
        self.notify(&request.room_id, RoomEvent::UploadStatus {
            message: "Uploading and processing your data...".to_string(),
        })
        .await;

        self.embed_and_finalize(session, request).await
    }

    async fn describe_image(&self, url: &str, room_id: &str) -> String {
        let messages = vec![ChatMessage::user_with_images(
            prompts::embed_session_describe_prompt(),
            &[url.to_string()],
        )];

        match self.vision_model.invoke(&messages).await {
            Ok(description) if !description.trim().is_empty() => {
                let description = description.trim().to_string();
                self.notify(room_id, RoomEvent::Token {
                    text: description.clone(),
                })
                .await;
                description
            }
            Ok(_) => "No description found.".to_string(),
            Err(err) => {
                tracing::warn!("Image description during embed failed: {}", err);
                "No description found.".to_string()
            }
        }
    }

    /// Embed whatever the session holds and close it out. The session row
    /// is deleted only on success so a failed embed can be retried.
    async fn embed_and_finalize(
        &self,
        session: &RoomSession,
        request: &EmbedSessionRequest,
    ) -> Result<EmbedSessionResponse, EmbedSessionError> {
        let text = session.embeddable_text(&self.settings.embed_prefix);

        let embed_result = match self.embedder.embed_document(&text).await {
            Ok(embedding) => {
                let record = VectorRecord {
                    id: format!("user_embed_{}", Uuid::new_v4()),
                    content: text.clone(),
                    doc_type: DocumentType::UserInput,
                    source: Some(request.user_email.clone()),
                    is_public: None,
                    metadata: serde_json::json!({
                        "header": session.header(),
                        "image_urls": session
                            .images()
                            .iter()
                            .map(|img| img.url.clone())
                            .collect::<Vec<_>>(),
                    }),
                    embedding,
                };
                self.vector_store
                    .upsert(&record)
                    .await
                    .map_err(|e| e.to_string())
            }
            Err(err) => Err(err.to_string()),
        };

        match embed_result {
            Ok(()) => {
                self.notify(&request.room_id, RoomEvent::Token {
                    text: EMBEDDED_MESSAGE.to_string(),
                })
                .await;
                self.notify(&request.room_id, RoomEvent::RemoveThumbnails).await;
                self.notify(&request.room_id, RoomEvent::EmbeddingComplete).await;
                self.notify(&request.room_id, RoomEvent::UploadStatus {
                    message: "Upload and processing complete.".to_string(),
                })
                .await;

                self.sessions
                    .delete(&request.room_id)
                    .await
                    .map_err(|e| EmbedSessionError::RepositoryError(e.to_string()))?;

                Ok(EmbedSessionResponse {
                    message: EMBEDDED_MESSAGE.to_string(),
                    stage: session.stage().as_i32(),
                })
            }
            Err(err) => {
                tracing::error!(room_id = %request.room_id, "Embedding failed: {}", err);
                self.notify(&request.room_id, RoomEvent::Token {
                    text: EMBED_FAILED_MESSAGE.to_string(),
                })
                .await;
                self.notify(&request.room_id, RoomEvent::UploadStatus {
                    message: "Upload and processing failed.".to_string(),
                })
                .await;
                // Session intentionally left in place for a retry.
                Err(EmbedSessionError::EmbeddingError(err))
            }
        }
    }

    async fn update(&self, session: &RoomSession) -> Result<(), EmbedSessionError> {
        self.sessions
            .update(session)
            .await
            .map_err(|e| EmbedSessionError::RepositoryError(e.to_string()))
    }

    async fn notify(&self, room_id: &str, event: RoomEvent) {
        self.notifier.publish(room_id, event).await;
    }
}

/// Social-media and similar hosts refuse hot-linked fetches; those images
/// get a static description instead of a vision call.
fn is_opaque_image_url(url: &str) -> bool {
    static OPAQUE_HOSTS: OnceLock<Regex> = OnceLock::new();
    let pattern = OPAQUE_HOSTS.get_or_init(|| {
        Regex::new(r"(?i)\b(linkedin|facebook|twitter|instagram|tiktok)\.").expect("valid regex")
    });
    pattern.is_match(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::chat_model::ChatModelError;
    use crate::application::ports::embedding_provider::EmbeddingProviderError;
    use crate::domain::entities::RetrievedDocument;
    use crate::domain::repositories::room_session_repository::RoomSessionRepositoryError;
    use crate::domain::repositories::vector_repository::{SearchFilter, VectorRepositoryError};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct InMemorySessions {
        rooms: Mutex<HashMap<String, RoomSession>>,
    }

    #[async_trait]
    impl RoomSessionRepository for InMemorySessions {
        async fn find_by_room_id(
            &self,
            room_id: &str,
        ) -> Result<Option<RoomSession>, RoomSessionRepositoryError> {
            Ok(self.rooms.lock().unwrap().get(room_id).cloned())
        }

        async fn create(&self, session: &RoomSession) -> Result<(), RoomSessionRepositoryError> {
            self.rooms
                .lock()
                .unwrap()
                .insert(session.room_id().to_string(), session.clone());
            Ok(())
        }

        async fn update(&self, session: &RoomSession) -> Result<(), RoomSessionRepositoryError> {
            self.rooms
                .lock()
                .unwrap()
                .insert(session.room_id().to_string(), session.clone());
            Ok(())
        }

        async fn delete(&self, room_id: &str) -> Result<(), RoomSessionRepositoryError> {
            self.rooms.lock().unwrap().remove(room_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeStore {
        upserts: Mutex<Vec<VectorRecord>>,
    }

    #[async_trait]
    impl VectorRepository for FakeStore {
        async fn similarity_search(
            &self,
            _embedding: &[f32],
            _limit: i64,
            _filter: &SearchFilter,
        ) -> Result<Vec<(RetrievedDocument, f32)>, VectorRepositoryError> {
            Ok(Vec::new())
        }

        async fn upsert(&self, record: &VectorRecord) -> Result<(), VectorRepositoryError> {
            self.upserts.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct FakeEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
            Ok(vec![0.1])
        }

        async fn embed_document(&self, _text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
            if self.fail {
                Err(EmbeddingProviderError::ServiceUnavailable)
            } else {
                Ok(vec![0.1])
            }
        }

        fn model_name(&self) -> &str {
            "fake"
        }

        fn dimension(&self) -> usize {
            1
        }
    }

    struct FakeVision;

    #[async_trait]
    impl ChatModel for FakeVision {
        async fn invoke(&self, _messages: &[ChatMessage]) -> Result<String, ChatModelError> {
            Ok("a toolpath screenshot".to_string())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<(String, RoomEvent)>>,
        count: AtomicUsize,
    }

    #[async_trait]
    impl RoomNotifier for RecordingNotifier {
        async fn publish(&self, room_id: &str, event: RoomEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.events
                .lock()
                .unwrap()
                .push((room_id.to_string(), event));
        }
    }

    struct Harness {
        use_case: EmbedSessionUseCase,
        sessions: Arc<InMemorySessions>,
        store: Arc<FakeStore>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness(embedder_fails: bool) -> Harness {
        let sessions = Arc::new(InMemorySessions::default());
        let store = Arc::new(FakeStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let use_case = EmbedSessionUseCase::new(
            sessions.clone(),
            store.clone(),
            Arc::new(FakeEmbedder {
                fail: embedder_fails,
            }),
            Arc::new(FakeVision),
            notifier.clone(),
            Arc::new(RoomLocks::new()),
            SessionSettings::default(),
        );
        Harness {
            use_case,
            sessions,
            store,
            notifier,
        }
    }

    fn request(question: &str, image_urls: Vec<&str>) -> EmbedSessionRequest {
        EmbedSessionRequest {
            question: question.to_string(),
            room_id: "room-9".to_string(),
            image_urls: image_urls.into_iter().map(str::to_string).collect(),
            user_email: "op@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_full_session_scenario() {
        let h = harness(false);

        // Keyword opens the session and asks for a header.
        let response = h
            .use_case
            .handle(&request("embed-4831-embed-4831", vec![]))
            .await
            .unwrap();
        assert_eq!(response.message, HEADER_PROMPT);
        assert!(h.use_case.has_open_session("room-9").await.unwrap());

        // Header captured.
        let response = h
            .use_case
            .handle(&request("Pocket Milling Guide", vec![]))
            .await
            .unwrap();
        assert_eq!(response.message, TEXT_PROMPT);
        let stored = h.sessions.rooms.lock().unwrap().get("room-9").cloned().unwrap();
        assert_eq!(stored.header(), Some("Pocket Milling Guide"));
        assert_eq!(stored.stage(), SessionStage::AwaitingText);

        // Body text captured, stage update pushed to the room.
        let response = h
            .use_case
            .handle(&request("Use climb milling for pockets.", vec![]))
            .await
            .unwrap();
        assert_eq!(response.message, IMAGE_PROMPT);
        assert_eq!(response.stage, 4);

        // Image arrives: described, embedded, session deleted.
        h.use_case
            .handle(&request("", vec!["https://cdn.example.com/pocket.png"]))
            .await
            .unwrap();

        assert!(h.sessions.rooms.lock().unwrap().is_empty());
        let upserts = h.store.upserts.lock().unwrap();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].doc_type, DocumentType::UserInput);
        assert!(upserts[0].content.contains("Pocket Milling Guide"));
        assert!(upserts[0]
            .content
            .contains("https://cdn.example.com/pocket.png image description: a toolpath screenshot"));

        let events = h.notifier.events.lock().unwrap();
        assert!(events
            .iter()
            .any(|(_, e)| matches!(e, RoomEvent::EmbeddingComplete)));
        assert!(events
            .iter()
            .any(|(_, e)| matches!(e, RoomEvent::RemoveThumbnails)));
    }

    #[tokio::test]
    async fn test_finalize_without_images() {
        let h = harness(false);
        h.use_case
            .handle(&request("embed-4831-embed-4831", vec![]))
            .await
            .unwrap();
        h.use_case.handle(&request("Header", vec![])).await.unwrap();
        h.use_case.handle(&request("Body", vec![])).await.unwrap();

        // Explicit finalize at stage 4 with no new image.
        let response = h.use_case.handle(&request("done", vec![])).await.unwrap();
        assert_eq!(response.message, EMBEDDED_MESSAGE);
        assert!(h.sessions.rooms.lock().unwrap().is_empty());
        assert_eq!(h.store.upserts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_input_without_session_is_invalid_flow() {
        let h = harness(false);
        let result = h.use_case.handle(&request("my header", vec![])).await;
        assert!(matches!(result, Err(EmbedSessionError::InvalidFlow(_))));
        // No session silently created.
        assert!(h.sessions.rooms.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_keyword_resets_open_session() {
        let h = harness(false);
        h.use_case
            .handle(&request("embed-4831-embed-4831", vec![]))
            .await
            .unwrap();
        h.use_case.handle(&request("Old header", vec![])).await.unwrap();

        // Keyword again: fresh start, old header gone.
        let response = h
            .use_case
            .handle(&request("embed-4831-embed-4831", vec![]))
            .await
            .unwrap();
        assert_eq!(response.message, HEADER_PROMPT);

        let stored = h.sessions.rooms.lock().unwrap().get("room-9").cloned().unwrap();
        assert_eq!(stored.stage(), SessionStage::AwaitingHeader);
        assert_eq!(stored.header(), None);
    }

    #[tokio::test]
    async fn test_expired_session_treated_as_absent() {
        let h = harness(false);
        let stale = RoomSession::from_database(
            "room-9".to_string(),
            SessionStage::AwaitingText,
            Some("old".to_string()),
            None,
            vec![],
            Utc::now() - Duration::hours(30),
        );
        h.sessions.create(&stale).await.unwrap();

        let result = h.use_case.handle(&request("some text", vec![])).await;
        assert!(matches!(result, Err(EmbedSessionError::InvalidFlow(_))));
        // The stale row was cleaned up on access.
        assert!(h.sessions.rooms.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embed_failure_keeps_session_for_retry() {
        let h = harness(true);
        h.use_case
            .handle(&request("embed-4831-embed-4831", vec![]))
            .await
            .unwrap();
        h.use_case.handle(&request("Header", vec![])).await.unwrap();
        h.use_case.handle(&request("Body", vec![])).await.unwrap();

        let result = h.use_case.handle(&request("done", vec![])).await;
        assert!(matches!(result, Err(EmbedSessionError::EmbeddingError(_))));
        assert!(h.sessions.rooms.lock().unwrap().contains_key("room-9"));

        let events = h.notifier.events.lock().unwrap();
        assert!(events.iter().any(|(_, e)| matches!(
            e,
            RoomEvent::UploadStatus { message } if message.contains("failed")
        )));
    }

    #[tokio::test]
    async fn test_opaque_urls_get_static_description() {
        let h = harness(false);
        h.use_case
            .handle(&request("embed-4831-embed-4831", vec![]))
            .await
            .unwrap();
        h.use_case.handle(&request("Header", vec![])).await.unwrap();
        h.use_case.handle(&request("Body", vec![])).await.unwrap();

        h.use_case
            .handle(&request("", vec!["https://www.linkedin.com/media/post.jpg"]))
            .await
            .unwrap();

        let upserts = h.store.upserts.lock().unwrap();
        assert!(upserts[0]
            .content
            .contains("Third-party image URL, no description fetched."));
    }

    #[test]
    fn test_opaque_url_recognition() {
        assert!(is_opaque_image_url("https://www.linkedin.com/a.jpg"));
        assert!(is_opaque_image_url("https://instagram.com/p/x.png"));
        assert!(!is_opaque_image_url("https://cdn.example.com/a.jpg"));
    }

    #[test]
    fn test_trigger_detection() {
        let h = harness(false);
        assert!(h.use_case.is_trigger("embed-4831-embed-4831"));
        assert!(h.use_case.is_trigger("  embed-4831-embed-4831 extra"));
        assert!(!h.use_case.is_trigger("how do I mill a pocket"));
    }
}

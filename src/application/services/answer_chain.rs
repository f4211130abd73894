use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::application::ports::chat_model::{ChatMessage, ChatModel};
use crate::application::ports::embedding_provider::EmbeddingProvider;
use crate::application::prompts::{self, QaPromptInputs};
use crate::application::services::history::{self, HistoryOptions};
use crate::application::services::image::ImageDescriptionService;
use crate::application::services::input_processor::{InputProcessor, ProcessedInput};
use crate::application::services::memory::MemoryService;
use crate::application::services::retriever::Retriever;
use crate::config::ChainSettings;
use crate::domain::entities::retrieved_document::sort_by_score_desc;
use crate::domain::entities::{ConversationTurn, QaRecord, RetrievedDocument};
use crate::domain::repositories::qa_repository::QaRepository;
use crate::domain::repositories::vector_repository::{VectorRecord, VectorRepository};
use crate::domain::value_objects::DocumentType;

#[derive(Debug)]
pub enum AnswerChainError {
    MemoryError(String),
    InputProcessingError(String),
    RetrievalError(String),
    GenerationError(String),
}

impl std::fmt::Display for AnswerChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerChainError::MemoryError(msg) => write!(f, "Memory error: {}", msg),
            AnswerChainError::InputProcessingError(msg) => {
                write!(f, "Input processing error: {}", msg)
            }
            AnswerChainError::RetrievalError(msg) => write!(f, "Retrieval error: {}", msg),
            AnswerChainError::GenerationError(msg) => write!(f, "Generation error: {}", msg),
        }
    }
}

impl std::error::Error for AnswerChainError {}

#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub question: String,
    pub image_urls: Vec<String>,
    pub room_id: String,
    pub user_email: String,
}

#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub answer: String,
    pub qa_id: Uuid,
    pub sources: Vec<RetrievedDocument>,
    pub language: String,
}

/// Top-level answer pipeline: contextualize, retrieve, generate, escalate
/// to vision when the evidence calls for it, persist, and stream the
/// finished answer word by word.
pub struct AnswerChain {
    retriever: Arc<Retriever>,
    answer_model: Arc<dyn ChatModel>,
    input_processor: Arc<InputProcessor>,
    image_service: Arc<ImageDescriptionService>,
    memory: Arc<MemoryService>,
    qa_repo: Arc<dyn QaRepository>,
    vector_store: Arc<dyn VectorRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    settings: ChainSettings,
}

impl AnswerChain {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        retriever: Arc<Retriever>,
        answer_model: Arc<dyn ChatModel>,
        input_processor: Arc<InputProcessor>,
        image_service: Arc<ImageDescriptionService>,
        memory: Arc<MemoryService>,
        qa_repo: Arc<dyn QaRepository>,
        vector_store: Arc<dyn VectorRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: ChainSettings,
    ) -> Self {
        Self {
            retriever,
            answer_model,
            input_processor,
            image_service,
            memory,
            qa_repo,
            vector_store,
            embedder,
            settings,
        }
    }

    pub async fn answer(
        &self,
        request: &AnswerRequest,
        token_tx: UnboundedSender<String>,
    ) -> Result<AnswerOutcome, AnswerChainError> {
        self.memory
            .ensure_session(&request.room_id, &request.user_email)
            .await
            .map_err(|e| AnswerChainError::MemoryError(e.to_string()))?;

        let qa_id = Uuid::new_v4();

        self.ensure_image_embeddings_exist(request).await;

        let raw_history = self
            .memory
            .history(&request.room_id)
            .await
            .map_err(|e| AnswerChainError::MemoryError(e.to_string()))?;
        let is_first_message = MemoryService::is_first_message(&raw_history);

        let relevant_history = history::relevant_history(
            self.embedder.as_ref(),
            &raw_history,
            &request.question,
            &HistoryOptions::default(),
        )
        .await;

        let processed = self
            .input_processor
            .process(&request.question, &relevant_history, is_first_message)
            .await
            .map_err(|e| AnswerChainError::InputProcessingError(e.to_string()))?;

        tracing::debug!(
            language = %processed.language,
            contextualized = %processed.contextualized_question,
            "Input processed"
        );

        let (_, image_description) = self
            .prepare_image_context(request, &processed, &raw_history)
            .await;
        let final_input = if image_description.is_empty() {
            processed.translated_question.clone()
        } else {
            format!(
                "{} [Image model answer: {}]",
                processed.translated_question, image_description
            )
        };

        // Retrieval runs on the contextualized question; rewriting against
        // history already happened in the consolidated call.
        let rows = self
            .retriever
            .retrieve(&processed.contextualized_question, &request.image_urls)
            .await
            .map_err(|e| AnswerChainError::RetrievalError(e.to_string()))?;

        let mut answer = self
            .generate_answer(&final_input, &relevant_history, &rows, &processed, &image_description)
            .await
            .map_err(AnswerChainError::GenerationError)?;

        // Vision-first escalation re-answers over the same retrieved set;
        // a fresh retrieval here would desynchronize the cited sources.
        if let Some(escalated) = self
            .vision_first_reanswer(&rows, &processed, &relevant_history)
            .await
        {
            answer = escalated;
        }

        let sources = self.filter_sources_for_display(&rows, &processed.language);

        if self.embedder.supports_image_input() && !request.image_urls.is_empty() {
            if let Some(vision_answer) = self
                .enhanced_vision_answer(request, &processed, &sources)
                .await
            {
                answer = vision_answer;
            }
        }

        self.persist_qa(request, qa_id, &processed, &answer, &sources)
            .await;
        self.update_memory(request, qa_id, &answer, processed.conversation_title.as_deref())
            .await;

        self.stream_answer(&answer, &token_tx).await;

        Ok(AnswerOutcome {
            answer,
            qa_id,
            sources,
            language: processed.language,
        })
    }

    /// For multimodal providers, user uploads get an image-only embedding
    /// upserted on the spot, tagged so retrieval never mistakes them for
    /// curated knowledge. Never blocks the conversation.
    async fn ensure_image_embeddings_exist(&self, request: &AnswerRequest) {
        if !self.embedder.supports_image_input() || request.image_urls.is_empty() {
            return;
        }

        let embedding = match self.embedder.embed_images(&request.image_urls).await {
            Ok(embedding) => embedding,
            Err(err) => {
                tracing::warn!("On-demand image embedding failed: {}", err);
                return;
            }
        };

        let record = VectorRecord {
            id: format!("user_image_{}", Uuid::new_v4()),
            content: format!(
                "User uploaded {} image(s) during conversation",
                request.image_urls.len()
            ),
            doc_type: DocumentType::Image,
            source: Some("chat_conversation".to_string()),
            is_public: Some(false),
            metadata: serde_json::json!({
                "image_urls": request.image_urls,
                "user_email": request.user_email,
                "room_id": request.room_id,
            }),
            embedding,
        };

        if let Err(err) = self.vector_store.upsert(&record).await {
            tracing::warn!("Failed to store on-demand image embedding: {}", err);
        }
    }

    /// Image description for non-multimodal providers: describe fresh
    /// uploads directly; for image-free turns, re-inspect historical
    /// images only when the model says the question needs another look.
    async fn prepare_image_context(
        &self,
        request: &AnswerRequest,
        processed: &ProcessedInput,
        raw_history: &[ConversationTurn],
    ) -> (String, String) {
        let mut image_description = String::new();

        if self.embedder.supports_image_input() {
            return (processed.translated_question.clone(), image_description);
        }

        if !request.image_urls.is_empty() {
            image_description = self
                .image_service
                .describe(&request.image_urls, &request.question)
                .await;
        } else {
            let history_images = match self.memory.image_urls_from_history(&request.room_id).await {
                Ok(urls) => urls,
                Err(err) => {
                    tracing::warn!("Failed to collect history images: {}", err);
                    Vec::new()
                }
            };

            if !history_images.is_empty()
                && self
                    .image_service
                    .is_question_related_to_image(
                        &processed.translated_question,
                        raw_history,
                        &image_description,
                    )
                    .await
            {
                image_description = self
                    .image_service
                    .describe(&history_images, &processed.translated_question)
                    .await;
            }
        }

        (processed.translated_question.clone(), image_description)
    }

    async fn generate_answer(
        &self,
        input: &str,
        relevant_history: &[ConversationTurn],
        rows: &[RetrievedDocument],
        processed: &ProcessedInput,
        image_description: &str,
    ) -> Result<String, String> {
        let context = render_context(rows);
        let system_prompt = prompts::qa_system_prompt(&QaPromptInputs {
            product_name: &self.settings.product_name,
            language: &processed.language,
            context: &context,
            image_description,
        });

        let mut messages = vec![ChatMessage::system(system_prompt)];
        for turn in relevant_history {
            messages.push(if turn.is_user() {
                ChatMessage::user(turn.content())
            } else {
                ChatMessage::assistant(turn.content())
            });
        }
        messages.push(ChatMessage::user(input));

        self.answer_model
            .invoke(&messages)
            .await
            .map_err(|e| e.to_string())
    }

    /// When the top hit is an image scoring above the escalation
    /// threshold, re-analyze that image against the contextualized
    /// question and regenerate over the same rows. Any failure keeps the
    /// original answer.
    async fn vision_first_reanswer(
        &self,
        rows: &[RetrievedDocument],
        processed: &ProcessedInput,
        relevant_history: &[ConversationTurn],
    ) -> Option<String> {
        let top = rows.first()?;
        if !top.metadata.doc_type.is_image()
            || top.score() <= self.settings.vision_escalation_threshold
        {
            return None;
        }

        let image_url = top.primary_image_url()?;
        tracing::info!(score = top.score(), %image_url, "Vision-first escalation triggered");

        let description = self
            .image_service
            .describe_for_escalation(&image_url, &processed.contextualized_question)
            .await?;

        match self
            .generate_answer(
                &processed.translated_question,
                relevant_history,
                rows,
                processed,
                &description,
            )
            .await
        {
            Ok(answer) => Some(answer),
            Err(err) => {
                tracing::warn!("Vision-first regeneration failed, keeping answer: {}", err);
                None
            }
        }
    }

    /// Display/persistence filtering: non-public documents are dropped,
    /// then the language-dependent noise types, then sorted by score.
    fn filter_sources_for_display(
        &self,
        rows: &[RetrievedDocument],
        language: &str,
    ) -> Vec<RetrievedDocument> {
        let is_english = language == "English";
        let mut sources: Vec<RetrievedDocument> = rows
            .iter()
            .filter(|doc| doc.metadata.is_visible_to_public())
            .filter(|doc| !doc.metadata.doc_type.is_noise_for_language(is_english))
            .cloned()
            .collect();
        sort_by_score_desc(&mut sources);
        sources
    }

    /// Enhanced vision pass for multimodal providers: answer straight from
    /// the user images plus any images the retrieved documents carry,
    /// falling back to the user images alone, and finally keeping the RAG
    /// answer.
    async fn enhanced_vision_answer(
        &self,
        request: &AnswerRequest,
        processed: &ProcessedInput,
        sources: &[RetrievedDocument],
    ) -> Option<String> {
        let mut combined = request.image_urls.clone();
        for doc in sources {
            for candidate in doc.image_candidates() {
                if !combined.contains(&candidate) {
                    combined.push(candidate);
                }
            }
        }

        let enhanced = self
            .image_service
            .answer_from_images(
                &self.settings.product_name,
                &processed.contextualized_question,
                &processed.language,
                &combined,
            )
            .await;
        if enhanced.is_some() {
            return enhanced;
        }

        tracing::warn!("Enhanced vision pass empty, trying user images only");
        self.image_service
            .answer_from_images(
                &self.settings.product_name,
                &processed.contextualized_question,
                &processed.language,
                &request.image_urls,
            )
            .await
    }

    /// Persistence is best-effort: the user already has an answer.
    async fn persist_qa(
        &self,
        request: &AnswerRequest,
        qa_id: Uuid,
        processed: &ProcessedInput,
        answer: &str,
        sources: &[RetrievedDocument],
    ) {
        let record = QaRecord::new(
            qa_id,
            request.room_id.clone(),
            request.user_email.clone(),
            request.question.clone(),
            answer.to_string(),
            processed.contextualized_question.clone(),
            sources.to_vec(),
            request.image_urls.clone(),
            processed.language.clone(),
            self.settings.model_type.clone(),
        );

        if let Err(err) = self.qa_repo.insert(&record).await {
            tracing::error!("Failed to persist QA record {}: {}", qa_id, err);
        }
    }

    async fn update_memory(
        &self,
        request: &AnswerRequest,
        qa_id: Uuid,
        answer: &str,
        title: Option<&str>,
    ) {
        if let Err(err) = self
            .memory
            .update_memory(
                &request.room_id,
                &request.question,
                answer,
                &request.image_urls,
                &request.user_email,
                qa_id,
                title,
            )
            .await
        {
            tracing::error!("Failed to update conversation memory: {}", err);
        }
    }

    /// Simulated streaming over the finished answer: all generation
    /// branches funnel through one uniform word-by-word phase.
    async fn stream_answer(&self, answer: &str, token_tx: &UnboundedSender<String>) {
        for word in answer.split(' ') {
            if token_tx.send(format!("{} ", word)).is_err() {
                // Receiver hung up; nothing left to stream to.
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(self.settings.stream_delay_ms))
                .await;
        }
    }
}

fn render_context(rows: &[RetrievedDocument]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    rows.iter()
        .enumerate()
        .map(|(index, doc)| {
            let source = doc
                .metadata
                .source
                .clone()
                .unwrap_or_else(|| format!("Document {}", index + 1));
            format!("- {}:\n{}", source, doc.page_content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

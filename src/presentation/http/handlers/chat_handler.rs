use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response, Sse},
};
use futures::stream::{self, Stream};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::application::use_cases::ask_question::{
    AskQuestionError, AskQuestionRequest, AskQuestionUseCase,
};
use crate::application::use_cases::embed_session::{
    EmbedSessionError, EmbedSessionRequest, EmbedSessionUseCase,
};
use crate::application::services::answer_chain::AnswerChainError;
use crate::presentation::http::dto::{ApiResponse, AskRequestDto, ChatStreamEvent};

/// POST /chat — answers over SSE. A keyword-prefixed question or an open
/// embedding session pre-empts normal chat handling for the room.
pub struct ChatHandler {
    ask_use_case: Arc<AskQuestionUseCase>,
    embed_use_case: Arc<EmbedSessionUseCase>,
}

impl ChatHandler {
    pub fn new(
        ask_use_case: Arc<AskQuestionUseCase>,
        embed_use_case: Arc<EmbedSessionUseCase>,
    ) -> Self {
        Self {
            ask_use_case,
            embed_use_case,
        }
    }

    pub async fn chat_stream(
        State(handler): State<Arc<ChatHandler>>,
        Json(request): Json<AskRequestDto>,
    ) -> Response {
        if request.room_id.trim().is_empty() {
            return bad_request("NO_ROOM_ID", "No roomId in the request");
        }
        if request.question.trim().is_empty() {
            return bad_request("NO_QUESTION", "No question in the request");
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel::<ChatStreamEvent>();
        let _ = event_tx.send(ChatStreamEvent::Connected {
            room_id: request.room_id.clone(),
        });

        tokio::spawn(Self::run_pipeline(handler.clone(), request, event_tx));

        let stream = stream::unfold(event_rx, |mut rx| async move {
            rx.recv()
                .await
                .map(|event| (Ok::<_, Infallible>(event.into_sse_event()), rx))
        });

        create_sse_response(stream)
    }

    async fn run_pipeline(
        handler: Arc<ChatHandler>,
        request: AskRequestDto,
        event_tx: UnboundedSender<ChatStreamEvent>,
    ) {
        let room_id = request.room_id.clone();

        let embed_mode = handler.embed_use_case.is_trigger(&request.question)
            || handler
                .embed_use_case
                .has_open_session(&room_id)
                .await
                .unwrap_or(false);

        if embed_mode {
            Self::run_embed_step(&handler, &request, &event_tx).await;
            return;
        }

        // Chain tokens are forwarded as they arrive; the channel closes
        // when the chain finishes streaming.
        let (token_tx, mut token_rx) = mpsc::unbounded_channel::<String>();
        let forward_tx = event_tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(token) = token_rx.recv().await {
                if forward_tx.send(ChatStreamEvent::Token { token }).is_err() {
                    break;
                }
            }
        });

        let result = handler
            .ask_use_case
            .execute(
                AskQuestionRequest {
                    question: request.question,
                    history: request.history,
                    room_id: room_id.clone(),
                    user_email: request.user_email,
                    image_urls: request.image_urls,
                },
                token_tx,
            )
            .await;
        let _ = forwarder.await;

        match result {
            Ok(outcome) => {
                let _ = event_tx.send(ChatStreamEvent::Complete {
                    room_id,
                    qa_id: Some(outcome.qa_id),
                    answer: outcome.answer,
                    source_docs: outcome.sources,
                });
                let _ = event_tx.send(ChatStreamEvent::Done);
            }
            Err(error) => {
                tracing::error!("Chat pipeline failed: {}", error);
                let _ = event_tx.send(ChatStreamEvent::Error {
                    message: error.to_string(),
                    code: ask_error_code(&error).to_string(),
                });
            }
        }
    }

    async fn run_embed_step(
        handler: &ChatHandler,
        request: &AskRequestDto,
        event_tx: &UnboundedSender<ChatStreamEvent>,
    ) {
        let embed_request = EmbedSessionRequest {
            question: request.question.clone(),
            room_id: request.room_id.clone(),
            image_urls: request.image_urls.clone(),
            user_email: request.user_email.clone(),
        };

        match handler.embed_use_case.handle(&embed_request).await {
            Ok(response) => {
                let _ = event_tx.send(ChatStreamEvent::Token {
                    token: response.message.clone(),
                });
                let _ = event_tx.send(ChatStreamEvent::Complete {
                    room_id: request.room_id.clone(),
                    qa_id: None,
                    answer: response.message,
                    source_docs: Vec::new(),
                });
                let _ = event_tx.send(ChatStreamEvent::Done);
            }
            Err(error) => {
                tracing::error!("Embedding step failed: {}", error);
                let _ = event_tx.send(ChatStreamEvent::Error {
                    message: error.to_string(),
                    code: embed_error_code(&error).to_string(),
                });
            }
        }
    }
}

fn ask_error_code(error: &AskQuestionError) -> &'static str {
    match error {
        AskQuestionError::ValidationError(_) => "INVALID_REQUEST",
        AskQuestionError::ChainError(chain_error) => match chain_error {
            AnswerChainError::MemoryError(_) => "MEMORY_FAILED",
            AnswerChainError::InputProcessingError(_) => "INPUT_PROCESSING_FAILED",
            AnswerChainError::RetrievalError(_) => "RETRIEVAL_FAILED",
            AnswerChainError::GenerationError(_) => "GENERATION_FAILED",
        },
    }
}

fn embed_error_code(error: &EmbedSessionError) -> &'static str {
    match error {
        EmbedSessionError::InvalidFlow(_) => "INVALID_FLOW",
        EmbedSessionError::RepositoryError(_) => "SESSION_STORE_FAILED",
        EmbedSessionError::EmbeddingError(_) => "EMBEDDING_FAILED",
    }
}

fn bad_request(code: &str, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(
            code.to_string(),
            message.to_string(),
            None,
        )),
    )
        .into_response()
}

/// SSE response with the keep-alive settings shared by every stream
/// endpoint.
pub fn create_sse_response<S>(stream: S) -> Response
where
    S: Stream<Item = Result<axum::response::sse::Event, Infallible>> + Send + 'static,
{
    Sse::new(stream)
        .keep_alive(
            axum::response::sse::KeepAlive::new()
                .interval(Duration::from_secs(30))
                .text("keep-alive"),
        )
        .into_response()
}

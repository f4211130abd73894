use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::stream;
use std::{convert::Infallible, sync::Arc};
use tokio::sync::broadcast;

use crate::application::use_cases::embed_session::{
    EmbedSessionError, EmbedSessionRequest, EmbedSessionUseCase,
};
use crate::infrastructure::notifier::BroadcastRoomNotifier;
use crate::presentation::http::dto::{ApiResponse, AskRequestDto, MessageResponseDto};
use crate::presentation::http::handlers::chat_handler::create_sse_response;

/// Direct embedding-session endpoint plus the per-room out-of-band event
/// feed.
pub struct EmbedHandler {
    embed_use_case: Arc<EmbedSessionUseCase>,
    notifier: Arc<BroadcastRoomNotifier>,
}

impl EmbedHandler {
    pub fn new(
        embed_use_case: Arc<EmbedSessionUseCase>,
        notifier: Arc<BroadcastRoomNotifier>,
    ) -> Self {
        Self {
            embed_use_case,
            notifier,
        }
    }

    pub async fn embed_step(
        State(handler): State<Arc<EmbedHandler>>,
        Json(request): Json<AskRequestDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let embed_request = EmbedSessionRequest {
            question: request.question,
            room_id: request.room_id,
            image_urls: request.image_urls,
            user_email: request.user_email,
        };

        match handler.embed_use_case.handle(&embed_request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(MessageResponseDto {
                    message: response.message,
                })),
            )),
            Err(EmbedSessionError::InvalidFlow(message)) => Ok((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(
                    "INVALID_FLOW".to_string(),
                    message,
                    None,
                )),
            )),
            Err(error) => Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(
                    "EMBED_FAILED".to_string(),
                    error.to_string(),
                    None,
                )),
            )),
        }
    }

    /// SSE feed of room events (stage updates, upload status, embedding
    /// completion).
    pub async fn room_events(
        State(handler): State<Arc<EmbedHandler>>,
        Path(room_id): Path<String>,
    ) -> Response {
        let receiver = handler.notifier.subscribe(&room_id);

        let stream = stream::unfold(receiver, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let data = serde_json::to_string(&event).unwrap_or_default();
                        let sse_event = axum::response::sse::Event::default()
                            .event(event.name())
                            .data(data);
                        return Some((Ok::<_, Infallible>(sse_event), rx));
                    }
                    // A slow consumer missed events; keep going with the
                    // live feed.
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        create_sse_response(stream)
    }
}

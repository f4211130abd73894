use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::domain::repositories::chat_history_repository::ChatHistoryRepository;
use crate::presentation::http::dto::{ApiResponse, HistoryResponseDto};

pub struct HistoryHandler {
    chat_repo: Arc<dyn ChatHistoryRepository>,
}

impl HistoryHandler {
    pub fn new(chat_repo: Arc<dyn ChatHistoryRepository>) -> Self {
        Self { chat_repo }
    }

    pub async fn room_history(
        State(handler): State<Arc<HistoryHandler>>,
        Path(room_id): Path<String>,
    ) -> Result<impl IntoResponse, StatusCode> {
        match handler.chat_repo.find_by_room_id(&room_id).await {
            Ok(Some(stored)) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(HistoryResponseDto {
                    title: stored.title,
                    turns: stored.turns,
                })),
            )),
            Ok(None) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(HistoryResponseDto {
                    title: None,
                    turns: Vec::new(),
                })),
            )),
            Err(error) => Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(
                    "HISTORY_FAILED".to_string(),
                    error.to_string(),
                    None,
                )),
            )),
        }
    }
}

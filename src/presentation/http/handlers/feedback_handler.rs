use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use crate::application::use_cases::submit_feedback::{
    SubmitFeedbackError, SubmitFeedbackRequest, SubmitFeedbackUseCase,
};
use crate::presentation::http::dto::{ApiResponse, FeedbackRequestDto, MessageResponseDto};

pub struct FeedbackHandler {
    feedback_use_case: Arc<SubmitFeedbackUseCase>,
}

impl FeedbackHandler {
    pub fn new(feedback_use_case: Arc<SubmitFeedbackUseCase>) -> Self {
        Self { feedback_use_case }
    }

    pub async fn submit_feedback(
        State(handler): State<Arc<FeedbackHandler>>,
        Json(request): Json<FeedbackRequestDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let result = handler
            .feedback_use_case
            .execute(SubmitFeedbackRequest {
                qa_id: request.qa_id,
                thumb: request.thumb,
                comment: request.comment,
            })
            .await;

        match result {
            Ok(()) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(MessageResponseDto {
                    message: "Feedback recorded".to_string(),
                })),
            )),
            Err(SubmitFeedbackError::ValidationError(message)) => Ok((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(
                    "INVALID_FEEDBACK".to_string(),
                    message,
                    None,
                )),
            )),
            Err(SubmitFeedbackError::NotFound(qa_id)) => Ok((
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(
                    "QA_NOT_FOUND".to_string(),
                    format!("No QA record for {}", qa_id),
                    None,
                )),
            )),
            Err(error) => Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(
                    "FEEDBACK_FAILED".to_string(),
                    error.to_string(),
                    None,
                )),
            )),
        }
    }
}

use axum::{Router, routing::post};
use std::sync::Arc;

use crate::presentation::http::handlers::FeedbackHandler;

pub fn feedback_routes(feedback_handler: Arc<FeedbackHandler>) -> Router {
    Router::new()
        .route("/feedback", post(FeedbackHandler::submit_feedback))
        .with_state(feedback_handler)
}

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::presentation::http::handlers::HistoryHandler;

pub fn history_routes(history_handler: Arc<HistoryHandler>) -> Router {
    Router::new()
        .route("/rooms/{room_id}/history", get(HistoryHandler::room_history))
        .with_state(history_handler)
}

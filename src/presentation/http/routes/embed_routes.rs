use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::presentation::http::handlers::EmbedHandler;

pub fn embed_routes(embed_handler: Arc<EmbedHandler>) -> Router {
    Router::new()
        .route("/embed", post(EmbedHandler::embed_step))
        .route("/rooms/{room_id}/events", get(EmbedHandler::room_events))
        .with_state(embed_handler)
}

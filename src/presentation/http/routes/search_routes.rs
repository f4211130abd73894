use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::presentation::http::handlers::SearchHandler;

pub fn search_routes(search_handler: Arc<SearchHandler>) -> Router {
    Router::new()
        .route("/search", get(SearchHandler::search_sources))
        .route("/search/by-image", post(SearchHandler::search_by_image))
        .with_state(search_handler)
}

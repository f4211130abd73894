use axum::Router;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::presentation::http::{
    handlers::{ChatHandler, EmbedHandler, FeedbackHandler, HistoryHandler, SearchHandler},
    routes::{
        chat_routes, embed_routes, feedback_routes, health_routes, history_routes, search_routes,
    },
};

pub struct HttpServer {
    chat_handler: Arc<ChatHandler>,
    embed_handler: Arc<EmbedHandler>,
    search_handler: Arc<SearchHandler>,
    feedback_handler: Arc<FeedbackHandler>,
    history_handler: Arc<HistoryHandler>,
    port: u16,
}

impl HttpServer {
    pub fn new(
        chat_handler: Arc<ChatHandler>,
        embed_handler: Arc<EmbedHandler>,
        search_handler: Arc<SearchHandler>,
        feedback_handler: Arc<FeedbackHandler>,
        history_handler: Arc<HistoryHandler>,
        port: u16,
    ) -> Self {
        Self {
            chat_handler,
            embed_handler,
            search_handler,
            feedback_handler,
            history_handler,
            port,
        }
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = Router::new()
            .merge(health_routes())
            .merge(chat_routes(self.chat_handler))
            .merge(embed_routes(self.embed_handler))
            .merge(search_routes(self.search_handler))
            .merge(feedback_routes(self.feedback_handler))
            .merge(history_routes(self.history_handler))
            .layer(cors)
            .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024)) // 10MB cap
            .layer(
                TraceLayer::new_for_http()
                    .on_request(
                        |request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                            tracing::info!(
                                "Received request: {} {}",
                                request.method(),
                                request.uri()
                            );
                        },
                    )
                    .on_response(
                        |response: &axum::http::Response<axum::body::Body>,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::info!(
                                "Response: {} (took {} ms)",
                                response.status(),
                                latency.as_millis()
                            );
                        },
                    )
                    .on_failure(
                        |error: ServerErrorsFailureClass,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::error!(
                                "Request failed: {:?} (took {} ms)",
                                error,
                                latency.as_millis()
                            );
                        },
                    ),
            );

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        tracing::info!("Listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

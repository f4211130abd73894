use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::application::services::retriever::Retriever;
use crate::application::use_cases::search_sources::{
    SearchSourcesError, SearchSourcesRequest, SearchSourcesUseCase,
};
use crate::config::RetrieverSettings;
use crate::presentation::http::dto::{
    ApiResponse, ImageSearchRequestDto, SearchRequestDto, SearchResponseDto,
};

pub struct SearchHandler {
    search_use_case: Arc<SearchSourcesUseCase>,
    retriever: Arc<Retriever>,
    retriever_settings: RetrieverSettings,
}

impl SearchHandler {
    pub fn new(
        search_use_case: Arc<SearchSourcesUseCase>,
        retriever: Arc<Retriever>,
        retriever_settings: RetrieverSettings,
    ) -> Self {
        Self {
            search_use_case,
            retriever,
            retriever_settings,
        }
    }

    pub async fn search_sources(
        State(handler): State<Arc<SearchHandler>>,
        Query(params): Query<SearchRequestDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let query = params.query.clone();
        let request = SearchSourcesRequest {
            query: params.query,
            language: params.language,
        };

        match handler.search_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(SearchResponseDto {
                    query,
                    total_results: response.results.len(),
                    results: response.results,
                })),
            )),
            Err(SearchSourcesError::ValidationError(message)) => Ok((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(
                    "INVALID_QUERY".to_string(),
                    message,
                    None,
                )),
            )),
            Err(error) => Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(
                    "SEARCH_FAILED".to_string(),
                    error.to_string(),
                    None,
                )),
            )),
        }
    }

    /// Image-to-image similarity search; empty unless the configured
    /// embedding provider is multimodal.
    pub async fn search_by_image(
        State(handler): State<Arc<SearchHandler>>,
        Json(request): Json<ImageSearchRequestDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        if request.image_urls.is_empty() {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(
                    "NO_IMAGES".to_string(),
                    "imageUrls cannot be empty".to_string(),
                    None,
                )),
            ));
        }

        let limit = request
            .limit
            .unwrap_or(handler.retriever_settings.image_search_limit);
        let min_score = request
            .min_score
            .unwrap_or(handler.retriever_settings.image_search_min_score);

        let results: Vec<_> = handler
            .retriever
            .search_by_image_similarity(&request.image_urls, limit, min_score)
            .await
            .into_iter()
            .map(|(mut doc, score)| {
                doc.metadata.score = score;
                doc
            })
            .collect();

        Ok((
            StatusCode::OK,
            Json(ApiResponse::success(SearchResponseDto {
                query: String::new(),
                total_results: results.len(),
                results,
            })),
        ))
    }
}

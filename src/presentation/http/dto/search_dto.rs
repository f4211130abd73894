use serde::{Deserialize, Serialize};

use crate::domain::entities::RetrievedDocument;

#[derive(Debug, Deserialize)]
pub struct SearchRequestDto {
    pub query: String,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponseDto {
    pub query: String,
    pub results: Vec<RetrievedDocument>,
    pub total_results: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSearchRequestDto {
    pub image_urls: Vec<String>,
    pub limit: Option<i64>,
    pub min_score: Option<f32>,
}

use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequestDto {
    pub qa_id: Uuid,
    pub thumb: Option<i16>,
    pub comment: Option<String>,
}

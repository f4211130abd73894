use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::entities::{QaRecord, RetrievedDocument};
use crate::infrastructure::database::schema::qa_records;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = qa_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct QaRecordModel {
    pub qa_id: Uuid,
    pub chatbot_id: String,
    pub room_id: String,
    pub user_email: Option<String>,
    pub question: String,
    pub answer: String,
    pub contextualized_question: String,
    pub sources: Value,
    pub image_urls: Value,
    pub language: String,
    pub model_type: String,
    pub thumb: Option<i16>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qa_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewQaRecordModel {
    pub qa_id: Uuid,
    pub chatbot_id: String,
    pub room_id: String,
    pub user_email: Option<String>,
    pub question: String,
    pub answer: String,
    pub contextualized_question: String,
    pub sources: Value,
    pub image_urls: Value,
    pub language: String,
    pub model_type: String,
    pub created_at: DateTime<Utc>,
}

impl NewQaRecordModel {
    pub fn build(record: &QaRecord, chatbot_id: &str) -> Result<Self, String> {
        Ok(Self {
            qa_id: record.qa_id(),
            chatbot_id: chatbot_id.to_string(),
            room_id: record.room_id().to_string(),
            user_email: Some(record.user_email().to_string()),
            question: record.question().to_string(),
            answer: record.answer().to_string(),
            contextualized_question: record.contextualized_question().to_string(),
            sources: serde_json::to_value(record.sources())
                .map_err(|e| format!("Failed to serialize sources: {}", e))?,
            image_urls: serde_json::to_value(record.image_urls())
                .map_err(|e| format!("Failed to serialize image urls: {}", e))?,
            language: record.language().to_string(),
            model_type: record.model_type().to_string(),
            created_at: record.created_at(),
        })
    }
}

impl TryFrom<QaRecordModel> for QaRecord {
    type Error = String;

    fn try_from(model: QaRecordModel) -> Result<Self, Self::Error> {
        let sources: Vec<RetrievedDocument> = serde_json::from_value(model.sources)
            .map_err(|e| format!("Malformed sources payload: {}", e))?;
        let image_urls: Vec<String> = serde_json::from_value(model.image_urls)
            .map_err(|e| format!("Malformed image url payload: {}", e))?;

        Ok(QaRecord::from_database(
            model.qa_id,
            model.room_id,
            model.user_email.unwrap_or_default(),
            model.question,
            model.answer,
            model.contextualized_question,
            sources,
            image_urls,
            model.language,
            model.model_type,
            model.thumb,
            model.comment,
            model.created_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::retrieved_document::DocumentMetadata;
    use crate::domain::value_objects::DocumentType;

    #[test]
    fn test_qa_record_round_trip() {
        let mut metadata = DocumentMetadata::new(DocumentType::Pdf, 0.82);
        metadata.source = Some("milling.pdf".to_string());
        let record = QaRecord::new(
            Uuid::new_v4(),
            "room-1".to_string(),
            "u@example.com".to_string(),
            "¿Cómo defino una herramienta?".to_string(),
            "Abra la tabla.".to_string(),
            "How do I define a tool?".to_string(),
            vec![RetrievedDocument::new("docs", metadata)],
            vec!["a.png".to_string()],
            "Spanish".to_string(),
            "openai".to_string(),
        );

        let new_model = NewQaRecordModel::build(&record, "bot-1").unwrap();
        let model = QaRecordModel {
            qa_id: new_model.qa_id,
            chatbot_id: new_model.chatbot_id,
            room_id: new_model.room_id,
            user_email: new_model.user_email,
            question: new_model.question,
            answer: new_model.answer,
            contextualized_question: new_model.contextualized_question,
            sources: new_model.sources,
            image_urls: new_model.image_urls,
            language: new_model.language,
            model_type: new_model.model_type,
            thumb: None,
            comment: None,
            created_at: new_model.created_at,
        };

        let restored = QaRecord::try_from(model).unwrap();
        assert_eq!(restored.question(), record.question());
        assert_eq!(restored.answer(), record.answer());
        assert_eq!(restored.sources(), record.sources());
        assert_eq!(restored.image_urls(), record.image_urls());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::RetrievedDocument;

/// One answered question. Created once per answer and immutable afterwards
/// except for the feedback fields, which arrive out-of-band keyed by
/// `qa_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    qa_id: Uuid,
    room_id: String,
    user_email: String,
    /// The question as the user typed it, untranslated.
    question: String,
    answer: String,
    /// Standalone rewrite of the question, stored for analytics.
    contextualized_question: String,
    sources: Vec<RetrievedDocument>,
    image_urls: Vec<String>,
    language: String,
    model_type: String,
    thumb: Option<i16>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl QaRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        qa_id: Uuid,
        room_id: String,
        user_email: String,
        question: String,
        answer: String,
        contextualized_question: String,
        sources: Vec<RetrievedDocument>,
        image_urls: Vec<String>,
        language: String,
        model_type: String,
    ) -> Self {
        Self {
            qa_id,
            room_id,
            user_email,
            question,
            answer,
            contextualized_question,
            sources,
            image_urls,
            language,
            model_type,
            thumb: None,
            comment: None,
            created_at: Utc::now(),
        }
    }

    /// Reconstruct a record from stored values.
    #[allow(clippy::too_many_arguments)]
    pub fn from_database(
        qa_id: Uuid,
        room_id: String,
        user_email: String,
        question: String,
        answer: String,
        contextualized_question: String,
        sources: Vec<RetrievedDocument>,
        image_urls: Vec<String>,
        language: String,
        model_type: String,
        thumb: Option<i16>,
        comment: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            qa_id,
            room_id,
            user_email,
            question,
            answer,
            contextualized_question,
            sources,
            image_urls,
            language,
            model_type,
            thumb,
            comment,
            created_at,
        }
    }

    pub fn qa_id(&self) -> Uuid {
        self.qa_id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn user_email(&self) -> &str {
        &self.user_email
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn contextualized_question(&self) -> &str {
        &self.contextualized_question
    }

    pub fn sources(&self) -> &[RetrievedDocument] {
        &self.sources
    }

    pub fn image_urls(&self) -> &[String] {
        &self.image_urls
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn thumb(&self) -> Option<i16> {
        self.thumb
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn apply_feedback(&mut self, thumb: Option<i16>, comment: Option<String>) {
        self.thumb = thumb;
        self.comment = comment;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::retrieved_document::DocumentMetadata;
    use crate::domain::value_objects::DocumentType;

    fn sample_record() -> QaRecord {
        QaRecord::new(
            Uuid::new_v4(),
            "room-1".to_string(),
            "user@example.com".to_string(),
            "¿Cómo defino una herramienta?".to_string(),
            "Abra la tabla de herramientas.".to_string(),
            "How do I define a tool in the tool table?".to_string(),
            vec![RetrievedDocument::new(
                "Tool table docs",
                DocumentMetadata::new(DocumentType::Pdf, 0.82),
            )],
            vec![],
            "Spanish".to_string(),
            "openai".to_string(),
        )
    }

    #[test]
    fn test_record_creation() {
        let record = sample_record();
        assert_eq!(record.room_id(), "room-1");
        assert_eq!(record.language(), "Spanish");
        assert_eq!(record.sources().len(), 1);
        assert_eq!(record.thumb(), None);
        assert_eq!(record.comment(), None);
    }

    #[test]
    fn test_feedback_application() {
        let mut record = sample_record();
        record.apply_feedback(Some(1), Some("helpful".to_string()));
        assert_eq!(record.thumb(), Some(1));
        assert_eq!(record.comment(), Some("helpful"));
    }
}

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use pgvector::Vector;
use serde_json::Value;

use crate::domain::entities::retrieved_document::DocumentMetadata;
use crate::domain::entities::RetrievedDocument;
use crate::domain::repositories::vector_repository::VectorRecord;
use crate::domain::value_objects::DocumentType;
use crate::infrastructure::database::schema::knowledge_vectors;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = knowledge_vectors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct KnowledgeVectorModel {
    pub id: String,
    pub chatbot_id: String,
    pub content: String,
    pub doc_type: String,
    pub source: Option<String>,
    pub is_public: Option<bool>,
    pub metadata: Value,
    pub embedding: Option<Vector>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = knowledge_vectors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewKnowledgeVectorModel {
    pub id: String,
    pub chatbot_id: String,
    pub content: String,
    pub doc_type: String,
    pub source: Option<String>,
    pub is_public: Option<bool>,
    pub metadata: Value,
    pub embedding: Option<Vector>,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeVectorModel {
    /// Flatten the row into a retrieval hit with the given similarity
    /// score.
    pub fn into_document(self, score: f32) -> RetrievedDocument {
        let mut metadata =
            DocumentMetadata::new(DocumentType::from_str_lossy(&self.doc_type), score);
        metadata.source = self.source;
        metadata.is_public = self.is_public;
        metadata.pdf_source = string_field(&self.metadata, "pdf_source");
        metadata.page_number = self.metadata.get("page_number").and_then(Value::as_i64).map(|n| n as i32);
        metadata.page_numbers = self.metadata.get("page_numbers").and_then(|value| {
            value.as_array().map(|numbers| {
                numbers
                    .iter()
                    .filter_map(Value::as_i64)
                    .map(|n| n as i32)
                    .collect()
            })
        });
        metadata.page_image_url = string_field(&self.metadata, "page_image_url");
        metadata.image_urls = self.metadata.get("image_urls").and_then(|value| {
            value.as_array().map(|urls| {
                urls.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
        });
        metadata.image = string_field(&self.metadata, "image");
        metadata.image_path = string_field(&self.metadata, "image_path");
        metadata.video_link = string_field(&self.metadata, "video_link");

        RetrievedDocument::new(self.content, metadata)
    }
}

fn string_field(metadata: &Value, key: &str) -> Option<String> {
    metadata.get(key).and_then(Value::as_str).map(str::to_string)
}

impl NewKnowledgeVectorModel {
    pub fn build(record: &VectorRecord, chatbot_id: &str) -> Self {
        Self {
            id: record.id.clone(),
            chatbot_id: chatbot_id.to_string(),
            content: record.content.clone(),
            doc_type: record.doc_type.as_str().to_string(),
            source: record.source.clone(),
            is_public: record.is_public,
            metadata: record.metadata.clone(),
            embedding: Some(Vector::from(record.embedding.clone())),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(metadata: Value) -> KnowledgeVectorModel {
        KnowledgeVectorModel {
            id: "vec-1".to_string(),
            chatbot_id: "bot-1".to_string(),
            content: "content".to_string(),
            doc_type: "pdf".to_string(),
            source: Some("milling.pdf".to_string()),
            is_public: None,
            metadata,
            embedding: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_into_document_flattens_metadata() {
        let doc = model(serde_json::json!({
            "pdf_source": "milling.pdf",
            "page_number": 12,
            "page_numbers": [12, 13],
            "page_image_url": "page.png",
            "image_urls": ["a.png", "b.png"],
            "video_link": "https://youtu.be/x",
        }))
        .into_document(0.7);

        assert_eq!(doc.score(), 0.7);
        assert_eq!(doc.metadata.doc_type, DocumentType::Pdf);
        assert_eq!(doc.metadata.page_number, Some(12));
        assert_eq!(doc.metadata.page_numbers, Some(vec![12, 13]));
        assert_eq!(doc.metadata.page_image_url, Some("page.png".to_string()));
        assert_eq!(
            doc.metadata.image_urls,
            Some(vec!["a.png".to_string(), "b.png".to_string()])
        );
        assert_eq!(doc.metadata.video_link, Some("https://youtu.be/x".to_string()));
    }

    #[test]
    fn test_unknown_doc_type_degrades_to_other() {
        let mut raw = model(serde_json::json!({}));
        raw.doc_type = "spreadsheet".to_string();
        let doc = raw.into_document(0.5);
        assert_eq!(doc.metadata.doc_type, DocumentType::Other);
    }

    #[test]
    fn test_build_from_record() {
        let record = VectorRecord {
            id: "vec-9".to_string(),
            content: "text".to_string(),
            doc_type: DocumentType::UserInput,
            source: Some("op@example.com".to_string()),
            is_public: None,
            metadata: serde_json::json!({"header": "h"}),
            embedding: vec![0.1, 0.2],
        };
        let model = NewKnowledgeVectorModel::build(&record, "bot-1");
        assert_eq!(model.doc_type, "user_input");
        assert_eq!(model.embedding.as_ref().unwrap().as_slice().len(), 2);
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::DocumentType;

/// Metadata flattened out of the vector index alongside each hit. The
/// optional image fields come from different ingest generations, which is
/// why several of them can point at the same underlying picture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub doc_type: DocumentType,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_numbers: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_link: Option<String>,
    /// Base64 payloads of the user's uploaded images, attached by the
    /// retriever so vision passes never need a second fetch. Transport
    /// only, never persisted.
    #[serde(skip)]
    pub user_image_base64: Vec<String>,
}

impl DocumentMetadata {
    pub fn new(doc_type: DocumentType, score: f32) -> Self {
        Self {
            source: None,
            doc_type,
            score,
            is_public: None,
            pdf_source: None,
            page_number: None,
            page_numbers: None,
            page_image_url: None,
            image_urls: None,
            image: None,
            image_path: None,
            video_link: None,
            user_image_base64: Vec::new(),
        }
    }

    /// Absent visibility means public; only an explicit `false` hides a
    /// document.
    pub fn is_visible_to_public(&self) -> bool {
        self.is_public != Some(false)
    }
}

/// A single retrieval hit. Produced fresh per query, never persisted as-is
/// (only its flattened metadata is stored with the Q&A record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

impl RetrievedDocument {
    pub fn new(page_content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            page_content: page_content.into(),
            metadata,
        }
    }

    pub fn score(&self) -> f32 {
        self.metadata.score
    }

    /// Image references embedded in the metadata, best candidate first:
    /// full-page render, then the url array, then the single image field,
    /// then the raw path, then the source itself for image-typed docs.
    pub fn image_candidates(&self) -> Vec<String> {
        let mut candidates = Vec::new();
        if let Some(url) = &self.metadata.page_image_url {
            candidates.push(url.clone());
        }
        if let Some(urls) = &self.metadata.image_urls {
            for url in urls {
                if !candidates.contains(url) {
                    candidates.push(url.clone());
                }
            }
        }
        if let Some(url) = &self.metadata.image {
            if !candidates.contains(url) {
                candidates.push(url.clone());
            }
        }
        if let Some(url) = &self.metadata.image_path {
            if !candidates.contains(url) {
                candidates.push(url.clone());
            }
        }
        if candidates.is_empty() && self.metadata.doc_type.is_image() {
            if let Some(source) = &self.metadata.source {
                candidates.push(source.clone());
            }
        }
        candidates
    }

    pub fn primary_image_url(&self) -> Option<String> {
        self.image_candidates().into_iter().next()
    }

    /// Short cleaned excerpt for logs and source listings.
    pub fn snippet(&self, max_length: usize) -> String {
        let cleaned = self.page_content.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.chars().count() <= max_length {
            return cleaned;
        }
        let truncated: String = cleaned.chars().take(max_length.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Sort documents by score, best first.
pub fn sort_by_score_desc(documents: &mut [RetrievedDocument]) {
    documents.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

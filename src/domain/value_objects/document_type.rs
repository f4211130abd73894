use serde::{Deserialize, Serialize};

/// Discriminator carried by every document in the knowledge index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Pdf,
    Youtube,
    Sentinel,
    Image,
    Txt,
    Other,
    Vbs,
    UserInput,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Youtube => "youtube",
            DocumentType::Sentinel => "sentinel",
            DocumentType::Image => "image",
            DocumentType::Txt => "txt",
            DocumentType::Other => "other",
            DocumentType::Vbs => "vbs",
            DocumentType::UserInput => "user_input",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(DocumentType::Pdf),
            "youtube" => Ok(DocumentType::Youtube),
            "sentinel" => Ok(DocumentType::Sentinel),
            "image" => Ok(DocumentType::Image),
            "txt" => Ok(DocumentType::Txt),
            "other" => Ok(DocumentType::Other),
            "vbs" => Ok(DocumentType::Vbs),
            "user_input" => Ok(DocumentType::UserInput),
            _ => Err(format!("Invalid document type: {}", s)),
        }
    }

    /// Lenient variant used when reading rows written by older ingest jobs.
    pub fn from_str_lossy(s: &str) -> Self {
        Self::from_str(s).unwrap_or(DocumentType::Other)
    }

    pub fn is_image(&self) -> bool {
        matches!(self, DocumentType::Image)
    }

    /// Some content types are noise depending on the query language:
    /// English queries drop `other`/`vbs`, non-English queries drop
    /// `txt`/`user_input`.
    pub fn is_noise_for_language(&self, language_is_english: bool) -> bool {
        if language_is_english {
            matches!(self, DocumentType::Other | DocumentType::Vbs)
        } else {
            matches!(self, DocumentType::Txt | DocumentType::UserInput)
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

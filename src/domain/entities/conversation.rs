use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationRole {
    User,
    Assistant,
}

/// A single turn of a room's conversation. User turns may carry image
/// attachments; assistant turns carry the qa id used to correlate
/// feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    role: ConversationRole,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    qa_id: Option<Uuid>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::User,
            content: content.into(),
            image_urls: Vec::new(),
            qa_id: None,
        }
    }

    pub fn user_with_images(content: impl Into<String>, image_urls: Vec<String>) -> Self {
        Self {
            role: ConversationRole::User,
            content: content.into(),
            image_urls,
            qa_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>, qa_id: Option<Uuid>) -> Self {
        Self {
            role: ConversationRole::Assistant,
            content: content.into(),
            image_urls: Vec::new(),
            qa_id,
        }
    }

    pub fn role(&self) -> ConversationRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn image_urls(&self) -> &[String] {
        &self.image_urls
    }

    pub fn qa_id(&self) -> Option<Uuid> {
        self.qa_id
    }

    pub fn is_user(&self) -> bool {
        self.role == ConversationRole::User
    }

    /// True for the synthetic "Hi" turn used to seed a fresh room.
    pub fn is_seed_greeting(&self) -> bool {
        self.is_user() && self.content.trim().eq_ignore_ascii_case("hi")
    }

    /// Transcript line used when a prompt needs the history as plain text.
    pub fn transcript_line(&self) -> String {
        let speaker = match self.role {
            ConversationRole::User => "User",
            ConversationRole::Assistant => "AI",
        };
        format!("{}: {}", speaker, self.content)
    }
}

/// Unique image URLs attached anywhere in the history, oldest first.
pub fn collect_image_urls(turns: &[ConversationTurn]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();
    for turn in turns {
        for url in &turn.image_urls {
            if seen.insert(url.clone()) {
                urls.push(url.clone());
            }
        }
    }
    urls
}

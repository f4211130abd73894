use async_trait::async_trait;

#[derive(Debug)]
pub enum ChatModelError {
    NetworkError(String),
    ApiError(String),
    InvalidInput(String),
    RateLimitExceeded,
    ServiceUnavailable,
}

impl std::fmt::Display for ChatModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatModelError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ChatModelError::ApiError(msg) => write!(f, "API error: {}", msg),
            ChatModelError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            ChatModelError::RateLimitExceeded => write!(f, "Rate limit exceeded"),
            ChatModelError::ServiceUnavailable => write!(f, "Service unavailable"),
        }
    }
}

impl std::error::Error for ChatModelError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Message content is a list of parts so vision calls can mix text with
/// image references.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    ImageUrl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn user_with_images(text: impl Into<String>, image_urls: &[String]) -> Self {
        let mut content = vec![ContentPart::Text(text.into())];
        for url in image_urls {
            content.push(ContentPart::ImageUrl(url.clone()));
        }
        Self {
            role: MessageRole::User,
            content,
        }
    }

    /// Concatenated text parts, ignoring image references.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::ImageUrl(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A chat-completion model invoked with a full message list and returning
/// the assistant's text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String, ChatModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_builders() {
        let message = ChatMessage::user_with_images("look at this", &["a.png".to_string()]);
        assert_eq!(message.role, MessageRole::User);
        assert_eq!(message.content.len(), 2);
        assert_eq!(message.text(), "look at this");
    }

    #[test]
    fn test_role_strings() {
        assert_eq!(MessageRole::System.as_str(), "system");
        assert_eq!(MessageRole::User.as_str(), "user");
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
    }
}

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::chat_model::{
    ChatMessage, ChatModel, ChatModelError, ContentPart,
};
use crate::config::ChatModelConfig;

#[derive(Debug, Clone)]
pub struct OpenAiClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub backoff_factor: f64,
}

impl OpenAiClientConfig {
    /// Client config for a specific model, sharing the request-level
    /// settings.
    pub fn for_model(config: &ChatModelConfig, model: &str) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: model.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: 3,
            timeout_secs: 60,
            backoff_factor: 1.5,
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: Vec<WireContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContentPart {
    Text { text: String },
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Serialize)]
struct WireImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

/// OpenAI chat-completions client; also carries vision calls via
/// image-url content parts.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    config: OpenAiClientConfig,
}

impl OpenAiChatClient {
    pub fn new(config: OpenAiClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    async fn send_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<String, ChatModelError> {
        let mut attempts = 0;
        let mut last_error = None;

        loop {
            attempts += 1;

            match self.execute_request(request).await {
                Ok(content) => return Ok(content),
                Err(error) => {
                    let retryable = matches!(
                        error,
                        ChatModelError::NetworkError(_)
                            | ChatModelError::RateLimitExceeded
                            | ChatModelError::ServiceUnavailable
                    );
                    last_error = Some(error);

                    if !retryable || attempts > self.config.max_retries {
                        break;
                    }

                    let backoff = Duration::from_millis(
                        (self.config.backoff_factor.powi(attempts as i32 - 1) * 1000.0) as u64,
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Err(last_error.unwrap_or(ChatModelError::ServiceUnavailable))
    }

    async fn execute_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<String, ChatModelError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatModelError::NetworkError(e.without_url().to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(ChatModelError::RateLimitExceeded),
            status if status.is_server_error() => {
                return Err(ChatModelError::ServiceUnavailable);
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(ChatModelError::ApiError(format!("{}: {}", status, body)));
            }
        }

        let payload = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ChatModelError::ApiError(e.to_string()))?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ChatModelError::ApiError("No completion returned".to_string()))
    }

    fn to_wire(messages: &[ChatMessage]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|message| WireMessage {
                role: message.role.as_str(),
                content: message
                    .content
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text(text) => WireContentPart::Text { text: text.clone() },
                        ContentPart::ImageUrl(url) => WireContentPart::ImageUrl {
                            image_url: WireImageUrl { url: url.clone() },
                        },
                    })
                    .collect(),
            })
            .collect()
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String, ChatModelError> {
        if messages.is_empty() {
            return Err(ChatModelError::InvalidInput("No messages".to_string()));
        }

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: Self::to_wire(messages),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        self.send_request(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_message_shapes() {
        let messages = vec![ChatMessage::user_with_images(
            "what part is this",
            &["https://cdn.example.com/a.png".to_string()],
        )];
        let wire = OpenAiChatClient::to_wire(&messages);

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[0]["content"][0]["type"], "text");
        assert_eq!(json[0]["content"][1]["type"], "image_url");
        assert_eq!(
            json[0]["content"][1]["image_url"]["url"],
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hello"));
    }
}

use std::sync::Arc;

use serde::Deserialize;

use crate::application::ports::chat_model::{ChatMessage, ChatModel};
use crate::application::prompts;
use crate::application::services::language::LanguageService;
use crate::domain::entities::ConversationTurn;

#[derive(Debug)]
pub enum InputProcessingError {
    ModelError(String),
}

impl std::fmt::Display for InputProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputProcessingError::ModelError(msg) => write!(f, "Model error: {}", msg),
        }
    }
}

impl std::error::Error for InputProcessingError {}

/// Output of the consolidated input-processing call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedInput {
    pub language: String,
    pub translated_question: String,
    pub contextualized_question: String,
    pub conversation_title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsolidatedResponse {
    detected_language: String,
    translated_question: String,
    contextualized_question: String,
    #[serde(default)]
    conversation_title: Option<String>,
}

/// One model call replacing four: language detection, translation,
/// contextualization and (first message only) title generation. A
/// transport failure is critical and propagates; a malformed payload falls
/// back to the discrete language services so the user still gets an
/// answer.
pub struct InputProcessor {
    model: Arc<dyn ChatModel>,
    language_service: Arc<LanguageService>,
    product_name: String,
}

impl InputProcessor {
    pub fn new(
        model: Arc<dyn ChatModel>,
        language_service: Arc<LanguageService>,
        product_name: impl Into<String>,
    ) -> Self {
        Self {
            model,
            language_service,
            product_name: product_name.into(),
        }
    }

    pub async fn process(
        &self,
        question: &str,
        history: &[ConversationTurn],
        is_first_message: bool,
    ) -> Result<ProcessedInput, InputProcessingError> {
        let prompt = prompts::consolidated_input_prompt(
            &self.product_name,
            question,
            history,
            is_first_message,
        );

        let response = self
            .model
            .invoke(&[ChatMessage::user(prompt)])
            .await
            .map_err(|e| InputProcessingError::ModelError(e.to_string()))?;

        let mut processed = match parse_consolidated_response(&response) {
            Some(parsed) => ProcessedInput {
                language: parsed.detected_language,
                translated_question: parsed.translated_question,
                contextualized_question: parsed.contextualized_question,
                conversation_title: parsed
                    .conversation_title
                    .filter(|title| !title.trim().is_empty()),
            },
            None => {
                tracing::warn!("Consolidated input response was not valid JSON, falling back");
                self.fallback(question).await
            }
        };

        if processed.language.trim().is_empty() {
            processed.language = "English".to_string();
        }
        if processed.translated_question.trim().is_empty() {
            processed.translated_question = question.to_string();
        }
        if processed.contextualized_question.trim().is_empty() {
            processed.contextualized_question = processed.translated_question.clone();
        }
        if is_first_message && processed.conversation_title.is_none() {
            processed.conversation_title = Some("New Chat".to_string());
        }

        Ok(processed)
    }

    /// Discrete pipeline used when the consolidated payload cannot be
    /// parsed: cached detection, best-effort translation, and the
    /// translated question standing in as its own contextualization.
    async fn fallback(&self, question: &str) -> ProcessedInput {
        let language = self.language_service.detect_language(question).await;
        let translated = if language == "English" {
            question.to_string()
        } else {
            self.language_service.translate_to_english(question).await
        };

        ProcessedInput {
            language,
            contextualized_question: translated.clone(),
            translated_question: translated,
            conversation_title: None,
        }
    }
}

fn parse_consolidated_response(raw: &str) -> Option<ConsolidatedResponse> {
    let trimmed = raw.trim();
    let without_fences = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str::<ConsolidatedResponse>(without_fences).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::chat_model::ChatModelError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct SequencedModel {
        responses: Mutex<VecDeque<Result<String, ()>>>,
    }

    impl SequencedModel {
        fn new(responses: Vec<Result<&str, ()>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
            })
        }
    }

    #[async_trait]
    impl ChatModel for SequencedModel {
        async fn invoke(&self, _messages: &[ChatMessage]) -> Result<String, ChatModelError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(()))
                .map_err(|_| ChatModelError::ServiceUnavailable)
        }
    }

    fn processor(
        main: Arc<SequencedModel>,
        fallback: Arc<SequencedModel>,
    ) -> InputProcessor {
        InputProcessor::new(
            main,
            Arc::new(LanguageService::new(fallback, "SolidCAM")),
            "SolidCAM",
        )
    }

    const SPANISH_JSON: &str = r#"{
        "detectedLanguage": "Spanish",
        "translatedQuestion": "hello, how are you",
        "contextualizedQuestion": "hello, how are you",
        "conversationTitle": "Saludo"
    }"#;

    #[tokio::test]
    async fn test_parses_strict_json() {
        let main = SequencedModel::new(vec![Ok(SPANISH_JSON)]);
        let fallback = SequencedModel::new(vec![]);
        let processed = processor(main, fallback)
            .process("hola, como estas", &[], true)
            .await
            .unwrap();

        assert_eq!(processed.language, "Spanish");
        assert_eq!(processed.translated_question, "hello, how are you");
        assert_eq!(processed.conversation_title, Some("Saludo".to_string()));
    }

    #[tokio::test]
    async fn test_parses_fenced_json() {
        let fenced = format!("```json\n{}\n```", SPANISH_JSON);
        let main = SequencedModel::new(vec![Ok(fenced.as_str())]);
        let fallback = SequencedModel::new(vec![]);
        let processed = processor(main, fallback)
            .process("hola, como estas", &[], false)
            .await
            .unwrap();

        assert_eq!(processed.language, "Spanish");
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let main = SequencedModel::new(vec![Err(())]);
        let fallback = SequencedModel::new(vec![]);
        let result = processor(main, fallback).process("hi", &[], false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_malformed_payload_falls_back_to_discrete_services() {
        let main = SequencedModel::new(vec![Ok("not json at all")]);
        // Fallback pipeline: detection then translation.
        let fallback = SequencedModel::new(vec![Ok("Spanish"), Ok("hello, how are you")]);
        let processed = processor(main, fallback)
            .process("hola, como estas", &[], false)
            .await
            .unwrap();

        assert_eq!(processed.language, "Spanish");
        assert_eq!(processed.translated_question, "hello, how are you");
        assert_eq!(processed.contextualized_question, "hello, how are you");
        assert_eq!(processed.conversation_title, None);
    }

    #[tokio::test]
    async fn test_first_message_title_fallback() {
        let json = r#"{
            "detectedLanguage": "English",
            "translatedQuestion": "hi",
            "contextualizedQuestion": "hi",
            "conversationTitle": "  "
        }"#;
        let main = SequencedModel::new(vec![Ok(json)]);
        let fallback = SequencedModel::new(vec![]);
        let processed = processor(main, fallback).process("hi", &[], true).await.unwrap();
        assert_eq!(processed.conversation_title, Some("New Chat".to_string()));
    }

    #[tokio::test]
    async fn test_empty_contextualization_defaults_to_translation() {
        let json = r#"{
            "detectedLanguage": "English",
            "translatedQuestion": "what is hsm",
            "contextualizedQuestion": ""
        }"#;
        let main = SequencedModel::new(vec![Ok(json)]);
        let fallback = SequencedModel::new(vec![]);
        let processed = processor(main, fallback)
            .process("what is hsm", &[], false)
            .await
            .unwrap();
        assert_eq!(processed.contextualized_question, "what is hsm");
    }
}

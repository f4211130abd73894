use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::application::ports::chat_model::{ChatMessage, ChatModel};
use crate::application::prompts;

const DETECTION_CACHE_KEY_CHARS: usize = 100;

/// Language detection and best-effort translation. Model failures are
/// swallowed: detection falls back to English, translation returns the
/// original text. Neither ever blocks an answer.
pub struct LanguageService {
    model: Arc<dyn ChatModel>,
    product_name: String,
    /// Detection results keyed by the text's first 100 characters. A plain
    /// memory optimization; prefix collisions between longer strings are an
    /// accepted tradeoff.
    detection_cache: Mutex<HashMap<String, String>>,
}

impl LanguageService {
    pub fn new(model: Arc<dyn ChatModel>, product_name: impl Into<String>) -> Self {
        Self {
            model,
            product_name: product_name.into(),
            detection_cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn detect_language(&self, text: &str) -> String {
        let cache_key: String = text.chars().take(DETECTION_CACHE_KEY_CHARS).collect();

        if let Ok(cache) = self.detection_cache.lock() {
            if let Some(language) = cache.get(&cache_key) {
                return language.clone();
            }
        }

        let prompt = prompts::language_detection_prompt(text);
        match self.model.invoke(&[ChatMessage::user(prompt)]).await {
            Ok(response) => {
                let language = response.trim().to_string();
                if language.is_empty() {
                    return "English".to_string();
                }
                if let Ok(mut cache) = self.detection_cache.lock() {
                    cache.insert(cache_key, language.clone());
                }
                language
            }
            Err(err) => {
                tracing::warn!("Language detection failed, defaulting to English: {}", err);
                "English".to_string()
            }
        }
    }

    pub async fn translate_to_english(&self, text: &str) -> String {
        let prompt = prompts::translation_prompt(&self.product_name, text);
        match self.model.invoke(&[ChatMessage::user(prompt)]).await {
            Ok(response) => {
                let translated = response.trim().to_string();
                if translated.is_empty() {
                    text.to_string()
                } else {
                    translated
                }
            }
            Err(err) => {
                tracing::warn!("Translation failed, keeping original text: {}", err);
                text.to_string()
            }
        }
    }
}

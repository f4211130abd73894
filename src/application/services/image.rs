use std::sync::Arc;

use crate::application::ports::chat_model::{ChatMessage, ChatModel};
use crate::application::prompts;
use crate::domain::entities::ConversationTurn;

/// Vision analysis over user-uploaded and retrieved images. Every failure
/// degrades to an empty description or a `false` answer; a vision problem
/// never blocks the response.
pub struct ImageDescriptionService {
    vision_model: Arc<dyn ChatModel>,
}

impl ImageDescriptionService {
    pub fn new(vision_model: Arc<dyn ChatModel>) -> Self {
        Self { vision_model }
    }

    /// One batched vision call describing the images in relation to the
    /// question, without answering it.
    pub async fn describe(&self, image_urls: &[String], question: &str) -> String {
        if image_urls.is_empty() {
            return String::new();
        }

        let messages = vec![
            ChatMessage::user(prompts::image_analysis_prompt()),
            ChatMessage::user_with_images(format!("Question: {}", question), image_urls),
        ];

        match self.vision_model.invoke(&messages).await {
            Ok(description) => description.trim().to_string(),
            Err(err) => {
                tracing::warn!("Image description failed: {}", err);
                String::new()
            }
        }
    }

    /// Whether a follow-up needs another look at previously discussed
    /// images, or prior answers suffice. Used to avoid re-running vision
    /// on every turn.
    pub async fn is_question_related_to_image(
        &self,
        follow_up_question: &str,
        history: &[ConversationTurn],
        image_description: &str,
    ) -> bool {
        let prompt =
            prompts::image_relation_prompt(history, image_description, follow_up_question);

        match self.vision_model.invoke(&[ChatMessage::user(prompt)]).await {
            Ok(answer) => answer.trim().to_lowercase().starts_with("yes"),
            Err(err) => {
                tracing::warn!("Image relation check failed: {}", err);
                false
            }
        }
    }

    /// Vision-first escalation: re-analyze the top retrieved image against
    /// the contextualized question. `None` leaves the existing answer
    /// untouched.
    pub async fn describe_for_escalation(
        &self,
        image_url: &str,
        contextualized_question: &str,
    ) -> Option<String> {
        let messages = vec![ChatMessage::user_with_images(
            prompts::vision_first_prompt(contextualized_question),
            &[image_url.to_string()],
        )];

        match self.vision_model.invoke(&messages).await {
            Ok(description) if !description.trim().is_empty() => {
                Some(description.trim().to_string())
            }
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("Vision-first analysis failed: {}", err);
                None
            }
        }
    }

    /// Direct vision answer over a set of images, used by the enhanced
    /// vision pass for multimodal providers.
    pub async fn answer_from_images(
        &self,
        product_name: &str,
        question: &str,
        language: &str,
        image_urls: &[String],
    ) -> Option<String> {
        if image_urls.is_empty() {
            return None;
        }

        let messages = vec![ChatMessage::user_with_images(
            prompts::enhanced_vision_prompt(product_name, question, language),
            image_urls,
        )];

        match self.vision_model.invoke(&messages).await {
            Ok(answer) if !answer.trim().is_empty() => Some(answer.trim().to_string()),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("Vision answer failed: {}", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::chat_model::ChatModelError;
    use async_trait::async_trait;

    struct ScriptedModel {
        response: Result<String, ()>,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn invoke(&self, _messages: &[ChatMessage]) -> Result<String, ChatModelError> {
            self.response
                .clone()
                .map_err(|_| ChatModelError::ServiceUnavailable)
        }
    }

    fn service(response: Result<&str, ()>) -> ImageDescriptionService {
        ImageDescriptionService::new(Arc::new(ScriptedModel {
            response: response.map(str::to_string),
        }))
    }

    #[tokio::test]
    async fn test_describe_empty_input() {
        let described = service(Ok("unused")).describe(&[], "question").await;
        assert_eq!(described, "");
    }

    #[tokio::test]
    async fn test_describe_swallows_failure() {
        let described = service(Err(()))
            .describe(&["a.png".to_string()], "question")
            .await;
        assert_eq!(described, "");
    }

    #[tokio::test]
    async fn test_relation_check_parses_yes_no() {
        assert!(
            service(Ok("Yes"))
                .is_question_related_to_image("q", &[], "")
                .await
        );
        assert!(
            !service(Ok("No"))
                .is_question_related_to_image("q", &[], "")
                .await
        );
        assert!(
            !service(Err(()))
                .is_question_related_to_image("q", &[], "")
                .await
        );
    }

    #[tokio::test]
    async fn test_escalation_returns_none_on_failure() {
        assert_eq!(
            service(Err(())).describe_for_escalation("a.png", "q").await,
            None
        );
        assert_eq!(service(Ok("  ")).describe_for_escalation("a.png", "q").await, None);
        assert_eq!(
            service(Ok("a pocket toolpath"))
                .describe_for_escalation("a.png", "q")
                .await,
            Some("a pocket toolpath".to_string())
        );
    }

    #[tokio::test]
    async fn test_answer_from_images_requires_images() {
        assert_eq!(
            service(Ok("answer"))
                .answer_from_images("SolidCAM", "q", "English", &[])
                .await,
            None
        );
        assert_eq!(
            service(Ok("answer"))
                .answer_from_images("SolidCAM", "q", "English", &["a.png".to_string()])
                .await,
            Some("answer".to_string())
        );
    }
}

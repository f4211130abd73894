//! Prompt templates and the product policies baked into them.
//!
//! Policies live as data so each one can be asserted independently instead
//! of hiding inside one opaque prompt string.

use crate::domain::entities::ConversationTurn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerPolicy {
    pub id: &'static str,
    pub text: &'static str,
}

/// Product rules applied to every generated answer, in render order.
/// `{product}` is substituted with the configured product name.
pub const ANSWER_POLICIES: &[AnswerPolicy] = &[
    AnswerPolicy {
        id: "admit-unknown",
        text: "If you do not have the information in the CONTEXT to answer a question, admit it openly without fabricating responses.",
    },
    AnswerPolicy {
        id: "stay-on-topic",
        text: "If a question or image is unrelated to {product}, kindly inform the user that your assistance is focused on {product}-related topics.",
    },
    AnswerPolicy {
        id: "links-from-context-only",
        text: "Add links in the answer only if the link appears in the CONTEXT and it is relevant to the answer. Don't make up links that do not exist in the CONTEXT.",
    },
    AnswerPolicy {
        id: "embed-context-images",
        text: "If there are any image URLs in the CONTEXT or if the image description contains a URL, you MUST include EACH image in your response using EXACTLY this markdown format: ![{product} screenshot](the_exact_image_url), without modifying the URL in any way.",
    },
    AnswerPolicy {
        id: "no-image-meta-talk",
        text: "Do not reference 'the image' or 'as shown in the image' in your response; incorporate the information from the image description directly into your answer.",
    },
    AnswerPolicy {
        id: "prefer-code-examples",
        text: "When questions involve code, scripts, or technical implementation, prioritize including code examples in your response if they exist in the CONTEXT.",
    },
    AnswerPolicy {
        id: "feedback-hint",
        text: "If the user's question is valid and there is no documentation or CONTEXT about it, let them know that they can leave feedback, and you will do your best to improve the knowledge base.",
    },
];

pub struct QaPromptInputs<'a> {
    pub product_name: &'a str,
    pub language: &'a str,
    pub context: &'a str,
    pub image_description: &'a str,
}

/// System prompt for the answer generation call.
pub fn qa_system_prompt(inputs: &QaPromptInputs<'_>) -> String {
    let mut prompt = format!(
        "You are a multilingual, helpful, and friendly assistant that can receive images but not files, \
         and respond to questions and answers in every language. Answer in the {} language. \
         You focus on helping {} users with their questions.\n\n",
        inputs.language, inputs.product_name
    );

    for policy in ANSWER_POLICIES {
        prompt.push_str("- ");
        prompt.push_str(&policy.text.replace("{product}", inputs.product_name));
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "\n=========\nCONTEXT: {}\nImage Description: {}\n=========\nAnswer in the {} language:",
        inputs.context, inputs.image_description, inputs.language
    ));
    prompt
}

/// Prompt for the single consolidated input-processing call: language
/// detection, translation, contextualization and (on first message) title
/// generation, returned as strict JSON.
pub fn consolidated_input_prompt(
    product_name: &str,
    question: &str,
    history: &[ConversationTurn],
    is_first_message: bool,
) -> String {
    let rendered_history = if history.is_empty() {
        "(none)".to_string()
    } else {
        history
            .iter()
            .map(|turn| turn.transcript_line())
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are a multilingual assistant that processes user questions for {product}. \
Analyze the user's input and return JSON with the following information:

1. Language Detection: detect the language of the user's input.
2. Translation: if not English, translate the question to English (keep the original if already English).
3. Contextualization: if chat history is provided, create a standalone version of the question that \
incorporates relevant context from the conversation history. Resolve pronouns, ellipsis and \
abbreviations against the history. If the question does not need context (e.g. \"thanks\"), return it unchanged.
4. Title Generation: generate a conversation title in the original language (only if this is the first message). \
If isFirstMessage is true you MUST return a concise title under 50 characters, falling back to \"New Chat\" \
only when nothing meaningful can be inferred.

Input:
- User Question: {question}
- Chat History: {history}
- Is First Message: {is_first}

Response format (strict JSON, no additional text):
{{
  \"detectedLanguage\": \"language_name\",
  \"translatedQuestion\": \"question_in_english\",
  \"contextualizedQuestion\": \"standalone_question_with_context\",
  \"conversationTitle\": \"title_in_original_language\"
}}",
        product = product_name,
        question = question,
        history = rendered_history,
        is_first = is_first_message,
    )
}

pub fn language_detection_prompt(text: &str) -> String {
    format!(
        "Detect the language of the following text and respond with the language name only, \
nothing else. If the language cannot be detected, respond with \"English\".\nText: \"{}\"",
        text
    )
}

pub fn translation_prompt(product_name: &str, text: &str) -> String {
    format!(
        "Translate the following text to English. Try to translate it taking into account that \
it's about {}. Return the translated text only:\nText: {}",
        product_name, text
    )
}

/// Framing for the image description call: describe, don't answer.
pub fn image_analysis_prompt() -> String {
    "Given the following question and images, provide necessary and concise data about the images \
to help answer the question. Do not try to answer the question itself. This will be passed to \
another model which needs the data about the images. Describe relevant visual elements, text, \
diagrams, UI components, or other details visible in the images that relate to the user's \
question. If there are multiple images, note any relationships or differences between them that \
might be relevant."
        .to_string()
}

pub fn image_relation_prompt(
    history: &[ConversationTurn],
    image_description: &str,
    follow_up_question: &str,
) -> String {
    let rendered_history = history
        .iter()
        .map(|turn| turn.transcript_line())
        .collect::<Vec<_>>()
        .join("\n");

    let description_part = if image_description.is_empty() {
        String::new()
    } else {
        format!("Relevant Image Description:\n{}\n", image_description)
    };

    format!(
        "You are analyzing a conversation to determine whether a follow-up question is related to \
an image previously discussed in the conversation.

Here is the chat history:
{}

{}
Here is the follow-up question:
\"{}\"

Determine if the follow-up question may be related to the image previously described in the \
conversation and if there is a need to have another look at the image to answer the question, or \
you can use previous AI answers to answer the question. Answer \"Yes\" if you must see the image \
again and \"No\" if you don't. Provide no additional commentary.",
        rendered_history, description_part, follow_up_question
    )
}

/// Prompt for re-analyzing the top retrieved image against the
/// contextualized question.
pub fn vision_first_prompt(contextualized_question: &str) -> String {
    format!(
        "Please analyze this image in relation to the user's question: \"{}\". Provide a short \
and concise description of what you see that's relevant to answering their question.",
        contextualized_question
    )
}

/// Prompt for the enhanced vision pass that answers directly from the
/// combined user and context images.
pub fn enhanced_vision_prompt(product_name: &str, question: &str, language: &str) -> String {
    format!(
        "You are a {} support assistant. Answer the user's question using the attached images \
as primary evidence, in the {} language. Question: {}",
        product_name, language, question
    )
}

pub fn embed_session_describe_prompt() -> String {
    "Please describe the image as best as you can".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered() -> String {
        qa_system_prompt(&QaPromptInputs {
            product_name: "SolidCAM",
            language: "Spanish",
            context: "ctx",
            image_description: "desc",
        })
    }

    #[test]
    fn test_every_policy_is_rendered() {
        let prompt = rendered();
        for policy in ANSWER_POLICIES {
            let expected = policy.text.replace("{product}", "SolidCAM");
            assert!(
                prompt.contains(&expected),
                "policy {} missing from rendered prompt",
                policy.id
            );
        }
    }

    #[test]
    fn test_policy_ids_are_unique() {
        let mut ids: Vec<_> = ANSWER_POLICIES.iter().map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), ANSWER_POLICIES.len());
    }

    #[test]
    fn test_qa_prompt_carries_language_and_context() {
        let prompt = rendered();
        assert!(prompt.contains("Answer in the Spanish language"));
        assert!(prompt.contains("CONTEXT: ctx"));
        assert!(prompt.contains("Image Description: desc"));
    }

    #[test]
    fn test_consolidated_prompt_flags_first_message() {
        let history = vec![ConversationTurn::user("hello")];
        let prompt = consolidated_input_prompt("SolidCAM", "and in 2023?", &history, true);
        assert!(prompt.contains("Is First Message: true"));
        assert!(prompt.contains("User: hello"));
        assert!(prompt.contains("and in 2023?"));
        assert!(prompt.contains("detectedLanguage"));
    }

    #[test]
    fn test_image_relation_prompt_omits_empty_description() {
        let prompt = image_relation_prompt(&[], "", "is it the same part?");
        assert!(!prompt.contains("Relevant Image Description"));

        let prompt = image_relation_prompt(&[], "a bracket", "is it the same part?");
        assert!(prompt.contains("Relevant Image Description:\na bracket"));
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::entities::{ConversationTurn, RetrievedDocument};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequestDto {
    pub question: String,
    #[serde(default)]
    pub history: Vec<(String, String)>,
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// Events emitted on the chat SSE stream, in protocol order:
/// `connected`, `token`*, `complete`, `done` — or `error`.
#[derive(Debug, Clone)]
pub enum ChatStreamEvent {
    Connected {
        room_id: String,
    },
    Token {
        token: String,
    },
    Complete {
        room_id: String,
        qa_id: Option<Uuid>,
        answer: String,
        source_docs: Vec<RetrievedDocument>,
    },
    Done,
    Error {
        message: String,
        code: String,
    },
}

impl ChatStreamEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChatStreamEvent::Connected { .. } => "connected",
            ChatStreamEvent::Token { .. } => "token",
            ChatStreamEvent::Complete { .. } => "complete",
            ChatStreamEvent::Done => "done",
            ChatStreamEvent::Error { .. } => "error",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            ChatStreamEvent::Connected { room_id } => serde_json::json!({ "roomId": room_id }),
            ChatStreamEvent::Token { token } => serde_json::json!({ "token": token }),
            ChatStreamEvent::Complete {
                room_id,
                qa_id,
                answer,
                source_docs,
            } => serde_json::json!({
                "roomId": room_id,
                "qaId": qa_id,
                "answer": answer,
                "sourceDocs": source_docs,
            }),
            ChatStreamEvent::Done => serde_json::json!({}),
            ChatStreamEvent::Error { message, code } => {
                serde_json::json!({ "message": message, "code": code })
            }
        }
    }

    pub fn into_sse_event(self) -> axum::response::sse::Event {
        axum::response::sse::Event::default()
            .event(self.name())
            .data(self.payload().to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponseDto {
    pub title: Option<String>,
    pub turns: Vec<ConversationTurn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_camel_case() {
        let raw = r#"{
            "question": "how do I mill a pocket",
            "history": [["q", "a"]],
            "roomId": "room-1",
            "userEmail": "u@example.com",
            "imageUrls": ["a.png"]
        }"#;
        let dto: AskRequestDto = serde_json::from_str(raw).unwrap();
        assert_eq!(dto.room_id, "room-1");
        assert_eq!(dto.image_urls, vec!["a.png"]);
        assert_eq!(dto.history.len(), 1);
    }

    #[test]
    fn test_event_payloads() {
        let event = ChatStreamEvent::Token {
            token: "hello ".to_string(),
        };
        assert_eq!(event.name(), "token");
        assert_eq!(event.payload()["token"], "hello ");

        let error = ChatStreamEvent::Error {
            message: "boom".to_string(),
            code: "CHAIN_FAILED".to_string(),
        };
        assert_eq!(error.payload()["code"], "CHAIN_FAILED");
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Out-of-band events pushed to everyone watching a room, alongside the
/// per-request response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RoomEvent {
    Token { text: String },
    StageUpdate { stage: i32 },
    UploadStatus { message: String },
    RemoveThumbnails,
    EmbeddingComplete,
}

impl RoomEvent {
    /// Wire name used by the SSE feed.
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::Token { .. } => "token",
            RoomEvent::StageUpdate { .. } => "stageUpdate",
            RoomEvent::UploadStatus { .. } => "uploadStatus",
            RoomEvent::RemoveThumbnails => "removeThumbnails",
            RoomEvent::EmbeddingComplete => "embeddingComplete",
        }
    }
}

#[async_trait]
pub trait RoomNotifier: Send + Sync {
    /// Best-effort delivery; a room with no listeners is not an error.
    async fn publish(&self, room_id: &str, event: RoomEvent);
}

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::application::ports::room_notifier::{RoomEvent, RoomNotifier};

const ROOM_CHANNEL_CAPACITY: usize = 64;

/// Per-room broadcast fan-out backing the out-of-band SSE event feed.
/// Publishing into a room nobody watches is a silent no-op.
pub struct BroadcastRoomNotifier {
    rooms: Mutex<HashMap<String, broadcast::Sender<RoomEvent>>>,
}

impl BroadcastRoomNotifier {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to a room's event feed, creating the channel on first
    /// use.
    pub fn subscribe(&self, room_id: &str) -> broadcast::Receiver<RoomEvent> {
        let mut rooms = self.rooms.lock().expect("notifier lock poisoned");
        rooms
            .entry(room_id.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

impl Default for BroadcastRoomNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomNotifier for BroadcastRoomNotifier {
    async fn publish(&self, room_id: &str, event: RoomEvent) {
        let mut rooms = self.rooms.lock().expect("notifier lock poisoned");
        let receiver_gone = match rooms.get(room_id) {
            Some(sender) => sender.send(event).is_err(),
            None => false,
        };
        if receiver_gone {
            // Last receiver is gone; drop the channel.
            rooms.remove(room_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let notifier = BroadcastRoomNotifier::new();
        let mut receiver = notifier.subscribe("room-1");

        notifier
            .publish("room-1", RoomEvent::StageUpdate { stage: 4 })
            .await;

        let event = receiver.recv().await.unwrap();
        assert_eq!(event, RoomEvent::StageUpdate { stage: 4 });
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let notifier = BroadcastRoomNotifier::new();
        notifier
            .publish("empty-room", RoomEvent::EmbeddingComplete)
            .await;
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let notifier = BroadcastRoomNotifier::new();
        let mut receiver_a = notifier.subscribe("room-a");
        let _receiver_b = notifier.subscribe("room-b");

        notifier
            .publish("room-b", RoomEvent::RemoveThumbnails)
            .await;

        assert!(receiver_a.try_recv().is_err());
    }
}

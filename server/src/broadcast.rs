use dashmap::DashMap;
use shared::{MatchId, ServerMessage};
use tokio::sync::broadcast;

pub const LOBBY_TOPIC: &str = "lobby";
const TOPIC_CAPACITY: usize = 64;

pub fn game_topic(game_id: MatchId) -> String {
    format!("game/{game_id}")
}

/// Fan-out of server messages to whoever is subscribed to a topic.
#[derive(Default)]
pub struct SnapshotHub {
    topics: DashMap<String, broadcast::Sender<ServerMessage>>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<ServerMessage> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Returns how many subscribers received the message.
    pub fn publish(&self, topic: &str, msg: ServerMessage) -> usize {
        self.topics
            .get(topic)
            .and_then(|tx| tx.send(msg).ok())
            .unwrap_or(0)
    }

    pub fn close(&self, topic: &str) {
        self.topics.remove(topic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let hub = SnapshotHub::new();
        assert_eq!(hub.publish(LOBBY_TOPIC, ServerMessage::WaitingForMatch), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let hub = SnapshotHub::new();
        let topic = game_topic(Uuid::new_v4());
        let mut a = hub.subscribe(&topic);
        let mut b = hub.subscribe(&topic);

        assert_eq!(hub.publish(&topic, ServerMessage::WaitingForMatch), 2);
        assert_eq!(hub.publish(&topic, ServerMessage::LeftQueue), 2);

        for rx in [&mut a, &mut b] {
            assert!(matches!(rx.recv().await, Ok(ServerMessage::WaitingForMatch)));
            assert!(matches!(rx.recv().await, Ok(ServerMessage::LeftQueue)));
        }
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let hub = SnapshotHub::new();
        let topic = game_topic(Uuid::new_v4());
        let mut rx = hub.subscribe(&topic);
        hub.close(&topic);
        assert!(rx.recv().await.is_err());
    }
}

use crate::error::PublishError;
use shared::CoreEvent;
use tokio::sync::mpsc;

/// Outbound side of the durable event channel.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: CoreEvent) -> Result<(), PublishError>;
}

/// Publisher backed by an in-process channel; the receiving half feeds the
/// server's own event loop.
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<CoreEvent>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: CoreEvent) -> Result<(), PublishError> {
        self.tx.send(event).map_err(|_| PublishError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PlayerDisconnected;
    use uuid::Uuid;

    #[test]
    fn test_publish_reaches_receiver() {
        let (publisher, mut rx) = ChannelPublisher::new();
        let event = CoreEvent::PlayerDisconnected(PlayerDisconnected {
            player_id: Uuid::new_v4(),
        });
        publisher.publish(event.clone()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), event);
    }

    #[test]
    fn test_publish_after_close_fails() {
        let (publisher, rx) = ChannelPublisher::new();
        drop(rx);
        let event = CoreEvent::PlayerDisconnected(PlayerDisconnected {
            player_id: Uuid::new_v4(),
        });
        assert_eq!(publisher.publish(event), Err(PublishError::ChannelClosed));
    }
}

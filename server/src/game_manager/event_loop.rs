use crate::broadcast::LOBBY_TOPIC;
use crate::game_manager::AppState;
use shared::{CoreEvent, MatchFormed, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;

impl AppState {
    /// Consumes the event channel until it closes or the server shuts down.
    pub async fn run_event_loop(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<CoreEvent>) {
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }
        tracing::info!("Event loop stopped");
    }

    pub async fn handle_event(self: &Arc<Self>, event: CoreEvent) {
        match event {
            CoreEvent::MatchFormed(event) => self.on_match_formed(event).await,
            CoreEvent::PlayerDisconnected(event) => {
                self.leave_queue(event.player_id).await;
            }
            CoreEvent::GameFinished(event) => {
                tracing::info!(
                    game_id = %event.match_id,
                    winner = ?event.winner,
                    ranked = event.ranked,
                    game_type = ?event.game_type,
                    "Game finished event"
                );
            }
        }
    }

    async fn on_match_formed(self: &Arc<Self>, event: MatchFormed) {
        tracing::info!(game_id = %event.match_id, origin = ?event.origin, "MatchFormed event received");
        match self
            .create_session(
                event.match_id,
                event.player_one,
                event.player_two,
                event.ranked,
                event.origin,
                None,
            )
            .await
        {
            Ok(snapshot) => {
                self.hub.publish(
                    LOBBY_TOPIC,
                    ServerMessage::GameUpdate(Box::new(snapshot.clone())),
                );
                self.broadcast_snapshot(&snapshot);
                if event.ranked {
                    self.schedule_no_show_check(event.match_id, event.player_one, event.player_two);
                }
            }
            Err(e) => {
                tracing::error!(game_id = %event.match_id, error = %e, "Error processing MatchFormed event");
            }
        }
    }
}

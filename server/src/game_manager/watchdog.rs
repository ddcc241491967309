use crate::error::SessionError;
use crate::game_manager::{AppState, SharedSession};
use std::sync::Arc;
use tokio::time::Instant;

impl AppState {
    /// Plays the lowest open column for every side that has held the move
    /// past the turn budget, after resending parked finish notifications.
    /// Returns how many moves were forced.
    pub async fn sweep_turn_timeouts(self: &Arc<Self>) -> usize {
        self.flush_pending_finishes().await;
        let budget = self.config.turn_budget();
        let now = Instant::now();
        let sessions: Vec<SharedSession> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut forced = 0;
        for session_lock in sessions {
            let (game_id, player_id, column, expected) = {
                let session = session_lock.read().await;
                if !session.turn_expired(budget, now) {
                    continue;
                }
                let Some(column) = session.board.lowest_open_column() else {
                    continue;
                };
                let side = session.board.next_to_move();
                (
                    session.id,
                    session.player_for(side),
                    column,
                    session.next_move_number(),
                )
            };

            match self
                .apply_move_checked(game_id, player_id, column, Some(expected))
                .await
            {
                Ok(_) => {
                    forced += 1;
                    tracing::info!(game_id = %game_id, player_id = %player_id, column, "Turn timed out, move auto-played");
                }
                Err(SessionError::StaleMove { .. } | SessionError::NotInProgress) => {
                    tracing::debug!(game_id = %game_id, "Timed out turn was resolved concurrently");
                }
                Err(e) => {
                    tracing::error!(game_id = %game_id, player_id = %player_id, column, error = %e, "Forced move failed");
                    self.rearm_turn_clock(&session_lock, expected).await;
                }
            }
        }
        forced
    }

    /// Pushes the turn start one budget into the future so a failing session
    /// is retried later instead of on every sweep.
    async fn rearm_turn_clock(&self, session_lock: &SharedSession, expected: u32) {
        let mut session = session_lock.write().await;
        if session.is_in_progress() && session.next_move_number() == expected {
            session.turn_started_at = Instant::now() + self.config.turn_budget();
            tracing::warn!(game_id = %session.id, "Turn clock re-armed after forced move failure");
        }
    }
}

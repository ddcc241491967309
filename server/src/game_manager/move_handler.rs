use crate::broadcast::game_topic;
use crate::error::SessionError;
use crate::game_manager::{AppState, MatchSession, SharedSession};
use chrono::Utc;
use ranked4_core::engine::search::AlphaBetaEngine;
use ranked4_core::engine::Searcher;
use shared::{
    CoreEvent, GameSnapshot, GameStatus, MatchId, PlayerId, ServerMessage, AI_PLAYER_ID,
};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

impl AppState {
    pub async fn apply_human_move(
        self: &Arc<Self>,
        game_id: MatchId,
        player_id: PlayerId,
        column: usize,
    ) -> Result<GameSnapshot, SessionError> {
        self.apply_move_checked(game_id, player_id, column, None)
            .await
    }

    /// Validates and applies one move. The board change, move log append and
    /// record update are committed to the store before the in-memory session
    /// changes, so a failed write leaves the session as it was.
    ///
    /// `expected_move` is the 1-based number the caller believes this move
    /// has; a mismatch is rejected as stale.
    pub async fn apply_move_checked(
        self: &Arc<Self>,
        game_id: MatchId,
        player_id: PlayerId,
        column: usize,
        expected_move: Option<u32>,
    ) -> Result<GameSnapshot, SessionError> {
        let session_lock = self
            .session(game_id)
            .ok_or(SessionError::NotFound(game_id))?;
        let mut session = session_lock.write().await;

        let side = session
            .side_of(player_id)
            .ok_or(SessionError::NotParticipant)?;
        if !session.is_in_progress() {
            return Err(SessionError::NotInProgress);
        }
        if let Some(actual) = expected_move {
            let expected = session.next_move_number();
            if actual != expected {
                return Err(SessionError::StaleMove { expected, actual });
            }
        }
        if session.board.next_to_move() != side {
            return Err(SessionError::NotYourTurn);
        }

        let mut board = session.board.clone();
        if !board.apply_move(column) {
            return Err(SessionError::InvalidMove { column });
        }

        let mv = session.move_record(side, column);
        let finished_on = Utc::now();
        let mut record = session.to_record();
        record.board_state = board.serialize();
        record.move_count = mv.sequence;
        if board.is_finished() {
            record.status = GameStatus::Finished;
            record.winner = board.winner();
            record.finished_at = Some(finished_on);
        }
        if let Err(e) = self.store.commit_move(&record, &mv) {
            tracing::warn!(game_id = %game_id, player_id = %player_id, column, error = %e, "Move rejected by store, session unchanged");
            return Err(e.into());
        }

        let now = Instant::now();
        let finished = board.is_finished();
        let winner = board.winner();
        session.board = board;
        session.move_count = mv.sequence;
        session.turn_started_at = now;
        tracing::info!(game_id = %game_id, player_id = %player_id, side = ?side, column, move_number = mv.sequence, "Move applied");

        if finished {
            session.finish(winner, now, finished_on);
            self.unbind_players(&session);
            tracing::info!(game_id = %game_id, winner = ?winner, "Game finished");
            self.publish_finished(&mut session);
        } else if session.is_ai_turn() {
            self.schedule_ai_reply(&mut session);
        }

        let snapshot = session.snapshot(self.config.turn_budget(), now);
        drop(session);

        self.broadcast_snapshot(&snapshot);
        Ok(snapshot)
    }

    /// Queues the AI's reply behind the thinking delay. Any reply still
    /// pending for this session is cancelled first.
    fn schedule_ai_reply(self: &Arc<Self>, session: &mut MatchSession) {
        let token = self.shutdown.child_token();
        if let Some(previous) = session.ai_task.replace(token.clone()) {
            previous.cancel();
        }

        let state = Arc::clone(self);
        let game_id = session.id;
        let expected = session.next_move_number();
        let delay = self.config.ai_thinking_delay();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    tracing::debug!(game_id = %game_id, "AI reply cancelled");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
            state.play_ai_turn(game_id, expected, &token).await;
        });
    }

    async fn play_ai_turn(self: &Arc<Self>, game_id: MatchId, expected: u32, token: &CancellationToken) {
        let Some(session_lock) = self.session(game_id) else {
            return;
        };
        let (board, side, difficulty) = {
            let session = session_lock.read().await;
            match session.ai_difficulty {
                Some(difficulty)
                    if session.is_ai_turn() && session.next_move_number() == expected =>
                {
                    (session.board.clone(), session.board.next_to_move(), difficulty)
                }
                _ => {
                    tracing::debug!(game_id = %game_id, "AI turn no longer pending");
                    return;
                }
            }
        };

        let engine_config = Arc::clone(&self.engine_config);
        let search = tokio::task::spawn_blocking(move || {
            AlphaBetaEngine::new(engine_config).choose_move(&board, difficulty, side)
        });
        let column = match search.await {
            Ok(Some((column, stats))) => {
                tracing::debug!(game_id = %game_id, column, depth = stats.depth, nodes = stats.nodes, random = stats.random, "AI chose move");
                column
            }
            Ok(None) => {
                tracing::warn!(game_id = %game_id, "AI found no legal move");
                return;
            }
            Err(e) => {
                tracing::error!(game_id = %game_id, error = %e, "AI search task failed");
                return;
            }
        };

        if token.is_cancelled() {
            return;
        }
        if let Err(e) = self
            .apply_move_checked(game_id, AI_PLAYER_ID, column, Some(expected))
            .await
        {
            tracing::warn!(game_id = %game_id, column, error = %e, "AI move not applied");
        }
    }

    pub(crate) fn broadcast_snapshot(&self, snapshot: &GameSnapshot) {
        self.hub.publish(
            &game_topic(snapshot.game_id),
            ServerMessage::GameUpdate(Box::new(snapshot.clone())),
        );
    }

    /// Announces a finished session while its write lock is held. The result
    /// is already durable, so a refused event is parked on the session and
    /// resent by [`AppState::flush_pending_finishes`].
    pub(crate) fn publish_finished(&self, session: &mut MatchSession) {
        let event = session.finished_event();
        if let Err(e) = self.events.publish(CoreEvent::GameFinished(event.clone())) {
            tracing::error!(game_id = %session.id, error = %e, "Failed to publish finished game, will retry");
            session.pending_finish = Some(event);
        }
    }

    /// Resends parked finish notifications. Returns how many went out.
    pub async fn flush_pending_finishes(&self) -> usize {
        let parked: Vec<SharedSession> = self
            .sessions
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .try_read()
                    .map_or(true, |session| session.pending_finish.is_some())
            })
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut sent = 0;
        for session_lock in parked {
            let mut session = session_lock.write().await;
            let Some(event) = session.pending_finish.take() else {
                continue;
            };
            match self.events.publish(CoreEvent::GameFinished(event.clone())) {
                Ok(()) => {
                    sent += 1;
                    tracing::info!(game_id = %session.id, "Parked finish notification delivered");
                }
                Err(e) => {
                    tracing::warn!(game_id = %session.id, error = %e, "Finish notification still undeliverable");
                    session.pending_finish = Some(event);
                }
            }
        }
        sent
    }
}

use crate::broadcast::game_topic;
use crate::error::SessionError;
use crate::game_manager::{AppState, MatchSession};
use crate::registry::ConnectionId;
use crate::scheduler::spawn_periodic;
use crate::store::{GameRecord, MoveRecord};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use ranked4_core::engine::Difficulty;
use shared::{
    CoreEvent, GameSnapshot, GameStatus, MatchId, Origin, PlayerDisconnected, PlayerId,
    AI_PLAYER_ID,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

impl AppState {
    /// Creates the session for `match_id`, or returns the existing one when
    /// the same match is announced again. Both seats must hold different
    /// players.
    pub async fn create_session(
        &self,
        match_id: MatchId,
        player_one: PlayerId,
        player_two: PlayerId,
        ranked: bool,
        origin: Origin,
        ai_difficulty: Option<Difficulty>,
    ) -> Result<GameSnapshot, SessionError> {
        if player_one == player_two {
            tracing::warn!(game_id = %match_id, player_id = %player_one, "Rejecting match with the same player on both sides");
            return Err(SessionError::SamePlayer);
        }
        let budget = self.config.turn_budget();
        let existing = match self.sessions.entry(match_id) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                if let Some(record) = self.store.load(match_id) {
                    tracing::debug!(game_id = %match_id, "Match already played and archived");
                    return Ok(record.snapshot());
                }

                let now = Instant::now();
                let mut session = MatchSession::new(
                    match_id,
                    player_one,
                    player_two,
                    ranked,
                    origin,
                    ai_difficulty,
                    now,
                );
                session.start(now);
                self.store.save(&session.to_record())?;

                let snapshot = session.snapshot(budget, now);
                for player in session.humans() {
                    self.player_to_game.insert(player, match_id);
                }
                entry.insert(Arc::new(RwLock::new(session)));
                tracing::info!(
                    game_id = %match_id,
                    player_one = %player_one,
                    player_two = %player_two,
                    ranked = snapshot.ranked,
                    origin = ?origin,
                    "Created new game session"
                );
                return Ok(snapshot);
            }
        };

        tracing::debug!(game_id = %match_id, "Duplicate match announcement, returning existing session");
        let session = existing.read().await;
        Ok(session.snapshot(budget, Instant::now()))
    }

    /// Starts a game against the AI. The human moves first and must not be
    /// in another live game.
    pub async fn create_pve(
        &self,
        player_id: PlayerId,
        difficulty: Difficulty,
    ) -> Result<GameSnapshot, SessionError> {
        if let Some(game_id) = self.current_game(player_id) {
            tracing::info!(player_id = %player_id, game_id = %game_id, "AI game refused: player already in a game");
            return Err(SessionError::AlreadyInGame);
        }
        self.create_session(
            Uuid::new_v4(),
            player_id,
            AI_PLAYER_ID,
            false,
            Origin::Pve,
            Some(difficulty),
        )
        .await
    }

    /// Ends the game in the opponent's favour. Already finished games are
    /// returned unchanged.
    pub async fn forfeit(
        &self,
        game_id: MatchId,
        player_id: PlayerId,
    ) -> Result<GameSnapshot, SessionError> {
        let session_lock = self
            .session(game_id)
            .ok_or(SessionError::NotFound(game_id))?;
        let mut session = session_lock.write().await;
        let budget = self.config.turn_budget();

        let side = session
            .side_of(player_id)
            .ok_or(SessionError::NotParticipant)?;
        if session.is_finished() {
            tracing::debug!(game_id = %game_id, "Forfeit ignored: game already ended");
            return Ok(session.snapshot(budget, Instant::now()));
        }

        let winner = Some(side.opposite());
        let finished_on = Utc::now();
        let mut record = session.to_record();
        record.status = GameStatus::Finished;
        record.winner = winner;
        record.finished_at = Some(finished_on);
        self.store.save(&record)?;

        let now = Instant::now();
        session.finish(winner, now, finished_on);
        self.unbind_players(&session);
        tracing::info!(game_id = %game_id, player_id = %player_id, winner = ?winner, "Game ended by forfeit");
        self.publish_finished(&mut session);

        let snapshot = session.snapshot(budget, now);
        drop(session);

        self.broadcast_snapshot(&snapshot);
        Ok(snapshot)
    }

    /// Voids a ranked game nobody finished showing up for. Other sessions are
    /// returned unchanged.
    pub async fn cancel_no_show(&self, game_id: MatchId) -> Result<GameSnapshot, SessionError> {
        let session_lock = self
            .session(game_id)
            .ok_or(SessionError::NotFound(game_id))?;
        let mut session = session_lock.write().await;
        let budget = self.config.turn_budget();
        let now = Instant::now();

        if !session.ranked || !session.is_in_progress() {
            return Ok(session.snapshot(budget, now));
        }

        let finished_on = Utc::now();
        let mut record = session.to_record();
        record.ranked = false;
        record.origin = Origin::CancelledNoShow;
        record.status = GameStatus::Finished;
        record.winner = None;
        record.finished_at = Some(finished_on);
        self.store.save(&record)?;

        session.ranked = false;
        session.origin = Origin::CancelledNoShow;
        session.finish(None, now, finished_on);
        self.unbind_players(&session);
        tracing::warn!(
            game_id = %game_id,
            age_secs = now.saturating_duration_since(session.created_at).as_secs(),
            "Cancelling ranked game due to missing player(s) after grace period"
        );

        let snapshot = session.snapshot(budget, now);
        drop(session);
        self.broadcast_snapshot(&snapshot);
        Ok(snapshot)
    }

    /// Checks once, after the grace period, that both players are watching
    /// the game.
    pub fn schedule_no_show_check(
        self: &Arc<Self>,
        game_id: MatchId,
        player_one: PlayerId,
        player_two: PlayerId,
    ) {
        let state = Arc::clone(self);
        let cancel = self.shutdown.child_token();
        let grace = self.config.no_show_grace();
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(grace) => {}
            }
            let one_connected = state.registry.is_connected_to_game(player_one, game_id);
            let two_connected = state.registry.is_connected_to_game(player_two, game_id);
            if one_connected && two_connected {
                return;
            }
            tracing::info!(game_id = %game_id, one_connected, two_connected, "No-show detected");
            if let Err(e) = state.cancel_no_show(game_id).await {
                tracing::warn!(game_id = %game_id, error = %e, "No-show cancel failed");
            }
        });
    }

    /// Connection loss: a game-bound connection forfeits its game, a lobby
    /// connection is announced so matchmaking can drop the player.
    pub async fn handle_disconnect(&self, connection_id: ConnectionId) {
        let Some(info) = self.registry.unregister(connection_id) else {
            tracing::info!(connection_id = %connection_id, "Disconnected connection was not registered");
            return;
        };

        match info.game_id {
            Some(game_id) => {
                tracing::warn!(player_id = %info.player_id, game_id = %game_id, "Player disconnected from game");
                if let Err(e) = self.forfeit(game_id, info.player_id).await {
                    tracing::warn!(game_id = %game_id, error = %e, "Unable to process forfeit");
                }
            }
            None => {
                tracing::info!(player_id = %info.player_id, "Player disconnected from lobby");
                let event = CoreEvent::PlayerDisconnected(PlayerDisconnected {
                    player_id: info.player_id,
                });
                if let Err(e) = self.events.publish(event) {
                    tracing::warn!(player_id = %info.player_id, error = %e, "Failed to announce disconnect");
                }
            }
        }
    }

    /// Drops sessions that finished at least one sweep interval ago and have
    /// no undelivered finish notification. Their records stay in the store.
    pub fn archive_finished_sessions(&self) -> usize {
        let min_age = self.config.archive_sweep_interval();
        let now = Instant::now();
        let mut archived = Vec::new();
        self.sessions.retain(|game_id, session_lock| {
            let done = session_lock.try_read().is_ok_and(|session| {
                session.pending_finish.is_none()
                    && session
                        .finished_at
                        .is_some_and(|at| now.saturating_duration_since(at) >= min_age)
            });
            if done {
                archived.push(*game_id);
            }
            !done
        });
        for game_id in &archived {
            tracing::info!(game_id = %game_id, "Archived finished game");
            self.hub.close(&game_topic(*game_id));
        }
        archived.len()
    }

    /// Current state, from the live session or else from the store.
    pub async fn snapshot(&self, game_id: MatchId) -> Result<GameSnapshot, SessionError> {
        if let Some(session_lock) = self.session(game_id) {
            let session = session_lock.read().await;
            return Ok(session.snapshot(self.config.turn_budget(), Instant::now()));
        }
        self.store
            .load(game_id)
            .map(|record| record.snapshot())
            .ok_or(SessionError::NotFound(game_id))
    }

    pub fn moves(&self, game_id: MatchId) -> Vec<MoveRecord> {
        self.store.moves(game_id)
    }

    /// Most recently finished ranked games, newest first.
    pub fn recent_ranked_games(&self) -> Vec<GameRecord> {
        self.store.recent_finished_ranked(self.config.history_limit)
    }

    /// Turn watchdog, queue staleness, lobby expiry and archival, each on its
    /// own timer.
    pub fn spawn_background_tasks(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let config = Arc::clone(&self.config);
        let watchdog = Arc::clone(self);
        let queue = Arc::clone(self);
        let lobbies = Arc::clone(self);
        let archive = Arc::clone(self);
        vec![
            spawn_periodic(
                "turn-watchdog",
                config.watchdog_interval(),
                self.shutdown.clone(),
                move || {
                    let state = Arc::clone(&watchdog);
                    async move {
                        state.sweep_turn_timeouts().await;
                    }
                },
            ),
            spawn_periodic(
                "queue-staleness",
                config.queue_sweep_interval(),
                self.shutdown.clone(),
                move || {
                    let state = Arc::clone(&queue);
                    async move {
                        state.sweep_stale_queue_entries().await;
                    }
                },
            ),
            spawn_periodic(
                "lobby-expiry",
                config.queue_sweep_interval(),
                self.shutdown.clone(),
                move || {
                    let state = Arc::clone(&lobbies);
                    async move {
                        state.sweep_expired_lobbies().await;
                    }
                },
            ),
            spawn_periodic(
                "session-archive",
                config.archive_sweep_interval(),
                self.shutdown.clone(),
                move || {
                    let state = Arc::clone(&archive);
                    async move {
                        state.archive_finished_sessions();
                    }
                },
            ),
        ]
    }
}

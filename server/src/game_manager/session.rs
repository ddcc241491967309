use crate::store::{GameRecord, MoveRecord};
use chrono::{DateTime, Utc};
use ranked4_core::engine::Difficulty;
use ranked4_core::logic::board::{Board, Side};
use shared::{
    GameFinished, GameSnapshot, GameStatus, GameType, MatchId, Origin, PlayerId, AI_PLAYER_ID,
};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct MatchSession {
    pub id: MatchId,
    pub player_one: PlayerId,
    pub player_two: PlayerId,
    pub board: Board,
    pub status: GameStatus,
    pub winner: Option<Side>,
    pub ranked: bool,
    pub origin: Origin,
    pub game_type: GameType,
    pub ai_difficulty: Option<Difficulty>,
    pub move_count: u32,
    pub turn_started_at: Instant,
    pub created_at: Instant,
    pub finished_at: Option<Instant>,
    /// Wall-clock creation and end times, for the durable record.
    pub created_on: DateTime<Utc>,
    pub finished_on: Option<DateTime<Utc>>,
    /// Pending AI reply, if one is scheduled.
    pub ai_task: Option<CancellationToken>,
    /// Finish notification the event channel refused; resent by the watchdog.
    pub pending_finish: Option<GameFinished>,
}

impl MatchSession {
    pub fn new(
        id: MatchId,
        player_one: PlayerId,
        player_two: PlayerId,
        ranked: bool,
        origin: Origin,
        ai_difficulty: Option<Difficulty>,
        now: Instant,
    ) -> Self {
        // AI games are never ranked.
        let ranked = ranked && ai_difficulty.is_none();
        Self {
            id,
            player_one,
            player_two,
            board: Board::new(),
            status: GameStatus::Created,
            winner: None,
            ranked,
            origin,
            game_type: GameType::classify(ranked, ai_difficulty),
            ai_difficulty,
            move_count: 0,
            turn_started_at: now,
            created_at: now,
            finished_at: None,
            created_on: Utc::now(),
            finished_on: None,
            ai_task: None,
            pending_finish: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.status = GameStatus::InProgress;
        self.turn_started_at = now;
    }

    pub fn side_of(&self, player_id: PlayerId) -> Option<Side> {
        if player_id == self.player_one {
            Some(Side::PlayerOne)
        } else if player_id == self.player_two {
            Some(Side::PlayerTwo)
        } else {
            None
        }
    }

    pub const fn player_for(&self, side: Side) -> PlayerId {
        match side {
            Side::PlayerOne => self.player_one,
            Side::PlayerTwo => self.player_two,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == GameStatus::InProgress
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    pub fn is_ai_turn(&self) -> bool {
        self.ai_difficulty.is_some()
            && self.is_in_progress()
            && self.player_for(self.board.next_to_move()) == AI_PLAYER_ID
    }

    pub const fn next_move_number(&self) -> u32 {
        self.move_count + 1
    }

    pub fn turn_time_remaining(&self, budget: Duration, now: Instant) -> Option<Duration> {
        self.is_in_progress()
            .then(|| budget.saturating_sub(now.saturating_duration_since(self.turn_started_at)))
    }

    pub fn turn_expired(&self, budget: Duration, now: Instant) -> bool {
        self.is_in_progress() && now.saturating_duration_since(self.turn_started_at) >= budget
    }

    /// Marks the session finished and drops any scheduled AI reply.
    pub fn finish(&mut self, winner: Option<Side>, now: Instant, finished_on: DateTime<Utc>) {
        self.status = GameStatus::Finished;
        self.winner = winner;
        self.finished_at = Some(now);
        self.finished_on = Some(finished_on);
        if let Some(task) = self.ai_task.take() {
            task.cancel();
        }
    }

    pub fn humans(&self) -> impl Iterator<Item = PlayerId> {
        [self.player_one, self.player_two]
            .into_iter()
            .filter(|&p| p != AI_PLAYER_ID)
    }

    pub fn to_record(&self) -> GameRecord {
        GameRecord {
            game_id: self.id,
            player_one: self.player_one,
            player_two: self.player_two,
            board_state: self.board.serialize(),
            status: self.status,
            winner: self.winner,
            ranked: self.ranked,
            origin: self.origin,
            game_type: self.game_type,
            ai_difficulty: self.ai_difficulty,
            move_count: self.move_count,
            created_at: self.created_on,
            finished_at: self.finished_on,
        }
    }

    pub fn move_record(&self, side: Side, column: usize) -> MoveRecord {
        MoveRecord {
            game_id: self.id,
            side,
            column,
            sequence: self.next_move_number(),
        }
    }

    pub fn snapshot(&self, budget: Duration, now: Instant) -> GameSnapshot {
        GameSnapshot {
            game_id: self.id,
            board_state: self.board.serialize(),
            status: self.status,
            next_to_move: self.board.next_to_move(),
            winner: self.winner,
            player_one: self.player_one,
            player_two: self.player_two,
            ranked: self.ranked,
            origin: self.origin,
            game_type: self.game_type,
            ai_difficulty: self.ai_difficulty,
            move_count: self.move_count,
            turn_time_remaining_secs: self
                .turn_time_remaining(budget, now)
                .map(|d| d.as_secs()),
            error: None,
        }
    }

    pub const fn finished_event(&self) -> GameFinished {
        GameFinished {
            match_id: self.id,
            player_one: self.player_one,
            player_two: self.player_two,
            winner: self.winner,
            ranked: self.ranked,
            origin: self.origin,
            game_type: self.game_type,
            ai_difficulty: self.ai_difficulty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn session(ai: Option<Difficulty>) -> MatchSession {
        let p2 = if ai.is_some() { AI_PLAYER_ID } else { Uuid::new_v4() };
        MatchSession::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            p2,
            true,
            Origin::Ranked,
            ai,
            Instant::now(),
        )
    }

    #[test]
    fn test_sides_and_players() {
        let s = session(None);
        assert_eq!(s.side_of(s.player_one), Some(Side::PlayerOne));
        assert_eq!(s.side_of(s.player_two), Some(Side::PlayerTwo));
        assert_eq!(s.side_of(Uuid::new_v4()), None);
        assert_eq!(s.player_for(Side::PlayerTwo), s.player_two);
        assert_eq!(s.game_type, GameType::PvpRanked);
        assert_eq!(s.humans().count(), 2);
    }

    #[test]
    fn test_ai_session_is_unranked_pve() {
        let mut s = session(Some(Difficulty::MEDIUM));
        assert!(!s.ranked);
        assert_eq!(s.game_type, GameType::Pve);
        assert_eq!(s.humans().collect::<Vec<_>>(), vec![s.player_one]);

        s.status = GameStatus::InProgress;
        assert!(!s.is_ai_turn());
        assert!(s.board.apply_move(3));
        assert!(s.is_ai_turn());
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_clock() {
        let mut s = session(None);
        let budget = Duration::from_secs(60);
        assert_eq!(s.turn_time_remaining(budget, Instant::now()), None);

        s.status = GameStatus::InProgress;
        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(
            s.snapshot(budget, Instant::now()).turn_time_remaining_secs,
            Some(15)
        );
        assert!(!s.turn_expired(budget, Instant::now()));

        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(s.turn_expired(budget, Instant::now()));
        assert_eq!(
            s.turn_time_remaining(budget, Instant::now()),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_finish_cancels_ai_task() {
        let mut s = session(Some(Difficulty::EASY));
        let token = CancellationToken::new();
        s.ai_task = Some(token.clone());
        s.finish(Some(Side::PlayerOne), Instant::now(), Utc::now());
        assert!(token.is_cancelled());
        assert!(s.is_finished());
        assert_eq!(s.finished_event().winner, Some(Side::PlayerOne));
        let record = s.to_record();
        assert_eq!(record.status, GameStatus::Finished);
        assert!(record.finished_at.is_some_and(|at| at >= record.created_at));
        assert_eq!(s.turn_time_remaining(Duration::from_secs(60), Instant::now()), None);
    }
}

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ranked4_core::engine::Difficulty;
use ranked4_core::logic::board::{Board, Side};
use serde::{Deserialize, Serialize};
use shared::{GameSnapshot, GameStatus, GameType, MatchId, Origin, PlayerId};

/// Durable form of a match session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: MatchId,
    pub player_one: PlayerId,
    pub player_two: PlayerId,
    pub board_state: String,
    pub status: GameStatus,
    pub winner: Option<Side>,
    pub ranked: bool,
    pub origin: Origin,
    pub game_type: GameType,
    pub ai_difficulty: Option<Difficulty>,
    pub move_count: u32,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl GameRecord {
    pub fn snapshot(&self) -> GameSnapshot {
        let board = Board::deserialize(&self.board_state);
        GameSnapshot {
            game_id: self.game_id,
            board_state: self.board_state.clone(),
            status: self.status,
            next_to_move: board.next_to_move(),
            winner: self.winner,
            player_one: self.player_one,
            player_two: self.player_two,
            ranked: self.ranked,
            origin: self.origin,
            game_type: self.game_type,
            ai_difficulty: self.ai_difficulty,
            move_count: self.move_count,
            turn_time_remaining_secs: None,
            error: None,
        }
    }
}

/// One entry of the append-only move log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub game_id: MatchId,
    pub side: Side,
    pub column: usize,
    pub sequence: u32,
}

/// Persistence seam for sessions and their move logs.
///
/// `commit_move` stores the post-move record and appends the move as one
/// unit: either both land or neither does.
pub trait GameStore: Send + Sync {
    fn save(&self, record: &GameRecord) -> Result<(), StoreError>;
    fn commit_move(&self, record: &GameRecord, mv: &MoveRecord) -> Result<(), StoreError>;
    fn load(&self, game_id: MatchId) -> Option<GameRecord>;
    fn moves(&self, game_id: MatchId) -> Vec<MoveRecord>;
    /// Finished ranked games, most recently finished first.
    fn recent_finished_ranked(&self, limit: usize) -> Vec<GameRecord>;
}

struct StoredGame {
    record: GameRecord,
    moves: Vec<MoveRecord>,
}

#[derive(Default)]
pub struct InMemoryStore {
    games: DashMap<MatchId, StoredGame>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for InMemoryStore {
    fn save(&self, record: &GameRecord) -> Result<(), StoreError> {
        self.games
            .entry(record.game_id)
            .and_modify(|stored| stored.record = record.clone())
            .or_insert_with(|| StoredGame {
                record: record.clone(),
                moves: Vec::new(),
            });
        Ok(())
    }

    fn commit_move(&self, record: &GameRecord, mv: &MoveRecord) -> Result<(), StoreError> {
        let mut stored = self
            .games
            .get_mut(&record.game_id)
            .ok_or_else(|| StoreError::Unavailable(format!("no record for {}", record.game_id)))?;

        let expected = u32::try_from(stored.moves.len()).unwrap_or(u32::MAX).saturating_add(1);
        if mv.sequence != expected {
            return Err(StoreError::SequenceConflict {
                expected,
                actual: mv.sequence,
            });
        }
        stored.moves.push(*mv);
        stored.record = record.clone();
        Ok(())
    }

    fn load(&self, game_id: MatchId) -> Option<GameRecord> {
        self.games.get(&game_id).map(|stored| stored.record.clone())
    }

    fn moves(&self, game_id: MatchId) -> Vec<MoveRecord> {
        self.games
            .get(&game_id)
            .map(|stored| stored.moves.clone())
            .unwrap_or_default()
    }

    fn recent_finished_ranked(&self, limit: usize) -> Vec<GameRecord> {
        let mut finished: Vec<GameRecord> = self
            .games
            .iter()
            .filter(|stored| {
                stored.record.ranked
                    && stored.record.status == GameStatus::Finished
                    && stored.record.finished_at.is_some()
            })
            .map(|stored| stored.record.clone())
            .collect();
        finished.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
        finished.truncate(limit);
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record(game_id: MatchId) -> GameRecord {
        GameRecord {
            game_id,
            player_one: Uuid::new_v4(),
            player_two: Uuid::new_v4(),
            board_state: Board::new().serialize(),
            status: GameStatus::InProgress,
            winner: None,
            ranked: true,
            origin: Origin::Ranked,
            game_type: GameType::PvpRanked,
            ai_difficulty: None,
            move_count: 0,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    fn mv(game_id: MatchId, sequence: u32) -> MoveRecord {
        MoveRecord {
            game_id,
            side: Side::PlayerOne,
            column: 3,
            sequence,
        }
    }

    #[test]
    fn test_move_log_is_strictly_increasing() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        store.save(&record(id)).unwrap();

        store.commit_move(&record(id), &mv(id, 1)).unwrap();
        assert_eq!(
            store.commit_move(&record(id), &mv(id, 1)),
            Err(StoreError::SequenceConflict {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            store.commit_move(&record(id), &mv(id, 3)),
            Err(StoreError::SequenceConflict {
                expected: 2,
                actual: 3
            })
        );
        store.commit_move(&record(id), &mv(id, 2)).unwrap();

        let sequences: Vec<u32> = store.moves(id).iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[test]
    fn test_rejected_commit_keeps_previous_record() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        let original = record(id);
        store.save(&original).unwrap();

        let mut changed = original.clone();
        changed.move_count = 5;
        assert!(store.commit_move(&changed, &mv(id, 9)).is_err());
        assert_eq!(store.load(id), Some(original));
    }

    #[test]
    fn test_commit_without_record_fails() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.commit_move(&record(id), &mv(id, 1)),
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.moves(id).is_empty());
    }

    #[test]
    fn test_recent_finished_ranked() {
        let store = InMemoryStore::new();
        let start = Utc::now();
        let mut ids = Vec::new();
        for minutes in 0..7 {
            let mut finished = record(Uuid::new_v4());
            finished.status = GameStatus::Finished;
            finished.finished_at = Some(start + chrono::Duration::minutes(minutes));
            store.save(&finished).unwrap();
            ids.push(finished.game_id);
        }

        let mut unranked = record(Uuid::new_v4());
        unranked.ranked = false;
        unranked.status = GameStatus::Finished;
        unranked.finished_at = Some(start + chrono::Duration::hours(1));
        store.save(&unranked).unwrap();
        store.save(&record(Uuid::new_v4())).unwrap();

        let recent: Vec<MatchId> = store
            .recent_finished_ranked(5)
            .iter()
            .map(|r| r.game_id)
            .collect();
        let expected: Vec<MatchId> = ids.iter().rev().take(5).copied().collect();
        assert_eq!(recent, expected);
        assert!(store.recent_finished_ranked(0).is_empty());
    }

    #[test]
    fn test_snapshot_from_record() {
        let id = Uuid::new_v4();
        let snapshot = record(id).snapshot();
        assert_eq!(snapshot.game_id, id);
        assert_eq!(snapshot.board_state.len(), 42);
        assert_eq!(snapshot.next_to_move, Side::PlayerOne);
        assert_eq!(snapshot.turn_time_remaining_secs, None);
    }
}

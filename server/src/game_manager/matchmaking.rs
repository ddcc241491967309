use crate::error::MatchmakingError;
use crate::game_manager::AppState;
use shared::{CoreEvent, MatchFormed, MatchId, Origin, PlayerId};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub player_id: PlayerId,
    pub elo: u32,
    pub enqueued_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Queued,
    Paired {
        match_id: MatchId,
        opponent_id: PlayerId,
    },
}

/// Entries ordered by rating for range lookups, with a reverse index by player.
#[derive(Default)]
struct Pool {
    by_elo: BTreeMap<(u32, PlayerId), QueueEntry>,
    by_player: HashMap<PlayerId, u32>,
}

impl Pool {
    fn insert(&mut self, entry: QueueEntry) {
        self.remove(entry.player_id);
        self.by_player.insert(entry.player_id, entry.elo);
        self.by_elo.insert((entry.elo, entry.player_id), entry);
    }

    fn remove(&mut self, player_id: PlayerId) -> Option<QueueEntry> {
        let elo = self.by_player.remove(&player_id)?;
        self.by_elo.remove(&(elo, player_id))
    }

    /// Closest rating first, then longest waiting.
    fn best_candidate(&self, player_id: PlayerId, elo: u32, range: u32) -> Option<QueueEntry> {
        let lo = (elo.saturating_sub(range), Uuid::nil());
        let hi = (elo.saturating_add(range), Uuid::from_u128(u128::MAX));
        self.by_elo
            .range(lo..=hi)
            .map(|(_, entry)| *entry)
            .filter(|entry| entry.player_id != player_id)
            .min_by_key(|entry| (entry.elo.abs_diff(elo), entry.enqueued_at, entry.player_id))
    }
}

pub struct MatchmakingQueue {
    pool: Mutex<Pool>,
    elo_range: u32,
    staleness: Duration,
}

impl MatchmakingQueue {
    pub fn new(elo_range: u32, staleness: Duration) -> Self {
        Self {
            pool: Mutex::new(Pool::default()),
            elo_range,
            staleness,
        }
    }

    /// Removes and returns a compatible opponent, or queues the requester.
    /// Lookup and removal happen under one lock.
    pub async fn pair_or_enqueue(
        &self,
        player_id: PlayerId,
        elo: u32,
        now: Instant,
    ) -> Option<QueueEntry> {
        let mut pool = self.pool.lock().await;
        pool.remove(player_id);

        if let Some(opponent) = pool.best_candidate(player_id, elo, self.elo_range) {
            pool.remove(opponent.player_id);
            return Some(opponent);
        }

        pool.insert(QueueEntry {
            player_id,
            elo,
            enqueued_at: now,
        });
        None
    }

    /// Puts back an entry whose match could not be announced.
    pub async fn restore(&self, entry: QueueEntry) {
        self.pool.lock().await.insert(entry);
    }

    pub async fn leave(&self, player_id: PlayerId) -> bool {
        self.pool.lock().await.remove(player_id).is_some()
    }

    pub async fn sweep_stale(&self, now: Instant) -> Vec<PlayerId> {
        let mut pool = self.pool.lock().await;
        let stale: Vec<PlayerId> = pool
            .by_elo
            .values()
            .filter(|e| now.saturating_duration_since(e.enqueued_at) > self.staleness)
            .map(|e| e.player_id)
            .collect();
        for player_id in &stale {
            pool.remove(*player_id);
        }
        stale
    }

    #[cfg(test)]
    pub async fn contains(&self, player_id: PlayerId) -> bool {
        self.pool.lock().await.by_player.contains_key(&player_id)
    }

    pub async fn len(&self) -> usize {
        self.pool.lock().await.by_player.len()
    }
}

impl AppState {
    pub async fn join_queue(&self, player_id: PlayerId) -> Result<JoinOutcome, MatchmakingError> {
        if let Some(game_id) = self.current_game(player_id) {
            tracing::warn!(player_id = %player_id, game_id = %game_id, "Player already in game, ignoring queue join");
            return Err(MatchmakingError::AlreadyInGame);
        }

        let elo = self.ratings.rating(player_id);
        let Some(opponent) = self
            .queue
            .pair_or_enqueue(player_id, elo, Instant::now())
            .await
        else {
            let queue_size = self.queue.len().await;
            tracing::info!(player_id = %player_id, elo, queue_size, "No opponent found, adding to queue");
            return Ok(JoinOutcome::Queued);
        };

        let match_id = Uuid::new_v4();
        let (player_one, player_two) = if rand::random() {
            (player_id, opponent.player_id)
        } else {
            (opponent.player_id, player_id)
        };

        let event = CoreEvent::MatchFormed(MatchFormed {
            match_id,
            player_one,
            player_two,
            ranked: true,
            origin: Origin::Ranked,
        });
        if let Err(e) = self.events.publish(event) {
            tracing::error!(player_id = %player_id, opponent_id = %opponent.player_id, error = %e, "Failed to publish match, restoring opponent");
            self.queue.restore(opponent).await;
            return Err(e.into());
        }

        tracing::info!(
            match_id = %match_id,
            player_id = %player_id,
            opponent_id = %opponent.player_id,
            elo,
            opponent_elo = opponent.elo,
            "Opponent found, match formed"
        );
        Ok(JoinOutcome::Paired {
            match_id,
            opponent_id: opponent.player_id,
        })
    }

    pub async fn leave_queue(&self, player_id: PlayerId) -> bool {
        let removed = self.queue.leave(player_id).await;
        if removed {
            tracing::info!(player_id = %player_id, "Player removed from matchmaking queue");
        }
        removed
    }

    pub async fn sweep_stale_queue_entries(&self) -> usize {
        let removed = self.queue.sweep_stale(Instant::now()).await;
        for player_id in &removed {
            tracing::info!(player_id = %player_id, "Stale queue entry removed");
        }
        removed.len()
    }
}

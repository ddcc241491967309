use crate::broadcast::SnapshotHub;
use crate::config::ServerConfig;
use crate::events::EventPublisher;
use crate::ratings::RatingLookup;
use crate::registry::SessionRegistry;
use crate::store::GameStore;
use dashmap::DashMap;
use ranked4_core::engine::config::EngineConfig;
use shared::{MatchId, PlayerId};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

pub mod event_loop;
pub mod lifecycle;
pub mod matchmaking;
pub mod move_handler;
pub mod private_lobby;
pub mod session;
pub mod watchdog;

pub use matchmaking::{JoinOutcome, MatchmakingQueue};
pub use private_lobby::LobbyManager;
pub use session::MatchSession;

pub type SharedSession = Arc<RwLock<MatchSession>>;

pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub engine_config: Arc<EngineConfig>,
    pub sessions: DashMap<MatchId, SharedSession>,
    pub player_to_game: DashMap<PlayerId, MatchId>,
    pub registry: SessionRegistry,
    pub queue: MatchmakingQueue,
    pub lobbies: LobbyManager,
    pub hub: SnapshotHub,
    pub store: Arc<dyn GameStore>,
    pub events: Arc<dyn EventPublisher>,
    pub ratings: Arc<dyn RatingLookup>,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn GameStore>,
        events: Arc<dyn EventPublisher>,
        ratings: Arc<dyn RatingLookup>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            engine_config: Arc::new(config.engine.clone()),
            queue: MatchmakingQueue::new(config.elo_range, config.queue_staleness()),
            lobbies: LobbyManager::new(config.lobby_code_length, config.lobby_ttl()),
            config,
            sessions: DashMap::new(),
            player_to_game: DashMap::new(),
            registry: SessionRegistry::new(),
            hub: SnapshotHub::new(),
            store,
            events,
            ratings,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn session(&self, game_id: MatchId) -> Option<SharedSession> {
        self.sessions.get(&game_id).map(|s| Arc::clone(s.value()))
    }

    /// The live game `player_id` is currently playing, if any.
    pub fn current_game(&self, player_id: PlayerId) -> Option<MatchId> {
        self.player_to_game.get(&player_id).map(|g| *g.value())
    }

    fn unbind_players(&self, session: &MatchSession) {
        for player in session.humans() {
            self.player_to_game
                .remove_if(&player, |_, game_id| *game_id == session.id);
        }
    }
}

use dashmap::DashMap;
use shared::{MatchId, PlayerId};
use uuid::Uuid;

pub type ConnectionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub player_id: PlayerId,
    pub game_id: Option<MatchId>,
}

/// Live connections, each optionally bound to the game it is watching.
#[derive(Default)]
pub struct SessionRegistry {
    connections: DashMap<ConnectionId, ConnectionInfo>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: ConnectionId, player_id: PlayerId) {
        tracing::info!(connection_id = %connection_id, player_id = %player_id, "Registering lobby connection");
        self.connections.entry(connection_id).or_insert(ConnectionInfo {
            player_id,
            game_id: None,
        });
    }

    pub fn bind_game(&self, connection_id: ConnectionId, player_id: PlayerId, game_id: MatchId) {
        match self.connections.get_mut(&connection_id) {
            Some(mut info) if info.player_id == player_id => {
                tracing::info!(connection_id = %connection_id, game_id = %game_id, "Binding connection to game");
                info.game_id = Some(game_id);
            }
            _ => {
                tracing::warn!(connection_id = %connection_id, player_id = %player_id, game_id = %game_id, "Direct registration of game connection");
                self.connections.insert(
                    connection_id,
                    ConnectionInfo {
                        player_id,
                        game_id: Some(game_id),
                    },
                );
            }
        }
    }

    pub fn unregister(&self, connection_id: ConnectionId) -> Option<ConnectionInfo> {
        let removed = self.connections.remove(&connection_id).map(|(_, info)| info);
        if let Some(info) = &removed {
            tracing::info!(connection_id = %connection_id, player_id = %info.player_id, "Connection removed from registry");
        }
        removed
    }

    pub fn is_connected_to_game(&self, player_id: PlayerId, game_id: MatchId) -> bool {
        self.connections
            .iter()
            .any(|c| c.player_id == player_id && c.game_id == Some(game_id))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_bind_and_unregister() {
        let registry = SessionRegistry::new();
        let (conn, player, game) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        registry.register(conn, player);
        assert!(!registry.is_connected_to_game(player, game));

        registry.bind_game(conn, player, game);
        assert!(registry.is_connected_to_game(player, game));

        let info = registry.unregister(conn).unwrap();
        assert_eq!(info.game_id, Some(game));
        assert!(registry.unregister(conn).is_none());
        assert!(!registry.is_connected_to_game(player, game));
    }

    #[test]
    fn test_bind_for_foreign_connection_replaces_entry() {
        let registry = SessionRegistry::new();
        let (conn, p1, p2, game) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        registry.register(conn, p1);
        registry.bind_game(conn, p2, game);
        assert!(registry.is_connected_to_game(p2, game));
        assert!(!registry.is_connected_to_game(p1, game));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_churn() {
        let registry = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let conn = Uuid::new_v4();
                        registry.register(conn, Uuid::new_v4());
                        registry.bind_game(conn, Uuid::new_v4(), Uuid::new_v4());
                        registry.unregister(conn);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(registry.is_empty());
    }
}

use crate::broadcast::{game_topic, LOBBY_TOPIC};
use crate::game_manager::private_lobby::lobby_topic;
use crate::game_manager::{AppState, JoinOutcome};
use crate::registry::ConnectionId;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use dashmap::DashSet;
use ranked4_core::logic::board::Side;
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use shared::{GameMessage, MatchId, PlayerId, ServerMessage, AI_PLAYER_ID};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type Tx = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub player_id: PlayerId,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.player_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, player_id: PlayerId) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Forward messages from the channel to the WebSocket
    let forwarder = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode server message");
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let conn = Connection {
        connection_id: Uuid::new_v4(),
        player_id,
        state: Arc::clone(&state),
        tx,
        cancel: state.shutdown.child_token(),
        watched: Arc::new(DashSet::new()),
    };
    state.registry.register(conn.connection_id, player_id);
    conn.listen_for_matches();

    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<GameMessage>(&text) {
                Ok(game_msg) => conn.dispatch(game_msg).await,
                Err(e) => conn.send(ServerMessage::Error(format!("Malformed message: {e}"))),
            }
        }
    }

    // Client disconnected
    conn.cancel.cancel();
    state.handle_disconnect(conn.connection_id).await;
    forwarder.abort();
}

#[derive(Clone)]
struct Connection {
    connection_id: ConnectionId,
    player_id: PlayerId,
    state: Arc<AppState>,
    tx: Tx,
    cancel: CancellationToken,
    watched: Arc<DashSet<MatchId>>,
}

impl Connection {
    fn send(&self, msg: ServerMessage) {
        let _ = self.tx.send(msg);
    }

    async fn dispatch(&self, msg: GameMessage) {
        let state = &self.state;
        match msg {
            GameMessage::FindMatch => match state.join_queue(self.player_id).await {
                Ok(JoinOutcome::Queued) => self.send(ServerMessage::WaitingForMatch),
                // MatchFound follows through the lobby topic.
                Ok(JoinOutcome::Paired { .. }) => {}
                Err(e) => self.send(ServerMessage::Error(e.to_string())),
            },
            GameMessage::CancelFindMatch => {
                state.leave_queue(self.player_id).await;
                self.send(ServerMessage::LeftQueue);
            }
            GameMessage::PlayAi { difficulty } => {
                match state.create_pve(self.player_id, difficulty).await {
                    Ok(snapshot) => {
                        self.send(ServerMessage::MatchFound {
                            game_id: snapshot.game_id,
                            opponent_id: AI_PLAYER_ID,
                            your_side: Side::PlayerOne,
                            origin: snapshot.origin,
                        });
                        self.watch_game(snapshot.game_id).await;
                    }
                    Err(e) => self.send(ServerMessage::Error(e.to_string())),
                }
            }
            GameMessage::JoinGame { game_id } => self.watch_game(game_id).await,
            GameMessage::MakeMove {
                game_id,
                column,
                move_number,
            } => {
                let result = match move_number {
                    Some(number) => {
                        state
                            .apply_move_checked(game_id, self.player_id, column, Some(number))
                            .await
                    }
                    None => state.apply_human_move(game_id, self.player_id, column).await,
                };
                if let Err(e) = result {
                    match state.snapshot(game_id).await {
                        Ok(snapshot) => self.send(ServerMessage::GameUpdate(Box::new(
                            snapshot.with_error(e.to_string()),
                        ))),
                        Err(_) => self.send(ServerMessage::Error(e.to_string())),
                    }
                }
            }
            GameMessage::Surrender { game_id } => {
                if let Err(e) = state.forfeit(game_id, self.player_id).await {
                    self.send(ServerMessage::Error(e.to_string()));
                }
            }
            GameMessage::CreatePrivateLobby => match state.create_lobby(self.player_id).await {
                Ok(view) => {
                    self.follow(state.hub.subscribe(&lobby_topic(&view.code)));
                    self.send(ServerMessage::LobbyUpdate(view));
                }
                Err(e) => self.send(ServerMessage::Error(e.to_string())),
            },
            GameMessage::JoinPrivateLobby { code } => match state.join_lobby(self.player_id, &code).await {
                Ok(view) => {
                    self.follow(state.hub.subscribe(&lobby_topic(&view.code)));
                    self.send(ServerMessage::LobbyUpdate(view));
                }
                Err(e) => self.send(ServerMessage::Error(e.to_string())),
            },
            GameMessage::StartPrivateMatch { code } => {
                if let Err(e) = state.start_lobby(self.player_id, &code).await {
                    self.send(ServerMessage::Error(e.to_string()));
                }
            }
            GameMessage::GetPrivateLobby { code } => match state.get_lobby(self.player_id, &code).await {
                Ok(view) => self.send(ServerMessage::LobbyUpdate(view)),
                Err(e) => self.send(ServerMessage::Error(e.to_string())),
            },
        }
    }

    /// Subscribes to a game's updates. Participants are also bound to the
    /// game in the registry, which is what no-show and disconnect handling
    /// look at.
    async fn watch_game(&self, game_id: MatchId) {
        let snapshot = match self.state.snapshot(game_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.send(ServerMessage::Error(e.to_string()));
                return;
            }
        };
        if snapshot.player_one == self.player_id || snapshot.player_two == self.player_id {
            self.state
                .registry
                .bind_game(self.connection_id, self.player_id, game_id);
        }
        if self.watched.insert(game_id) {
            self.follow(self.state.hub.subscribe(&game_topic(game_id)));
        }
        self.send(ServerMessage::GameUpdate(Box::new(snapshot)));
    }

    /// Turns lobby-topic snapshots of this player's new games into
    /// `MatchFound` notices.
    fn listen_for_matches(&self) {
        let conn = self.clone();
        let mut lobby = self.state.hub.subscribe(LOBBY_TOPIC);
        tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    () = conn.cancel.cancelled() => break,
                    msg = lobby.recv() => msg,
                };
                let snapshot = match msg {
                    Ok(ServerMessage::GameUpdate(snapshot)) => snapshot,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let (your_side, opponent_id) = if snapshot.player_one == conn.player_id {
                    (Side::PlayerOne, snapshot.player_two)
                } else if snapshot.player_two == conn.player_id {
                    (Side::PlayerTwo, snapshot.player_one)
                } else {
                    continue;
                };
                conn.send(ServerMessage::MatchFound {
                    game_id: snapshot.game_id,
                    opponent_id,
                    your_side,
                    origin: snapshot.origin,
                });
                conn.watch_game(snapshot.game_id).await;
            }
        });
    }

    fn follow(&self, mut topic: broadcast::Receiver<ServerMessage>) {
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    () = cancel.cancelled() => break,
                    msg = topic.recv() => msg,
                };
                match msg {
                    Ok(msg) => {
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Topic subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

use ranked4_core::engine::Difficulty;
use ranked4_core::logic::board::Side;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PlayerId = Uuid;
pub type MatchId = Uuid;

/// Identity the server plays under in PVE sessions.
pub const AI_PLAYER_ID: PlayerId = Uuid::from_u128(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Origin {
    Ranked,
    #[serde(rename = "PRIVATE_1V1")]
    Private1v1,
    Pve,
    CancelledNoShow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameType {
    PvpRanked,
    PvpPrivate,
    Pve,
}

impl GameType {
    pub const fn classify(ranked: bool, ai_difficulty: Option<Difficulty>) -> Self {
        match (ai_difficulty, ranked) {
            (Some(_), _) => Self::Pve,
            (None, true) => Self::PvpRanked,
            (None, false) => Self::PvpPrivate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Created,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFormed {
    pub match_id: MatchId,
    pub player_one: PlayerId,
    pub player_two: PlayerId,
    pub ranked: bool,
    pub origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFinished {
    pub match_id: MatchId,
    pub player_one: PlayerId,
    pub player_two: PlayerId,
    pub winner: Option<Side>,
    pub ranked: bool,
    pub origin: Origin,
    pub game_type: GameType,
    pub ai_difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDisconnected {
    pub player_id: PlayerId,
}

/// Events on the durable channel between this core and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CoreEvent {
    MatchFormed(MatchFormed),
    GameFinished(GameFinished),
    PlayerDisconnected(PlayerDisconnected),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub game_id: MatchId,
    /// 42 digits, row-major, top row first.
    pub board_state: String,
    pub status: GameStatus,
    pub next_to_move: Side,
    pub winner: Option<Side>,
    pub player_one: PlayerId,
    pub player_two: PlayerId,
    pub ranked: bool,
    pub origin: Origin,
    pub game_type: GameType,
    pub ai_difficulty: Option<Difficulty>,
    pub move_count: u32,
    pub turn_time_remaining_secs: Option<u64>,
    pub error: Option<String>,
}

impl GameSnapshot {
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyStatus {
    Lobby,
    Started,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyView {
    pub code: String,
    pub host_id: PlayerId,
    pub guest_id: Option<PlayerId>,
    pub status: LobbyStatus,
    pub match_id: Option<MatchId>,
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameMessage {
    FindMatch,
    CancelFindMatch,
    PlayAi { difficulty: Difficulty },
    JoinGame { game_id: MatchId },
    MakeMove {
        game_id: MatchId,
        column: usize,
        move_number: Option<u32>,
    },
    Surrender { game_id: MatchId },
    CreatePrivateLobby,
    JoinPrivateLobby { code: String },
    StartPrivateMatch { code: String },
    GetPrivateLobby { code: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    WaitingForMatch,
    LeftQueue,
    MatchFound {
        game_id: MatchId,
        opponent_id: PlayerId,
        your_side: Side,
        origin: Origin,
    },
    GameUpdate(Box<GameSnapshot>),
    LobbyUpdate(LobbyView),
    PrivateMatchStarted { game_id: MatchId },
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_wire_names() {
        assert_eq!(
            serde_json::to_string(&Origin::Private1v1).unwrap(),
            "\"PRIVATE_1V1\""
        );
        assert_eq!(
            serde_json::to_string(&Origin::CancelledNoShow).unwrap(),
            "\"CANCELLED_NO_SHOW\""
        );
    }

    #[test]
    fn test_game_type_classification() {
        assert_eq!(GameType::classify(true, None), GameType::PvpRanked);
        assert_eq!(GameType::classify(false, None), GameType::PvpPrivate);
        assert_eq!(
            GameType::classify(false, Some(Difficulty::HARD)),
            GameType::Pve
        );
    }

    #[test]
    fn test_match_formed_event_shape() {
        let event = CoreEvent::MatchFormed(MatchFormed {
            match_id: Uuid::nil(),
            player_one: AI_PLAYER_ID,
            player_two: Uuid::nil(),
            ranked: false,
            origin: Origin::Private1v1,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MatchFormed");
        assert_eq!(json["ranked"], false);
        assert_eq!(json["origin"], "PRIVATE_1V1");
        assert_eq!(json["playerOne"], "00000000-0000-0000-0000-000000000001");
    }
}

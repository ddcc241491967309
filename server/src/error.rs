use shared::MatchId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("move sequence conflict: expected {expected}, got {actual}")]
    SequenceConflict { expected: u32, actual: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("event channel closed")]
    ChannelClosed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("game {0} not found")]
    NotFound(MatchId),
    #[error("player is not a participant of this game")]
    NotParticipant,
    #[error("a player cannot be matched against themself")]
    SamePlayer,
    #[error("player is already in a game")]
    AlreadyInGame,
    #[error("game is not in progress")]
    NotInProgress,
    #[error("not your turn")]
    NotYourTurn,
    #[error("invalid move: column {column}")]
    InvalidMove { column: usize },
    #[error("stale move: next move is #{expected}, got #{actual}")]
    StaleMove { expected: u32, actual: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchmakingError {
    #[error("player is already in a game")]
    AlreadyInGame,
    #[error(transparent)]
    Publish(#[from] PublishError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("malformed lobby code")]
    InvalidCode,
    #[error("lobby not found or expired")]
    NotFound,
    #[error("lobby is not open")]
    NotJoinable,
    #[error("cannot join your own lobby")]
    OwnLobby,
    #[error("lobby already has a guest")]
    GuestAlreadyPresent,
    #[error("only the host can start the match")]
    NotHost,
    #[error("match already started")]
    AlreadyStarted,
    #[error("no guest has joined yet")]
    NoGuest,
    #[error("not a member of this lobby")]
    Forbidden,
    #[error("no free lobby code, try again")]
    NoCodeAvailable,
    #[error(transparent)]
    Publish(#[from] PublishError),
}

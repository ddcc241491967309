use crate::error::SessionError;
use crate::game_manager::AppState;
use crate::store::{GameRecord, MoveRecord};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use ranked4_core::logic::board::Side;
use serde::Serialize;
use shared::{GameSnapshot, MatchId, PlayerId};
use std::sync::Arc;

/// One line of the public ranked history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub game_id: MatchId,
    pub player_one_id: PlayerId,
    pub player_two_id: PlayerId,
    pub winner: Option<Side>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<GameRecord> for HistoryEntry {
    fn from(record: GameRecord) -> Self {
        Self {
            game_id: record.game_id,
            player_one_id: record.player_one,
            player_two_id: record.player_two,
            winner: record.winner,
            created_at: record.created_at,
            finished_at: record.finished_at,
        }
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/games/history", get(get_history))
        .route("/games/:game_id", get(get_game))
        .route("/games/:game_id/moves", get(get_moves))
}

async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<MatchId>,
) -> Result<Json<GameSnapshot>, StatusCode> {
    match state.snapshot(game_id).await {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(SessionError::NotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(game_id = %game_id, error = %e, "Snapshot lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_moves(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<MatchId>,
) -> Json<Vec<MoveRecord>> {
    Json(state.moves(game_id))
}

async fn get_history(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryEntry>> {
    Json(
        state
            .recent_ranked_games()
            .into_iter()
            .map(HistoryEntry::from)
            .collect(),
    )
}

use crate::logic::board::{Board, Side};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod config;
pub mod eval;
pub mod search;

/// AI strength tier. Tiers 1..=4 map to fixed search depths; anything else
/// falls back to the default depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Difficulty(u8);

impl Difficulty {
    pub const EASY: Self = Self(1);
    pub const MEDIUM: Self = Self(2);
    pub const HARD: Self = Self(3);
    pub const VERY_HARD: Self = Self(4);

    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    pub const fn level(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub depth: u8,
    pub nodes: u32,
    pub random: bool,
}

pub trait Evaluator {
    /// Static score of `board` for `side`; positive favours `side`.
    fn evaluate(&self, board: &Board, side: Side) -> i32;
}

pub trait Searcher {
    fn choose_move(
        &mut self,
        board: &Board,
        difficulty: Difficulty,
        side: Side,
    ) -> Option<(usize, SearchStats)>;
}

/// One-shot search with the default configuration.
pub fn choose_move(board: &Board, difficulty: Difficulty, side: Side) -> Option<usize> {
    let mut engine = search::AlphaBetaEngine::new(Arc::new(config::EngineConfig::default()));
    engine
        .choose_move(board, difficulty, side)
        .map(|(col, _)| col)
}

use crate::engine::Difficulty;
use crate::logic::eval_constants::{
    CENTER_WEIGHT, DEFAULT_DEPTH, DEPTH_BY_DIFFICULTY, RANDOM_MOVE_PERCENT, SCORE_WIN,
    WINDOW_OPP_FOUR, WINDOW_OPP_THREE, WINDOW_OPP_TWO, WINDOW_OWN_FOUR, WINDOW_OWN_THREE,
    WINDOW_OWN_TWO,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // Search Parameters
    pub depth_by_difficulty: [u8; 4],
    pub default_depth: u8,
    pub random_move_percent: u32,

    // Evaluation Parameters
    pub center_weight: i32,
    pub window_own_four: i32,
    pub window_own_three: i32,
    pub window_own_two: i32,
    pub window_opp_four: i32,
    pub window_opp_three: i32,
    pub window_opp_two: i32,
    pub score_win: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            depth_by_difficulty: DEPTH_BY_DIFFICULTY,
            default_depth: DEFAULT_DEPTH,
            random_move_percent: RANDOM_MOVE_PERCENT,

            center_weight: CENTER_WEIGHT,
            window_own_four: WINDOW_OWN_FOUR,
            window_own_three: WINDOW_OWN_THREE,
            window_own_two: WINDOW_OWN_TWO,
            window_opp_four: WINDOW_OPP_FOUR,
            window_opp_three: WINDOW_OPP_THREE,
            window_opp_two: WINDOW_OPP_TWO,
            score_win: SCORE_WIN,
        }
    }
}

impl EngineConfig {
    pub fn load_from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    pub fn depth_for(&self, difficulty: Difficulty) -> u8 {
        usize::from(difficulty.level())
            .checked_sub(1)
            .and_then(|tier| self.depth_by_difficulty.get(tier))
            .copied()
            .unwrap_or(self.default_depth)
    }
}

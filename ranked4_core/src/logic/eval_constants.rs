// Window scores, from the point of view of the side being evaluated.
pub const WINDOW_OWN_FOUR: i32 = 100;
pub const WINDOW_OWN_THREE: i32 = 5;
pub const WINDOW_OWN_TWO: i32 = 2;
pub const WINDOW_OPP_FOUR: i32 = -100;
pub const WINDOW_OPP_THREE: i32 = -50;
pub const WINDOW_OPP_TWO: i32 = -2;

/// Per disc in the centre column (+ own, - opponent).
pub const CENTER_WEIGHT: i32 = 3;

/// Score of a decided position before the distance-to-win adjustment.
pub const SCORE_WIN: i32 = 1_000_000;

// Search depth per difficulty tier 1..=4.
pub const DEPTH_BY_DIFFICULTY: [u8; 4] = [4, 5, 6, 8];
pub const DEFAULT_DEPTH: u8 = 5;

/// Share of tier-1 calls answered with a random legal column.
pub const RANDOM_MOVE_PERCENT: u32 = 80;

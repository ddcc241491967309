use crate::engine::config::EngineConfig;
use crate::engine::Evaluator;
use crate::logic::board::{Board, Side, COLS, DIRECTIONS, ROWS, WIN_STREAK};
use std::sync::{Arc, OnceLock};

type Window = [(usize, usize); WIN_STREAK];

/// Every run of four cells on the board, in all four directions.
pub fn windows() -> &'static [Window] {
    static INSTANCE: OnceLock<Vec<Window>> = OnceLock::new();
    INSTANCE.get_or_init(compute_windows)
}

fn compute_windows() -> Vec<Window> {
    let mut windows = Vec::new();
    for row in 0..ROWS {
        for col in 0..COLS {
            for &(dr, dc) in &DIRECTIONS {
                let mut window = [(0, 0); WIN_STREAK];
                let fits = (0..WIN_STREAK).all(|i| {
                    #[allow(clippy::cast_possible_wrap)]
                    let (r, c) = (row as isize + dr * i as isize, col as isize + dc * i as isize);
                    match (usize::try_from(r), usize::try_from(c)) {
                        (Ok(r), Ok(c)) if r < ROWS && c < COLS => {
                            window[i] = (r, c);
                            true
                        }
                        _ => false,
                    }
                });
                if fits {
                    windows.push(window);
                }
            }
        }
    }
    windows
}

pub struct WindowEvaluator {
    config: Arc<EngineConfig>,
}

impl WindowEvaluator {
    pub const fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    fn score_center(&self, board: &Board, side: Side) -> i32 {
        let center = COLS / 2;
        (0..ROWS)
            .filter_map(|row| board.get_cell(row, center))
            .map(|disc| {
                if disc == side {
                    self.config.center_weight
                } else {
                    -self.config.center_weight
                }
            })
            .sum()
    }

    fn score_window(&self, board: &Board, window: &Window, side: Side) -> i32 {
        let (mut own, mut opp, mut empty) = (0, 0, 0);
        for &(r, c) in window {
            match board.get_cell(r, c) {
                Some(disc) if disc == side => own += 1,
                Some(_) => opp += 1,
                None => empty += 1,
            }
        }

        let cfg = &self.config;
        match (own, opp, empty) {
            (4, _, _) => cfg.window_own_four,
            (_, 4, _) => cfg.window_opp_four,
            (3, _, 1) => cfg.window_own_three,
            (2, _, 2) => cfg.window_own_two,
            (_, 3, 1) => cfg.window_opp_three,
            (_, 2, 2) => cfg.window_opp_two,
            _ => 0,
        }
    }
}

impl Evaluator for WindowEvaluator {
    fn evaluate(&self, board: &Board, side: Side) -> i32 {
        let windows_score: i32 = windows()
            .iter()
            .map(|window| self.score_window(board, window, side))
            .sum();
        self.score_center(board, side) + windows_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> WindowEvaluator {
        WindowEvaluator::new(Arc::new(EngineConfig::default()))
    }

    fn play(moves: &[usize]) -> Board {
        let mut board = Board::new();
        for &col in moves {
            assert!(board.apply_move(col));
        }
        board
    }

    #[test]
    fn test_window_count() {
        // 24 horizontal + 21 vertical + 12 per diagonal direction.
        assert_eq!(windows().len(), 69);
    }

    #[test]
    fn test_empty_board_scores_zero() {
        let board = Board::new();
        assert_eq!(evaluator().evaluate(&board, Side::PlayerOne), 0);
        assert_eq!(evaluator().evaluate(&board, Side::PlayerTwo), 0);
    }

    #[test]
    fn test_single_center_disc() {
        // The centre bottom cell lies in no window with another disc, so only
        // the centre bonus applies.
        let board = play(&[3]);
        assert_eq!(evaluator().evaluate(&board, Side::PlayerOne), 3);
        assert_eq!(evaluator().evaluate(&board, Side::PlayerTwo), -3);
    }

    #[test]
    fn test_open_three_weighs_heavily_against_opponent() {
        // PlayerOne has three on the bottom row with both ends open.
        let board = play(&[1, 1, 2, 2, 3]);
        let own = evaluator().evaluate(&board, Side::PlayerOne);
        let opp = evaluator().evaluate(&board, Side::PlayerTwo);
        assert!(own > 0);
        assert!(opp < -50);
    }
}

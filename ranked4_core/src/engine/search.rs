use crate::engine::config::EngineConfig;
use crate::engine::eval::WindowEvaluator;
use crate::engine::{Difficulty, Evaluator, SearchStats, Searcher};
use crate::logic::board::{Board, Side};
use rand::Rng;
use std::sync::Arc;

/// Depth-bounded minimax with alpha-beta pruning. Every node works on its own
/// copy of the board; the caller's board is never touched.
pub struct AlphaBetaEngine {
    config: Arc<EngineConfig>,
    evaluator: WindowEvaluator,
    nodes_searched: u32,
}

impl AlphaBetaEngine {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            evaluator: WindowEvaluator::new(config.clone()),
            config,
            nodes_searched: 0,
        }
    }

    pub fn update_config(&mut self, config: Arc<EngineConfig>) {
        self.evaluator = WindowEvaluator::new(config.clone());
        self.config = config;
    }

    pub fn choose_move_with_rng<R: Rng + ?Sized>(
        &mut self,
        board: &Board,
        difficulty: Difficulty,
        side: Side,
        rng: &mut R,
    ) -> Option<(usize, SearchStats)> {
        if board.is_finished() {
            return None;
        }
        let legal: Vec<usize> = board.legal_columns().collect();
        let first = *legal.first()?;

        if difficulty == Difficulty::EASY && rng.gen_range(0..100) < self.config.random_move_percent
        {
            let col = legal[rng.gen_range(0..legal.len())];
            log::debug!("random move {col} for {side:?}");
            return Some((
                col,
                SearchStats {
                    depth: 0,
                    nodes: 0,
                    random: true,
                },
            ));
        }

        let depth = self.config.depth_for(difficulty);
        let mut root = board.clone();
        root.set_next_to_move(side);
        self.nodes_searched = 0;

        let mut best_col = first;
        let mut best_score = i32::MIN;
        for &col in &legal {
            let mut child = root.clone();
            child.apply_move(col);
            let score = self.minimax(
                &child,
                depth.saturating_sub(1),
                1,
                false,
                side,
                i32::MIN,
                i32::MAX,
            );
            // Strictly greater only: ties keep the lowest column.
            if score > best_score {
                best_score = score;
                best_col = col;
            }
        }

        log::debug!(
            "best move {best_col} for {side:?} (score {best_score}, depth {depth}, nodes {})",
            self.nodes_searched
        );
        Some((
            best_col,
            SearchStats {
                depth,
                nodes: self.nodes_searched,
                random: false,
            },
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn minimax(
        &mut self,
        board: &Board,
        depth: u8,
        ply: u8,
        maximizing: bool,
        side: Side,
        mut alpha: i32,
        mut beta: i32,
    ) -> i32 {
        self.nodes_searched += 1;

        if board.is_finished() {
            // Nearer wins score higher, nearer losses lower.
            return match board.winner() {
                Some(winner) if winner == side => self.config.score_win - i32::from(ply),
                Some(_) => -self.config.score_win + i32::from(ply),
                None => 0,
            };
        }

        if depth == 0 {
            return self.evaluator.evaluate(board, side);
        }

        if maximizing {
            let mut best = i32::MIN;
            for col in board.legal_columns() {
                let mut child = board.clone();
                child.apply_move(col);
                let score = self.minimax(&child, depth - 1, ply + 1, false, side, alpha, beta);
                best = best.max(score);
                alpha = alpha.max(score);
                if beta <= alpha {
                    break;
                }
            }
            best
        } else {
            let mut best = i32::MAX;
            for col in board.legal_columns() {
                let mut child = board.clone();
                child.apply_move(col);
                let score = self.minimax(&child, depth - 1, ply + 1, true, side, alpha, beta);
                best = best.min(score);
                beta = beta.min(score);
                if beta <= alpha {
                    break;
                }
            }
            best
        }
    }
}

impl Searcher for AlphaBetaEngine {
    fn choose_move(
        &mut self,
        board: &Board,
        difficulty: Difficulty,
        side: Side,
    ) -> Option<(usize, SearchStats)> {
        self.choose_move_with_rng(board, difficulty, side, &mut rand::thread_rng())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine() -> AlphaBetaEngine {
        AlphaBetaEngine::new(Arc::new(EngineConfig::default()))
    }

    #[test]
    fn test_easy_tier_mostly_random_but_always_legal() {
        let mut board = Board::new();
        for col in [0, 0, 0, 0, 0, 0] {
            assert!(board.apply_move(col));
        }
        let mut engine = engine();
        let mut rng = StdRng::seed_from_u64(42);
        let mut random_calls = 0;
        for _ in 0..200 {
            let (col, stats) = engine
                .choose_move_with_rng(&board, Difficulty::EASY, Side::PlayerOne, &mut rng)
                .unwrap();
            assert_ne!(col, 0, "column 0 is full");
            if stats.random {
                random_calls += 1;
            }
        }
        assert!((120..=190).contains(&random_calls), "got {random_calls}");
    }

    #[test]
    fn test_search_reports_depth_and_nodes() {
        let mut engine = engine();
        let mut rng = StdRng::seed_from_u64(1);
        let (_, stats) = engine
            .choose_move_with_rng(&Board::new(), Difficulty::MEDIUM, Side::PlayerOne, &mut rng)
            .unwrap();
        assert_eq!(stats.depth, 5);
        assert!(stats.nodes > 0);
        assert!(!stats.random);
    }

    #[test]
    fn test_update_config_disables_random_moves() {
        let mut engine = engine();
        engine.update_config(Arc::new(EngineConfig {
            random_move_percent: 0,
            ..EngineConfig::default()
        }));
        let mut rng = StdRng::seed_from_u64(3);
        let (_, stats) = engine
            .choose_move_with_rng(&Board::new(), Difficulty::EASY, Side::PlayerOne, &mut rng)
            .unwrap();
        assert!(!stats.random);
        assert_eq!(stats.depth, 4);
    }
}

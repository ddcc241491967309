use ranked4_core::engine::config::EngineConfig;
use ranked4_core::engine::search::AlphaBetaEngine;
use ranked4_core::engine::{choose_move, Difficulty, Searcher};
use ranked4_core::logic::board::{Board, Side};
use std::sync::Arc;

fn board_from_moves(moves: &[usize]) -> Board {
    let mut board = Board::new();
    for &col in moves {
        assert!(board.apply_move(col), "setup move {col} rejected");
    }
    board
}

#[test]
fn test_takes_immediate_vertical_win() {
    // PlayerOne has three stacked in column 3 and is to move.
    let board = board_from_moves(&[3, 2, 3, 2, 3, 0]);
    assert_eq!(board.next_to_move(), Side::PlayerOne);

    for difficulty in [Difficulty::MEDIUM, Difficulty::HARD] {
        assert_eq!(
            choose_move(&board, difficulty, Side::PlayerOne),
            Some(3),
            "difficulty {difficulty:?}"
        );
    }
}

#[test]
fn test_takes_immediate_horizontal_win_over_lower_columns() {
    // PlayerTwo owns 3,4,5 on the bottom row and column 6 completes it.
    // Lower columns are searched first but must not win the tie.
    let board = board_from_moves(&[2, 3, 0, 4, 0, 5, 1]);
    assert_eq!(board.next_to_move(), Side::PlayerTwo);
    assert_eq!(choose_move(&board, Difficulty::MEDIUM, Side::PlayerTwo), Some(6));
}

#[test]
fn test_blocks_opponent_vertical_threat() {
    // PlayerOne threatens column 3; PlayerTwo must block.
    let board = board_from_moves(&[3, 0, 3, 0, 3]);
    assert_eq!(board.next_to_move(), Side::PlayerTwo);
    assert_eq!(choose_move(&board, Difficulty::MEDIUM, Side::PlayerTwo), Some(3));
}

#[test]
fn test_searches_for_requested_side() {
    // PlayerTwo is formally to move, but the search is asked for PlayerOne.
    let board = board_from_moves(&[3, 2, 3, 2, 3]);
    assert_eq!(choose_move(&board, Difficulty::MEDIUM, Side::PlayerOne), Some(3));
}

#[test]
fn test_search_leaves_board_untouched() {
    let board = board_from_moves(&[3, 3, 4, 2]);
    let before = board.clone();
    let mut engine = AlphaBetaEngine::new(Arc::new(EngineConfig::default()));
    let _ = engine.choose_move(&board, Difficulty::HARD, board.next_to_move());
    assert_eq!(board, before);
}

#[test]
fn test_no_move_on_finished_board() {
    let board = board_from_moves(&[3, 2, 3, 2, 3, 2, 3]);
    assert!(board.is_finished());
    assert_eq!(choose_move(&board, Difficulty::HARD, Side::PlayerTwo), None);
}

#[test]
fn test_only_legal_column_is_chosen() {
    // All but the last move of a drawn game: only column 2 has room.
    let board = board_from_moves(&[
        6, 2, 3, 1, 2, 5, 0, 4, 0, 1, 5, 1, 1, 3, 6, 0, 6, 3, 2, 2, 4, 3, 3, 4, 2, 6, 0, 5, 1, 0,
        4, 4, 4, 6, 1, 6, 0, 3, 5, 5, 5,
    ]);
    assert_eq!(board.legal_columns().collect::<Vec<_>>(), vec![2]);
    assert_eq!(
        choose_move(&board, Difficulty::VERY_HARD, board.next_to_move()),
        Some(2)
    );
}

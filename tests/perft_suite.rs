//! Perft regression positions.
//!
//! Run with: cargo test --release --test perft_suite

use bitchess::board::Board;
use bitchess::perft::{perft, perft_parallel, PerftCase, PERFT_SUITE};
use pretty_assertions::assert_eq;

fn run_case(case: &PerftCase) {
    let board = Board::from_fen(case.fen).unwrap();
    let stats = perft_parallel(&board, case.depth).unwrap();
    assert_eq!(
        stats.leaves, case.leaves,
        "{} ({}) at depth {}",
        case.name, case.fen, case.depth
    );
}

fn case(name: &str, fen: &str) -> &'static PerftCase {
    PERFT_SUITE
        .iter()
        .find(|c| c.name == name && c.fen == fen)
        .unwrap()
}

#[test]
fn illegal_ep_move_1() {
    run_case(case("Illegal ep move #1", "3k4/3p4/8/K1P4r/8/8/8/8 b - - 0 1"));
}

#[test]
fn illegal_ep_move_2() {
    run_case(case("Illegal ep move #2", "8/8/4k3/8/2p5/8/B2P2K1/8 w - - 0 1"));
}

#[test]
fn ep_capture_checks_opponent() {
    run_case(case("EP Capture Checks Opponent", "8/8/1k6/2b5/2pP4/8/5K2/8 b - d3 0 1"));
}

#[test]
fn short_castling_gives_check() {
    run_case(case("Short Castling Gives Check", "5k2/8/8/8/8/8/8/4K2R w K - 0 1"));
}

#[test]
fn long_castling_gives_check() {
    run_case(case("Long Castling Gives Check", "3k4/8/8/8/8/8/8/R3K3 w Q - 0 1"));
}

#[test]
fn castle_rights() {
    run_case(case("Castle Rights", "r3k2r/1b4bq/8/8/8/8/7B/R3K2R w KQkq - 0 1"));
}

#[test]
fn castling_prevented() {
    run_case(case("Castling Prevented", "r3k2r/8/3Q4/8/8/5q2/8/R3K2R b KQkq - 0 1"));
}

#[test]
fn promote_out_of_check() {
    run_case(case("Promote out of Check", "2K2r2/4P3/8/8/8/8/8/3k4 w - - 0 1"));
}

#[test]
fn discovered_check() {
    run_case(case("Discovered Check", "8/8/1P2K3/8/2n5/1q6/8/5k2 b - - 0 1"));
}

#[test]
fn promote_to_give_check() {
    run_case(case("Promote to give check", "4k3/1P6/8/8/8/8/K7/8 w - - 0 1"));
}

#[test]
fn under_promote_to_give_check() {
    run_case(case("Under Promote to give check", "8/P1k5/K7/8/8/8/8/8 w - - 0 1"));
}

#[test]
fn self_stalemate() {
    run_case(case("Self Stalemate", "K1k5/8/P7/8/8/8/8/8 w - - 0 1"));
}

#[test]
fn stalemate_and_checkmate_1() {
    run_case(case("Stalemate & Checkmate", "8/k1P5/8/1K6/8/8/8/8 w - - 0 1"));
}

#[test]
fn stalemate_and_checkmate_2() {
    run_case(case("Stalemate & Checkmate", "8/8/2k5/5q2/5n2/8/5K2/8 b - - 0 1"));
}

#[test]
fn suite_is_complete() {
    assert_eq!(PERFT_SUITE.len(), 14);
}

/// Standard positions from https://www.chessprogramming.org/Perft_Results
#[test]
fn perft_start_position() {
    let board = Board::new();
    let expected = [1, 20, 400, 8_902, 197_281];
    for (depth, &leaves) in expected.iter().enumerate() {
        assert_eq!(perft(&board, depth as u8).unwrap().leaves, leaves, "depth {}", depth);
    }
}

#[test]
fn perft_kiwipete() {
    let board =
        Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
            .unwrap();
    let expected = [1, 48, 2_039, 97_862];
    for (depth, &leaves) in expected.iter().enumerate() {
        assert_eq!(
            perft_parallel(&board, depth as u8).unwrap().leaves,
            leaves,
            "depth {}",
            depth
        );
    }
}

#[test]
fn perft_position_3() {
    let board = Board::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
    let expected = [1, 14, 191, 2_812, 43_238];
    for (depth, &leaves) in expected.iter().enumerate() {
        assert_eq!(perft(&board, depth as u8).unwrap().leaves, leaves, "depth {}", depth);
    }
}

#[test]
fn perft_position_5() {
    let board =
        Board::from_fen("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8").unwrap();
    assert_eq!(perft_parallel(&board, 3).unwrap().leaves, 62_379);
}

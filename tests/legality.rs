//! Invariants checked along seeded random games.

use bitchess::board::Board;
use bitchess::types::{Color, PieceType, Status};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const GAMES: u64 = 20;
const MAX_PLIES: usize = 200;

fn assert_planes_consistent(board: &Board) {
    let pieces = PieceType::ALL
        .iter()
        .fold(0u64, |acc, &piece| acc | board.piece_bb(piece));
    let white = board.pieces(Color::White);
    let black = board.pieces(Color::Black);

    assert_eq!(white & black, 0, "color planes overlap in {}", board.to_fen());
    assert_eq!(white | black, pieces, "planes disagree in {}", board.to_fen());
    assert_eq!(board.occupied(), pieces);
    assert_eq!(board.empty_squares(), !pieces);

    // every square holds at most one piece type
    for (i, &a) in PieceType::ALL.iter().enumerate() {
        for &b in &PieceType::ALL[i + 1..] {
            assert_eq!(
                board.piece_bb(a) & board.piece_bb(b),
                0,
                "{} overlaps in {}",
                a.to_human(),
                board.to_fen()
            );
        }
    }
    assert!(board.en_passant().count_ones() <= 1);
    assert_eq!(board.piece_bb(PieceType::King).count_ones(), 2);
}

fn rights(board: &Board) -> [bool; 4] {
    let c = board.castling();
    [c.white_kingside, c.white_queenside, c.black_kingside, c.black_queenside]
}

#[test]
fn random_games_keep_invariants() {
    for seed in 0..GAMES {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut board = Board::new();

        for _ in 0..MAX_PLIES {
            assert_planes_consistent(&board);
            let mover = board.active_color();

            // attack sets are a pure function of the position
            let attacked = board.attacked_squares(mover.other_color());
            assert_eq!(attacked, board.attacked_squares(mover.other_color()));

            let legal = board.legal_moves().unwrap();
            if legal.is_empty() {
                let status = board.status().unwrap();
                if board.is_check() {
                    assert_eq!(status, Some(Status::Checkmate(mover.other_color())));
                } else {
                    assert_eq!(status, Some(Status::Stalemate));
                }
                break;
            }

            for mv in legal.iter() {
                let before = board;
                let next = board.apply_move(mv).unwrap();
                assert_eq!(board, before, "apply_move mutated the original");
                assert!(!next.is_own_king_attacked());
                assert_eq!(next.active_color(), mover.other_color());

                // text form resolves back to the same move
                let resolved = board.resolve_move(&mv.to_uci()).unwrap();
                assert_eq!(resolved, *mv);
                assert_eq!(resolved.move_type, mv.move_type);
            }

            let before_rights = rights(&board);
            let mv = *legal.choose(&mut rng).unwrap();
            board.make_move(&mv).unwrap();

            // rights are only ever cleared
            for (before, after) in before_rights.iter().zip(rights(&board)) {
                assert!(*before || !after);
            }

            if board.halfmove_clock() >= 100 {
                break;
            }
        }
    }
}

#[test]
fn fen_round_trips_along_random_games() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut board = Board::new();
    for _ in 0..120 {
        let fen = board.to_fen();
        let reparsed = Board::from_fen(&fen).unwrap();
        assert_eq!(reparsed.to_fen(), fen);
        assert_eq!(reparsed.occupied(), board.occupied());

        let legal = board.legal_moves().unwrap();
        let Some(mv) = legal.choose(&mut rng) else {
            break;
        };
        board.make_move(mv).unwrap();
    }
}

#[test]
fn checkmate_is_not_stalemate() {
    // back rank mate
    let mut board = Board::from_fen("3R2k1/5ppp/8/8/8/8/8/6K1 b - - 0 1").unwrap();
    assert!(board.is_checkmate().unwrap());
    assert!(!board.is_stalemate().unwrap());
    assert_eq!(board.status().unwrap(), Some(Status::Checkmate(Color::White)));

    // king boxed in by a queen but not attacked
    let mut board = Board::from_fen("k7/2Q5/1K6/8/8/8/8/8 b - - 0 1").unwrap();
    assert!(!board.is_check());
    assert!(board.legal_moves().unwrap().is_empty());
    assert_eq!(board.status().unwrap(), Some(Status::Stalemate));
}

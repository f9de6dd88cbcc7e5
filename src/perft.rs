use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rayon::prelude::*;
use tracing::debug;

use crate::board::Board;
use crate::error::ChessResult;
use crate::types::Move;

/// Node counts gathered by a perft run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerftStats {
    /// Pseudo-legal moves produced by the generator
    pub generated: u64,
    /// Moves that survived the legality filter
    pub legal: u64,
    /// Positions reached at the requested depth
    pub leaves: u64,
}

impl PerftStats {
    pub fn leaf() -> Self {
        Self {
            leaves: 1,
            ..Self::default()
        }
    }

    /// Share of generated moves that were legal.
    pub fn accuracy(&self) -> f64 {
        if self.generated == 0 {
            return 1.0;
        }
        self.legal as f64 / self.generated as f64
    }
}

impl Add for PerftStats {
    type Output = PerftStats;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for PerftStats {
    fn add_assign(&mut self, rhs: Self) {
        self.generated += rhs.generated;
        self.legal += rhs.legal;
        self.leaves += rhs.leaves;
    }
}

impl Sum for PerftStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(PerftStats::default(), Add::add)
    }
}

/// Legal children of a position, each with the move that leads there.
fn children(board: &Board, stats: &mut PerftStats) -> ChessResult<Vec<(Move, Board)>> {
    let mut board = *board;
    let moves = board.pseudo_legal_moves()?;
    stats.generated += moves.len() as u64;

    let mut res = Vec::with_capacity(moves.len());
    for mv in moves {
        let next = board.apply_move(&mv)?;
        if next.is_own_king_attacked() {
            continue;
        }
        stats.legal += 1;
        res.push((mv, next));
    }
    Ok(res)
}

/// Count the positions reachable in exactly `depth` plies.
pub fn perft(board: &Board, depth: u8) -> ChessResult<PerftStats> {
    if depth == 0 {
        return Ok(PerftStats::leaf());
    }

    let mut stats = PerftStats::default();
    for (_, next) in children(board, &mut stats)? {
        stats += perft(&next, depth - 1)?;
    }
    Ok(stats)
}

/// Same counts as [`perft`], with the subtrees below the first two plies spread over
/// the rayon pool.
pub fn perft_parallel(board: &Board, depth: u8) -> ChessResult<PerftStats> {
    if depth <= 2 {
        return perft(board, depth);
    }

    let mut stats = PerftStats::default();
    let mut frontier = Vec::new();
    for (_, child) in children(board, &mut stats)? {
        for (_, grandchild) in children(&child, &mut stats)? {
            frontier.push(grandchild);
        }
    }

    let below: PerftStats = frontier
        .par_iter()
        .map(|b| perft(b, depth - 2))
        .collect::<ChessResult<Vec<_>>>()?
        .into_iter()
        .sum();
    Ok(stats + below)
}

/// Leaf count below each legal root move. Depth 0 has no root moves to split on, so
/// the result is empty.
pub fn divide(board: &Board, depth: u8) -> ChessResult<Vec<(Move, u64)>> {
    if depth == 0 {
        return Ok(Vec::new());
    }
    let mut root = PerftStats::default();
    children(board, &mut root)?
        .par_iter()
        .map(|(mv, next)| {
            let leaves = perft(next, depth - 1)?.leaves;
            debug!(%mv, leaves, "divide");
            Ok((*mv, leaves))
        })
        .collect()
}

/// A position with a known leaf count.
#[derive(Debug, Clone, Copy)]
pub struct PerftCase {
    pub name: &'static str,
    pub fen: &'static str,
    pub depth: u8,
    pub leaves: u64,
}

/// Positions that exercise en passant, castling, promotion and mate edge cases.
pub static PERFT_SUITE: [PerftCase; 14] = [
    PerftCase {
        name: "Illegal ep move #1",
        fen: "3k4/3p4/8/K1P4r/8/8/8/8 b - - 0 1",
        depth: 6,
        leaves: 1_134_888,
    },
    PerftCase {
        name: "Illegal ep move #2",
        fen: "8/8/4k3/8/2p5/8/B2P2K1/8 w - - 0 1",
        depth: 6,
        leaves: 1_015_133,
    },
    PerftCase {
        name: "EP Capture Checks Opponent",
        fen: "8/8/1k6/2b5/2pP4/8/5K2/8 b - d3 0 1",
        depth: 6,
        leaves: 1_440_467,
    },
    PerftCase {
        name: "Short Castling Gives Check",
        fen: "5k2/8/8/8/8/8/8/4K2R w K - 0 1",
        depth: 6,
        leaves: 661_072,
    },
    PerftCase {
        name: "Long Castling Gives Check",
        fen: "3k4/8/8/8/8/8/8/R3K3 w Q - 0 1",
        depth: 6,
        leaves: 803_711,
    },
    PerftCase {
        name: "Castle Rights",
        fen: "r3k2r/1b4bq/8/8/8/8/7B/R3K2R w KQkq - 0 1",
        depth: 4,
        leaves: 1_274_206,
    },
    PerftCase {
        name: "Castling Prevented",
        fen: "r3k2r/8/3Q4/8/8/5q2/8/R3K2R b KQkq - 0 1",
        depth: 4,
        leaves: 1_720_476,
    },
    PerftCase {
        name: "Promote out of Check",
        fen: "2K2r2/4P3/8/8/8/8/8/3k4 w - - 0 1",
        depth: 6,
        leaves: 3_821_001,
    },
    PerftCase {
        name: "Discovered Check",
        fen: "8/8/1P2K3/8/2n5/1q6/8/5k2 b - - 0 1",
        depth: 5,
        leaves: 1_004_658,
    },
    PerftCase {
        name: "Promote to give check",
        fen: "4k3/1P6/8/8/8/8/K7/8 w - - 0 1",
        depth: 6,
        leaves: 217_342,
    },
    PerftCase {
        name: "Under Promote to give check",
        fen: "8/P1k5/K7/8/8/8/8/8 w - - 0 1",
        depth: 6,
        leaves: 92_683,
    },
    PerftCase {
        name: "Self Stalemate",
        fen: "K1k5/8/P7/8/8/8/8/8 w - - 0 1",
        depth: 6,
        leaves: 2_217,
    },
    PerftCase {
        name: "Stalemate & Checkmate",
        fen: "8/k1P5/8/1K6/8/8/8/8 w - - 0 1",
        depth: 7,
        leaves: 567_584,
    },
    PerftCase {
        name: "Stalemate & Checkmate",
        fen: "8/8/2k5/5q2/5n2/8/5K2/8 b - - 0 1",
        depth: 4,
        leaves: 23_527,
    },
];

/// Perft from starting position
///
/// https://www.chessprogramming.org/Perft_Results
///
/// | Depth | Nodes       |
/// | ----- | ----------- |
/// | 1     | 20          |
/// | 2     | 400         |
/// | 3     | 8,902       |
/// | 4     | 197,281     |
/// | 5     | 4,865,609   |
/// | 6     | 119,060,324 |
pub fn start_position_leaves(depth: u8) -> Option<u64> {
    match depth {
        0 => Some(1),
        1 => Some(20),
        2 => Some(400),
        3 => Some(8902),
        4 => Some(197_281),
        5 => Some(4_865_609),
        6 => Some(119_060_324),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MAX_DEPTH: u8 = 4;

    #[test]
    fn perft_start() {
        let board = Board::new();
        for depth in 0..=MAX_DEPTH {
            let stats = perft(&board, depth).unwrap();
            assert_eq!(Some(stats.leaves), start_position_leaves(depth), "depth {}", depth);
        }
    }

    #[test]
    fn perft_counts_generated_and_legal() {
        let stats = perft(&Board::new(), 1).unwrap();
        assert_eq!(
            stats,
            PerftStats {
                generated: 20,
                legal: 20,
                leaves: 20
            }
        );
        assert_eq!(stats.accuracy(), 1.0);

        // the pinned knight has pseudo-legal moves that are all rejected
        let board = Board::from_fen("4k3/4r3/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
        let stats = perft(&board, 1).unwrap();
        assert!(stats.generated > stats.legal);
        assert!(stats.accuracy() < 1.0);
    }

    #[test]
    fn perft_parallel_matches_sequential() {
        let board = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        let sequential = perft(&board, 3).unwrap();
        let parallel = perft_parallel(&board, 3).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel.leaves, 97_862);
    }

    /// "position 5" from https://www.chessprogramming.org/Perft_Results
    ///
    /// Depth | Nodes
    /// ----- | -----
    /// 1     | 44
    /// 2     | 1,486
    /// 3     | 62,379
    #[test]
    fn perft_pos_5() {
        let board =
            Board::from_fen("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8").unwrap();
        let expected = [1, 44, 1_486, 62_379];
        for (depth, &leaves) in expected.iter().enumerate() {
            assert_eq!(perft(&board, depth as u8).unwrap().leaves, leaves, "depth {}", depth);
        }
    }

    #[test]
    fn divide_sums_to_perft() {
        let board = Board::new();
        let split = divide(&board, 3).unwrap();
        assert_eq!(split.len(), 20);
        assert_eq!(split.iter().map(|(_, n)| n).sum::<u64>(), 8902);
        let e2e4 = split.iter().find(|(mv, _)| mv.to_uci() == "e2e4").unwrap();
        assert_eq!(e2e4.1, 600);

        let split = divide(&board, 1).unwrap();
        assert_eq!(split.len(), 20);
        assert!(split.iter().all(|&(_, n)| n == 1));
    }

    #[test]
    fn divide_at_depth_zero_is_empty() {
        assert_eq!(divide(&Board::new(), 0).unwrap(), Vec::new());
    }

    #[test]
    fn suite_fens_parse() {
        for case in PERFT_SUITE {
            assert!(Board::from_fen(case.fen).is_ok(), "{}", case.name);
        }
    }
}

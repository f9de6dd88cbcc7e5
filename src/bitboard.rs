//! Bitboard representation and precomputed knight/king tables.
//!
//! A bitboard is a 64-bit integer where each bit represents a square on the chess board.
//! Square indexing: h1 = 0, g1 = 1, ..., a1 = 7, h2 = 8, ..., a8 = 63.
//! In move coordinates (`x` = file with 0 = a, `y` = rank from the top with 0 = rank 8)
//! this is `square_index = 63 - (x + 8 * y)`.
//!
//! With this layout a shift left by 8 moves every square one rank up, and a shift by one
//! bit inside a rank moves towards the a-file (left) or the h-file (right).

pub const FILE_A: u64 = 0x8080_8080_8080_8080;
pub const FILE_B: u64 = FILE_A >> 1;
pub const FILE_G: u64 = FILE_H << 1;
pub const FILE_H: u64 = 0x0101_0101_0101_0101;

pub const RANK_1: u64 = 0xFF;
pub const RANK_2: u64 = RANK_1 << 8;
pub const RANK_4: u64 = RANK_1 << 24;
pub const RANK_5: u64 = RANK_1 << 32;
pub const RANK_7: u64 = RANK_1 << 48;
pub const RANK_8: u64 = RANK_1 << 56;

/// Convert move coordinates to a square index (0-63)
#[inline(always)]
pub const fn xy_to_sq(x: u8, y: u8) -> u8 {
    63 - (x + (y << 3))
}

/// File of a square in move coordinates (0 = a)
#[inline(always)]
pub const fn sq_x(sq: u8) -> u8 {
    7 - (sq & 7)
}

/// Rank of a square in move coordinates (0 = rank 8)
#[inline(always)]
pub const fn sq_y(sq: u8) -> u8 {
    7 - (sq >> 3)
}

/// Convert a square index to a bitboard with that single bit set
#[inline(always)]
pub const fn sq_to_bb(sq: u8) -> u64 {
    1u64 << sq
}

/// Iterate over set bits in a bitboard, returning square indices
pub struct BitboardIter(pub u64);

impl Iterator for BitboardIter {
    type Item = u8;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            None
        } else {
            let sq = self.0.trailing_zeros() as u8;
            self.0 &= self.0 - 1; // Clear the lowest set bit
            Some(sq)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

/// Squares attacked by a set of white pawns (diagonally upward).
#[inline(always)]
pub const fn white_pawn_attacks(pawns: u64) -> u64 {
    ((pawns << 7) & !FILE_A) | ((pawns << 9) & !FILE_H)
}

/// Squares attacked by a set of black pawns (diagonally downward).
#[inline(always)]
pub const fn black_pawn_attacks(pawns: u64) -> u64 {
    ((pawns >> 7) & !FILE_H) | ((pawns >> 9) & !FILE_A)
}

/// Knight pattern for a knight standing on square 18 (f3).
const KNIGHT_TEMPLATE: u64 = 0x0000_000A_1100_110A;
const KNIGHT_TEMPLATE_SQ: usize = 18;

/// King pattern for a king standing on square 9 (g2).
const KING_TEMPLATE: u64 = 0x0007_0507;
const KING_TEMPLATE_SQ: usize = 9;

/// Precomputed reachability for the non-sliding pieces.
pub struct MoveTables {
    /// Knight moves for each square
    pub knight: [u64; 64],
    /// King moves for each square
    pub king: [u64; 64],
}

impl MoveTables {
    /// Shift each template onto the square and cut off whatever wrapped around the
    /// opposite board edge.
    pub const fn new() -> Self {
        let mut knight = [0u64; 64];
        let mut king = [0u64; 64];

        let mut sq = 0;
        while sq < 64 {
            let near_h_file = sq % 8 < 4;

            let mut moves = if sq > KNIGHT_TEMPLATE_SQ {
                KNIGHT_TEMPLATE << (sq - KNIGHT_TEMPLATE_SQ)
            } else {
                KNIGHT_TEMPLATE >> (KNIGHT_TEMPLATE_SQ - sq)
            };
            if near_h_file {
                moves &= !(FILE_A | FILE_B);
            } else {
                moves &= !(FILE_G | FILE_H);
            }
            knight[sq] = moves;

            let mut moves = if sq > KING_TEMPLATE_SQ {
                KING_TEMPLATE << (sq - KING_TEMPLATE_SQ)
            } else {
                KING_TEMPLATE >> (KING_TEMPLATE_SQ - sq)
            };
            if near_h_file {
                moves &= !FILE_A;
            } else {
                moves &= !FILE_H;
            }
            king[sq] = moves;

            sq += 1;
        }

        MoveTables { knight, king }
    }
}

impl Default for MoveTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Global knight/king tables, built at compile time
pub static MOVE_TABLES: MoveTables = MoveTables::new();

#[inline(always)]
pub fn knight_moves(sq: u8) -> u64 {
    MOVE_TABLES.knight[sq as usize]
}

#[inline(always)]
pub fn king_moves(sq: u8) -> u64 {
    MOVE_TABLES.king[sq as usize]
}

use tracing::trace;

use crate::bitboard::{
    king_moves, knight_moves, BitboardIter, FILE_A, FILE_H, RANK_1, RANK_4, RANK_5, RANK_8,
};
use crate::board::{castle_masks, king_home, rook_home, Board};
use crate::magic::{bishop_attacks, queen_attacks, rook_attacks};
use crate::error::ChessResult;
use crate::movelist::MoveList;
use crate::types::{Color, Coord, Move, MoveType, PIECES_CAN_PROMOTE_TO};

/// Pseudo-legal move generation for the side to move.
///
/// Moves never land on an own piece or on the enemy king. Whether the mover's king is
/// left attacked is checked afterwards on a copy of the board.
pub struct MoveGenerator<'a> {
    board: &'a mut Board,
    color: Color,
    moves: MoveList,
}

impl<'a> MoveGenerator<'a> {
    pub fn new(board: &'a mut Board) -> Self {
        let color = board.active_color;
        Self {
            board,
            color,
            moves: MoveList::new(),
        }
    }

    pub fn generate(mut self) -> ChessResult<MoveList> {
        let opponent = self.color.other_color();
        self.board.refresh_attacks(opponent);

        let own = self.board.pieces(self.color);
        let enemy = self.board.pieces(opponent);
        // never generate a capture of the king
        let targets = !(own | (self.board.kings & enemy));

        self.generate_pawn_moves(enemy & !self.board.kings)?;
        self.generate_knight_moves(targets)?;
        self.generate_slider_moves(targets)?;
        self.generate_king_moves(targets)?;
        self.generate_castling()?;

        Ok(self.moves)
    }

    #[inline(always)]
    fn own(&self, pieces: u64) -> u64 {
        pieces & self.board.pieces(self.color)
    }

    fn generate_knight_moves(&mut self, targets: u64) -> ChessResult<()> {
        for from_sq in BitboardIter(self.own(self.board.knights)) {
            for to_sq in BitboardIter(knight_moves(from_sq) & targets) {
                self.moves
                    .push(Move::from_squares(from_sq, to_sq, MoveType::Knight))?;
            }
        }
        Ok(())
    }

    fn generate_slider_moves(&mut self, targets: u64) -> ChessResult<()> {
        let occupied = self.board.occupied;

        for from_sq in BitboardIter(self.own(self.board.bishops)) {
            for to_sq in BitboardIter(bishop_attacks(from_sq, occupied) & targets) {
                self.moves
                    .push(Move::from_squares(from_sq, to_sq, MoveType::Bishop))?;
            }
        }

        for from_sq in BitboardIter(self.own(self.board.rooks)) {
            for to_sq in BitboardIter(rook_attacks(from_sq, occupied) & targets) {
                self.moves
                    .push(Move::from_squares(from_sq, to_sq, MoveType::Rook(self.color)))?;
            }
        }

        for from_sq in BitboardIter(self.own(self.board.queens)) {
            for to_sq in BitboardIter(queen_attacks(from_sq, occupied) & targets) {
                self.moves
                    .push(Move::from_squares(from_sq, to_sq, MoveType::Queen))?;
            }
        }
        Ok(())
    }

    /// King steps, never onto a square the opponent attacks.
    fn generate_king_moves(&mut self, targets: u64) -> ChessResult<()> {
        let attacked = self.board.cached_attacks(self.color.other_color());
        for from_sq in BitboardIter(self.own(self.board.kings)) {
            for to_sq in BitboardIter(king_moves(from_sq) & targets & !attacked) {
                self.moves
                    .push(Move::from_squares(from_sq, to_sq, MoveType::King(self.color)))?;
            }
        }
        Ok(())
    }

    fn generate_castling(&mut self) -> ChessResult<()> {
        let color = self.color;
        let own_rooks = self.own(self.board.rooks);

        // a right whose rook has left its corner can never be used again
        for kingside in [true, false] {
            if self.board.castling.get(color, kingside)
                && own_rooks & rook_home(color, kingside) == 0
            {
                trace!(color = color.to_human(), kingside, "rook gone, castling right revoked");
                self.board.castling.revoke(color, kingside);
            }
        }

        let attacked = self.board.cached_attacks(color.other_color());
        let king = self.own(self.board.kings) & king_home(color);
        if king == 0 || king & attacked != 0 {
            return Ok(());
        }

        let empty = self.board.empty;
        let y = match color {
            Color::White => 7,
            Color::Black => 0,
        };
        let from = Coord::new(4, y);

        for (kingside, path, safe, to_x) in [
            (true, castle_masks::KINGSIDE_EMPTY, castle_masks::KINGSIDE_SAFE, 6),
            (false, castle_masks::QUEENSIDE_EMPTY, castle_masks::QUEENSIDE_SAFE, 2),
        ] {
            let path = castle_masks::for_color(path, color);
            let safe = castle_masks::for_color(safe, color);
            if self.board.castling.get(color, kingside)
                && empty & path == path
                && attacked & safe == 0
            {
                self.moves
                    .push(Move::new(from, Coord::new(to_x, y), MoveType::Castle(color)))?;
            }
        }
        Ok(())
    }

    /// Pushes, double pushes, captures, promotions and en passant.
    ///
    /// Destinations are produced set-wise by shifting the whole pawn plane; the origin of
    /// each destination is recovered from the shift distance.
    fn generate_pawn_moves(&mut self, capturable: u64) -> ChessResult<()> {
        let pawns = self.own(self.board.pawns);
        let empty = self.board.empty;

        match self.color {
            Color::White => {
                let single = (pawns << 8) & empty;
                let double = (pawns << 16) & empty & (empty << 8) & RANK_4;
                // towards the a-file
                let left = (pawns << 9) & capturable & !FILE_H;
                // towards the h-file
                let right = (pawns << 7) & capturable & !FILE_A;

                self.push_pawn_moves(single, -8, RANK_8)?;
                self.push_pawn_moves(double, -16, RANK_8)?;
                self.push_pawn_moves(left, -9, RANK_8)?;
                self.push_pawn_moves(right, -7, RANK_8)?;
            }
            Color::Black => {
                let single = (pawns >> 8) & empty;
                let double = (pawns >> 16) & empty & (empty >> 8) & RANK_5;
                let left = (pawns >> 7) & capturable & !FILE_H;
                let right = (pawns >> 9) & capturable & !FILE_A;

                self.push_pawn_moves(single, 8, RANK_1)?;
                self.push_pawn_moves(double, 16, RANK_1)?;
                self.push_pawn_moves(left, 7, RANK_1)?;
                self.push_pawn_moves(right, 9, RANK_1)?;
            }
        }

        self.generate_en_passant(pawns)
    }

    /// Emit one move per destination, or four when it lands on the last rank.
    fn push_pawn_moves(
        &mut self,
        destinations: u64,
        offset: i8,
        last_rank: u64,
    ) -> ChessResult<()> {
        for to_sq in BitboardIter(destinations & !last_rank) {
            let from_sq = (to_sq as i8 + offset) as u8;
            self.moves
                .push(Move::from_squares(from_sq, to_sq, MoveType::Pawn(self.color)))?;
        }
        for to_sq in BitboardIter(destinations & last_rank) {
            let from_sq = (to_sq as i8 + offset) as u8;
            for piece in PIECES_CAN_PROMOTE_TO {
                self.moves
                    .push(Move::from_squares(from_sq, to_sq, MoveType::Promotion(piece)))?;
            }
        }
        Ok(())
    }

    fn generate_en_passant(&mut self, pawns: u64) -> ChessResult<()> {
        let opponent = self.color.other_color();
        let (rank, forward) = match self.color {
            Color::White => (RANK_5, 8i8),
            Color::Black => (RANK_4, -8i8),
        };
        let target = self.board.en_passant & self.board.pawns & self.board.pieces(opponent) & rank;
        if target == 0 {
            return Ok(());
        }

        let neighbours = ((target << 1) & !FILE_H) | ((target >> 1) & !FILE_A);
        let victim_sq = target.trailing_zeros() as i8;
        let to_sq = (victim_sq + forward) as u8;
        for from_sq in BitboardIter(neighbours & pawns) {
            self.moves
                .push(Move::from_squares(from_sq, to_sq, MoveType::EnPassant(self.color)))?;
        }
        Ok(())
    }
}

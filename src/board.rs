//! Bitboard position: piece and color planes, move application and king safety.

use std::fmt;
use std::str::FromStr;

use crate::bitboard::{
    black_pawn_attacks, king_moves, knight_moves, sq_to_bb, white_pawn_attacks, xy_to_sq,
    BitboardIter, RANK_1, RANK_2, RANK_7, RANK_8,
};
use crate::error::{ChessError, ChessResult, FenError};
use crate::magic::{bishop_attacks, rook_attacks};
use crate::movegen::MoveGenerator;
use crate::movelist::MoveList;
use crate::types::{Color, Coord, Move, MoveRequest, MoveType, PieceType, Status};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Home corner of a rook, by color and side.
#[inline(always)]
pub(crate) const fn rook_home(color: Color, kingside: bool) -> u64 {
    let corner = if kingside { 1 } else { 1 << 7 };
    match color {
        Color::White => corner,
        Color::Black => corner << 56,
    }
}

/// King start square (e1/e8).
#[inline(always)]
pub(crate) const fn king_home(color: Color) -> u64 {
    match color {
        Color::White => 1 << 3,
        Color::Black => 1 << 59,
    }
}

/// White-side masks of the squares a castle touches; shift by 56 for black.
pub(crate) mod castle_masks {
    /// f1 g1
    pub const KINGSIDE_EMPTY: u64 = 0b0000_0110;
    pub const KINGSIDE_SAFE: u64 = 0b0000_0110;
    /// b1 c1 d1
    pub const QUEENSIDE_EMPTY: u64 = 0b0111_0000;
    /// c1 d1, the rook alone passes b1
    pub const QUEENSIDE_SAFE: u64 = 0b0011_0000;

    pub const KINGSIDE_KING: u64 = 0b0000_1010;
    pub const KINGSIDE_ROOK: u64 = 0b0000_0101;
    pub const QUEENSIDE_KING: u64 = 0b0010_1000;
    pub const QUEENSIDE_ROOK: u64 = 0b1001_0000;

    #[inline(always)]
    pub const fn for_color(mask: u64, color: crate::types::Color) -> u64 {
        match color {
            crate::types::Color::White => mask,
            crate::types::Color::Black => mask << 56,
        }
    }
}

/// Castling availability. Rights only ever go from true to false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub const ALL: CastlingRights = CastlingRights {
        white_kingside: true,
        white_queenside: true,
        black_kingside: true,
        black_queenside: true,
    };

    pub fn get(&self, color: Color, kingside: bool) -> bool {
        match (color, kingside) {
            (Color::White, true) => self.white_kingside,
            (Color::White, false) => self.white_queenside,
            (Color::Black, true) => self.black_kingside,
            (Color::Black, false) => self.black_queenside,
        }
    }

    pub fn revoke(&mut self, color: Color, kingside: bool) {
        match (color, kingside) {
            (Color::White, true) => self.white_kingside = false,
            (Color::White, false) => self.white_queenside = false,
            (Color::Black, true) => self.black_kingside = false,
            (Color::Black, false) => self.black_queenside = false,
        }
    }

    pub fn revoke_all(&mut self, color: Color) {
        self.revoke(color, true);
        self.revoke(color, false);
    }

    fn to_fen(self) -> String {
        let mut res = String::new();
        for (allowed, c) in [
            (self.white_kingside, 'K'),
            (self.white_queenside, 'Q'),
            (self.black_kingside, 'k'),
            (self.black_queenside, 'q'),
        ] {
            if allowed {
                res.push(c);
            }
        }
        if res.is_empty() {
            res.push('-');
        }
        res
    }
}

/// A chess position.
///
/// Six piece-type planes hold every piece regardless of color and two color planes say
/// whose it is. The struct is plain data and `Copy`, so speculative moves are made on a
/// copy and the original is never touched.
///
/// Equality compares the position only. The attack caches are left out since the one
/// of the side that just moved is not refreshed by `make_move`.
#[derive(Debug, Clone, Copy)]
pub struct Board {
    pub(crate) white: u64,
    pub(crate) black: u64,
    pub(crate) pawns: u64,
    pub(crate) knights: u64,
    pub(crate) bishops: u64,
    pub(crate) rooks: u64,
    pub(crate) queens: u64,
    pub(crate) kings: u64,
    /// Pawn that just made a double step, if any
    pub(crate) en_passant: u64,
    pub(crate) active_color: Color,
    pub(crate) castling: CastlingRights,
    pub(crate) halfmove_clock: u32,
    pub(crate) fullmove_number: u32,

    // derived
    pub(crate) occupied: u64,
    pub(crate) empty: u64,
    /// Squares attacked by each color, indexed by `Color as usize`
    pub(crate) attacked: [u64; 2],
}

impl Board {
    /// The standard starting position.
    pub fn new() -> Self {
        let mut board = Board {
            white: RANK_1 | RANK_2,
            black: RANK_7 | RANK_8,
            pawns: RANK_2 | RANK_7,
            knights: 0x42 | (0x42 << 56),
            bishops: 0x24 | (0x24 << 56),
            rooks: 0x81 | (0x81 << 56),
            queens: 0x10 | (0x10 << 56),
            kings: 0x08 | (0x08 << 56),
            castling: CastlingRights::ALL,
            ..Self::empty_board()
        };
        board.refresh_derived();
        board
    }

    fn empty_board() -> Self {
        Board {
            white: 0,
            black: 0,
            pawns: 0,
            knights: 0,
            bishops: 0,
            rooks: 0,
            queens: 0,
            kings: 0,
            en_passant: 0,
            active_color: Color::White,
            castling: CastlingRights::default(),
            halfmove_clock: 0,
            fullmove_number: 1,
            occupied: 0,
            empty: !0,
            attacked: [0; 2],
        }
    }

    pub fn from_fen(fen: &str) -> ChessResult<Board> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().ok_or(FenError::MissingField("piece placement"))?;
        let side = fields.next().ok_or(FenError::MissingField("side to move"))?;
        let castling = fields.next().ok_or(FenError::MissingField("castling"))?;
        let en_passant = fields.next().ok_or(FenError::MissingField("en passant"))?;

        let mut board = Self::empty_board();

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::WrongRankCount(ranks.len()).into());
        }
        for (y, rank) in ranks.iter().enumerate() {
            let mut x = 0usize;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10).filter(|d| (1..=8).contains(d)) {
                    x += skip as usize;
                    continue;
                }
                let piece = PieceType::from_char(c).ok_or(FenError::InvalidPlacementChar(c))?;
                if x >= 8 {
                    return Err(FenError::WrongRankLength {
                        rank: 8 - y,
                        files: x + 1,
                    }
                    .into());
                }
                let bb = sq_to_bb(xy_to_sq(x as u8, y as u8));
                *board.piece_bb_mut(piece) |= bb;
                *board.color_bb_mut(Color::from_case(c)) |= bb;
                x += 1;
            }
            if x != 8 {
                return Err(FenError::WrongRankLength {
                    rank: 8 - y,
                    files: x,
                }
                .into());
            }
        }

        board.active_color = match side {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(FenError::InvalidSideToMove(side.to_string()).into()),
        };

        if castling != "-" {
            for c in castling.chars() {
                match c {
                    'K' => board.castling.white_kingside = true,
                    'Q' => board.castling.white_queenside = true,
                    'k' => board.castling.black_kingside = true,
                    'q' => board.castling.black_queenside = true,
                    _ => return Err(FenError::InvalidCastlingChar(c).into()),
                }
            }
        }

        board.en_passant = parse_en_passant(en_passant)?;

        // move counters are optional, but must be numbers when given
        if let Some(halfmove) = fields.next() {
            board.halfmove_clock = parse_counter("halfmove clock", halfmove)?;
        }
        if let Some(fullmove) = fields.next() {
            board.fullmove_number = parse_counter("fullmove number", fullmove)?;
        }

        board.refresh_derived();
        Ok(board)
    }

    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for y in 0..8u8 {
            let mut empty = 0;
            for x in 0..8u8 {
                match self.piece_at(xy_to_sq(x, y)) {
                    Some((color, piece)) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(piece.to_char_colored(color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if y < 7 {
                placement.push('/');
            }
        }

        let en_passant = match BitboardIter(self.en_passant).next() {
            Some(sq) => {
                // the target square is the one the pawn skipped
                let pawn = Coord::from_sq(sq);
                let y = if pawn.y == 4 { 5 } else { 2 };
                Coord::new(pawn.x, y).to_algebraic()
            }
            None => "-".to_string(),
        };

        format!(
            "{} {} {} {} {} {}",
            placement,
            self.active_color.to_char(),
            self.castling.to_fen(),
            en_passant,
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    pub fn active_color(&self) -> Color {
        self.active_color
    }

    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    /// Square of the pawn that can be captured en passant, as a bitboard.
    pub fn en_passant(&self) -> u64 {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    pub fn occupied(&self) -> u64 {
        self.occupied
    }

    pub fn empty_squares(&self) -> u64 {
        self.empty
    }

    #[inline(always)]
    pub fn pieces(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    #[inline(always)]
    pub(crate) fn color_bb_mut(&mut self, color: Color) -> &mut u64 {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    /// All pieces of a type, both colors.
    #[inline(always)]
    pub fn piece_bb(&self, piece: PieceType) -> u64 {
        match piece {
            PieceType::Pawn => self.pawns,
            PieceType::Knight => self.knights,
            PieceType::Bishop => self.bishops,
            PieceType::Rook => self.rooks,
            PieceType::Queen => self.queens,
            PieceType::King => self.kings,
        }
    }

    #[inline(always)]
    fn piece_bb_mut(&mut self, piece: PieceType) -> &mut u64 {
        match piece {
            PieceType::Pawn => &mut self.pawns,
            PieceType::Knight => &mut self.knights,
            PieceType::Bishop => &mut self.bishops,
            PieceType::Rook => &mut self.rooks,
            PieceType::Queen => &mut self.queens,
            PieceType::King => &mut self.kings,
        }
    }

    /// What stands on a square: the color plane first, then the piece planes in order.
    pub fn piece_at(&self, sq: u8) -> Option<(Color, PieceType)> {
        let bb = sq_to_bb(sq);
        let color = if self.white & bb != 0 {
            Color::White
        } else if self.black & bb != 0 {
            Color::Black
        } else {
            return None;
        };
        PieceType::ALL
            .into_iter()
            .find(|&piece| self.piece_bb(piece) & bb != 0)
            .map(|piece| (color, piece))
    }

    pub fn piece_at_coord(&self, coord: Coord) -> Option<(Color, PieceType)> {
        self.piece_at(coord.to_sq())
    }

    /// Every square attacked by `color`, computed from the planes.
    pub fn attacked_squares(&self, color: Color) -> u64 {
        let own = self.pieces(color);
        let occupied = self.occupied;

        let pawns = self.pawns & own;
        let mut attacks = match color {
            Color::White => white_pawn_attacks(pawns),
            Color::Black => black_pawn_attacks(pawns),
        };
        for sq in BitboardIter(self.knights & own) {
            attacks |= knight_moves(sq);
        }
        for sq in BitboardIter((self.bishops | self.queens) & own) {
            attacks |= bishop_attacks(sq, occupied);
        }
        for sq in BitboardIter((self.rooks | self.queens) & own) {
            attacks |= rook_attacks(sq, occupied);
        }
        for sq in BitboardIter(self.kings & own) {
            attacks |= king_moves(sq);
        }
        attacks
    }

    /// Recompute the cached attack set of one color.
    #[inline]
    pub(crate) fn refresh_attacks(&mut self, color: Color) {
        self.attacked[color as usize] = self.attacked_squares(color);
    }

    /// Cached attack set of a color. Valid for the side to move after every move.
    #[inline(always)]
    pub(crate) fn cached_attacks(&self, color: Color) -> u64 {
        self.attacked[color as usize]
    }

    fn update_occupancy(&mut self) {
        self.occupied = self.white | self.black;
        self.empty = !self.occupied;
    }

    fn refresh_derived(&mut self) {
        self.update_occupancy();
        self.refresh_attacks(Color::White);
        self.refresh_attacks(Color::Black);
    }

    /// Apply a move in place. A promotion to pawn or king is rejected before anything
    /// changes.
    pub fn make_move(&mut self, mv: &Move) -> ChessResult<()> {
        if let MoveType::Promotion(PieceType::Pawn | PieceType::King) = mv.move_type {
            return Err(ChessError::InvalidMoveType(mv.move_type));
        }

        let mover = self.active_color;
        let start = mv.from.to_bb();
        let end = mv.to.to_bb();
        let move_mask = start | end;

        self.en_passant = 0;
        self.halfmove_clock += 1;

        match mv.move_type {
            MoveType::EnPassant(color) => {
                // the captured pawn sits beside the start square, on the destination file
                let captured = Coord::new(mv.to.x, mv.from.y).to_bb();
                self.pawns ^= move_mask | captured;
                *self.color_bb_mut(color) ^= move_mask;
                *self.color_bb_mut(color.other_color()) ^= captured;
                self.halfmove_clock = 0;
            }
            MoveType::Castle(color) => self.castle(color, mv.to.x > mv.from.x),
            move_type => {
                self.capture(end);
                *self.color_bb_mut(mover) ^= move_mask;
                match move_type {
                    MoveType::Knight => self.knights ^= move_mask,
                    MoveType::Bishop => self.bishops ^= move_mask,
                    MoveType::Queen => self.queens ^= move_mask,
                    MoveType::Rook(color) => {
                        self.rooks ^= move_mask;
                        for kingside in [true, false] {
                            if start == rook_home(color, kingside) {
                                self.castling.revoke(color, kingside);
                            }
                        }
                    }
                    MoveType::King(color) => {
                        self.kings ^= move_mask;
                        self.castling.revoke_all(color);
                    }
                    MoveType::Pawn(_) => {
                        self.pawns ^= move_mask;
                        self.halfmove_clock = 0;
                        if mv.from.y.abs_diff(mv.to.y) == 2 {
                            self.en_passant = end;
                        }
                    }
                    MoveType::Promotion(piece) => {
                        self.pawns ^= start;
                        *self.piece_bb_mut(piece) ^= end;
                        self.halfmove_clock = 0;
                    }
                    MoveType::EnPassant(_) | MoveType::Castle(_) => unreachable!(),
                }
            }
        }

        if mover == Color::Black {
            self.fullmove_number += 1;
        }
        self.active_color = mover.other_color();
        self.update_occupancy();
        self.refresh_attacks(self.active_color);
        Ok(())
    }

    /// Copy-make: the resulting position, leaving `self` untouched.
    pub fn apply_move(&self, mv: &Move) -> ChessResult<Board> {
        let mut next = *self;
        next.make_move(mv)?;
        Ok(next)
    }

    /// Remove whatever enemy piece sits on `end`. Kings are never captured.
    fn capture(&mut self, end: u64) {
        let opponent = self.active_color.other_color();
        if self.pieces(opponent) & end == 0 {
            return;
        }
        self.halfmove_clock = 0;
        for kingside in [true, false] {
            if end == rook_home(opponent, kingside) {
                self.castling.revoke(opponent, kingside);
            }
        }
        let keep = !end;
        self.pawns &= keep;
        self.knights &= keep;
        self.bishops &= keep;
        self.rooks &= keep;
        self.queens &= keep;
        *self.color_bb_mut(opponent) &= keep;
    }

    fn castle(&mut self, color: Color, kingside: bool) {
        let (king, rook) = if kingside {
            (castle_masks::KINGSIDE_KING, castle_masks::KINGSIDE_ROOK)
        } else {
            (castle_masks::QUEENSIDE_KING, castle_masks::QUEENSIDE_ROOK)
        };
        let king = castle_masks::for_color(king, color);
        let rook = castle_masks::for_color(rook, color);
        self.kings ^= king;
        self.rooks ^= rook;
        *self.color_bb_mut(color) ^= king | rook;
        self.castling.revoke_all(color);
    }

    /// After a move: is the king of the side that just moved attacked.
    #[inline]
    pub fn is_own_king_attacked(&self) -> bool {
        let mover = self.active_color.other_color();
        self.kings & self.pieces(mover) & self.cached_attacks(self.active_color) != 0
    }

    /// Is the side to move in check.
    pub fn is_check(&self) -> bool {
        let opponent = self.active_color.other_color();
        self.kings & self.pieces(self.active_color) & self.attacked_squares(opponent) != 0
    }

    /// Every pseudo-legal move for the side to move. Takes `&mut self` because a right
    /// whose rook has left its corner is revoked here.
    pub fn pseudo_legal_moves(&mut self) -> ChessResult<MoveList> {
        MoveGenerator::new(self).generate()
    }

    /// Pseudo-legal moves that do not leave the mover's king attacked.
    pub fn legal_moves(&mut self) -> ChessResult<MoveList> {
        let mut legal = MoveList::new();
        for mv in self.pseudo_legal_moves()? {
            if !self.apply_move(&mv)?.is_own_king_attacked() {
                legal.push(mv)?;
            }
        }
        Ok(legal)
    }

    pub fn is_checkmate(&mut self) -> ChessResult<bool> {
        Ok(self.is_check() && self.legal_moves()?.is_empty())
    }

    pub fn is_stalemate(&mut self) -> ChessResult<bool> {
        Ok(!self.is_check() && self.legal_moves()?.is_empty())
    }

    /// `None` while the game goes on.
    pub fn status(&mut self) -> ChessResult<Option<Status>> {
        if !self.legal_moves()?.is_empty() {
            return Ok(None);
        }
        if self.is_check() {
            Ok(Some(Status::Checkmate(self.active_color.other_color())))
        } else {
            Ok(Some(Status::Stalemate))
        }
    }

    /// Match coordinate text such as `e2e4` or `a7a8q` against the legal moves.
    pub fn resolve_move(&mut self, text: &str) -> ChessResult<Move> {
        let request: MoveRequest = text.parse()?;
        let legal = self.legal_moves()?;
        if let Some(mv) = legal.iter().find(|mv| mv.matches(&request)) {
            return Ok(*mv);
        }
        let needs_promotion = request.promotion.is_none()
            && legal
                .iter()
                .any(|mv| mv.from == request.from && mv.to == request.to);
        if needs_promotion {
            Err(ChessError::MissingPromotion(text.trim().to_string()))
        } else {
            Err(ChessError::IllegalMove(text.trim().to_string()))
        }
    }

    /// Resolve and play a move given as coordinate text.
    pub fn play(&mut self, text: &str) -> ChessResult<Move> {
        let mv = self.resolve_move(text)?;
        self.make_move(&mv)?;
        Ok(mv)
    }
}

fn parse_counter(field: &'static str, value: &str) -> ChessResult<u32> {
    value.parse::<u32>().map_err(|_| {
        FenError::InvalidMoveCounter {
            field,
            value: value.to_string(),
        }
        .into()
    })
}

fn parse_en_passant(field: &str) -> ChessResult<u64> {
    if field == "-" {
        return Ok(0);
    }
    let invalid = || FenError::InvalidEnPassant(field.to_string());
    let target = Coord::from_algebraic(field).map_err(|_| invalid())?;
    // store the pawn that made the double step, one rank past the target
    let pawn_y = match field.as_bytes()[1] {
        b'3' => target.y - 1,
        b'6' => target.y + 1,
        _ => return Err(invalid().into()),
    };
    Ok(Coord::new(target.x, pawn_y).to_bb())
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.white == other.white
            && self.black == other.black
            && self.pawns == other.pawns
            && self.knights == other.knights
            && self.bishops == other.bishops
            && self.rooks == other.rooks
            && self.queens == other.queens
            && self.kings == other.kings
            && self.en_passant == other.en_passant
            && self.active_color == other.active_color
            && self.castling == other.castling
            && self.halfmove_clock == other.halfmove_clock
            && self.fullmove_number == other.fullmove_number
    }
}

impl Eq for Board {}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for Board {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::from_fen(s)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..8u8 {
            write!(f, "{} ", 8 - y)?;
            for x in 0..8u8 {
                let c = match self.piece_at_coord(Coord::new(x, y)) {
                    Some((color, piece)) => piece.to_char_colored(color),
                    None => '.',
                };
                write!(f, "{}", c)?;
                if x < 7 {
                    write!(f, " ")?;
                }
            }
            writeln!(f)?;
        }
        write!(f, "  a b c d e f g h")
    }
}

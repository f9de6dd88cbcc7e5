use std::fmt;
use std::str::FromStr;

use crate::bitboard::{sq_to_bb, sq_x, sq_y, xy_to_sq};
use crate::error::ChessError;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn from_case(c: char) -> Color {
        if c.is_uppercase() {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn other_color(&self) -> Color {
        if *self == Color::White {
            Color::Black
        } else {
            Color::White
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            Self::White => 'w',
            Self::Black => 'b',
        }
    }

    pub fn to_human(&self) -> &str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    /// Lookup order used when resolving which plane holds a square.
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    pub fn from_char(c: char) -> Option<PieceType> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceType::Pawn),
            'n' => Some(PieceType::Knight),
            'b' => Some(PieceType::Bishop),
            'r' => Some(PieceType::Rook),
            'q' => Some(PieceType::Queen),
            'k' => Some(PieceType::King),
            _ => None,
        }
    }

    pub fn to_human(&self) -> &str {
        match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        }
    }

    /// Uppercase letter, as used for white pieces in FEN.
    pub fn to_char(&self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Knight => 'N',
            Self::Bishop => 'B',
            Self::Rook => 'R',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }

    pub fn to_char_colored(&self, color: Color) -> char {
        match color {
            Color::White => self.to_char(),
            Color::Black => self.to_char().to_ascii_lowercase(),
        }
    }
}

/// Promotion classes in the order the generator emits them.
pub const PIECES_CAN_PROMOTE_TO: [PieceType; 4] = [
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Rook,
    PieceType::Queen,
];

/// Board coordinate in the move convention: `x` is the file (0 = a), `y` the rank
/// counted from the top (0 = rank 8).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Coord {
    pub x: u8,
    pub y: u8,
}

impl Coord {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    #[inline(always)]
    pub const fn from_sq(sq: u8) -> Self {
        Self {
            x: sq_x(sq),
            y: sq_y(sq),
        }
    }

    #[inline(always)]
    pub const fn to_sq(&self) -> u8 {
        xy_to_sq(self.x, self.y)
    }

    #[inline(always)]
    pub const fn to_bb(&self) -> u64 {
        sq_to_bb(self.to_sq())
    }

    pub fn from_algebraic(s: &str) -> Result<Coord, ChessError> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ChessError::InvalidSquare(s.to_string()));
        }
        let (file, rank) = (bytes[0], bytes[1]);
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(ChessError::InvalidSquare(s.to_string()));
        }
        Ok(Coord {
            x: file - b'a',
            y: 7 - (rank - b'1'),
        })
    }

    pub fn to_algebraic(&self) -> String {
        format!("{}{}", (b'a' + self.x) as char, 8 - self.y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_algebraic())
    }
}

/// Move class. Tells move application which planes and rights a move touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveType {
    Knight,
    Bishop,
    Queen,
    /// Pawn promotion. Contains the piece promoted to
    Promotion(PieceType),
    /// Pawn push, double push or capture.
    Pawn(Color),
    EnPassant(Color),
    /// Rook move; clears the castling right of its home corner.
    Rook(Color),
    /// King move; clears both castling rights of its color.
    King(Color),
    Castle(Color),
}

impl MoveType {
    pub fn promotion(&self) -> Option<PieceType> {
        match self {
            MoveType::Promotion(piece) => Some(*piece),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Move {
    pub from: Coord,
    pub to: Coord,
    pub move_type: MoveType,
}

/// Two moves are equal when they share coordinates and promotion piece.
impl PartialEq for Move {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.move_type.promotion() == other.move_type.promotion()
    }
}

impl Eq for Move {}

impl Move {
    pub fn new(from: Coord, to: Coord, move_type: MoveType) -> Self {
        Self {
            from,
            to,
            move_type,
        }
    }

    #[inline(always)]
    pub fn from_squares(from_sq: u8, to_sq: u8, move_type: MoveType) -> Self {
        Self {
            from: Coord::from_sq(from_sq),
            to: Coord::from_sq(to_sq),
            move_type,
        }
    }

    pub fn promotion(&self) -> Option<PieceType> {
        self.move_type.promotion()
    }

    /// Does this move answer the parsed text request.
    pub fn matches(&self, request: &MoveRequest) -> bool {
        self.from == request.from
            && self.to == request.to
            && self.promotion() == request.promotion
    }

    /// Coordinate text, e.g. `e2e4` or `e7e8q`.
    pub fn to_uci(&self) -> String {
        let mut res = format!("{}{}", self.from, self.to);
        if let Some(piece) = self.promotion() {
            res.push(piece.to_char().to_ascii_lowercase());
        }
        res
    }

    pub fn to_human(&self) -> String {
        match self.move_type {
            MoveType::Castle(color) => {
                let side = if self.to.x > self.from.x {
                    "kingside"
                } else {
                    "queenside"
                };
                format!("{} castles {}", color.to_human(), side)
            }
            MoveType::EnPassant(color) => format!(
                "{} pawn captures en passant from {} to {}",
                color.to_human(),
                self.from,
                self.to
            ),
            MoveType::Promotion(piece) => format!(
                "pawn moves from {} to {} promoting to {}",
                self.from,
                self.to,
                piece.to_human()
            ),
            _ => format!("{} to {}", self.from, self.to),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

/// A move as typed by a user: coordinates plus an optional promotion letter.
/// Carries no move class; resolve it against a legal move list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub from: Coord,
    pub to: Coord,
    pub promotion: Option<PieceType>,
}

impl FromStr for MoveRequest {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_ascii() || (s.len() != 4 && s.len() != 5) {
            return Err(ChessError::InvalidMoveText(s.to_string()));
        }
        let from = Coord::from_algebraic(&s[0..2])?;
        let to = Coord::from_algebraic(&s[2..4])?;
        let promotion = match s[4..].chars().next() {
            None => None,
            Some(c @ ('n' | 'b' | 'r' | 'q')) => PieceType::from_char(c),
            Some(_) => return Err(ChessError::InvalidMoveText(s.to_string())),
        };
        Ok(MoveRequest {
            from,
            to,
            promotion,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Status {
    /// Contains the winning color
    Checkmate(Color),
    Stalemate,
}

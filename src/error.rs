//! Error types for position construction, move handling and table building.

use thiserror::Error;

use crate::types::MoveType;

/// Malformed position text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("FEN is missing the {0} field")]
    MissingField(&'static str),

    #[error("invalid piece placement character '{0}'")]
    InvalidPlacementChar(char),

    #[error("piece placement has {0} ranks, expected 8")]
    WrongRankCount(usize),

    #[error("rank {rank} describes {files} files, expected 8")]
    WrongRankLength { rank: usize, files: usize },

    #[error("invalid side to move '{0}'")]
    InvalidSideToMove(String),

    #[error("invalid castling character '{0}'")]
    InvalidCastlingChar(char),

    /// The en-passant square must be on rank 3 or rank 6
    #[error("invalid en passant square '{0}'")]
    InvalidEnPassant(String),

    #[error("invalid {field} '{value}'")]
    InvalidMoveCounter { field: &'static str, value: String },
}

/// Errors that can occur in the core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    #[error("invalid FEN: {0}")]
    Fen(#[from] FenError),

    #[error("invalid square '{0}'")]
    InvalidSquare(String),

    #[error("invalid move text '{0}'")]
    InvalidMoveText(String),

    #[error("illegal move '{0}'")]
    IllegalMove(String),

    /// A promotion was requested without naming the piece
    #[error("move '{0}' needs a promotion piece (n, b, r or q)")]
    MissingPromotion(String),

    /// The move class cannot be applied to a position
    #[error("cannot apply move class {0:?}")]
    InvalidMoveType(MoveType),

    /// More candidate moves than any legal position can have
    #[error("move list overflow: more than {0} moves")]
    MoveListOverflow(usize),

    #[error("no magic found for {piece} on square {square} after {attempts} attempts")]
    MagicSearchExhausted {
        piece: &'static str,
        square: u8,
        attempts: u64,
    },
}

/// Result type alias for core operations
pub type ChessResult<T> = Result<T, ChessError>;

pub mod bitboard;
pub mod board;
pub mod error;
pub mod magic;
pub mod movegen;
pub mod movelist;
pub mod perft;
pub mod types;

pub use board::Board;
pub use error::{ChessError, ChessResult, FenError};
pub use movelist::MoveList;
pub use types::{Color, Coord, Move, MoveType, PieceType, Status};

//! Growable move list with a hard capacity.
//!
//! The most moves known in a legal position is 218, so running past `MAX_MOVES` means
//! the position is corrupt. The fault is returned to the caller rather than aborting.

use std::ops::Deref;

use crate::error::{ChessError, ChessResult};
use crate::types::Move;

/// Maximum number of candidate moves produced by one generation call.
pub const MAX_MOVES: usize = 256;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveList {
    moves: Vec<Move>,
}

impl MoveList {
    /// Create a new empty move list.
    #[inline]
    pub fn new() -> Self {
        Self {
            moves: Vec::with_capacity(MAX_MOVES),
        }
    }

    /// Add a move to the list, failing once `MAX_MOVES` are stored.
    #[inline(always)]
    pub fn push(&mut self, mv: Move) -> ChessResult<()> {
        if self.moves.len() >= MAX_MOVES {
            return Err(ChessError::MoveListOverflow(MAX_MOVES));
        }
        self.moves.push(mv);
        Ok(())
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl Deref for MoveList {
    type Target = [Move];

    fn deref(&self) -> &[Move] {
        &self.moves
    }
}

impl IntoIterator for MoveList {
    type Item = Move;
    type IntoIter = std::vec::IntoIter<Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.into_iter()
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coord, MoveType};

    fn mv(from_sq: u8, to_sq: u8) -> Move {
        Move::from_squares(from_sq, to_sq, MoveType::Knight)
    }

    #[test]
    fn test_new_is_empty() {
        let list = MoveList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_push_and_iterate() {
        let mut list = MoveList::new();
        list.push(mv(1, 18)).unwrap();
        list.push(mv(6, 21)).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], mv(1, 18));
        let targets: Vec<Coord> = list.iter().map(|m| m.to).collect();
        assert_eq!(targets, vec![Coord::from_sq(18), Coord::from_sq(21)]);
        assert!(list.contains(&mv(6, 21)));
    }

    #[test]
    fn test_fills_to_capacity() {
        let mut list = MoveList::new();
        for i in 0..MAX_MOVES {
            list.push(mv((i % 64) as u8, ((i + 1) % 64) as u8)).unwrap();
        }
        assert_eq!(list.len(), MAX_MOVES);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut list = MoveList::new();
        for i in 0..MAX_MOVES {
            list.push(mv((i % 64) as u8, ((i + 1) % 64) as u8)).unwrap();
        }
        assert_eq!(list.push(mv(0, 1)), Err(ChessError::MoveListOverflow(MAX_MOVES)));
        assert_eq!(list.len(), MAX_MOVES);
    }
}

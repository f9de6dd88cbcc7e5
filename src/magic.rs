//! Magic bitboard attack tables for the sliding pieces.
//!
//! For every square and slider the builder computes the relevant blocker mask, a
//! multiplier that perfectly hashes every blocker subset of that mask into a dense
//! table, and the table of attack sets itself. Lookups are then a mask, a multiply and
//! a shift.
//!
//! The ray geometry below works on `rank = sq / 8` and `file = sq % 8`. Our squares run
//! h1 = 0 .. a8 = 63, which is the mirror image of that geometry, and sliding moves are
//! symmetric under the mirror, so the masks and rays come out right for either layout.

use std::time::Instant;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::error::{ChessError, ChessResult};

/// Entries per square in the rook table (12 relevant bits at most)
pub const ROOK_TABLE_SIZE: usize = 4096;
/// Entries per square in the bishop table (9 relevant bits at most)
pub const BISHOP_TABLE_SIZE: usize = 512;

/// Candidates whose product leaves fewer set bits than this in the top byte are skipped.
const MIN_TOP_BYTE_BITS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slider {
    Rook,
    Bishop,
}

impl Slider {
    pub const ALL: [Slider; 2] = [Slider::Rook, Slider::Bishop];

    pub fn name(&self) -> &'static str {
        match self {
            Slider::Rook => "rook",
            Slider::Bishop => "bishop",
        }
    }

    pub fn table_size(&self) -> usize {
        match self {
            Slider::Rook => ROOK_TABLE_SIZE,
            Slider::Bishop => BISHOP_TABLE_SIZE,
        }
    }

    fn directions(&self) -> [(i32, i32); 4] {
        match self {
            Slider::Rook => [(1, 0), (-1, 0), (0, 1), (0, -1)],
            Slider::Bishop => [(1, 1), (1, -1), (-1, 1), (-1, -1)],
        }
    }

    fn known_magics(&self) -> &'static [u64; 64] {
        match self {
            Slider::Rook => &ROOK_MAGICS,
            Slider::Bishop => &BISHOP_MAGICS,
        }
    }

    /// Squares whose occupancy can change the attack set from `sq`. The last square of
    /// every ray is left out since nothing lies beyond it.
    pub fn relevant_mask(&self, sq: u8) -> u64 {
        let rank = (sq >> 3) as i32;
        let file = (sq & 7) as i32;
        let mut mask = 0u64;

        for (dr, df) in self.directions() {
            let mut r = rank + dr;
            let mut f = file + df;
            while on_board(r, f) && on_board(r + dr, f + df) {
                mask |= 1u64 << (r * 8 + f);
                r += dr;
                f += df;
            }
        }
        mask
    }

    /// Ray-cast attacks, stopping at (and including) the first blocker in each direction.
    pub fn slow_attacks(&self, sq: u8, occupied: u64) -> u64 {
        let rank = (sq >> 3) as i32;
        let file = (sq & 7) as i32;
        let mut attacks = 0u64;

        for (dr, df) in self.directions() {
            let mut r = rank + dr;
            let mut f = file + df;
            while on_board(r, f) {
                let target = 1u64 << (r * 8 + f);
                attacks |= target;
                if occupied & target != 0 {
                    break;
                }
                r += dr;
                f += df;
            }
        }
        attacks
    }
}

#[inline(always)]
fn on_board(rank: i32, file: i32) -> bool {
    (0..8).contains(&rank) && (0..8).contains(&file)
}

/// Blocker subset number `index` of `mask`: bit `i` of the index says whether the
/// `i`-th lowest square of the mask is occupied.
pub fn index_to_occupancy(index: usize, mask: u64) -> u64 {
    let mut remaining = mask;
    let mut occupancy = 0u64;
    let mut i = 0;
    while remaining != 0 {
        let low = remaining & remaining.wrapping_neg();
        if index & (1 << i) != 0 {
            occupancy |= low;
        }
        remaining ^= low;
        i += 1;
    }
    occupancy
}

/// The perfect-hash parameters for one square.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Magic {
    pub mask: u64,
    pub magic: u64,
    pub shift: u8,
}

impl Magic {
    #[inline(always)]
    pub fn index(&self, occupied: u64) -> usize {
        ((occupied & self.mask).wrapping_mul(self.magic) >> self.shift) as usize
    }
}

/// Every blocker subset of a mask together with its true attack set.
struct SquareSubsets {
    occupancies: Vec<u64>,
    attacks: Vec<u64>,
}

impl SquareSubsets {
    fn new(slider: Slider, sq: u8, mask: u64) -> Self {
        let n = 1usize << mask.count_ones();
        let occupancies: Vec<u64> = (0..n).map(|i| index_to_occupancy(i, mask)).collect();
        let attacks = occupancies
            .iter()
            .map(|&occ| slider.slow_attacks(sq, occ))
            .collect();
        Self {
            occupancies,
            attacks,
        }
    }

    /// Try to hash every subset with `candidate`. `used` doubles as the output table;
    /// zero marks an unused slot since no attack set is empty. Two subsets may share a
    /// slot when their attack sets agree.
    fn fill(&self, candidate: &Magic, used: &mut [u64]) -> bool {
        used.fill(0);
        for (&occ, &attack) in self.occupancies.iter().zip(&self.attacks) {
            let idx = candidate.index(occ);
            if used[idx] == 0 {
                used[idx] = attack;
            } else if used[idx] != attack {
                return false;
            }
        }
        true
    }
}

/// Sparse random candidate, the AND of three random words.
fn random_candidate(rng: &mut StdRng) -> u64 {
    rng.gen::<u64>() & rng.gen::<u64>() & rng.gen::<u64>()
}

/// Randomized search for a magic for one square. `max_attempts` of `None` searches
/// until one is found. On success `table` holds the filled attack table.
pub fn find_magic(
    slider: Slider,
    sq: u8,
    rng: &mut StdRng,
    max_attempts: Option<u64>,
    table: &mut [u64],
) -> ChessResult<Magic> {
    let mask = slider.relevant_mask(sq);
    let bits = mask.count_ones();
    let subsets = SquareSubsets::new(slider, sq, mask);
    let used = &mut table[..1 << bits];

    let mut attempts = 0u64;
    while max_attempts.map_or(true, |max| attempts < max) {
        attempts += 1;
        let magic = random_candidate(rng);
        if (mask.wrapping_mul(magic) & 0xFF00_0000_0000_0000).count_ones() < MIN_TOP_BYTE_BITS {
            continue;
        }
        let candidate = Magic {
            mask,
            magic,
            shift: (64 - bits) as u8,
        };
        if subsets.fill(&candidate, used) {
            return Ok(candidate);
        }
    }

    Err(ChessError::MagicSearchExhausted {
        piece: slider.name(),
        square: sq,
        attempts,
    })
}

/// Controls how the tables are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicConfig {
    /// Seed for the random search, so the output is reproducible
    pub seed: u64,
    /// Candidates tried per square before giving up; `None` never gives up
    pub max_attempts: Option<u64>,
    /// Try the precomputed constants before searching
    pub use_known_magics: bool,
}

impl Default for MagicConfig {
    fn default() -> Self {
        Self {
            seed: 0x6D61_6769_6373_2121,
            max_attempts: None,
            use_known_magics: true,
        }
    }
}

/// Rook and bishop lookup tables, one fixed-size block per square.
pub struct MagicTables {
    rook_magics: [Magic; 64],
    bishop_magics: [Magic; 64],
    rook_table: Vec<u64>,
    bishop_table: Vec<u64>,
    /// How many squares needed a random search
    searched: usize,
}

impl MagicTables {
    /// Tables with the default configuration. The search is unbounded so this cannot
    /// run out of attempts.
    pub fn new() -> Self {
        match Self::build(&MagicConfig::default()) {
            Ok(tables) => tables,
            Err(e) => unreachable!("unbounded magic search failed: {e}"),
        }
    }

    /// Pure randomized discovery for every square, ignoring the known constants.
    pub fn generate(config: MagicConfig) -> ChessResult<Self> {
        Self::build(&MagicConfig {
            use_known_magics: false,
            ..config
        })
    }

    pub fn build(config: &MagicConfig) -> ChessResult<Self> {
        let start = Instant::now();
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut tables = MagicTables {
            rook_magics: [Magic::default(); 64],
            bishop_magics: [Magic::default(); 64],
            rook_table: vec![0; 64 * ROOK_TABLE_SIZE],
            bishop_table: vec![0; 64 * BISHOP_TABLE_SIZE],
            searched: 0,
        };

        for slider in Slider::ALL {
            let size = slider.table_size();
            for sq in 0..64u8 {
                let block = sq as usize * size..(sq as usize + 1) * size;
                let (magics, table) = match slider {
                    Slider::Rook => (&mut tables.rook_magics, &mut tables.rook_table[block]),
                    Slider::Bishop => (&mut tables.bishop_magics, &mut tables.bishop_table[block]),
                };

                let known = if config.use_known_magics {
                    verify_known(slider, sq, table)
                } else {
                    None
                };
                magics[sq as usize] = match known {
                    Some(magic) => magic,
                    None => {
                        if config.use_known_magics {
                            debug!(piece = slider.name(), sq, "known magic rejected, searching");
                        }
                        tables.searched += 1;
                        find_magic(slider, sq, &mut rng, config.max_attempts, table)?
                    }
                };
            }
        }

        if config.use_known_magics && tables.searched > 0 {
            warn!(
                squares = tables.searched,
                "some precomputed magics failed verification"
            );
        }
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            searched = tables.searched,
            "magic tables built"
        );
        Ok(tables)
    }

    #[inline(always)]
    pub fn rook_attacks(&self, sq: u8, occupied: u64) -> u64 {
        let magic = &self.rook_magics[sq as usize];
        self.rook_table[sq as usize * ROOK_TABLE_SIZE + magic.index(occupied)]
    }

    #[inline(always)]
    pub fn bishop_attacks(&self, sq: u8, occupied: u64) -> u64 {
        let magic = &self.bishop_magics[sq as usize];
        self.bishop_table[sq as usize * BISHOP_TABLE_SIZE + magic.index(occupied)]
    }

    /// Union of the rook and bishop lookups from `sq`.
    #[inline(always)]
    pub fn queen_attacks(&self, sq: u8, occupied: u64) -> u64 {
        self.bishop_attacks(sq, occupied) | self.rook_attacks(sq, occupied)
    }

    pub fn magic(&self, slider: Slider, sq: u8) -> Magic {
        match slider {
            Slider::Rook => self.rook_magics[sq as usize],
            Slider::Bishop => self.bishop_magics[sq as usize],
        }
    }

    /// Number of squares whose magic came from the random search.
    pub fn searched_squares(&self) -> usize {
        self.searched
    }
}

impl Default for MagicTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Check the precomputed constant for a square against every blocker subset.
fn verify_known(slider: Slider, sq: u8, table: &mut [u64]) -> Option<Magic> {
    let mask = slider.relevant_mask(sq);
    let bits = mask.count_ones();
    let candidate = Magic {
        mask,
        magic: slider.known_magics()[sq as usize],
        shift: (64 - bits) as u8,
    };
    let subsets = SquareSubsets::new(slider, sq, mask);
    subsets
        .fill(&candidate, &mut table[..1 << bits])
        .then_some(candidate)
}

/// Process-wide tables, built on first use
pub static MAGIC_TABLES: Lazy<MagicTables> = Lazy::new(MagicTables::new);

/// Build the global tables now instead of on the first lookup. Call before spawning
/// worker threads to keep construction off the hot path.
pub fn init() {
    Lazy::force(&MAGIC_TABLES);
}

#[inline(always)]
pub fn rook_attacks(sq: u8, occupied: u64) -> u64 {
    MAGIC_TABLES.rook_attacks(sq, occupied)
}

#[inline(always)]
pub fn bishop_attacks(sq: u8, occupied: u64) -> u64 {
    MAGIC_TABLES.bishop_attacks(sq, occupied)
}

#[inline(always)]
pub fn queen_attacks(sq: u8, occupied: u64) -> u64 {
    MAGIC_TABLES.queen_attacks(sq, occupied)
}

/// Well-known bishop magics, tried before searching.
const BISHOP_MAGICS: [u64; 64] = [
    0x0002020202020200, 0x0002020202020000, 0x0004010202000000, 0x0004040080000000,
    0x0001104000000000, 0x0000821040000000, 0x0000410410400000, 0x0000104104104000,
    0x0000040404040400, 0x0000020202020200, 0x0000040102020000, 0x0000040400800000,
    0x0000011040000000, 0x0000008210400000, 0x0000004104104000, 0x0000002082082000,
    0x0004000808080800, 0x0002000404040400, 0x0001000202020200, 0x0000800802004000,
    0x0000800400A00000, 0x0000200100884000, 0x0000400082082000, 0x0000200041041000,
    0x0002080010101000, 0x0001040008080800, 0x0000208004010400, 0x0000404004010200,
    0x0000840000802000, 0x0000404002011000, 0x0000808001041000, 0x0000404000820800,
    0x0001041000202000, 0x0000820800101000, 0x0000104400080800, 0x0000020080080080,
    0x0000404040040100, 0x0000808100020100, 0x0001010100020800, 0x0000808080010400,
    0x0000820820004000, 0x0000410410002000, 0x0000082088001000, 0x0000002011000800,
    0x0000080100400400, 0x0001010101000200, 0x0002020202000400, 0x0001010101000200,
    0x0000410410400000, 0x0000208208200000, 0x0000002084100000, 0x0000000020880000,
    0x0000001002020000, 0x0000040408020000, 0x0004040404040000, 0x0002020202020000,
    0x0000104104104000, 0x0000002082082000, 0x0000000020841000, 0x0000000000208800,
    0x0000000010020200, 0x0000000404080200, 0x0000040404040400, 0x0002020202020200,
];

/// Well-known rook magics, tried before searching.
const ROOK_MAGICS: [u64; 64] = [
    0x0080001020400080, 0x0040001000200040, 0x0080081000200080, 0x0080040800100080,
    0x0080020400080080, 0x0080010200040080, 0x0080008001000200, 0x0080002040800100,
    0x0000800020400080, 0x0000400020005000, 0x0000801000200080, 0x0000800800100080,
    0x0000800400080080, 0x0000800200040080, 0x0000800100020080, 0x0000800040800100,
    0x0000208000400080, 0x0000404000201000, 0x0000808010002000, 0x0000808008001000,
    0x0000808004000800, 0x0000808002000400, 0x0000010100020004, 0x0000020000408104,
    0x0000208080004000, 0x0000200040005000, 0x0000100080200080, 0x0000080080100080,
    0x0000040080080080, 0x0000020080040080, 0x0000010080800200, 0x0000800080004100,
    0x0000204000800080, 0x0000200040401000, 0x0000100080802000, 0x0000080080801000,
    0x0000040080800800, 0x0000020080800400, 0x0000020001010004, 0x0000800040800100,
    0x0000204000808000, 0x0000200040008080, 0x0000100020008080, 0x0000080010008080,
    0x0000040008008080, 0x0000020004008080, 0x0000010002008080, 0x0000004081020004,
    0x0000204000800080, 0x0000200040008080, 0x0000100020008080, 0x0000080010008080,
    0x0000040008008080, 0x0000020004008080, 0x0000800100020080, 0x0000800041000080,
    0x00FFFCDDFCED714A, 0x007FFCDDFCED714A, 0x003FFFCDFFD88096, 0x0000040810002101,
    0x0001000204080011, 0x0001000204000801, 0x0001000082000401, 0x0001FFFAABFAD1A2,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboard::sq_to_bb;
    use crate::types::Coord;
    use pretty_assertions::assert_eq;

    fn sq(name: &str) -> u8 {
        Coord::from_algebraic(name).unwrap().to_sq()
    }

    fn bb(names: &[&str]) -> u64 {
        names.iter().fold(0, |acc, name| acc | sq_to_bb(sq(name)))
    }

    #[test]
    fn test_relevant_mask_sizes() {
        assert_eq!(Slider::Rook.relevant_mask(sq("a1")).count_ones(), 12);
        assert_eq!(Slider::Rook.relevant_mask(sq("e4")).count_ones(), 10);
        assert_eq!(Slider::Rook.relevant_mask(sq("a4")).count_ones(), 11);
        assert_eq!(Slider::Bishop.relevant_mask(sq("a1")).count_ones(), 6);
        assert_eq!(Slider::Bishop.relevant_mask(sq("d4")).count_ones(), 9);
        assert_eq!(Slider::Bishop.relevant_mask(sq("b1")).count_ones(), 5);
        // edges are never relevant
        assert_eq!(Slider::Rook.relevant_mask(sq("e4")) & bb(&["e1", "e8", "a4", "h4"]), 0);
    }

    #[test]
    fn test_index_to_occupancy() {
        let mask = bb(&["b2", "c3", "d4"]);
        assert_eq!(index_to_occupancy(0, mask), 0);
        assert_eq!(index_to_occupancy(7, mask), mask);
        let all: Vec<u64> = (0..8).map(|i| index_to_occupancy(i, mask)).collect();
        for (i, a) in all.iter().enumerate() {
            assert_eq!(a & !mask, 0);
            assert!(all[i + 1..].iter().all(|b| b != a));
        }
    }

    #[test]
    fn test_slow_attacks() {
        let rook = Slider::Rook.slow_attacks(sq("e4"), bb(&["e2", "g4"]));
        assert_eq!(
            rook,
            bb(&["e2", "e3", "e5", "e6", "e7", "e8", "a4", "b4", "c4", "d4", "f4", "g4"])
        );
        let bishop = Slider::Bishop.slow_attacks(sq("e4"), bb(&["c2", "g6"]));
        assert_eq!(
            bishop,
            bb(&["d3", "c2", "f5", "g6", "f3", "g2", "h1", "d5", "c6", "b7", "a8"])
        );
    }

    #[test]
    fn test_magic_rook_attacks_empty_board() {
        // Should attack 14 squares (7 on rank, 7 on file)
        assert_eq!(rook_attacks(sq("e4"), 0).count_ones(), 14);
        assert_eq!(rook_attacks(sq("a1"), 0).count_ones(), 14);
    }

    #[test]
    fn test_magic_rook_attacks_with_blockers() {
        let attacks = rook_attacks(sq("e4"), bb(&["e2", "g4"]));
        assert!(attacks & bb(&["e2"]) != 0);
        assert!(attacks & bb(&["g4"]) != 0);
        assert!(attacks & bb(&["e1"]) == 0);
        assert!(attacks & bb(&["h4"]) == 0);
    }

    #[test]
    fn test_magic_bishop_attacks_empty_board() {
        assert_eq!(bishop_attacks(sq("e4"), 0).count_ones(), 13);
        assert_eq!(bishop_attacks(sq("a1"), 0).count_ones(), 7);
    }

    #[test]
    fn test_magic_queen_attacks() {
        // Should attack 27 squares (14 rook + 13 bishop)
        assert_eq!(queen_attacks(sq("e4"), 0).count_ones(), 27);
    }

    #[test]
    fn test_magic_matches_slow_attacks() {
        let mut rng = StdRng::seed_from_u64(7);
        for sq in 0..64u8 {
            for _ in 0..64 {
                let occupied = rng.gen::<u64>() & rng.gen::<u64>();
                assert_eq!(
                    rook_attacks(sq, occupied),
                    Slider::Rook.slow_attacks(sq, occupied),
                    "rook mismatch at sq={}, occ={:#x}",
                    sq,
                    occupied
                );
                assert_eq!(
                    bishop_attacks(sq, occupied),
                    Slider::Bishop.slow_attacks(sq, occupied),
                    "bishop mismatch at sq={}, occ={:#x}",
                    sq,
                    occupied
                );
            }
        }
    }

    #[test]
    fn test_find_magic_single_square() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut table = vec![0; ROOK_TABLE_SIZE];
        let magic = find_magic(Slider::Rook, sq("d5"), &mut rng, Some(10_000_000), &mut table)
            .unwrap();
        assert_eq!(magic.mask, Slider::Rook.relevant_mask(sq("d5")));
        assert_eq!(magic.shift as u32, 64 - magic.mask.count_ones());
        let occupied = bb(&["d7", "b5", "d2"]);
        assert_eq!(
            table[magic.index(occupied)],
            Slider::Rook.slow_attacks(sq("d5"), occupied)
        );
    }

    #[test]
    fn test_search_exhausted() {
        let config = MagicConfig {
            max_attempts: Some(0),
            ..MagicConfig::default()
        };
        let err = MagicTables::generate(config).err().unwrap();
        assert_eq!(
            err,
            ChessError::MagicSearchExhausted {
                piece: "rook",
                square: 0,
                attempts: 0
            }
        );
    }

    #[test]
    fn test_generate_is_reproducible_and_correct() {
        let config = MagicConfig {
            seed: 1234,
            max_attempts: Some(100_000_000),
            use_known_magics: false,
        };
        let a = MagicTables::generate(config).unwrap();
        let b = MagicTables::generate(config).unwrap();
        assert_eq!(a.searched_squares(), 128);
        for sq in 0..64u8 {
            assert_eq!(a.magic(Slider::Rook, sq), b.magic(Slider::Rook, sq));
            assert_eq!(a.magic(Slider::Bishop, sq), b.magic(Slider::Bishop, sq));
            let occupied = bb(&["c3", "f6", "b7", "g2", "d4", "e5"]);
            assert_eq!(a.rook_attacks(sq, occupied), Slider::Rook.slow_attacks(sq, occupied));
            assert_eq!(
                a.bishop_attacks(sq, occupied),
                Slider::Bishop.slow_attacks(sq, occupied)
            );
        }
    }
}

//! Pre-computed attack tables for move generation and check detection.
//!
//! All tables are initialised once (via `OnceLock`) and live for the lifetime
//! of the process. Leapers (knight, king, pawn captures) use direct lookup.
//! Sliders use per-direction ray tables: the ray is cut at the first blocker,
//! which is itself included so captures fall out of the same mask.

use crate::engine::types::{Bitboard, Color, Square};
use std::sync::OnceLock;

// =========================================================================
// Public API
// =========================================================================

/// Get a reference to the global attack tables.
pub fn tables() -> &'static AttackTables {
    static TABLES: OnceLock<AttackTables> = OnceLock::new();
    TABLES.get_or_init(AttackTables::init)
}

/// The eight ray directions, as (file, rank) steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    pub const ORTHOGONAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub const DIAGONAL: [Direction; 4] = [
        Direction::NorthEast,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::NorthWest,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// (file delta, rank delta) of one step.
    pub const fn delta(self) -> (i8, i8) {
        match self {
            Direction::North => (0, 1),
            Direction::NorthEast => (1, 1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, -1),
            Direction::South => (0, -1),
            Direction::SouthWest => (-1, -1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, 1),
        }
    }

    /// Whether stepping in this direction increases the square index.
    #[inline]
    const fn is_ascending(self) -> bool {
        matches!(
            self,
            Direction::North | Direction::NorthEast | Direction::East | Direction::NorthWest
        )
    }
}

/// Pre-computed attack/move tables for every piece type.
pub struct AttackTables {
    pub knight: [Bitboard; 64],
    pub king: [Bitboard; 64],
    /// `pawn_attacks[color][square]`: squares a pawn on `square` attacks.
    pub pawn_attacks: [[Bitboard; 64]; 2],
    /// `rays[direction][square]`: every square along the ray on an empty board.
    pub rays: [[Bitboard; 64]; 8],
}

impl AttackTables {
    // -------------------------------------------------------------------
    // Leaper lookups
    // -------------------------------------------------------------------

    /// Knight attacks from a square.
    #[inline]
    pub fn knight_attacks(&self, sq: Square) -> Bitboard {
        self.knight[sq.0 as usize]
    }

    /// King attacks from a square.
    #[inline]
    pub fn king_attacks(&self, sq: Square) -> Bitboard {
        self.king[sq.0 as usize]
    }

    /// Pawn attack squares for a given colour.
    #[inline]
    pub fn pawn_attacks(&self, color: Color, sq: Square) -> Bitboard {
        self.pawn_attacks[color.index()][sq.0 as usize]
    }

    // -------------------------------------------------------------------
    // Slider lookups (ray scans)
    // -------------------------------------------------------------------

    /// Squares reached from `sq` in one direction, stopping at (and
    /// including) the first occupied square.
    #[inline]
    pub fn ray_attacks(&self, sq: Square, dir: Direction, occupied: Bitboard) -> Bitboard {
        let ray = self.rays[dir.index()][sq.0 as usize];
        let blockers = ray & occupied;
        let first = if dir.is_ascending() {
            blockers.lsb()
        } else {
            blockers.msb()
        };
        match first {
            Some(b) => Bitboard(ray.0 ^ self.rays[dir.index()][b.0 as usize].0),
            None => ray,
        }
    }

    /// Rook attacks from `sq` given current `occupied` bitboard.
    #[inline]
    pub fn rook_attacks(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        Direction::ORTHOGONAL
            .iter()
            .fold(Bitboard::EMPTY, |acc, &d| acc | self.ray_attacks(sq, d, occupied))
    }

    /// Bishop attacks from `sq` given current `occupied` bitboard.
    #[inline]
    pub fn bishop_attacks(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        Direction::DIAGONAL
            .iter()
            .fold(Bitboard::EMPTY, |acc, &d| acc | self.ray_attacks(sq, d, occupied))
    }

    /// Queen attacks = rook | bishop.
    #[inline]
    pub fn queen_attacks(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        self.rook_attacks(sq, occupied) | self.bishop_attacks(sq, occupied)
    }
}

// =========================================================================
// Initialisation
// =========================================================================

impl AttackTables {
    fn init() -> Self {
        AttackTables {
            knight: init_leaper(&[
                (-2, -1),
                (-2, 1),
                (-1, -2),
                (-1, 2),
                (1, -2),
                (1, 2),
                (2, -1),
                (2, 1),
            ]),
            king: init_leaper(&[
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, -1),
                (0, 1),
                (1, -1),
                (1, 0),
                (1, 1),
            ]),
            pawn_attacks: [init_leaper(&[(-1, 1), (1, 1)]), init_leaper(&[(-1, -1), (1, -1)])],
            rays: init_rays(),
        }
    }
}

/// Table of single-step targets for a fixed offset pattern.
fn init_leaper(offsets: &[(i8, i8)]) -> [Bitboard; 64] {
    let mut table = [Bitboard::EMPTY; 64];
    for (idx, entry) in table.iter_mut().enumerate() {
        let from = Square(idx as u8);
        for &(df, dr) in offsets {
            if let Some(to) = from.offset(df, dr) {
                entry.set(to);
            }
        }
    }
    table
}

fn init_rays() -> [[Bitboard; 64]; 8] {
    let mut rays = [[Bitboard::EMPTY; 64]; 8];
    for dir in Direction::ALL {
        let (df, dr) = dir.delta();
        for idx in 0..64u8 {
            let mut bb = Bitboard::EMPTY;
            let mut cur = Square(idx);
            while let Some(next) = cur.offset(df, dr) {
                bb.set(next);
                cur = next;
            }
            rays[dir.index()][idx as usize] = bb;
        }
    }
    rays
}

// =========================================================================
// Tests
// =========================================================================

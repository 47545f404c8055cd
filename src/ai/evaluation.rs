//! Static position evaluation.
//!
//! Scores are centipawns from White's perspective: positive favours White.
//! An `Evaluator` is material (from a read-only `PieceValues` table) plus a
//! list of pluggable `PositionalTerm`s, each scored independently.

use crate::engine::attacks;
use crate::engine::board::Position;
use crate::engine::types::{Color, PieceType, Square};

/// Infinity sentinel. Larger than any realistic eval.
pub const INF: i32 = 100_000;

/// Checkmate score base. Actual mate scores are `MATE - ply` so closer mates
/// score higher.
pub const MATE: i32 = 90_000;

/// Is this score a forced-mate score?
#[inline]
pub fn is_mate_score(score: i32) -> bool {
    score.abs() >= MATE - 500
}

// =========================================================================
// Material values (centipawns)
// =========================================================================

/// Material value per piece kind. The king is never counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PieceValues {
    values: [i32; PieceType::COUNT],
}

impl PieceValues {
    pub const fn new(pawn: i32, knight: i32, bishop: i32, rook: i32, queen: i32) -> Self {
        PieceValues {
            values: [pawn, knight, bishop, rook, queen, 0],
        }
    }

    #[inline]
    pub fn get(&self, pt: PieceType) -> i32 {
        self.values[pt.index()]
    }
}

impl Default for PieceValues {
    fn default() -> Self {
        PieceValues {
            values: PieceType::ALL.map(PieceType::value),
        }
    }
}

// =========================================================================
// Positional terms
// =========================================================================

/// An independent positional heuristic added on top of material.
pub trait PositionalTerm: Send + Sync {
    /// Short identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Score from White's perspective.
    fn score(&self, pos: &Position) -> i32;
}

/// Mirror a square vertically (flip rank) for Black PST lookup.
#[inline]
fn mirror_square(sq: Square) -> usize {
    (sq.0 ^ 56) as usize
}

/// Piece-square tables (middle-game).
#[derive(Clone, Copy, Debug, Default)]
pub struct PieceSquareTables;

/// Pawn PST: central pawns and advancement.
#[rustfmt::skip]
const PAWN_PST: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10,-20,-20, 10, 10,  5,
     5, -5,-10,  0,  0,-10, -5,  5,
     0,  0,  0, 20, 20,  0,  0,  0,
     5,  5, 10, 25, 25, 10,  5,  5,
    10, 10, 20, 30, 30, 20, 10, 10,
    50, 50, 50, 50, 50, 50, 50, 50,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_PST: [i32; 64] = [
    -50,-40,-30,-30,-30,-30,-40,-50,
    -40,-20,  0,  5,  5,  0,-20,-40,
    -30,  5, 10, 15, 15, 10,  5,-30,
    -30,  0, 15, 20, 20, 15,  0,-30,
    -30,  5, 15, 20, 20, 15,  5,-30,
    -30,  0, 10, 15, 15, 10,  0,-30,
    -40,-20,  0,  0,  0,  0,-20,-40,
    -50,-40,-30,-30,-30,-30,-40,-50,
];

#[rustfmt::skip]
const BISHOP_PST: [i32; 64] = [
    -20,-10,-10,-10,-10,-10,-10,-20,
    -10,  5,  0,  0,  0,  0,  5,-10,
    -10, 10, 10, 10, 10, 10, 10,-10,
    -10,  0, 10, 10, 10, 10,  0,-10,
    -10,  5,  5, 10, 10,  5,  5,-10,
    -10,  0,  5, 10, 10,  5,  0,-10,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -20,-10,-10,-10,-10,-10,-10,-20,
];

#[rustfmt::skip]
const ROOK_PST: [i32; 64] = [
      0,  0,  0,  5,  5,  0,  0,  0,
     -5,  0,  0,  0,  0,  0,  0, -5,
     -5,  0,  0,  0,  0,  0,  0, -5,
     -5,  0,  0,  0,  0,  0,  0, -5,
     -5,  0,  0,  0,  0,  0,  0, -5,
     -5,  0,  0,  0,  0,  0,  0, -5,
      5, 10, 10, 10, 10, 10, 10,  5,
      0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN_PST: [i32; 64] = [
    -20,-10,-10, -5, -5,-10,-10,-20,
    -10,  0,  5,  0,  0,  0,  0,-10,
    -10,  5,  5,  5,  5,  5,  0,-10,
      0,  0,  5,  5,  5,  5,  0, -5,
     -5,  0,  5,  5,  5,  5,  0, -5,
    -10,  0,  5,  5,  5,  5,  0,-10,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -20,-10,-10, -5, -5,-10,-10,-20,
];

/// King PST (middle-game): stay castled, keep out of the centre.
#[rustfmt::skip]
const KING_MG_PST: [i32; 64] = [
     20, 30, 10,  0,  0, 10, 30, 20,
     20, 20,  0,  0,  0,  0, 20, 20,
    -10,-20,-20,-20,-20,-20,-20,-10,
    -20,-30,-30,-40,-40,-30,-30,-20,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
];

const PST: [[i32; 64]; PieceType::COUNT] = [
    PAWN_PST,
    KNIGHT_PST,
    BISHOP_PST,
    ROOK_PST,
    QUEEN_PST,
    KING_MG_PST,
];

impl PositionalTerm for PieceSquareTables {
    fn name(&self) -> &'static str {
        "pst"
    }

    fn score(&self, pos: &Position) -> i32 {
        let mut score = 0;
        for pt in PieceType::ALL {
            let table = &PST[pt.index()];
            score += pos
                .bb(Color::White, pt)
                .iter()
                .map(|sq| table[sq.0 as usize])
                .sum::<i32>();
            score -= pos
                .bb(Color::Black, pt)
                .iter()
                .map(|sq| table[mirror_square(sq)])
                .sum::<i32>();
        }
        score
    }
}

/// Flat bonus for each piece standing on d4, e4, d5 or e5.
#[derive(Clone, Copy, Debug)]
pub struct CenterControl {
    pub bonus: i32,
}

impl Default for CenterControl {
    fn default() -> Self {
        CenterControl { bonus: 15 }
    }
}

/// d4, e4, d5, e5.
const CENTER: u64 = (1 << 27) | (1 << 28) | (1 << 35) | (1 << 36);

impl PositionalTerm for CenterControl {
    fn name(&self) -> &'static str {
        "center"
    }

    fn score(&self, pos: &Position) -> i32 {
        let count = |c: Color| (pos.occupied[c.index()].0 & CENTER).count_ones() as i32;
        (count(Color::White) - count(Color::Black)) * self.bonus
    }
}

/// Bonus for holding both bishops.
#[derive(Clone, Copy, Debug)]
pub struct BishopPair {
    pub bonus: i32,
}

impl Default for BishopPair {
    fn default() -> Self {
        BishopPair { bonus: 30 }
    }
}

impl PositionalTerm for BishopPair {
    fn name(&self) -> &'static str {
        "bishop_pair"
    }

    fn score(&self, pos: &Position) -> i32 {
        let has_pair = |c: Color| pos.bb(c, PieceType::Bishop).pop_count() >= 2;
        match (has_pair(Color::White), has_pair(Color::Black)) {
            (true, false) => self.bonus,
            (false, true) => -self.bonus,
            _ => 0,
        }
    }
}

/// Per-square bonus for the squares knights and sliders can reach that are
/// not occupied by their own side.
#[derive(Clone, Copy, Debug)]
pub struct Mobility {
    pub weight: i32,
}

impl Default for Mobility {
    fn default() -> Self {
        Mobility { weight: 2 }
    }
}

impl Mobility {
    fn reach(pos: &Position, color: Color) -> i32 {
        let t = attacks::tables();
        let occ = pos.all_occupied;
        let own = pos.occupied[color.index()];
        let mut total = 0;
        for sq in pos.bb(color, PieceType::Knight).iter() {
            total += (t.knight_attacks(sq) & !own).pop_count();
        }
        for sq in pos.bb(color, PieceType::Bishop).iter() {
            total += (t.bishop_attacks(sq, occ) & !own).pop_count();
        }
        for sq in pos.bb(color, PieceType::Rook).iter() {
            total += (t.rook_attacks(sq, occ) & !own).pop_count();
        }
        for sq in pos.bb(color, PieceType::Queen).iter() {
            total += (t.queen_attacks(sq, occ) & !own).pop_count();
        }
        total as i32
    }
}

impl PositionalTerm for Mobility {
    fn name(&self) -> &'static str {
        "mobility"
    }

    fn score(&self, pos: &Position) -> i32 {
        (Self::reach(pos, Color::White) - Self::reach(pos, Color::Black)) * self.weight
    }
}

// =========================================================================
// Evaluator
// =========================================================================

/// Material plus positional terms.
pub struct Evaluator {
    values: PieceValues,
    terms: Vec<Box<dyn PositionalTerm>>,
}

impl Evaluator {
    /// Material only, no positional terms.
    pub fn material_only(values: PieceValues) -> Self {
        Evaluator {
            values,
            terms: Vec::new(),
        }
    }

    /// Add a positional term.
    pub fn with_term(mut self, term: impl PositionalTerm + 'static) -> Self {
        self.terms.push(Box::new(term));
        self
    }

    pub fn values(&self) -> &PieceValues {
        &self.values
    }

    /// Names of the active positional terms, in evaluation order.
    pub fn term_names(&self) -> Vec<&'static str> {
        self.terms.iter().map(|t| t.name()).collect()
    }

    /// White material minus Black material.
    pub fn material(&self, pos: &Position) -> i32 {
        PieceType::ALL
            .iter()
            .map(|&pt| {
                let w = pos.bb(Color::White, pt).pop_count() as i32;
                let b = pos.bb(Color::Black, pt).pop_count() as i32;
                (w - b) * self.values.get(pt)
            })
            .sum()
    }

    /// Evaluate a position. Returns centipawn score from White's perspective.
    pub fn evaluate(&self, pos: &Position) -> i32 {
        self.material(pos) + self.terms.iter().map(|t| t.score(pos)).sum::<i32>()
    }

    /// Evaluate from the side-to-move's perspective (for negamax).
    #[inline]
    pub fn evaluate_relative(&self, pos: &Position) -> i32 {
        self.evaluate_for(pos, pos.side_to_move)
    }

    /// Evaluate from `color`'s perspective.
    #[inline]
    pub fn evaluate_for(&self, pos: &Position, color: Color) -> i32 {
        let score = self.evaluate(pos);
        match color {
            Color::White => score,
            Color::Black => -score,
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::material_only(PieceValues::default())
            .with_term(PieceSquareTables)
            .with_term(CenterControl::default())
            .with_term(BishopPair::default())
            .with_term(Mobility::default())
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("values", &self.values)
            .field("terms", &self.term_names())
            .finish()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    #[test]
    fn default_piece_values() {
        let v = PieceValues::default();
        assert_eq!(v.get(PieceType::Pawn), 100);
        assert_eq!(v.get(PieceType::Knight), 300);
        assert_eq!(v.get(PieceType::Bishop), 300);
        assert_eq!(v.get(PieceType::Rook), 500);
        assert_eq!(v.get(PieceType::Queen), 900);
        assert_eq!(v.get(PieceType::King), 0);
    }

    #[test]
    fn material_balance_is_exact() {
        let e = Evaluator::default();
        assert_eq!(e.material(&Position::starting()), 0);
        assert_eq!(e.material(&pos("4k3/8/8/8/8/8/8/3QK3 w - - 0 1")), 900);
        assert_eq!(e.material(&pos("r3k3/8/8/8/8/8/8/1N2K3 w - - 0 1")), -200);
    }

    #[test]
    fn material_only_uses_supplied_table() {
        let e = Evaluator::material_only(PieceValues::new(1, 3, 3, 5, 9));
        let p = pos("4k3/8/8/8/8/8/8/3QK3 w - - 0 1");
        assert_eq!(e.evaluate(&p), 9);
        assert!(e.term_names().is_empty());
    }

    #[test]
    fn starting_position_is_balanced() {
        let e = Evaluator::default();
        assert_eq!(e.evaluate(&Position::starting()), 0);
    }

    #[test]
    fn extra_queen_dominates() {
        let e = Evaluator::default();
        assert!(e.evaluate(&pos("4k3/8/8/8/8/8/8/3QK3 w - - 0 1")) > 800);
        assert!(e.evaluate(&pos("3qk3/8/8/8/8/8/8/4K3 w - - 0 1")) < -800);
    }

    #[test]
    fn relative_score_flips_for_black() {
        let e = Evaluator::default();
        let p = pos("3qk3/8/8/8/8/8/8/4K3 b - - 0 1");
        assert!(e.evaluate_relative(&p) > 800);
        assert_eq!(e.evaluate_for(&p, Color::White), -e.evaluate_relative(&p));
    }

    #[test]
    fn center_control_counts_pieces_on_central_squares() {
        let c = CenterControl::default();
        assert_eq!(c.score(&Position::starting()), 0);
        let p = pos("4k3/8/8/8/3PP3/8/8/4K3 w - - 0 1");
        assert_eq!(c.score(&p), 30);
        let p = pos("4k3/8/8/3p4/3PP3/8/8/4K3 w - - 0 1");
        assert_eq!(c.score(&p), 15);
    }

    #[test]
    fn bishop_pair_term() {
        let b = BishopPair::default();
        assert_eq!(b.score(&pos("4k3/8/8/8/8/8/8/2B1KB2 w - - 0 1")), 30);
        assert_eq!(b.score(&pos("2b1kb2/8/8/8/8/8/8/2B1KB2 w - - 0 1")), 0);
        assert_eq!(b.score(&pos("2b1kb2/8/8/8/8/8/8/4K3 w - - 0 1")), -30);
    }

    #[test]
    fn mobility_favours_active_pieces() {
        let m = Mobility::default();
        assert_eq!(m.score(&Position::starting()), 0);
        // Centralised knight versus a cornered one.
        let p = pos("n3k3/8/8/8/3N4/8/8/4K3 w - - 0 1");
        assert_eq!(m.score(&p), (8 - 2) * 2);
    }

    #[test]
    fn pst_is_symmetric() {
        let p = pos("r1bqkb1r/pppppppp/2n2n2/8/8/2N2N2/PPPPPPPP/R1BQKB1R w KQkq - 0 1");
        assert_eq!(PieceSquareTables.score(&p), 0);
    }

    #[test]
    fn mate_score_detection() {
        assert!(is_mate_score(MATE));
        assert!(is_mate_score(-(MATE - 10)));
        assert!(!is_mate_score(500));
    }

    #[test]
    fn mirror_square_flips_rank() {
        assert_eq!(mirror_square(Square(0)), 56);
        assert_eq!(mirror_square(Square(63)), 7);
    }
}

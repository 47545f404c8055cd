//! Legal move generation.
//!
//! Pipeline:
//!   1. Generate pseudo-legal moves, one pattern function per piece kind,
//!      dispatched through `GENERATORS`.
//!   2. Filter: make the move on a scratch copy, verify the mover's king is
//!      not attacked, undo.

use crate::engine::attacks;
use crate::engine::board::Position;
use crate::engine::types::{Bitboard, Color, Move, MoveFlags, PieceType, Square};

/// Emits the pseudo-legal moves of the piece standing on `from`.
type PatternFn = fn(&Position, Square, &mut Vec<Move>);

/// Move-pattern functions indexed by `PieceType::index()`.
const GENERATORS: [PatternFn; PieceType::COUNT] = [
    pawn_moves,
    knight_moves,
    bishop_moves,
    rook_moves,
    queen_moves,
    king_moves,
];

// =========================================================================
// Public API
// =========================================================================

/// Generate all legal moves for the side to move.
pub fn legal_moves(pos: &Position) -> Vec<Move> {
    let mut pseudo = Vec::with_capacity(128);
    generate_pseudo_legal(pos, &mut pseudo);
    filter_legal(pos, pseudo)
}

/// Generate all legal moves originating from a specific square. Empty when
/// the square is vacant or holds an opponent's piece.
pub fn legal_moves_from(pos: &Position, from: Square) -> Vec<Move> {
    let Some((color, piece)) = pos.piece_at(from) else {
        return Vec::new();
    };
    if color != pos.side_to_move {
        return Vec::new();
    }
    let mut pseudo = Vec::with_capacity(32);
    GENERATORS[piece.index()](pos, from, &mut pseudo);
    filter_legal(pos, pseudo)
}

/// Generate moves ignoring whether the mover's king is left attacked.
pub fn generate_pseudo_legal(pos: &Position, moves: &mut Vec<Move>) {
    let us = pos.side_to_move;
    for pt in PieceType::ALL {
        let generate = GENERATORS[pt.index()];
        for from in pos.bb(us, pt).iter() {
            generate(pos, from, moves);
        }
    }
}

fn filter_legal(pos: &Position, pseudo: Vec<Move>) -> Vec<Move> {
    let us = pos.side_to_move;
    let mut scratch = pos.clone();
    pseudo
        .into_iter()
        .filter(|&mv| {
            let undo = scratch.make_move(mv);
            let safe = !scratch.is_square_attacked(scratch.king_sq(us), !us);
            scratch.undo_move(mv, &undo);
            safe
        })
        .collect()
}

// =========================================================================
// Pawn moves
// =========================================================================

fn pawn_moves(pos: &Position, from: Square, moves: &mut Vec<Move>) {
    let t = attacks::tables();
    let us = pos.side_to_move;
    let enemy = pos.enemy();

    let (push_dir, start_rank, promo_rank): (i8, u8, u8) = match us {
        Color::White => (1, 1, 6),
        Color::Black => (-1, 6, 1),
    };
    let promotes = from.rank() == promo_rank;

    // --- Pushes ---
    if let Some(to) = from.offset(0, push_dir)
        && !pos.all_occupied.is_set(to)
    {
        if promotes {
            add_promotions(from, to, MoveFlags::NONE, moves);
        } else {
            moves.push(Move::new(from, to));
        }
        if from.rank() == start_rank
            && let Some(to2) = to.offset(0, push_dir)
            && !pos.all_occupied.is_set(to2)
        {
            moves.push(Move::with_flags(from, to2, MoveFlags::DOUBLE_PUSH));
        }
    }

    // --- Captures (including promotion captures) ---
    for to in (t.pawn_attacks(us, from) & enemy).iter() {
        if promotes {
            add_promotions(from, to, MoveFlags::CAPTURE, moves);
        } else {
            moves.push(Move::with_flags(from, to, MoveFlags::CAPTURE));
        }
    }

    // --- En passant ---
    if let Some(ep_sq) = pos.en_passant
        && t.pawn_attacks(us, from).is_set(ep_sq)
    {
        moves.push(Move::with_flags(
            from,
            ep_sq,
            MoveFlags::CAPTURE | MoveFlags::EN_PASSANT,
        ));
    }
}

/// Add all four promotion variants for a pawn push or capture.
fn add_promotions(from: Square, to: Square, extra_flags: MoveFlags, moves: &mut Vec<Move>) {
    for promo in PieceType::PROMOTIONS {
        moves.push(Move::with_promotion(from, to, promo, extra_flags));
    }
}

// =========================================================================
// Leapers and sliders
// =========================================================================

/// Push a move to every target square, flagging captures of enemy pieces.
fn push_targets(pos: &Position, from: Square, targets: Bitboard, moves: &mut Vec<Move>) {
    let enemy = pos.enemy();
    for to in (targets & !pos.friendly()).iter() {
        let flags = if enemy.is_set(to) {
            MoveFlags::CAPTURE
        } else {
            MoveFlags::NONE
        };
        moves.push(Move::with_flags(from, to, flags));
    }
}

fn knight_moves(pos: &Position, from: Square, moves: &mut Vec<Move>) {
    push_targets(pos, from, attacks::tables().knight_attacks(from), moves);
}

fn bishop_moves(pos: &Position, from: Square, moves: &mut Vec<Move>) {
    let targets = attacks::tables().bishop_attacks(from, pos.all_occupied);
    push_targets(pos, from, targets, moves);
}

fn rook_moves(pos: &Position, from: Square, moves: &mut Vec<Move>) {
    let targets = attacks::tables().rook_attacks(from, pos.all_occupied);
    push_targets(pos, from, targets, moves);
}

fn queen_moves(pos: &Position, from: Square, moves: &mut Vec<Move>) {
    let targets = attacks::tables().queen_attacks(from, pos.all_occupied);
    push_targets(pos, from, targets, moves);
}

fn king_moves(pos: &Position, from: Square, moves: &mut Vec<Move>) {
    push_targets(pos, from, attacks::tables().king_attacks(from), moves);
    castling_moves(pos, from, moves);
}

// =========================================================================
// Castling
// =========================================================================

fn castling_moves(pos: &Position, king_sq: Square, moves: &mut Vec<Move>) {
    let us = pos.side_to_move;
    let them = !us;
    let rank_base = match us {
        Color::White => 0u8,
        Color::Black => 56u8,
    };

    // Rights imply the king still stands on its home square.
    if king_sq.0 != rank_base + 4 || pos.is_square_attacked(king_sq, them) {
        return;
    }

    let empty = |s: u8| !pos.all_occupied.is_set(Square(rank_base + s));
    let safe = |s: u8| !pos.is_square_attacked(Square(rank_base + s), them);

    // Kingside: f and g empty, king passes f and lands on g.
    if pos.castling_rights.can_castle_kingside(us)
        && empty(5)
        && empty(6)
        && safe(5)
        && safe(6)
    {
        moves.push(Move::with_flags(
            king_sq,
            Square(rank_base + 6),
            MoveFlags::CASTLE_KINGSIDE,
        ));
    }

    // Queenside: b, c, d empty, king passes d and lands on c.
    if pos.castling_rights.can_castle_queenside(us)
        && empty(1)
        && empty(2)
        && empty(3)
        && safe(3)
        && safe(2)
    {
        moves.push(Move::with_flags(
            king_sq,
            Square(rank_base + 2),
            MoveFlags::CASTLE_QUEENSIDE,
        ));
    }
}

// =========================================================================
// Tests
// =========================================================================

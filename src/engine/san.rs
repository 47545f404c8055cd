//! Standard Algebraic Notation (SAN) for the move history.
//!
//! SAN examples: `e4`, `Nf3`, `Bxe5`, `O-O`, `e8=Q+`, `Raxd1#`.

use crate::engine::board::Position;
use crate::engine::types::{Color, Move, PieceType};

/// Convert a move to SAN notation.
///
/// `legal_moves` should be the full list of legal moves in the position
/// (passed in to avoid redundant generation). The `+`/`#` suffix is added
/// by the caller once the resulting position is known.
pub fn move_to_san(pos: &Position, mv: Move, legal_moves: &[Move]) -> String {
    if mv.flags.is_castle_kingside() {
        return "O-O".into();
    }
    if mv.flags.is_castle_queenside() {
        return "O-O-O".into();
    }

    let Some((_, piece)) = pos.piece_at(mv.from) else {
        return mv.to_string();
    };

    let mut san = String::with_capacity(8);

    if piece == PieceType::Pawn {
        if mv.flags.is_capture() {
            san.push((b'a' + mv.from.file()) as char);
            san.push('x');
        }
        san.push_str(&mv.to.to_algebraic());
        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(promo.to_char(Color::White));
        }
    } else {
        san.push(piece.to_char(Color::White));
        san.push_str(&disambiguation(pos, mv, piece, legal_moves));
        if mv.flags.is_capture() {
            san.push('x');
        }
        san.push_str(&mv.to.to_algebraic());
    }

    san
}

/// File, rank, or both when another piece of the same kind can reach the
/// same destination.
fn disambiguation(pos: &Position, mv: Move, piece: PieceType, legal_moves: &[Move]) -> String {
    let us = pos.side_to_move;
    let rivals: Vec<&Move> = legal_moves
        .iter()
        .filter(|m| {
            m.to == mv.to
                && m.from != mv.from
                && pos.piece_at(m.from) == Some((us, piece))
        })
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let file = (b'a' + mv.from.file()) as char;
    let rank = (b'1' + mv.from.rank()) as char;
    let same_file = rivals.iter().any(|m| m.from.file() == mv.from.file());
    let same_rank = rivals.iter().any(|m| m.from.rank() == mv.from.rank());

    match (same_file, same_rank) {
        (false, _) => file.to_string(),
        (true, false) => rank.to_string(),
        (true, true) => format!("{file}{rank}"),
    }
}

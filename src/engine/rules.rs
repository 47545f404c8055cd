//! Checked move application and terminal-state classification.
//!
//! `Position::make_move` trusts its input; the functions here are the
//! boundary used by the game session and tests. `evaluate` is stateless: the
//! caller supplies the list of position keys reached so far.

use crate::engine::board::{Position, PositionKey, UndoInfo};
use crate::engine::movegen;
use crate::engine::types::{ChessError, Color, GameResult, Move, PieceType};

/// Apply a legal move to a copy of `pos`.
///
/// All-or-nothing: on error the input is untouched and nothing is returned.
pub fn apply(pos: &Position, mv: Move) -> Result<(Position, UndoInfo), ChessError> {
    if let Some(promo) = mv.promotion
        && !promo.is_promotion_choice()
    {
        return Err(ChessError::IllegalPromotionChoice(promo.to_char(Color::White).to_ascii_lowercase().to_string()));
    }
    if !movegen::legal_moves(pos).contains(&mv) {
        return Err(ChessError::PreconditionViolation(format!(
            "{mv} is not a legal move in {}",
            pos.to_fen()
        )));
    }
    let mut next = pos.clone();
    let undo = next.make_move(mv);
    Ok((next, undo))
}

/// Return the position that existed before `mv` was applied.
pub fn undo(pos: &Position, mv: Move, record: &UndoInfo) -> Position {
    let mut prev = pos.clone();
    prev.undo_move(mv, record);
    prev
}

/// Is the side to move in check?
#[inline]
pub fn is_check(pos: &Position) -> bool {
    pos.is_in_check()
}

/// How many times `key` occurs in `history`.
pub fn repetition_count(history: &[PositionKey], key: &PositionKey) -> usize {
    history.iter().filter(|k| *k == key).count()
}

/// Classify the position.
///
/// `history` holds the keys of every position reached in the game,
/// including the current one. Priority: checkmate, stalemate, fifty-move,
/// repetition, insufficient material.
pub fn evaluate(pos: &Position, history: &[PositionKey]) -> GameResult {
    if movegen::legal_moves(pos).is_empty() {
        return if is_check(pos) {
            GameResult::Checkmate(!pos.side_to_move)
        } else {
            GameResult::Stalemate
        };
    }
    if pos.halfmove_clock >= 100 {
        return GameResult::DrawByFiftyMove;
    }
    if repetition_count(history, &pos.key()) >= 3 {
        return GameResult::DrawByRepetition;
    }
    if is_insufficient_material(pos) {
        return GameResult::DrawByInsufficientMaterial;
    }
    GameResult::Ongoing
}

/// Neither side can possibly deliver mate.
///
/// Draws: K vs K, K+B vs K, K+N vs K, K+B vs K+B (same colour bishops).
pub fn is_insufficient_material(pos: &Position) -> bool {
    let heavy = [PieceType::Pawn, PieceType::Rook, PieceType::Queen];
    for color in [Color::White, Color::Black] {
        if heavy.iter().any(|&pt| pos.bb(color, pt).is_not_empty()) {
            return false;
        }
    }

    let minors = |c: Color| {
        pos.bb(c, PieceType::Knight).pop_count() + pos.bb(c, PieceType::Bishop).pop_count()
    };
    let (w_minor, b_minor) = (minors(Color::White), minors(Color::Black));

    match (w_minor, b_minor) {
        (0, 0) | (1, 0) | (0, 1) => true,
        (1, 1) => {
            match (
                pos.bb(Color::White, PieceType::Bishop).lsb(),
                pos.bb(Color::Black, PieceType::Bishop).lsb(),
            ) {
                (Some(w), Some(b)) => w.is_light() == b.is_light(),
                _ => false,
            }
        }
        _ => false,
    }
}

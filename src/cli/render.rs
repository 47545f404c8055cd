//! Text rendering for the console: board, move history, captured pieces.

use std::fmt::Write as _;

use crate::engine::board::Position;
use crate::engine::game::HistoryEntry;
use crate::engine::types::{Bitboard, Color, PieceType, Square};

/// How the board is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Chess glyphs instead of FEN letters.
    pub unicode: bool,
    /// Draw from Black's side (rank 1 at the top).
    pub flipped: bool,
    /// Squares to mark, typically the targets of a selected piece.
    pub highlights: Bitboard,
}

impl RenderOptions {
    pub fn with_highlights(mut self, squares: impl IntoIterator<Item = Square>) -> Self {
        for sq in squares {
            self.highlights.set(sq);
        }
        self
    }
}

/// Glyph for a piece.
pub fn piece_glyph(color: Color, piece: PieceType, unicode: bool) -> char {
    if !unicode {
        return piece.to_char(color);
    }
    match (color, piece) {
        (Color::White, PieceType::King) => '♔',
        (Color::White, PieceType::Queen) => '♕',
        (Color::White, PieceType::Rook) => '♖',
        (Color::White, PieceType::Bishop) => '♗',
        (Color::White, PieceType::Knight) => '♘',
        (Color::White, PieceType::Pawn) => '♙',
        (Color::Black, PieceType::King) => '♚',
        (Color::Black, PieceType::Queen) => '♛',
        (Color::Black, PieceType::Rook) => '♜',
        (Color::Black, PieceType::Bishop) => '♝',
        (Color::Black, PieceType::Knight) => '♞',
        (Color::Black, PieceType::Pawn) => '♟',
    }
}

/// Render the board with rank and file labels.
///
/// Empty squares are `.`; a highlighted empty square is `*` and a
/// highlighted occupied square gets a `*` in front of its piece.
pub fn render_board(pos: &Position, opts: &RenderOptions) -> String {
    let ranks: Vec<u8> = if opts.flipped {
        (0..8).collect()
    } else {
        (0..8).rev().collect()
    };
    let files: Vec<u8> = if opts.flipped {
        (0..8).rev().collect()
    } else {
        (0..8).collect()
    };

    let mut out = String::with_capacity(400);
    out.push_str("   +-----------------+\n");
    for &rank in &ranks {
        let _ = write!(out, " {} |", rank + 1);
        for &file in &files {
            let sq = Square::from_file_rank(file, rank);
            let marked = opts.highlights.is_set(sq);
            match pos.piece_at(sq) {
                Some((color, piece)) => {
                    out.push(if marked { '*' } else { ' ' });
                    out.push(piece_glyph(color, piece, opts.unicode));
                }
                None => {
                    out.push(' ');
                    out.push(if marked { '*' } else { '.' });
                }
            }
        }
        out.push_str(" |\n");
    }
    out.push_str("   +-----------------+\n     ");
    for (i, &file) in files.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push((b'a' + file) as char);
    }
    out.push('\n');
    out
}

/// Numbered move list, one full move per line: `1. e4 e5`.
pub fn render_history(history: &[HistoryEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in history.iter().enumerate() {
        match entry.mover {
            Color::White => {
                if i > 0 {
                    out.push('\n');
                }
                let _ = write!(out, "{}. {}", entry.move_number, entry.san);
            }
            Color::Black if i == 0 => {
                let _ = write!(out, "{}... {}", entry.move_number, entry.san);
            }
            Color::Black => {
                let _ = write!(out, " {}", entry.san);
            }
        }
    }
    out
}

/// Space-separated glyphs of the pieces `captor` has taken.
pub fn render_captured(captured: &[PieceType], captor: Color, unicode: bool) -> String {
    captured
        .iter()
        .map(|&pt| piece_glyph(!captor, pt, unicode).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub const HELP_TEXT: &str = "\
Enter moves in coordinate notation: e2e4, e2-e4, e7e8q, e7e8=q or \"e7 e8 q\".
A pawn reaching the last rank promotes to a queen unless you name q, r, b or n.
Commands:
  moves <sq>  show legal moves for the piece on <sq>
  undo        take back the last move (yours and the computer's reply)
  history     show the moves played so far
  hint        suggest a move
  draw        offer or accept a draw
  resign      resign the game
  board       redraw the board
  help        show this text
  quit        leave the game";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::game::{Game, MoveRequest};

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    #[test]
    fn starting_board_ascii() {
        let text = render_board(&Position::starting(), &RenderOptions::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], " 8 | r n b q k b n r |");
        assert_eq!(lines[2], " 7 | p p p p p p p p |");
        assert_eq!(lines[4], " 5 | . . . . . . . . |");
        assert_eq!(lines[8], " 1 | R N B Q K B N R |");
        assert_eq!(lines[10], "     a b c d e f g h");
    }

    #[test]
    fn unicode_glyphs() {
        let opts = RenderOptions {
            unicode: true,
            ..RenderOptions::default()
        };
        let text = render_board(&Position::starting(), &opts);
        assert!(text.contains(" 8 | ♜ ♞ ♝ ♛ ♚ ♝ ♞ ♜ |"));
        assert!(text.contains(" 1 | ♖ ♘ ♗ ♕ ♔ ♗ ♘ ♖ |"));
    }

    #[test]
    fn flipped_board_puts_rank_one_on_top() {
        let opts = RenderOptions {
            flipped: true,
            ..RenderOptions::default()
        };
        let text = render_board(&Position::starting(), &opts);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], " 1 | R N B K Q B N R |");
        assert_eq!(lines[10], "     h g f e d c b a");
    }

    #[test]
    fn highlights_mark_targets() {
        let opts = RenderOptions::default().with_highlights([sq("e3"), sq("e4"), sq("e7")]);
        let text = render_board(&Position::starting(), &opts);
        assert!(text.contains(" 4 | . . . . * . . . |"));
        assert!(text.contains(" 3 | . . . . * . . . |"));
        assert!(text.contains(" 7 | p p p p*p p p p |"));
    }

    #[test]
    fn history_is_numbered_by_full_move() {
        let mut game = Game::new();
        for (from, to) in [("e2", "e4"), ("e7", "e5"), ("g1", "f3")] {
            let mv = game
                .resolve_request(&MoveRequest::new(sq(from), sq(to)))
                .unwrap();
            game.make_move(mv).unwrap();
        }
        assert_eq!(render_history(game.history()), "1. e4 e5\n2. Nf3");
        assert_eq!(render_history(&[]), "");
    }

    #[test]
    fn history_starting_with_black() {
        let mut game =
            Game::from_fen("4k3/4p3/8/8/8/8/4P3/4K3 b - - 0 7").unwrap();
        let mv = game
            .resolve_request(&MoveRequest::new(sq("e7"), sq("e5")))
            .unwrap();
        game.make_move(mv).unwrap();
        assert_eq!(render_history(game.history()), "7... e5");
    }

    #[test]
    fn captured_uses_victim_colour() {
        let taken = [PieceType::Pawn, PieceType::Knight];
        assert_eq!(render_captured(&taken, Color::White, false), "p n");
        assert_eq!(render_captured(&taken, Color::Black, false), "P N");
        assert_eq!(render_captured(&[], Color::White, true), "");
    }
}

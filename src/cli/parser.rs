//! Console command parsing.
//!
//! Accepted move forms: `e2e4`, `e2-e4`, `e2 e4`, `e7e8q`, `e7e8=q`,
//! `e7 e8 q`. Everything else is one of the session keywords.

use crate::engine::game::MoveRequest;
use crate::engine::types::{ChessError, Square};

/// A parsed line of user input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Move(MoveRequest),
    Undo,
    History,
    /// List legal moves from a square.
    Moves(Square),
    Draw,
    Resign,
    Quit,
    Hint,
    Board,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty input")]
    Empty,

    #[error("unrecognised input '{0}' (type 'help' for commands, moves look like e2e4)")]
    BadNotation(String),

    #[error("invalid square '{0}'")]
    BadSquare(String),

    #[error("'moves' needs a square, e.g. 'moves e2'")]
    MissingSquare,
    #[error("'{0}' takes no further arguments")]
    UnexpectedArgument(String),
}

impl From<ParseError> for ChessError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::BadSquare(s) => ChessError::InvalidSquare(s),
            other => ChessError::InvalidMoveRequest {
                from: String::new(),
                to: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

/// Parse one line of user input.
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let line = input.trim().to_lowercase();
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Err(ParseError::Empty);
    };

    let keyword = match first {
        "undo" => Some(Command::Undo),
        "history" => Some(Command::History),
        "draw" => Some(Command::Draw),
        "resign" => Some(Command::Resign),
        "quit" | "exit" => Some(Command::Quit),
        "hint" => Some(Command::Hint),
        "board" => Some(Command::Board),
        "help" | "?" => Some(Command::Help),
        "moves" => {
            let arg = words.next().ok_or(ParseError::MissingSquare)?;
            let sq = Square::from_algebraic(arg)
                .ok_or_else(|| ParseError::BadSquare(arg.to_string()))?;
            Some(Command::Moves(sq))
        }
        _ => None,
    };
    if let Some(cmd) = keyword {
        if words.next().is_some() {
            return Err(ParseError::UnexpectedArgument(first.to_string()));
        }
        return Ok(cmd);
    }

    parse_move(&line).map(Command::Move)
}

/// Parse coordinate notation into a request. The promotion letter is kept
/// raw; whether it names a legal piece is the game's decision.
pub fn parse_move(input: &str) -> Result<MoveRequest, ParseError> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '=')
        .collect();
    let bad = || ParseError::BadNotation(input.trim().to_string());

    if !compact.is_ascii() || !(4..=5).contains(&compact.len()) {
        return Err(bad());
    }

    let from = Square::from_algebraic(&compact[0..2]).ok_or_else(bad)?;
    let to = Square::from_algebraic(&compact[2..4]).ok_or_else(bad)?;
    match compact[4..].chars().next() {
        None => Ok(MoveRequest::new(from, to)),
        Some(letter) if letter.is_ascii_alphabetic() => {
            Ok(MoveRequest::with_promotion(from, to, letter))
        }
        Some(_) => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    #[test]
    fn keywords() {
        assert_eq!(parse_command("undo"), Ok(Command::Undo));
        assert_eq!(parse_command("  HISTORY "), Ok(Command::History));
        assert_eq!(parse_command("draw"), Ok(Command::Draw));
        assert_eq!(parse_command("resign"), Ok(Command::Resign));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
        assert_eq!(parse_command("hint"), Ok(Command::Hint));
        assert_eq!(parse_command("board"), Ok(Command::Board));
        assert_eq!(parse_command("help"), Ok(Command::Help));
    }

    #[test]
    fn keywords_reject_trailing_words() {
        assert_eq!(
            parse_command("undo now"),
            Err(ParseError::UnexpectedArgument("undo".into()))
        );
        assert_eq!(
            parse_command("resign please"),
            Err(ParseError::UnexpectedArgument("resign".into()))
        );
        assert_eq!(
            parse_command("moves e2 e4"),
            Err(ParseError::UnexpectedArgument("moves".into()))
        );
    }

    #[test]
    fn moves_command_needs_valid_square() {
        assert_eq!(parse_command("moves e2"), Ok(Command::Moves(sq("e2"))));
        assert_eq!(parse_command("moves"), Err(ParseError::MissingSquare));
        assert_eq!(
            parse_command("moves z9"),
            Err(ParseError::BadSquare("z9".into()))
        );
    }

    #[test]
    fn move_forms() {
        let plain = Command::Move(MoveRequest::new(sq("e2"), sq("e4")));
        for text in ["e2e4", "e2-e4", "e2 e4", "E2E4"] {
            assert_eq!(parse_command(text), Ok(plain), "{text}");
        }
        let promo = Command::Move(MoveRequest::with_promotion(sq("e7"), sq("e8"), 'q'));
        for text in ["e7e8q", "e7e8=q", "e7 e8 q", "e7-e8=Q"] {
            assert_eq!(parse_command(text), Ok(promo), "{text}");
        }
    }

    #[test]
    fn promotion_letter_is_passed_through() {
        assert_eq!(
            parse_move("a7a8k"),
            Ok(MoveRequest::with_promotion(sq("a7"), sq("a8"), 'k'))
        );
    }

    #[test]
    fn malformed_notation() {
        for text in ["e2", "e2e9", "i2e4", "e2e4e5", "e2e45", "♔"] {
            assert!(
                matches!(parse_command(text), Err(ParseError::BadNotation(_))),
                "{text}"
            );
        }
        assert_eq!(parse_command("   "), Err(ParseError::Empty));
    }

    #[test]
    fn converts_into_domain_error() {
        let err: ChessError = ParseError::BadNotation("zz".into()).into();
        assert!(matches!(err, ChessError::InvalidMoveRequest { .. }));
        let err: ChessError = ParseError::BadSquare("z9".into()).into();
        assert_eq!(err, ChessError::InvalidSquare("z9".into()));
    }
}

//! Stateful game controller wrapping Position.
//!
//! `Game` owns the board, the move history, the repetition keys and the
//! outcome. It resolves user move requests against the legal move list,
//! applies and undoes moves, and handles the session-level outcomes (draw
//! by agreement, resignation) that the board alone cannot derive.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::board::{Position, PositionKey, UndoInfo};
use crate::engine::types::{
    ChessError, Color, Difficulty, GameResult, Move, PieceType, Square,
};
use crate::engine::{movegen, rules, san};

// =========================================================================
// HistoryEntry & MoveRequest
// =========================================================================

/// A recorded move in the game history.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    /// The move that was played.
    pub mv: Move,
    /// State needed to take the move back, including any captured piece.
    pub undo: UndoInfo,
    /// Side that played the move.
    pub mover: Color,
    /// Full-move number the move belongs to.
    pub move_number: u16,
    /// SAN with check/mate suffix.
    pub san: String,
}

/// A move as typed by a player: squares plus an optional promotion letter,
/// not yet matched against the legal move list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveRequest {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<char>,
}

impl MoveRequest {
    pub fn new(from: Square, to: Square) -> Self {
        MoveRequest {
            from,
            to,
            promotion: None,
        }
    }

    pub fn with_promotion(from: Square, to: Square, letter: char) -> Self {
        MoveRequest {
            from,
            to,
            promotion: Some(letter),
        }
    }
}

// =========================================================================
// Game
// =========================================================================

/// A complete chess game with history, undo, and outcome tracking.
#[derive(Clone, Debug)]
pub struct Game {
    position: Position,
    history: Vec<HistoryEntry>,
    /// Keys of all positions reached, including the current one.
    keys: Vec<PositionKey>,
    result: GameResult,
    /// Side with an outstanding draw offer.
    draw_offer: Option<Color>,

    // Metadata
    pub id: Uuid,
    pub white_player: String,
    pub black_player: String,
    pub created_at: DateTime<Utc>,
    pub ai_difficulty: Option<Difficulty>,
}

impl Game {
    // -----------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------

    /// Create a new game from the standard starting position.
    pub fn new() -> Self {
        Self::from_position(Position::starting())
    }

    /// Create a game from an arbitrary position.
    pub fn from_position(position: Position) -> Self {
        let keys = vec![position.key()];
        let result = rules::evaluate(&position, &keys);
        Self {
            position,
            history: Vec::new(),
            keys,
            result,
            draw_offer: None,
            id: Uuid::new_v4(),
            white_player: "White".into(),
            black_player: "Black".into(),
            created_at: Utc::now(),
            ai_difficulty: None,
        }
    }

    /// Create a game from a FEN position literal.
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        Ok(Self::from_position(Position::from_fen(fen)?))
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    /// Current board position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Current outcome.
    pub fn result(&self) -> GameResult {
        self.result
    }

    /// Display name of the player on `color`.
    pub fn player(&self, color: Color) -> &str {
        match color {
            Color::White => &self.white_player,
            Color::Black => &self.black_player,
        }
    }

    /// Side to move.
    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move
    }

    /// Moves played so far, oldest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Keys of every position reached, including the current one.
    pub fn position_keys(&self) -> &[PositionKey] {
        &self.keys
    }

    /// All legal moves in the current position.
    pub fn legal_moves(&self) -> Vec<Move> {
        movegen::legal_moves(&self.position)
    }

    /// Legal moves from a specific square.
    pub fn legal_moves_from(&self, sq: Square) -> Vec<Move> {
        movegen::legal_moves_from(&self.position, sq)
    }

    /// Whether the game is over.
    pub fn is_game_over(&self) -> bool {
        self.result.is_terminal()
    }

    /// Whether the side to move is in check.
    pub fn is_check(&self) -> bool {
        rules::is_check(&self.position)
    }

    /// Side with an outstanding draw offer, if any.
    pub fn pending_draw_offer(&self) -> Option<Color> {
        self.draw_offer
    }

    /// Pieces captured by `color`, in the order they were taken.
    pub fn captured_by(&self, color: Color) -> Vec<PieceType> {
        self.history
            .iter()
            .filter(|e| e.mover == color)
            .filter_map(|e| e.undo.captured_piece)
            .collect()
    }

    // -----------------------------------------------------------------
    // Move requests
    // -----------------------------------------------------------------

    /// Match a typed request against the legal moves.
    ///
    /// A pawn reaching the last rank without a letter promotes to a queen.
    pub fn resolve_request(&self, req: &MoveRequest) -> Result<Move, ChessError> {
        if self.is_game_over() {
            return Err(self.game_over_error());
        }

        let promotion = match req.promotion {
            None => None,
            Some(letter) => match PieceType::from_char(letter) {
                Some((_, pt)) if pt.is_promotion_choice() => Some(pt),
                _ => return Err(ChessError::IllegalPromotionChoice(letter.to_string())),
            },
        };

        let reject = |reason: &str| ChessError::InvalidMoveRequest {
            from: req.from.to_algebraic(),
            to: req.to.to_algebraic(),
            reason: reason.to_string(),
        };

        match self.position.piece_at(req.from) {
            None => return Err(reject("no piece on that square")),
            Some((color, _)) if color != self.side_to_move() => {
                return Err(reject("that piece belongs to the opponent"));
            }
            _ => {}
        }

        let candidates: Vec<Move> = self
            .legal_moves_from(req.from)
            .into_iter()
            .filter(|m| m.to == req.to)
            .collect();

        if candidates.is_empty() {
            return Err(reject("not a legal move"));
        }

        let is_promotion = candidates.iter().any(|m| m.promotion.is_some());
        match (is_promotion, promotion) {
            (false, Some(_)) => Err(reject("only a pawn reaching the last rank can promote")),
            (false, None) => Ok(candidates[0]),
            (true, choice) => {
                let want = choice.unwrap_or(PieceType::Queen);
                candidates
                    .into_iter()
                    .find(|m| m.promotion == Some(want))
                    .ok_or_else(|| reject("promotion not available"))
            }
        }
    }

    // -----------------------------------------------------------------
    // Make / undo
    // -----------------------------------------------------------------

    /// Play a move. Returns the SAN notation of the move played.
    ///
    /// Returns `ChessError::GameOver` if the game is already finished, or
    /// `ChessError::InvalidMoveRequest` if the move is not legal.
    pub fn make_move(&mut self, mv: Move) -> Result<String, ChessError> {
        if self.is_game_over() {
            return Err(self.game_over_error());
        }

        let legal = self.legal_moves();
        if !legal.contains(&mv) {
            return Err(ChessError::InvalidMoveRequest {
                from: mv.from.to_algebraic(),
                to: mv.to.to_algebraic(),
                reason: "not a legal move".into(),
            });
        }

        let mut notation = san::move_to_san(&self.position, mv, &legal);
        let mover = self.side_to_move();
        let move_number = self.position.fullmove_number;

        let undo = self.position.make_move(mv);
        self.keys.push(self.position.key());
        self.result = rules::evaluate(&self.position, &self.keys);
        self.draw_offer = None;

        if matches!(self.result, GameResult::Checkmate(_)) {
            notation.push('#');
        } else if self.is_check() {
            notation.push('+');
        }

        debug!(%mv, san = %notation, result = %self.result, "move applied");
        if self.result.is_terminal() {
            info!(game = %self.id, result = %self.result, "game finished");
        }

        self.history.push(HistoryEntry {
            mv,
            undo,
            mover,
            move_number,
            san: notation.clone(),
        });

        Ok(notation)
    }

    /// Undo the last ply. Returns the move that was undone.
    ///
    /// Any outcome, including resignation or agreed draw, is cleared so
    /// play can resume from the restored position.
    pub fn undo_move(&mut self) -> Result<Move, ChessError> {
        let entry = self.history.pop().ok_or(ChessError::NothingToUndo)?;
        self.position.undo_move(entry.mv, &entry.undo);
        self.keys.pop();
        self.draw_offer = None;
        self.result = rules::evaluate(&self.position, &self.keys);
        debug!(mv = %entry.mv, "move undone");
        Ok(entry.mv)
    }

    // -----------------------------------------------------------------
    // Agreement & resignation
    // -----------------------------------------------------------------

    /// Record a draw offer by `by`. It lapses when the next move is made.
    pub fn offer_draw(&mut self, by: Color) -> Result<(), ChessError> {
        if self.is_game_over() {
            return Err(self.game_over_error());
        }
        self.draw_offer = Some(by);
        Ok(())
    }

    /// Accept the opponent's pending draw offer.
    pub fn accept_draw(&mut self, by: Color) -> Result<(), ChessError> {
        if self.is_game_over() {
            return Err(self.game_over_error());
        }
        if self.draw_offer != Some(!by) {
            return Err(ChessError::NoDrawOffer);
        }
        self.draw_offer = None;
        self.result = GameResult::DrawByAgreement;
        info!(game = %self.id, "draw agreed");
        Ok(())
    }

    /// `by` resigns; the opponent wins.
    pub fn resign(&mut self, by: Color) -> Result<(), ChessError> {
        if self.is_game_over() {
            return Err(self.game_over_error());
        }
        self.result = GameResult::Resignation(by);
        info!(game = %self.id, %by, "resigned");
        Ok(())
    }

    fn game_over_error(&self) -> ChessError {
        ChessError::GameOver(self.result.describe())
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================

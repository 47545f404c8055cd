//! The board state the rules engine plays on.
//!
//! `Position` keeps one bitboard per colour and piece kind plus cached
//! occupancy, the side to move, castling rights, the en-passant target
//! and both move counters. Make/undo mutate it in place; `UndoInfo` carries
//! whatever the move itself cannot reconstruct.

use crate::engine::attacks;
use crate::engine::types::{Bitboard, CastlingRights, ChessError, Color, Move, PieceType, Square};

/// FEN of the standard initial position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// ---------------------------------------------------------------------------
// UndoInfo: saved state for reversing a move
// ---------------------------------------------------------------------------

/// What `undo_move` needs that the move itself does not record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UndoInfo {
    pub captured_piece: Option<PieceType>,
    pub castling_rights: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u16,
    pub fullmove_number: u16,
}

// ---------------------------------------------------------------------------
// PositionKey: identity for repetition detection
// ---------------------------------------------------------------------------

/// Exact identity of a position for the repetition rule: piece layout, side
/// to move, castling rights and en-passant target. Clocks are excluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pieces: [[Bitboard; PieceType::COUNT]; 2],
    side_to_move: Color,
    castling_rights: CastlingRights,
    en_passant: Option<Square>,
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Pieces, side to move, castling rights, en-passant target and clocks.
///
/// Bit `n` of every bitboard is `Square(n)`, so a1 is bit 0 and h8 bit 63.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    /// Indexed `[color][kind]`.
    pub pieces: [[Bitboard; PieceType::COUNT]; 2],

    /// Every piece of one colour.
    pub occupied: [Bitboard; 2],

    /// Every piece on the board.
    pub all_occupied: Bitboard,

    /// Whose turn it is.
    pub side_to_move: Color,

    /// Castles still available to either side.
    pub castling_rights: CastlingRights,

    /// Square a pawn skipped with a double push on the last move.
    pub en_passant: Option<Square>,

    /// Plies since the last capture or pawn move. Saturates at `u16::MAX`.
    pub halfmove_clock: u16,

    /// Starts at 1 and grows after each Black move. Saturates at `u16::MAX`.
    pub fullmove_number: u16,
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

// ---------------------------------------------------------------------------
// Construction helpers
// ---------------------------------------------------------------------------

impl Position {
    /// No pieces, White to move.
    pub fn empty() -> Self {
        Position {
            pieces: [[Bitboard::EMPTY; PieceType::COUNT]; 2],
            occupied: [Bitboard::EMPTY; 2],
            all_occupied: Bitboard::EMPTY,
            side_to_move: Color::White,
            castling_rights: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// The initial array.
    pub fn starting() -> Self {
        Self::from_fen(STARTING_FEN).expect("starting FEN is always valid")
    }

    // -----------------------------------------------------------------------
    // Piece placement
    // -----------------------------------------------------------------------

    /// Place a piece on a square.
    #[inline]
    pub fn put_piece(&mut self, sq: Square, color: Color, piece: PieceType) {
        let bb = Bitboard::from_square(sq);
        self.pieces[color.index()][piece.index()] |= bb;
        self.occupied[color.index()] |= bb;
        self.all_occupied |= bb;
    }

    /// Remove a piece from a square.
    #[inline]
    pub fn remove_piece(&mut self, sq: Square, color: Color, piece: PieceType) {
        let bb = Bitboard::from_square(sq);
        self.pieces[color.index()][piece.index()] &= !bb;
        self.occupied[color.index()] &= !bb;
        self.all_occupied &= !bb;
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Colour and kind of the piece on `sq`.
    pub fn piece_at(&self, sq: Square) -> Option<(Color, PieceType)> {
        let bb = Bitboard::from_square(sq);
        if (self.all_occupied & bb).is_empty() {
            return None;
        }
        let color = if (self.occupied[Color::White.index()] & bb).is_not_empty() {
            Color::White
        } else {
            Color::Black
        };
        PieceType::ALL
            .iter()
            .find(|pt| (self.pieces[color.index()][pt.index()] & bb).is_not_empty())
            .map(|&pt| (color, pt))
    }

    /// Squares holding `color`'s pieces of kind `piece`.
    #[inline]
    pub fn bb(&self, color: Color, piece: PieceType) -> Bitboard {
        self.pieces[color.index()][piece.index()]
    }

    /// Pieces of the side to move.
    #[inline]
    pub fn friendly(&self) -> Bitboard {
        self.occupied[self.side_to_move.index()]
    }

    /// Pieces of the side not to move.
    #[inline]
    pub fn enemy(&self) -> Bitboard {
        self.occupied[(!self.side_to_move).index()]
    }

    /// Where `color`'s king stands.
    #[inline]
    pub fn king_sq(&self, color: Color) -> Square {
        self.pieces[color.index()][PieceType::King.index()]
            .lsb()
            .expect("king must exist")
    }

    /// Repetition identity of this position.
    pub fn key(&self) -> PositionKey {
        PositionKey {
            pieces: self.pieces,
            side_to_move: self.side_to_move,
            castling_rights: self.castling_rights,
            en_passant: self.en_passant,
        }
    }

    // -----------------------------------------------------------------------
    // Consistency
    // -----------------------------------------------------------------------

    /// Verify that redundant occupancy bitboards are consistent with piece
    /// bitboards and that no square holds two pieces.
    #[cfg(any(debug_assertions, test))]
    pub fn assert_consistent(&self) {
        for color in [Color::White, Color::Black] {
            let mut expected = Bitboard::EMPTY;
            for &pt in &PieceType::ALL {
                let bb = self.pieces[color.index()][pt.index()];
                assert!(
                    (expected & bb).is_empty(),
                    "overlapping {color} pieces on {:?}",
                    expected & bb
                );
                expected |= bb;
            }
            assert_eq!(
                self.occupied[color.index()],
                expected,
                "occupancy mismatch for {color:?}",
            );
        }
        assert!(
            (self.occupied[0] & self.occupied[1]).is_empty(),
            "square occupied by both colours"
        );
        assert_eq!(
            self.all_occupied,
            self.occupied[0] | self.occupied[1],
            "all_occupied mismatch",
        );
    }

    // -----------------------------------------------------------------------
    // Attack detection
    // -----------------------------------------------------------------------

    /// Whether any piece of `by` attacks `sq`.
    ///
    /// Pawns count only through their capture pattern, never their pushes.
    pub fn is_square_attacked(&self, sq: Square, by: Color) -> bool {
        let t = attacks::tables();
        let occ = self.all_occupied;

        // Reverse lookup: squares from which a `by` pawn would hit `sq`.
        if (t.pawn_attacks(!by, sq) & self.bb(by, PieceType::Pawn)).is_not_empty() {
            return true;
        }
        if (t.knight_attacks(sq) & self.bb(by, PieceType::Knight)).is_not_empty() {
            return true;
        }
        if (t.king_attacks(sq) & self.bb(by, PieceType::King)).is_not_empty() {
            return true;
        }

        let rook_queen = self.bb(by, PieceType::Rook) | self.bb(by, PieceType::Queen);
        if (t.rook_attacks(sq, occ) & rook_queen).is_not_empty() {
            return true;
        }

        let bishop_queen = self.bb(by, PieceType::Bishop) | self.bb(by, PieceType::Queen);
        (t.bishop_attacks(sq, occ) & bishop_queen).is_not_empty()
    }

    /// Whether the side to move is in check.
    #[inline]
    pub fn is_in_check(&self) -> bool {
        let king = self.king_sq(self.side_to_move);
        self.is_square_attacked(king, !self.side_to_move)
    }

    // -----------------------------------------------------------------------
    // Make / Undo move
    // -----------------------------------------------------------------------

    /// Play `mv` in place and return what `undo_move` needs to reverse it.
    ///
    /// The move must come from the generator for this position. Legality
    /// (king safety) is the caller's concern; see `rules::apply` for the
    /// checked entry point.
    pub fn make_move(&mut self, mv: Move) -> UndoInfo {
        let us = self.side_to_move;
        let them = !us;

        let mut undo = UndoInfo {
            captured_piece: None,
            castling_rights: self.castling_rights,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        };

        let moving_piece = self.piece_type_at(mv.from, us);
        self.en_passant = None;

        // Capture
        if mv.flags.is_en_passant() {
            let cap_sq = en_passant_victim(mv.to, us);
            self.remove_piece(cap_sq, them, PieceType::Pawn);
            undo.captured_piece = Some(PieceType::Pawn);
        } else if mv.flags.is_capture() {
            let cap_piece = self.piece_type_at(mv.to, them);
            self.remove_piece(mv.to, them, cap_piece);
            undo.captured_piece = Some(cap_piece);
        }

        // Promotion swaps the pawn for the new piece
        self.remove_piece(mv.from, us, moving_piece);
        self.put_piece(mv.to, us, mv.promotion.unwrap_or(moving_piece));

        // Castling rook
        if let Some((rook_from, rook_to)) = castling_rook_squares(mv, us) {
            self.remove_piece(rook_from, us, PieceType::Rook);
            self.put_piece(rook_to, us, PieceType::Rook);
        }

        // A king or rook leaving home, or a rook taken at home, drops rights
        self.castling_rights.0 &= CASTLING_MASK[mv.from.0 as usize];
        self.castling_rights.0 &= CASTLING_MASK[mv.to.0 as usize];

        if mv.flags.is_double_push() {
            self.en_passant = Some(mv.to.behind(us));
        }

        if moving_piece == PieceType::Pawn || undo.captured_piece.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }

        if us == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }

        self.side_to_move = them;
        undo
    }

    /// Take back `mv`, which must be the last move made with `make_move`.
    pub fn undo_move(&mut self, mv: Move, undo: &UndoInfo) {
        let us = !self.side_to_move;
        let them = self.side_to_move;
        self.side_to_move = us;

        let landing_piece = mv
            .promotion
            .unwrap_or_else(|| self.piece_type_at(mv.to, us));
        let original_piece = if mv.promotion.is_some() {
            PieceType::Pawn
        } else {
            landing_piece
        };

        self.remove_piece(mv.to, us, landing_piece);
        self.put_piece(mv.from, us, original_piece);

        if mv.flags.is_en_passant() {
            self.put_piece(en_passant_victim(mv.to, us), them, PieceType::Pawn);
        } else if let Some(cap_piece) = undo.captured_piece {
            self.put_piece(mv.to, them, cap_piece);
        }

        if let Some((rook_from, rook_to)) = castling_rook_squares(mv, us) {
            self.remove_piece(rook_to, us, PieceType::Rook);
            self.put_piece(rook_from, us, PieceType::Rook);
        }

        self.castling_rights = undo.castling_rights;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        self.fullmove_number = undo.fullmove_number;
    }

    /// Kind of `color`'s piece on `sq`. The square must hold one.
    #[inline]
    fn piece_type_at(&self, sq: Square, color: Color) -> PieceType {
        let bb = Bitboard::from_square(sq);
        for &pt in &PieceType::ALL {
            if (self.pieces[color.index()][pt.index()] & bb).is_not_empty() {
                return pt;
            }
        }
        panic!("no {color} piece found on {sq} in {}", self.to_fen());
    }
}

// ---------------------------------------------------------------------------
// Move geometry helpers
// ---------------------------------------------------------------------------

impl Square {
    /// The square one rank behind this one from `color`'s point of view.
    #[inline]
    fn behind(self, color: Color) -> Square {
        match color {
            Color::White => Square(self.0 - 8),
            Color::Black => Square(self.0 + 8),
        }
    }
}

/// Square of the pawn removed by an en-passant capture landing on `to`.
#[inline]
fn en_passant_victim(to: Square, mover: Color) -> Square {
    to.behind(mover)
}

/// Rook (from, to) for a castling move, `None` for anything else.
fn castling_rook_squares(mv: Move, color: Color) -> Option<(Square, Square)> {
    let rank = match color {
        Color::White => 0,
        Color::Black => 7,
    };
    if mv.flags.is_castle_kingside() {
        Some((Square::from_file_rank(7, rank), Square::from_file_rank(5, rank)))
    } else if mv.flags.is_castle_queenside() {
        Some((Square::from_file_rank(0, rank), Square::from_file_rank(3, rank)))
    } else {
        None
    }
}

/// Castling rights that survive a move touching each square. The king's home
/// square removes both of that side's rights; a rook's home square removes
/// its own.
#[rustfmt::skip]
const CASTLING_MASK: [u8; 64] = {
    let mut mask = [0b1111u8; 64];
    mask[0]  = 0b1111 & !CastlingRights::WHITE_QUEENSIDE;
    mask[4]  = 0b1111 & !(CastlingRights::WHITE_KINGSIDE | CastlingRights::WHITE_QUEENSIDE);
    mask[7]  = 0b1111 & !CastlingRights::WHITE_KINGSIDE;
    mask[56] = 0b1111 & !CastlingRights::BLACK_QUEENSIDE;
    mask[60] = 0b1111 & !(CastlingRights::BLACK_KINGSIDE | CastlingRights::BLACK_QUEENSIDE);
    mask[63] = 0b1111 & !CastlingRights::BLACK_KINGSIDE;
    mask
};

// ---------------------------------------------------------------------------
// FEN
// ---------------------------------------------------------------------------

impl Position {
    /// Read a six-field FEN record. Each field is checked, and each side
    /// must have exactly one king.
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(ChessError::InvalidFen(format!(
                "expected 6 fields, got {}",
                fields.len()
            )));
        }

        let mut pos = Position::empty();

        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(ChessError::InvalidFen(format!(
                "expected 8 ranks, got {}",
                ranks.len()
            )));
        }

        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_idx as u8;
            let mut file: u8 = 0;
            for ch in rank_str.chars() {
                if file > 7 {
                    return Err(ChessError::InvalidFen(format!(
                        "too many squares in rank {}",
                        rank + 1
                    )));
                }
                if let Some(digit) = ch.to_digit(10) {
                    if !(1..=8).contains(&digit) {
                        return Err(ChessError::InvalidFen(format!(
                            "invalid empty count '{ch}' in rank {}",
                            rank + 1
                        )));
                    }
                    file += digit as u8;
                } else if let Some((color, piece)) = PieceType::from_char(ch) {
                    pos.put_piece(Square::from_file_rank(file, rank), color, piece);
                    file += 1;
                } else {
                    return Err(ChessError::InvalidFen(format!(
                        "invalid character '{ch}' in piece placement"
                    )));
                }
            }
            if file != 8 {
                return Err(ChessError::InvalidFen(format!(
                    "rank {} has {} squares instead of 8",
                    rank + 1,
                    file
                )));
            }
        }

        for color in [Color::White, Color::Black] {
            let king_count = pos.bb(color, PieceType::King).pop_count();
            if king_count != 1 {
                return Err(ChessError::InvalidFen(format!(
                    "{color} has {king_count} kings (expected 1)"
                )));
            }
        }

        pos.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(ChessError::InvalidFen(format!(
                    "invalid side to move: '{other}'"
                )));
            }
        };

        pos.castling_rights = CastlingRights::from_fen(fields[2]).ok_or_else(|| {
            ChessError::InvalidFen(format!("invalid castling string: '{}'", fields[2]))
        })?;

        if fields[3] != "-" {
            let ep_sq = Square::from_algebraic(fields[3]).ok_or_else(|| {
                ChessError::InvalidFen(format!("invalid en passant square: '{}'", fields[3]))
            })?;
            let rank = ep_sq.rank();
            if rank != 2 && rank != 5 {
                return Err(ChessError::InvalidFen(format!(
                    "en passant square {} is not on rank 3 or 6",
                    fields[3]
                )));
            }
            pos.en_passant = Some(ep_sq);
        }

        pos.halfmove_clock = fields[4].parse::<u16>().map_err(|_| {
            ChessError::InvalidFen(format!("invalid halfmove clock: '{}'", fields[4]))
        })?;

        pos.fullmove_number = fields[5].parse::<u16>().map_err(|_| {
            ChessError::InvalidFen(format!("invalid fullmove number: '{}'", fields[5]))
        })?;
        if pos.fullmove_number == 0 {
            return Err(ChessError::InvalidFen(
                "fullmove number must be >= 1".to_string(),
            ));
        }

        #[cfg(debug_assertions)]
        pos.assert_consistent();

        Ok(pos)
    }

    /// Six-field FEN record for this position.
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(80);

        for rank in (0..8).rev() {
            let mut empty_count = 0u8;
            for file in 0..8 {
                match self.piece_at(Square::from_file_rank(file, rank)) {
                    Some((color, piece)) => {
                        if empty_count > 0 {
                            fen.push((b'0' + empty_count) as char);
                            empty_count = 0;
                        }
                        fen.push(piece.to_char(color));
                    }
                    None => empty_count += 1,
                }
            }
            if empty_count > 0 {
                fen.push((b'0' + empty_count) as char);
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });
        fen.push(' ');
        fen.push_str(&self.castling_rights.to_fen());
        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&sq.to_algebraic()),
            None => fen.push('-'),
        }
        fen.push(' ');
        fen.push_str(&self.halfmove_clock.to_string());
        fen.push(' ');
        fen.push_str(&self.fullmove_number.to_string());

        fen
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::fmt;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Side to move, owner of a piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Slot in per-colour arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Parse "white"/"black" (or "w"/"b"), case-insensitive.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "white" | "w" => Some(Color::White),
            "black" | "b" => Some(Color::Black),
            _ => None,
        }
    }

    /// Capitalised name for user-facing messages.
    pub fn name(self) -> &'static str {
        match self {
            Color::White => "White",
            Color::Black => "Black",
        }
    }
}

impl std::ops::Not for Color {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

// ---------------------------------------------------------------------------
// PieceType
// ---------------------------------------------------------------------------

/// The six piece kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    /// All piece types in order.
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    /// Kinds a pawn may promote to, strongest first.
    pub const PROMOTIONS: [PieceType; 4] = [
        PieceType::Queen,
        PieceType::Rook,
        PieceType::Bishop,
        PieceType::Knight,
    ];

    /// Number of piece types.
    pub const COUNT: usize = 6;

    /// Slot in per-kind arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Standard material value in centipawns. The king is never traded, so 0.
    pub const fn value(self) -> i32 {
        match self {
            PieceType::Pawn => 100,
            PieceType::Knight => 300,
            PieceType::Bishop => 300,
            PieceType::Rook => 500,
            PieceType::Queen => 900,
            PieceType::King => 0,
        }
    }

    /// Whether a pawn may promote to this kind.
    #[inline]
    pub fn is_promotion_choice(self) -> bool {
        Self::PROMOTIONS.contains(&self)
    }

    /// FEN letter: uppercase for White.
    pub fn to_char(self, color: Color) -> char {
        let c = match self {
            PieceType::Pawn => 'p',
            PieceType::Knight => 'n',
            PieceType::Bishop => 'b',
            PieceType::Rook => 'r',
            PieceType::Queen => 'q',
            PieceType::King => 'k',
        };
        match color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    /// Inverse of `to_char`: the letter case picks the colour.
    pub fn from_char(c: char) -> Option<(Color, PieceType)> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let piece = match c.to_ascii_lowercase() {
            'p' => PieceType::Pawn,
            'n' => PieceType::Knight,
            'b' => PieceType::Bishop,
            'r' => PieceType::Rook,
            'q' => PieceType::Queen,
            'k' => PieceType::King,
            _ => return None,
        };
        Some((color, piece))
    }
}

// ---------------------------------------------------------------------------
// Square
// ---------------------------------------------------------------------------

/// Board square index, a1 = 0 through h8 = 63 (file-major within a rank).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Square(pub u8);

impl Square {
    #[inline]
    pub fn file(self) -> u8 {
        self.0 & 7
    }

    #[inline]
    pub fn rank(self) -> u8 {
        self.0 >> 3
    }

    #[inline]
    pub fn from_file_rank(file: u8, rank: u8) -> Self {
        debug_assert!(file < 8 && rank < 8);
        Square(rank * 8 + file)
    }

    /// Step by (file, rank) deltas, or `None` when leaving the board.
    #[inline]
    pub fn offset(self, df: i8, dr: i8) -> Option<Self> {
        let f = self.file() as i8 + df;
        let r = self.rank() as i8 + dr;
        if (0..8).contains(&f) && (0..8).contains(&r) {
            Some(Square::from_file_rank(f as u8, r as u8))
        } else {
            None
        }
    }

    /// Light squares have an odd file+rank sum (a1 is dark).
    #[inline]
    pub fn is_light(self) -> bool {
        (self.file() + self.rank()) & 1 == 1
    }

    /// Parse algebraic notation like "e4" (case-insensitive file).
    pub fn from_algebraic(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].to_ascii_lowercase().wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        if file < 8 && rank < 8 {
            Some(Square::from_file_rank(file, rank))
        } else {
            None
        }
    }

    /// Coordinate name such as `e4`.
    pub fn to_algebraic(self) -> String {
        let file = (b'a' + self.file()) as char;
        let rank = (b'1' + self.rank()) as char;
        format!("{file}{rank}")
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_algebraic())
    }
}

// ---------------------------------------------------------------------------
// Bitboard
// ---------------------------------------------------------------------------

/// A 64-bit bitboard, one bit per square.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bitboard(pub u64);

impl Bitboard {
    pub const EMPTY: Bitboard = Bitboard(0);
    pub const ALL: Bitboard = Bitboard(!0u64);

    #[inline]
    pub fn from_square(sq: Square) -> Self {
        Bitboard(1u64 << sq.0)
    }

    #[inline]
    pub fn is_set(self, sq: Square) -> bool {
        self.0 & (1u64 << sq.0) != 0
    }

    #[inline]
    pub fn set(&mut self, sq: Square) {
        self.0 |= 1u64 << sq.0;
    }

    #[inline]
    pub fn pop_count(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_not_empty(self) -> bool {
        self.0 != 0
    }

    /// Lowest set square.
    #[inline]
    pub fn lsb(self) -> Option<Square> {
        if self.0 == 0 {
            None
        } else {
            Some(Square(self.0.trailing_zeros() as u8))
        }
    }

    /// Highest set square.
    #[inline]
    pub fn msb(self) -> Option<Square> {
        if self.0 == 0 {
            None
        } else {
            Some(Square(63 - self.0.leading_zeros() as u8))
        }
    }

    /// Remove and return the lowest square.
    #[inline]
    pub fn pop_lsb(&mut self) -> Option<Square> {
        let sq = self.lsb()?;
        self.0 &= self.0 - 1;
        Some(sq)
    }

    /// Squares in the set, lowest first.
    #[inline]
    pub fn iter(self) -> BitboardIter {
        BitboardIter(self)
    }
}

/// Yields the squares of a `Bitboard`, lowest first.
pub struct BitboardIter(Bitboard);

impl Iterator for BitboardIter {
    type Item = Square;

    #[inline]
    fn next(&mut self) -> Option<Square> {
        self.0.pop_lsb()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.0.pop_count() as usize;
        (count, Some(count))
    }
}

impl ExactSizeIterator for BitboardIter {}

impl std::ops::BitAnd for Bitboard {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Bitboard(self.0 & rhs.0)
    }
}

impl std::ops::BitOr for Bitboard {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Bitboard(self.0 | rhs.0)
    }
}

impl std::ops::Not for Bitboard {
    type Output = Self;
    #[inline]
    fn not(self) -> Self {
        Bitboard(!self.0)
    }
}

impl std::ops::BitAndAssign for Bitboard {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl std::ops::BitOrAssign for Bitboard {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Bitboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitboard(0x{:016x})", self.0)
    }
}

// ---------------------------------------------------------------------------
// MoveFlags
// ---------------------------------------------------------------------------

/// What kind of move this is, as a bit set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MoveFlags(pub u8);

impl MoveFlags {
    pub const NONE: MoveFlags = MoveFlags(0);
    pub const CAPTURE: MoveFlags = MoveFlags(1);
    pub const EN_PASSANT: MoveFlags = MoveFlags(2);
    pub const CASTLE_KINGSIDE: MoveFlags = MoveFlags(4);
    pub const CASTLE_QUEENSIDE: MoveFlags = MoveFlags(8);
    pub const DOUBLE_PUSH: MoveFlags = MoveFlags(16);

    #[inline]
    pub fn is_capture(self) -> bool {
        self.0 & Self::CAPTURE.0 != 0
    }

    #[inline]
    pub fn is_en_passant(self) -> bool {
        self.0 & Self::EN_PASSANT.0 != 0
    }

    #[inline]
    pub fn is_castle_kingside(self) -> bool {
        self.0 & Self::CASTLE_KINGSIDE.0 != 0
    }

    #[inline]
    pub fn is_castle_queenside(self) -> bool {
        self.0 & Self::CASTLE_QUEENSIDE.0 != 0
    }

    #[inline]
    pub fn is_castling(self) -> bool {
        self.is_castle_kingside() || self.is_castle_queenside()
    }

    #[inline]
    pub fn is_double_push(self) -> bool {
        self.0 & Self::DOUBLE_PUSH.0 != 0
    }
}

impl std::ops::BitOr for MoveFlags {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        MoveFlags(self.0 | rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// A move as generated: origin, destination, promotion piece and kind flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceType>,
    pub flags: MoveFlags,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Move {
            from,
            to,
            promotion: None,
            flags: MoveFlags::NONE,
        }
    }

    pub fn with_flags(from: Square, to: Square, flags: MoveFlags) -> Self {
        Move {
            from,
            to,
            promotion: None,
            flags,
        }
    }

    pub fn with_promotion(
        from: Square,
        to: Square,
        promotion: PieceType,
        flags: MoveFlags,
    ) -> Self {
        Move {
            from,
            to,
            promotion: Some(promotion),
            flags,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promo) = self.promotion {
            write!(f, "{}", promo.to_char(Color::Black))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CastlingRights
// ---------------------------------------------------------------------------

/// Which castles remain available. One bit each for White short, White long,
/// Black short and Black long.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CastlingRights(pub u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const WHITE_KINGSIDE: u8 = 1;
    pub const WHITE_QUEENSIDE: u8 = 2;
    pub const BLACK_KINGSIDE: u8 = 4;
    pub const BLACK_QUEENSIDE: u8 = 8;
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    #[inline]
    pub fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    #[inline]
    fn kingside_flag(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_KINGSIDE,
            Color::Black => Self::BLACK_KINGSIDE,
        }
    }

    #[inline]
    fn queenside_flag(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_QUEENSIDE,
            Color::Black => Self::BLACK_QUEENSIDE,
        }
    }

    #[inline]
    pub fn can_castle_kingside(self, color: Color) -> bool {
        self.has(Self::kingside_flag(color))
    }

    #[inline]
    pub fn can_castle_queenside(self, color: Color) -> bool {
        self.has(Self::queenside_flag(color))
    }

    /// Read the castling field of a FEN record.
    pub fn from_fen(s: &str) -> Option<Self> {
        if s == "-" {
            return Some(CastlingRights::NONE);
        }
        let mut rights = 0u8;
        for c in s.chars() {
            match c {
                'K' => rights |= Self::WHITE_KINGSIDE,
                'Q' => rights |= Self::WHITE_QUEENSIDE,
                'k' => rights |= Self::BLACK_KINGSIDE,
                'q' => rights |= Self::BLACK_QUEENSIDE,
                _ => return None,
            }
        }
        Some(CastlingRights(rights))
    }

    /// The castling field of a FEN record.
    pub fn to_fen(self) -> String {
        if self.0 == 0 {
            return "-".to_string();
        }
        [
            (Self::WHITE_KINGSIDE, 'K'),
            (Self::WHITE_QUEENSIDE, 'Q'),
            (Self::BLACK_KINGSIDE, 'k'),
            (Self::BLACK_QUEENSIDE, 'q'),
        ]
        .iter()
        .filter(|(flag, _)| self.has(*flag))
        .map(|(_, c)| *c)
        .collect()
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fen())
    }
}

// ---------------------------------------------------------------------------
// GameResult & Difficulty
// ---------------------------------------------------------------------------

/// Outcome classification of a game. Everything but `Ongoing` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameResult {
    Ongoing,
    /// Carries the winning side.
    Checkmate(Color),
    Stalemate,
    DrawByAgreement,
    DrawByRepetition,
    DrawByFiftyMove,
    DrawByInsufficientMaterial,
    /// Carries the side that resigned.
    Resignation(Color),
}

impl GameResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::Ongoing => "ongoing",
            GameResult::Checkmate(_) => "checkmate",
            GameResult::Stalemate => "stalemate",
            GameResult::DrawByAgreement => "draw_by_agreement",
            GameResult::DrawByRepetition => "threefold_repetition",
            GameResult::DrawByFiftyMove => "fifty_move_rule",
            GameResult::DrawByInsufficientMaterial => "insufficient_material",
            GameResult::Resignation(_) => "resignation",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameResult::Ongoing)
    }

    /// The winning side, if the game was decided.
    pub fn winner(&self) -> Option<Color> {
        match *self {
            GameResult::Checkmate(winner) => Some(winner),
            GameResult::Resignation(loser) => Some(!loser),
            _ => None,
        }
    }

    /// Human-readable summary, e.g. "White wins by checkmate".
    pub fn describe(&self) -> String {
        match *self {
            GameResult::Ongoing => "Game in progress".to_string(),
            GameResult::Checkmate(winner) => format!("{} wins by checkmate", winner.name()),
            GameResult::Resignation(loser) => {
                format!("{} resigns, {} wins", loser.name(), (!loser).name())
            }
            GameResult::Stalemate => "Draw by stalemate".to_string(),
            GameResult::DrawByAgreement => "Draw by agreement".to_string(),
            GameResult::DrawByRepetition => "Draw by threefold repetition".to_string(),
            GameResult::DrawByFiftyMove => "Draw by fifty-move rule".to_string(),
            GameResult::DrawByInsufficientMaterial => {
                "Draw by insufficient material".to_string()
            }
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// AI difficulty levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Difficulty {
    Harmless,
    Easy,
    Medium,
    Hard,
    Expert,
    Godlike,
}

impl Difficulty {
    pub const ALL: [Difficulty; 6] = [
        Difficulty::Harmless,
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
        Difficulty::Godlike,
    ];

    /// Level name in any case, as given on the command line.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "harmless" => Some(Difficulty::Harmless),
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            "expert" => Some(Difficulty::Expert),
            "godlike" => Some(Difficulty::Godlike),
            _ => None,
        }
    }

    /// Search depth for minimax. Strictly increasing with the level.
    pub fn depth(self) -> u32 {
        match self {
            Difficulty::Harmless => 0,
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
            Difficulty::Expert => 4,
            Difficulty::Godlike => 5,
        }
    }

    /// Share of the best-scored root moves the engine picks from at random.
    /// Zero means it always plays its top move.
    pub fn randomness(self) -> f64 {
        match self {
            Difficulty::Easy => 0.3,
            Difficulty::Medium => 0.1,
            _ => 0.0,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Harmless => write!(f, "harmless"),
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
            Difficulty::Expert => write!(f, "expert"),
            Difficulty::Godlike => write!(f, "godlike"),
        }
    }
}

// ---------------------------------------------------------------------------
// ChessError
// ---------------------------------------------------------------------------

/// Everything that can go wrong while playing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChessError {
    #[error("illegal move: {from} -> {to}: {reason}")]
    InvalidMoveRequest {
        from: String,
        to: String,
        reason: String,
    },

    #[error("invalid promotion piece: {0} (choose q, r, b or n)")]
    IllegalPromotionChoice(String),

    /// A move not drawn from the generator reached the applier.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("invalid FEN string: {0}")]
    InvalidFen(String),

    #[error("invalid square notation: {0}")]
    InvalidSquare(String),

    #[error("game is already over: {0}")]
    GameOver(String),

    #[error("no moves to undo")]
    NothingToUndo,

    #[error("there is no draw offer to accept")]
    NoDrawOffer,
}

impl ChessError {
    /// Errors the player can fix by entering something else.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ChessError::PreconditionViolation(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

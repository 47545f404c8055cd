//! AI Engine: trait definition, RandomAi, and MinimaxAi.
//!
//! The `AiEngine` trait defines the interface for all AI engines.
//! Two implementations are provided:
//!   - `RandomAi`  plays a random legal move (used for "harmless" difficulty).
//!   - `MinimaxAi` runs negamax search with alpha-beta pruning.

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use tracing::debug;

use crate::engine::board::{Position, UndoInfo};
use crate::engine::game::Game;
use crate::engine::movegen::legal_moves;
use crate::engine::types::{ChessError, Color, Difficulty, Move, PieceType};

use super::evaluation::{Evaluator, INF, MATE, is_mate_score};

// =========================================================================
// AiEngine trait
// =========================================================================

/// The AI engine interface.
pub trait AiEngine: Send + Sync {
    /// Select the best move for the current position at the given difficulty.
    fn best_move(&self, game: &Game, difficulty: Difficulty) -> Result<Move, ChessError>;

    /// Human-readable name for this engine.
    fn name(&self) -> &str;
}

fn no_moves_error() -> ChessError {
    ChessError::GameOver("no legal moves".to_string())
}

// =========================================================================
// RandomAi
// =========================================================================

/// Picks a random legal move. Used for "harmless" difficulty.
pub struct RandomAi;

impl AiEngine for RandomAi {
    fn best_move(&self, game: &Game, _difficulty: Difficulty) -> Result<Move, ChessError> {
        let moves = game.legal_moves();
        let mut rng = rand::thread_rng();
        moves.choose(&mut rng).copied().ok_or_else(no_moves_error)
    }

    fn name(&self) -> &str {
        "RandomAi"
    }
}

// =========================================================================
// ScopedMove: make on construction, undo on drop
// =========================================================================

/// A move applied to a borrowed position for the lifetime of the guard.
///
/// The guard derefs to the position so the child node can be searched
/// through it; dropping the guard undoes the move on every exit path.
pub struct ScopedMove<'a> {
    pos: &'a mut Position,
    mv: Move,
    undo: UndoInfo,
}

impl<'a> ScopedMove<'a> {
    pub fn new(pos: &'a mut Position, mv: Move) -> Self {
        let undo = pos.make_move(mv);
        ScopedMove { pos, mv, undo }
    }
}

impl Deref for ScopedMove<'_> {
    type Target = Position;
    fn deref(&self) -> &Position {
        self.pos
    }
}

impl DerefMut for ScopedMove<'_> {
    fn deref_mut(&mut self) -> &mut Position {
        self.pos
    }
}

impl Drop for ScopedMove<'_> {
    fn drop(&mut self) {
        self.pos.undo_move(self.mv, &self.undo);
    }
}

// =========================================================================
// Move ordering (MVV-LVA)
// =========================================================================

/// Score a move for ordering. Higher = searched first.
fn move_order_score(mv: &Move, pos: &Position) -> i32 {
    let mut score = 0i32;

    if mv.flags.is_capture() {
        let victim = if mv.flags.is_en_passant() {
            PieceType::Pawn
        } else {
            pos.piece_at(mv.to).map_or(PieceType::Pawn, |(_, pt)| pt)
        };
        let attacker = pos.piece_at(mv.from).map_or(0, |(_, pt)| pt.value());
        score += 10_000 + victim.value() * 10 - attacker;
    }

    if let Some(promo) = mv.promotion {
        score += 8_000 + promo.value();
    }

    score
}

/// Sort moves for alpha-beta search (best-first).
fn order_moves(moves: &mut [Move], pos: &Position) {
    moves.sort_by_key(|m| std::cmp::Reverse(move_order_score(m, pos)));
}

// =========================================================================
// MinimaxAi: negamax with alpha-beta pruning
// =========================================================================

/// Search statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchStats {
    pub nodes: u64,
    /// Deepest fully completed iteration.
    pub depth: u32,
    pub score: i32,
    pub time_ms: u64,
}

/// State for a single search.
struct SearchContext<'e> {
    evaluator: &'e Evaluator,
    deadline: Option<Instant>,
    nodes: u64,
    aborted: bool,
}

impl<'e> SearchContext<'e> {
    fn new(evaluator: &'e Evaluator, deadline: Option<Instant>) -> Self {
        Self {
            evaluator,
            deadline,
            nodes: 0,
            aborted: false,
        }
    }

    /// Check the deadline every 4096 nodes.
    #[inline]
    fn check_time(&mut self) {
        if self.nodes & 4095 == 0
            && let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            self.aborted = true;
        }
    }

    /// Negamax with alpha-beta pruning. Score is from the side to move's
    /// perspective; `ply` is the distance from the root.
    fn negamax(
        &mut self,
        pos: &mut Position,
        depth: u32,
        ply: u32,
        mut alpha: i32,
        beta: i32,
    ) -> i32 {
        self.nodes += 1;
        self.check_time();
        if self.aborted {
            return 0;
        }

        // Terminal detection comes before the depth cutoff so a leaf that is
        // mate or stalemate scores as such.
        let mut moves = legal_moves(pos);
        if moves.is_empty() {
            return if pos.is_in_check() {
                -(MATE - ply as i32)
            } else {
                0
            };
        }

        if depth == 0 {
            return self.evaluator.evaluate_relative(pos);
        }

        order_moves(&mut moves, pos);

        let mut best_score = -INF;
        for mv in moves {
            let score = {
                let mut child = ScopedMove::new(pos, mv);
                -self.negamax(&mut child, depth - 1, ply + 1, -beta, -alpha)
            };
            if self.aborted {
                return best_score.max(score);
            }
            best_score = best_score.max(score);
            alpha = alpha.max(score);
            if alpha >= beta {
                break;
            }
        }
        best_score
    }

    /// Search every root move to `depth`. `None` when aborted before the
    /// first root move completed.
    fn root(&mut self, pos: &mut Position, moves: &[Move], depth: u32) -> Option<(Move, i32)> {
        let mut best: Option<(Move, i32)> = None;
        for &mv in moves {
            let alpha = best.map_or(-INF, |(_, s)| s);
            let score = {
                let mut child = ScopedMove::new(pos, mv);
                -self.negamax(&mut child, depth - 1, 1, -INF, -alpha)
            };
            if self.aborted {
                break;
            }
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((mv, score));
            }
        }
        best
    }

    /// Exact score of every root move at `depth`, in search order. Stops at
    /// the deadline, so the list may be shorter than `moves`.
    fn score_all(&mut self, pos: &mut Position, moves: &[Move], depth: u32) -> Vec<(Move, i32)> {
        let mut scored = Vec::with_capacity(moves.len());
        for &mv in moves {
            let score = {
                let mut child = ScopedMove::new(pos, mv);
                -self.negamax(&mut child, depth - 1, 1, -INF, INF)
            };
            if self.aborted {
                break;
            }
            scored.push((mv, score));
        }
        scored
    }
}

/// Minimax AI engine using negamax with alpha-beta pruning.
#[derive(Debug, Default)]
pub struct MinimaxAi {
    evaluator: Evaluator,
    /// Optional time limit per search (if None, depth alone limits search).
    time_limit: Option<Duration>,
}

impl MinimaxAi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit(time_limit: Duration) -> Self {
        Self {
            time_limit: Some(time_limit),
            ..Self::default()
        }
    }

    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Search to exactly `depth` plies. Depth 0 is treated as 1.
    ///
    /// Every move is undone before returning, so `pos` is unchanged.
    pub fn search_fixed_depth(
        &self,
        pos: &mut Position,
        depth: u32,
    ) -> (Option<Move>, SearchStats) {
        let start = Instant::now();
        let depth = depth.max(1);
        let mut ctx = SearchContext::new(&self.evaluator, None);

        let mut moves = legal_moves(pos);
        order_moves(&mut moves, pos);
        let best = ctx.root(pos, &moves, depth);

        let stats = SearchStats {
            nodes: ctx.nodes,
            depth,
            score: best.map_or(0, |(_, s)| s),
            time_ms: start.elapsed().as_millis() as u64,
        };
        (best.map(|(mv, _)| mv), stats)
    }

    /// Iterative deepening from depth 1 to `max_depth`, stopping early when
    /// the time limit runs out. Returns the result of the last completed
    /// iteration (or the partial first iteration if even that ran out).
    pub fn search(&self, pos: &mut Position, max_depth: u32) -> (Option<Move>, SearchStats) {
        let Some(limit) = self.time_limit else {
            return self.search_fixed_depth(pos, max_depth);
        };

        let start = Instant::now();
        let mut ctx = SearchContext::new(&self.evaluator, Some(start + limit));
        let mut moves = legal_moves(pos);
        order_moves(&mut moves, pos);

        let mut best: Option<(Move, i32)> = None;
        let mut completed = 0;
        for depth in 1..=max_depth.max(1) {
            let result = ctx.root(pos, &moves, depth);
            if ctx.aborted {
                if best.is_none() {
                    best = result;
                }
                break;
            }
            best = result;
            completed = depth;
            // Search the previous best first on the next iteration.
            if let Some((mv, _)) = best
                && let Some(idx) = moves.iter().position(|&m| m == mv)
            {
                moves[..=idx].rotate_right(1);
            }
        }

        // Out of time before any root move finished: fall back to move ordering.
        if best.is_none()
            && let Some(&first) = moves.first()
        {
            best = Some((first, 0));
        }

        let stats = SearchStats {
            nodes: ctx.nodes,
            depth: completed,
            score: best.map_or(0, |(_, s)| s),
            time_ms: start.elapsed().as_millis() as u64,
        };
        (best.map(|(mv, _)| mv), stats)
    }

    /// Score every root move at `depth` and pick uniformly among the top
    /// `max(1, len * randomness)` of them. A forced mate is always played.
    fn pick_among_best(
        &self,
        pos: &mut Position,
        depth: u32,
        randomness: f64,
    ) -> (Option<Move>, SearchStats) {
        let start = Instant::now();
        let depth = depth.max(1);
        let mut ctx = SearchContext::new(&self.evaluator, self.time_limit.map(|l| start + l));
        let mut moves = legal_moves(pos);
        order_moves(&mut moves, pos);

        let mut scored = ctx.score_all(pos, &moves, depth);
        scored.sort_by_key(|&(_, score)| std::cmp::Reverse(score));

        let pick = match scored.first() {
            None => moves.first().map(|&mv| (mv, 0)),
            Some(&(mv, score)) if score > 0 && is_mate_score(score) => Some((mv, score)),
            Some(_) => {
                let pool = ((scored.len() as f64 * randomness) as usize).max(1);
                scored[..pool].choose(&mut rand::thread_rng()).copied()
            }
        };

        let stats = SearchStats {
            nodes: ctx.nodes,
            depth: if ctx.aborted { 0 } else { depth },
            score: pick.map_or(0, |(_, s)| s),
            time_ms: start.elapsed().as_millis() as u64,
        };
        (pick.map(|(mv, _)| mv), stats)
    }

    /// Suggest a move for the side to move, one ply shallower than
    /// `difficulty` would search (at least one).
    pub fn hint(&self, game: &Game, difficulty: Difficulty) -> Result<Move, ChessError> {
        let depth = difficulty.depth().saturating_sub(1).max(1);
        let mut pos = game.position().clone();
        let (best, stats) = self.search(&mut pos, depth);
        debug!(nodes = stats.nodes, depth = stats.depth, score = stats.score, "hint search");
        best.ok_or_else(no_moves_error)
    }

    /// Whether the engine, playing `color`, would take a draw here.
    pub fn accepts_draw(&self, pos: &Position, color: Color) -> bool {
        self.evaluator.evaluate_for(pos, color) <= 0
    }
}

impl AiEngine for MinimaxAi {
    fn best_move(&self, game: &Game, difficulty: Difficulty) -> Result<Move, ChessError> {
        let depth = difficulty.depth();
        if depth == 0 {
            return RandomAi.best_move(game, difficulty);
        }

        let mut pos = game.position().clone();
        let randomness = difficulty.randomness();
        let (best, stats) = if randomness > 0.0 {
            self.pick_among_best(&mut pos, depth, randomness)
        } else {
            self.search(&mut pos, depth)
        };
        debug!(
            %difficulty,
            nodes = stats.nodes,
            depth = stats.depth,
            score = stats.score,
            time_ms = stats.time_ms,
            "search finished"
        );
        best.ok_or_else(no_moves_error)
    }

    fn name(&self) -> &str {
        "MinimaxAi"
    }
}

/// Best move for the side to move at a fixed depth, using the default
/// evaluator. `None` when there are no legal moves.
pub fn search_best_move(pos: &Position, depth: u32) -> Option<Move> {
    let mut scratch = pos.clone();
    MinimaxAi::new().search_fixed_depth(&mut scratch, depth).0
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::ai::evaluation::PieceValues;
    use crate::engine::types::{GameResult, Square};

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    // --- RandomAi ---

    #[test]
    fn random_ai_returns_legal_move() {
        let game = Game::new();
        let legal = game.legal_moves();
        for _ in 0..50 {
            let mv = RandomAi.best_move(&game, Difficulty::Harmless).unwrap();
            assert!(legal.contains(&mv), "RandomAi returned illegal move: {mv:?}");
        }
    }

    #[test]
    fn random_ai_errors_when_no_moves() {
        let game = Game::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
            .unwrap();
        assert!(RandomAi.best_move(&game, Difficulty::Harmless).is_err());
    }

    // --- ScopedMove ---

    #[test]
    fn scoped_move_undoes_on_drop() {
        let mut pos = Position::starting();
        let mv = legal_moves(&pos)[0];
        {
            let guard = ScopedMove::new(&mut pos, mv);
            assert_eq!(guard.side_to_move, Color::Black);
        }
        assert_eq!(pos, Position::starting());
    }

    // --- Move ordering ---

    #[test]
    fn captures_ordered_before_quiet_moves() {
        let pos =
            Position::from_fen("r1bqkb1r/pppppppp/2n2n2/4P3/8/8/PPPP1PPP/RNBQKBNR w KQkq - 1 3")
                .unwrap();
        let mut moves = legal_moves(&pos);
        order_moves(&mut moves, &pos);
        let last_capture = moves.iter().rposition(|m| m.flags.is_capture());
        let first_quiet = moves.iter().position(|m| !m.flags.is_capture());
        if let (Some(cap), Some(quiet)) = (last_capture, first_quiet) {
            assert!(cap < quiet);
        }
    }

    #[test]
    fn most_valuable_victim_first() {
        // Pawn can take the queen or the knight.
        let pos = Position::from_fen("4k3/8/8/2n1q3/3P4/8/8/7K w - - 0 1").unwrap();
        let mut moves = legal_moves(&pos);
        order_moves(&mut moves, &pos);
        assert_eq!(moves[0].to, sq("e5"));
    }

    // --- MinimaxAi ---

    #[test]
    fn finds_mate_in_one_white() {
        let game =
            Game::from_fen("r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4")
                .unwrap();
        let mv = MinimaxAi::new().best_move(&game, Difficulty::Easy).unwrap();
        assert_eq!(mv.to, sq("f7"), "should find Qxf7# mate-in-1");
    }

    #[test]
    fn finds_mate_in_one_black() {
        let game = Game::from_fen("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq g3 0 2")
            .unwrap();
        let mv = MinimaxAi::new().best_move(&game, Difficulty::Easy).unwrap();
        let mut after = game.clone();
        after.make_move(mv).unwrap();
        assert_eq!(after.result(), GameResult::Checkmate(Color::Black));
    }

    #[test]
    fn captures_hanging_piece() {
        let game = Game::from_fen("4k3/8/8/3r4/8/8/3Q4/4K3 w - - 0 1").unwrap();
        let mv = MinimaxAi::new().best_move(&game, Difficulty::Hard).unwrap();
        assert_eq!(mv.to, sq("d5"), "should capture hanging rook on d5");
    }

    #[test]
    fn search_leaves_position_unchanged() {
        let mut pos =
            Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
                .unwrap();
        let before = pos.clone();
        let (mv, stats) = MinimaxAi::new().search_fixed_depth(&mut pos, 2);
        assert!(mv.is_some());
        assert!(stats.nodes > 48);
        assert_eq!(pos, before);
    }

    #[test]
    fn mate_score_prefers_faster_mate() {
        let mut pos =
            Position::from_fen("r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4")
                .unwrap();
        let (mv, stats) = MinimaxAi::new().search_fixed_depth(&mut pos, 3);
        assert!(is_mate_score(stats.score));
        assert_eq!(stats.score, MATE - 1);
        assert_eq!(mv.map(|m| m.to), Some(sq("f7")));
    }

    #[test]
    fn no_move_in_terminal_position() {
        let pos = Position::from_fen("k7/2K5/1Q6/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(search_best_move(&pos, 3), None);
    }

    #[test]
    fn harmless_delegates_to_random() {
        let game = Game::new();
        let mv = MinimaxAi::new().best_move(&game, Difficulty::Harmless).unwrap();
        assert!(game.legal_moves().contains(&mv));
    }

    #[test]
    fn search_with_time_limit_returns_legal_move() {
        let game = Game::new();
        let ai = MinimaxAi::with_time_limit(Duration::from_millis(50));
        let mv = ai.best_move(&game, Difficulty::Godlike).unwrap();
        assert!(game.legal_moves().contains(&mv));
    }

    #[test]
    fn iterative_deepening_matches_fixed_depth_on_mate() {
        let mut pos = Position::from_fen("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq g3 0 2")
            .unwrap();
        let ai = MinimaxAi::with_time_limit(Duration::from_secs(30));
        let (mv, stats) = ai.search(&mut pos, 2);
        assert_eq!(mv.map(|m| m.to), Some(sq("h4")));
        assert_eq!(stats.depth, 2);
    }

    #[test]
    fn hint_returns_legal_move() {
        let game = Game::new();
        let mv = MinimaxAi::new().hint(&game, Difficulty::Medium).unwrap();
        assert!(game.legal_moves().contains(&mv));
    }

    #[test]
    fn draw_acceptance_follows_evaluation() {
        let ai = MinimaxAi::new();
        let white_up = Position::from_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        assert!(!ai.accepts_draw(&white_up, Color::White));
        assert!(ai.accepts_draw(&white_up, Color::Black));
    }

    #[test]
    fn material_only_evaluator_still_takes_free_rook() {
        let ai = MinimaxAi::new().with_evaluator(Evaluator::material_only(PieceValues::default()));
        assert!(ai.evaluator().term_names().is_empty());
        let game = Game::from_fen("4k3/8/8/3r4/8/8/3Q4/4K3 w - - 0 1").unwrap();
        let mv = ai.best_move(&game, Difficulty::Hard).unwrap();
        assert_eq!(mv.to, sq("d5"));
    }

    #[test]
    fn easy_varies_its_opening_move() {
        let game = Game::new();
        let ai = MinimaxAi::new();
        let legal = game.legal_moves();
        let seen: HashSet<Move> = (0..40)
            .map(|_| ai.best_move(&game, Difficulty::Easy).unwrap())
            .inspect(|mv| assert!(legal.contains(mv)))
            .collect();
        assert!(seen.len() > 1, "easy always played {seen:?}");
    }

    #[test]
    fn hard_is_deterministic() {
        let game = Game::new();
        let ai = MinimaxAi::new();
        let first = ai.best_move(&game, Difficulty::Hard).unwrap();
        for _ in 0..4 {
            assert_eq!(ai.best_move(&game, Difficulty::Hard).unwrap(), first);
        }
    }

    #[test]
    fn randomised_levels_still_mate_in_one() {
        let game =
            Game::from_fen("r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4")
                .unwrap();
        for _ in 0..10 {
            let mv = MinimaxAi::new().best_move(&game, Difficulty::Medium).unwrap();
            assert_eq!(mv.to, sq("f7"));
        }
    }
}

pub mod engine;
pub mod evaluation;

pub use engine::{AiEngine, MinimaxAi, RandomAi, ScopedMove, SearchStats, search_best_move};
pub use evaluation::{Evaluator, PieceValues, PositionalTerm};

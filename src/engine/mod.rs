pub mod attacks;
pub mod board;
pub mod game;
pub mod movegen;
pub mod rules;
pub mod san;
pub mod types;

pub use board::{Position, PositionKey, UndoInfo};
pub use game::{Game, HistoryEntry, MoveRequest};
pub use movegen::{legal_moves, legal_moves_from};
pub use types::*;

//! Console chess: a bitboard rules engine, an alpha-beta computer opponent
//! and a line-based terminal front end.

pub mod ai;
pub mod cli;
pub mod config;
pub mod engine;

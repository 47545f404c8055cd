use std::time::Duration;

use crate::engine::types::{Color, Difficulty};

/// Game configuration parsed from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Computer strength.
    pub difficulty: Difficulty,
    /// AI move timeout in milliseconds; 0 means depth alone bounds the search.
    pub ai_timeout_ms: u64,
    /// Colour played by the human in single-player mode.
    pub human_color: Color,
    /// Play against the computer (`true`) or another human (`false`).
    pub vs_ai: bool,
    /// Draw pieces with Unicode chess glyphs instead of letters.
    pub unicode: bool,
}

impl GameConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key/value source. Unparseable values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = GameConfig::default();
        GameConfig {
            difficulty: lookup("CHESS_AI_DEFAULT_DIFFICULTY")
                .and_then(|v| Difficulty::from_str_loose(&v))
                .unwrap_or(defaults.difficulty),
            ai_timeout_ms: lookup("CHESS_AI_TIMEOUT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.ai_timeout_ms),
            human_color: lookup("CHESS_PLAYER_COLOR")
                .and_then(|v| Color::from_str_loose(&v))
                .unwrap_or(defaults.human_color),
            vs_ai: lookup("CHESS_MODE")
                .and_then(|v| match v.trim().to_lowercase().as_str() {
                    "ai" | "computer" => Some(true),
                    "human" | "pvp" => Some(false),
                    _ => None,
                })
                .unwrap_or(defaults.vs_ai),
            unicode: lookup("CHESS_UNICODE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.unicode),
        }
    }

    /// Apply command-line flags on top of the environment:
    /// `--difficulty <level>`, `--black`, `--white`, `--pvp`, `--unicode`.
    pub fn apply_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "--difficulty" => {
                    if let Some(level) = args.next()
                        && let Some(d) = Difficulty::from_str_loose(level.as_ref())
                    {
                        self.difficulty = d;
                    }
                }
                "--black" => self.human_color = Color::Black,
                "--white" => self.human_color = Color::White,
                "--pvp" => self.vs_ai = false,
                "--unicode" => self.unicode = true,
                _ => {}
            }
        }
    }

    /// Search time limit, if any.
    pub fn ai_timeout(&self) -> Option<Duration> {
        (self.ai_timeout_ms > 0).then(|| Duration::from_millis(self.ai_timeout_ms))
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            difficulty: Difficulty::Medium,
            ai_timeout_ms: 0,
            human_color: Color::White,
            vs_ai: true,
            unicode: false,
        }
    }
}
